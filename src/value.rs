//! The intermediate value tree that sits between serde and the wire.
//!
//! Encoding turns a `Serialize` value into a [`Value`] first and then walks
//! it against the target signature; decoding produces a [`Value`] from the
//! message's own signature and hands it to serde afterwards.

use std::convert::TryFrom;
use std::fmt::{self, Display};

use crate::error::{CodingPath, Error, Result};
use crate::signature::{BasicKind, TypeNode};

/// Exactly one scalar of one basic kind.
#[derive(Clone, Debug, PartialEq)]
pub enum BasicValue {
    Byte(u8),
    Boolean(bool),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Double(f64),
    UnixFd(u32),
    String(String),
    ObjectPath(String),
    Signature(String),
}

impl BasicValue {
    pub fn kind(&self) -> BasicKind {
        match self {
            BasicValue::Byte(_) => BasicKind::Byte,
            BasicValue::Boolean(_) => BasicKind::Boolean,
            BasicValue::Int16(_) => BasicKind::Int16,
            BasicValue::UInt16(_) => BasicKind::UInt16,
            BasicValue::Int32(_) => BasicKind::Int32,
            BasicValue::UInt32(_) => BasicKind::UInt32,
            BasicValue::Int64(_) => BasicKind::Int64,
            BasicValue::UInt64(_) => BasicKind::UInt64,
            BasicValue::Double(_) => BasicKind::Double,
            BasicValue::UnixFd(_) => BasicKind::UnixFd,
            BasicValue::String(_) => BasicKind::String,
            BasicValue::ObjectPath(_) => BasicKind::ObjectPath,
            BasicValue::Signature(_) => BasicKind::Signature,
        }
    }

    /// Any integer kind, widened losslessly.
    pub fn as_i128(&self) -> Option<i128> {
        match self {
            BasicValue::Byte(v) => Some(i128::from(*v)),
            BasicValue::Int16(v) => Some(i128::from(*v)),
            BasicValue::UInt16(v) => Some(i128::from(*v)),
            BasicValue::Int32(v) => Some(i128::from(*v)),
            BasicValue::UInt32(v) | BasicValue::UnixFd(v) => Some(i128::from(*v)),
            BasicValue::Int64(v) => Some(i128::from(*v)),
            BasicValue::UInt64(v) => Some(i128::from(*v)),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            BasicValue::String(s) | BasicValue::ObjectPath(s) | BasicValue::Signature(s) => {
                Some(s)
            }
            _ => None,
        }
    }

    /// Converts to `kind` without losing anything.
    ///
    /// Integers convert between widths only when the value fits exactly;
    /// booleans and doubles only convert to themselves; the three string
    /// kinds convert among each other (the text is validated when it is
    /// appended).
    pub fn convert_to(&self, kind: BasicKind, path: &CodingPath) -> Result<BasicValue> {
        if self.kind() == kind {
            return Ok(self.clone());
        }

        if kind.is_integer() {
            let wide = self
                .as_i128()
                .ok_or_else(|| Error::type_mismatch(path, kind.name(), self.kind().name()))?;
            let out_of_range = || Error::value_range(path, wide, kind.name());
            let converted = match kind {
                BasicKind::Byte => BasicValue::Byte(u8::try_from(wide).map_err(|_| out_of_range())?),
                BasicKind::Int16 => {
                    BasicValue::Int16(i16::try_from(wide).map_err(|_| out_of_range())?)
                }
                BasicKind::UInt16 => {
                    BasicValue::UInt16(u16::try_from(wide).map_err(|_| out_of_range())?)
                }
                BasicKind::Int32 => {
                    BasicValue::Int32(i32::try_from(wide).map_err(|_| out_of_range())?)
                }
                BasicKind::UInt32 => {
                    BasicValue::UInt32(u32::try_from(wide).map_err(|_| out_of_range())?)
                }
                BasicKind::Int64 => {
                    BasicValue::Int64(i64::try_from(wide).map_err(|_| out_of_range())?)
                }
                BasicKind::UInt64 => {
                    BasicValue::UInt64(u64::try_from(wide).map_err(|_| out_of_range())?)
                }
                BasicKind::UnixFd => {
                    BasicValue::UnixFd(u32::try_from(wide).map_err(|_| out_of_range())?)
                }
                _ => return Err(Error::type_mismatch(path, kind.name(), self.kind().name())),
            };
            return Ok(converted);
        }

        if kind.is_string_like() {
            if let Some(text) = self.as_str() {
                let text = text.to_owned();
                return Ok(match kind {
                    BasicKind::ObjectPath => BasicValue::ObjectPath(text),
                    BasicKind::Signature => BasicValue::Signature(text),
                    _ => BasicValue::String(text),
                });
            }
        }

        Err(Error::type_mismatch(path, kind.name(), self.kind().name()))
    }

    /// The key's canonical text form, used in coding paths and when a
    /// string is requested for a numeric key.
    pub fn canonical_key(&self) -> String {
        self.to_string()
    }
}

impl Display for BasicValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BasicValue::Byte(v) => write!(f, "{}", v),
            BasicValue::Boolean(v) => write!(f, "{}", v),
            BasicValue::Int16(v) => write!(f, "{}", v),
            BasicValue::UInt16(v) => write!(f, "{}", v),
            BasicValue::Int32(v) => write!(f, "{}", v),
            BasicValue::UInt32(v) | BasicValue::UnixFd(v) => write!(f, "{}", v),
            BasicValue::Int64(v) => write!(f, "{}", v),
            BasicValue::UInt64(v) => write!(f, "{}", v),
            BasicValue::Double(v) => write!(f, "{}", v),
            BasicValue::String(s) | BasicValue::ObjectPath(s) | BasicValue::Signature(s) => {
                f.write_str(s)
            }
        }
    }
}

macro_rules! basic_from {
    ($type:ty, $variant:ident) => {
        impl From<$type> for BasicValue {
            fn from(v: $type) -> Self {
                BasicValue::$variant(v)
            }
        }

        impl From<$type> for Value {
            fn from(v: $type) -> Self {
                Value::Basic(BasicValue::$variant(v))
            }
        }
    };
}

basic_from!(u8, Byte);
basic_from!(bool, Boolean);
basic_from!(i16, Int16);
basic_from!(u16, UInt16);
basic_from!(i32, Int32);
basic_from!(u32, UInt32);
basic_from!(i64, Int64);
basic_from!(u64, UInt64);
basic_from!(f64, Double);
basic_from!(String, String);

impl From<&str> for BasicValue {
    fn from(v: &str) -> Self {
        BasicValue::String(v.to_owned())
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Basic(BasicValue::String(v.to_owned()))
    }
}

/// A node of the intermediate tree.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Basic(BasicValue),
    /// Homogeneous sequence.
    Array(Vec<Value>),
    /// Fixed sequence of fields.
    Struct(Vec<Value>),
    /// Key/value entries, in source order. Also used for records with
    /// named fields, which encode as either a dictionary or a struct.
    Dict(Vec<(BasicValue, Value)>),
    /// Forces a `v` wherever a signature is synthesized from this value.
    /// Decoded values never contain it: variants are unwrapped on read.
    Variant(Box<Value>),
}

impl Value {
    pub fn variant(inner: impl Into<Value>) -> Self {
        Value::Variant(Box::new(inner.into()))
    }

    /// Looks up a dictionary entry by its key's text.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Dict(entries) => entries
                .iter()
                .find(|(k, _)| k.as_str() == Some(key))
                .map(|(_, v)| v),
            Value::Variant(inner) => inner.get(key),
            _ => None,
        }
    }

    /// Short description for error messages.
    pub fn describe(&self) -> String {
        match self {
            Value::Basic(basic) => basic.kind().name().to_owned(),
            Value::Array(items) => format!("array of {} values", items.len()),
            Value::Struct(fields) => format!("struct of {} fields", fields.len()),
            Value::Dict(entries) => format!("dictionary of {} entries", entries.len()),
            Value::Variant(_) => "variant".to_owned(),
        }
    }

    /// The type this value would have on the wire if nothing constrained
    /// it, as needed to fill a variant.
    ///
    /// Arrays and dictionaries whose items disagree on a type, or that are
    /// empty, fall back to variant elements (`av`, `a{sv}`).
    pub fn synthesize_type(&self, path: &CodingPath) -> Result<TypeNode> {
        match self {
            Value::Basic(basic) => Ok(TypeNode::Basic(basic.kind())),
            Value::Variant(_) => Ok(TypeNode::Variant),
            Value::Array(items) => {
                let element = common_type(
                    items
                        .iter()
                        .enumerate()
                        .map(|(ix, item)| item.synthesize_type(&path.child_index(ix))),
                )?;
                Ok(TypeNode::array(element))
            }
            Value::Struct(fields) => {
                if fields.is_empty() {
                    return Err(Error::unsupported(path, "a struct must have at least one field"));
                }
                let fields = fields
                    .iter()
                    .enumerate()
                    .map(|(ix, field)| field.synthesize_type(&path.child_index(ix)))
                    .collect::<Result<Vec<_>>>()?;
                Ok(TypeNode::Struct(fields))
            }
            Value::Dict(entries) => {
                let key = match entries.first() {
                    None => BasicKind::String,
                    Some((first, _)) => first.kind(),
                };
                if let Some((stray, _)) = entries.iter().find(|(k, _)| k.kind() != key) {
                    return Err(Error::type_mismatch(
                        &path.child_key(stray.canonical_key()),
                        format!("{} key", key),
                        format!("{} key", stray.kind()),
                    ));
                }
                let value = common_type(
                    entries
                        .iter()
                        .map(|(k, v)| v.synthesize_type(&path.child_key(k.canonical_key()))),
                )?;
                Ok(TypeNode::dict(key, value))
            }
        }
    }
}

fn common_type(types: impl Iterator<Item = Result<TypeNode>>) -> Result<TypeNode> {
    let mut common: Option<TypeNode> = None;
    for ty in types {
        let ty = ty?;
        match &common {
            None => common = Some(ty),
            Some(seen) if *seen == ty => {}
            Some(_) => return Ok(TypeNode::Variant),
        }
    }
    Ok(common.unwrap_or(TypeNode::Variant))
}

impl From<BasicValue> for Value {
    fn from(basic: BasicValue) -> Self {
        Value::Basic(basic)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Array(items.into_iter().map(Into::into).collect())
    }
}
