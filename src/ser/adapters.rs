//! serde's side of encoding: turns any `Serialize` value into a [`Value`].
//!
//! A [`SingleValueSlot`] receives exactly one value. Sequences, tuples and
//! tuple variants go through an [`OrderedAdapter`]; maps, structs and
//! struct variants through a [`KeyedAdapter`], whose keys are produced by
//! a [`KeySerializer`] that only admits types DBus allows as dictionary
//! keys.

use serde::ser::{self, Impossible, Serialize};

use super::serializer_policy::{SerializerPolicy, StructSerializationStyle};
use crate::error::{CodingPath, Error, Result};
use crate::primitives::{OBJECT_PATH_TOKEN, SIGNATURE_TOKEN, UNIX_FD_TOKEN, VARIANT_TOKEN};
use crate::value::{BasicValue, Value};

/// Holds the single value serialized into it.
pub(crate) struct SingleValueSlot<'p, P> {
    path: CodingPath,
    policy: &'p P,
    value: Option<Value>,
    // A `None` was written; only allowed for keyed-record fields.
    allow_absent: bool,
    absent: bool,
}

impl<'p, P: SerializerPolicy> SingleValueSlot<'p, P> {
    pub(crate) fn new(path: CodingPath, policy: &'p P) -> Self {
        SingleValueSlot {
            path,
            policy,
            value: None,
            allow_absent: false,
            absent: false,
        }
    }

    fn optional(path: CodingPath, policy: &'p P) -> Self {
        SingleValueSlot {
            allow_absent: true,
            ..SingleValueSlot::new(path, policy)
        }
    }

    fn store(&mut self, value: Value) -> Result<()> {
        if self.value.is_some() || self.absent {
            return Err(Error::EncodingInProgress {
                path: self.path.clone(),
            });
        }
        self.value = Some(value);
        Ok(())
    }

    pub(crate) fn finish(self) -> Result<Value> {
        let path = self.path;
        self.value
            .ok_or_else(|| Error::unsupported(&path, "nothing was serialized"))
    }

    fn finish_optional(self) -> Result<Option<Value>> {
        if self.absent {
            return Ok(None);
        }
        self.finish().map(Some)
    }

    fn encode_child<T: Serialize + ?Sized>(&self, path: CodingPath, value: &T) -> Result<Value> {
        let mut child = SingleValueSlot::new(path, self.policy);
        value.serialize(&mut child)?;
        child.finish()
    }

    fn ordered<'a>(&'a mut self, shape: Shape, variant: Option<&'static str>) -> OrderedAdapter<'a, 'p, P> {
        let base = match variant {
            Some(name) => self.path.child_key(name),
            None => self.path.clone(),
        };
        OrderedAdapter {
            slot: self,
            base,
            shape,
            variant,
            items: Vec::new(),
        }
    }

    fn keyed<'a>(
        &'a mut self,
        style: StructSerializationStyle,
        variant: Option<&'static str>,
    ) -> KeyedAdapter<'a, 'p, P> {
        let base = match variant {
            Some(name) => self.path.child_key(name),
            None => self.path.clone(),
        };
        KeyedAdapter {
            slot: self,
            base,
            style,
            variant,
            entries: Vec::new(),
            fields: Vec::new(),
            pending_key: None,
        }
    }
}

// Enum payloads travel as a single-entry dictionary keyed by the variant.
fn tag_variant(variant: Option<&'static str>, payload: Value) -> Value {
    match variant {
        Some(name) => Value::Dict(vec![(BasicValue::String(name.to_owned()), payload)]),
        None => payload,
    }
}

impl<'a, 'p, P: SerializerPolicy> ser::Serializer for &'a mut SingleValueSlot<'p, P> {
    type Ok = ();
    type Error = Error;

    type SerializeSeq = OrderedAdapter<'a, 'p, P>;
    type SerializeTuple = OrderedAdapter<'a, 'p, P>;
    type SerializeTupleStruct = OrderedAdapter<'a, 'p, P>;
    type SerializeTupleVariant = OrderedAdapter<'a, 'p, P>;
    type SerializeMap = KeyedAdapter<'a, 'p, P>;
    type SerializeStruct = KeyedAdapter<'a, 'p, P>;
    type SerializeStructVariant = KeyedAdapter<'a, 'p, P>;

    fn serialize_bool(self, val: bool) -> Result<()> {
        self.store(Value::from(val))
    }

    fn serialize_i8(self, val: i8) -> Result<()> {
        self.store(Value::from(i16::from(val)))
    }

    fn serialize_i16(self, val: i16) -> Result<()> {
        self.store(Value::from(val))
    }

    fn serialize_i32(self, val: i32) -> Result<()> {
        self.store(Value::from(val))
    }

    fn serialize_i64(self, val: i64) -> Result<()> {
        self.store(Value::from(val))
    }

    fn serialize_u8(self, val: u8) -> Result<()> {
        self.store(Value::from(val))
    }

    fn serialize_u16(self, val: u16) -> Result<()> {
        self.store(Value::from(val))
    }

    fn serialize_u32(self, val: u32) -> Result<()> {
        self.store(Value::from(val))
    }

    fn serialize_u64(self, val: u64) -> Result<()> {
        self.store(Value::from(val))
    }

    fn serialize_f32(self, val: f32) -> Result<()> {
        self.store(Value::from(f64::from(val)))
    }

    fn serialize_f64(self, val: f64) -> Result<()> {
        self.store(Value::from(val))
    }

    fn serialize_char(self, val: char) -> Result<()> {
        self.store(Value::from(u32::from(val)))
    }

    fn serialize_str(self, val: &str) -> Result<()> {
        self.store(Value::from(val))
    }

    fn serialize_bytes(self, val: &[u8]) -> Result<()> {
        self.store(Value::Array(val.iter().map(|b| Value::from(*b)).collect()))
    }

    fn serialize_none(self) -> Result<()> {
        if !self.allow_absent {
            return Err(Error::unsupported(
                &self.path,
                "None can only be left out of a dictionary-style struct",
            ));
        }
        if self.value.is_some() || self.absent {
            return Err(Error::EncodingInProgress {
                path: self.path.clone(),
            });
        }
        self.absent = true;
        Ok(())
    }

    fn serialize_some<T>(self, val: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        val.serialize(self)
    }

    // The empty struct; only an empty argument list can hold it.
    fn serialize_unit(self) -> Result<()> {
        self.store(Value::Struct(Vec::new()))
    }

    fn serialize_unit_struct(self, _: &'static str) -> Result<()> {
        self.serialize_unit()
    }

    fn serialize_unit_variant(
        self,
        _: &'static str,
        variant_index: u32,
        _: &'static str,
    ) -> Result<()> {
        self.store(Value::from(variant_index))
    }

    fn serialize_newtype_struct<T>(self, name: &'static str, value: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        let marked = match name {
            OBJECT_PATH_TOKEN | SIGNATURE_TOKEN | UNIX_FD_TOKEN | VARIANT_TOKEN => {
                self.encode_child(self.path.clone(), value)?
            }
            _ => return value.serialize(self),
        };
        let value = match (name, marked) {
            (OBJECT_PATH_TOKEN, Value::Basic(BasicValue::String(path))) => {
                Value::Basic(BasicValue::ObjectPath(path))
            }
            (SIGNATURE_TOKEN, Value::Basic(BasicValue::String(signature))) => {
                Value::Basic(BasicValue::Signature(signature))
            }
            (UNIX_FD_TOKEN, Value::Basic(BasicValue::UInt32(fd))) => {
                Value::Basic(BasicValue::UnixFd(fd))
            }
            (VARIANT_TOKEN, inner) => Value::variant(inner),
            (_, other) => other,
        };
        self.store(value)
    }

    fn serialize_newtype_variant<T>(
        self,
        _: &'static str,
        _: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        let payload = self.encode_child(self.path.child_key(variant), value)?;
        self.store(tag_variant(Some(variant), payload))
    }

    fn serialize_seq(self, _: Option<usize>) -> Result<Self::SerializeSeq> {
        Ok(self.ordered(Shape::Array, None))
    }

    fn serialize_tuple(self, _: usize) -> Result<Self::SerializeTuple> {
        Ok(self.ordered(Shape::Struct, None))
    }

    fn serialize_tuple_struct(
        self,
        _: &'static str,
        _: usize,
    ) -> Result<Self::SerializeTupleStruct> {
        Ok(self.ordered(Shape::Struct, None))
    }

    fn serialize_tuple_variant(
        self,
        _: &'static str,
        _: u32,
        variant: &'static str,
        _: usize,
    ) -> Result<Self::SerializeTupleVariant> {
        Ok(self.ordered(Shape::Struct, Some(variant)))
    }

    fn serialize_map(self, _: Option<usize>) -> Result<Self::SerializeMap> {
        Ok(self.keyed(StructSerializationStyle::Dict, None))
    }

    fn serialize_struct(self, name: &'static str, _: usize) -> Result<Self::SerializeStruct> {
        let style = self.policy.query_struct_name(name);
        Ok(self.keyed(style, None))
    }

    fn serialize_struct_variant(
        self,
        _: &'static str,
        _: u32,
        variant: &'static str,
        _: usize,
    ) -> Result<Self::SerializeStructVariant> {
        Ok(self.keyed(StructSerializationStyle::Dict, Some(variant)))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Shape {
    Array,
    Struct,
}

/// Collects positional items: sequences become arrays, tuples structs.
pub(crate) struct OrderedAdapter<'a, 'p, P> {
    slot: &'a mut SingleValueSlot<'p, P>,
    base: CodingPath,
    shape: Shape,
    variant: Option<&'static str>,
    items: Vec<Value>,
}

impl<'a, 'p, P: SerializerPolicy> OrderedAdapter<'a, 'p, P> {
    fn push<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        let path = self.base.child_index(self.items.len());
        let item = self.slot.encode_child(path, value)?;
        self.items.push(item);
        Ok(())
    }

    fn finish(self) -> Result<()> {
        let collected = match self.shape {
            Shape::Array => Value::Array(self.items),
            Shape::Struct => Value::Struct(self.items),
        };
        self.slot.store(tag_variant(self.variant, collected))
    }
}

impl<'a, 'p, P: SerializerPolicy> ser::SerializeSeq for OrderedAdapter<'a, 'p, P> {
    type Ok = ();
    type Error = Error;

    fn serialize_element<T>(&mut self, value: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        self.push(value)
    }

    fn end(self) -> Result<()> {
        self.finish()
    }
}

impl<'a, 'p, P: SerializerPolicy> ser::SerializeTuple for OrderedAdapter<'a, 'p, P> {
    type Ok = ();
    type Error = Error;

    fn serialize_element<T>(&mut self, value: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        self.push(value)
    }

    fn end(self) -> Result<()> {
        self.finish()
    }
}

impl<'a, 'p, P: SerializerPolicy> ser::SerializeTupleStruct for OrderedAdapter<'a, 'p, P> {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T>(&mut self, value: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        self.push(value)
    }

    fn end(self) -> Result<()> {
        self.finish()
    }
}

impl<'a, 'p, P: SerializerPolicy> ser::SerializeTupleVariant for OrderedAdapter<'a, 'p, P> {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T>(&mut self, value: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        self.push(value)
    }

    fn end(self) -> Result<()> {
        self.finish()
    }
}

/// Collects keyed entries: maps and dictionary-style structs become
/// dictionaries, strongly typed structs become structs.
pub(crate) struct KeyedAdapter<'a, 'p, P> {
    slot: &'a mut SingleValueSlot<'p, P>,
    base: CodingPath,
    style: StructSerializationStyle,
    variant: Option<&'static str>,
    entries: Vec<(BasicValue, Value)>,
    fields: Vec<Value>,
    pending_key: Option<BasicValue>,
}

impl<'a, 'p, P: SerializerPolicy> KeyedAdapter<'a, 'p, P> {
    fn field<T: Serialize + ?Sized>(&mut self, name: &'static str, value: &T) -> Result<()> {
        let path = self.base.child_key(name);
        match self.style {
            StructSerializationStyle::Dict => {
                let mut child = SingleValueSlot::optional(path, self.slot.policy);
                value.serialize(&mut child)?;
                if let Some(item) = child.finish_optional()? {
                    // Property dictionaries hold every field in a variant.
                    let item = match item {
                        wrapped @ Value::Variant(_) => wrapped,
                        other => Value::variant(other),
                    };
                    self.entries.push((BasicValue::String(name.to_owned()), item));
                }
            }
            StructSerializationStyle::StronglyTyped => {
                let item = self.slot.encode_child(path, value)?;
                self.fields.push(item);
            }
        }
        Ok(())
    }

    fn finish(self) -> Result<()> {
        let collected = match self.style {
            StructSerializationStyle::Dict => Value::Dict(self.entries),
            StructSerializationStyle::StronglyTyped => Value::Struct(self.fields),
        };
        self.slot.store(tag_variant(self.variant, collected))
    }
}

impl<'a, 'p, P: SerializerPolicy> ser::SerializeMap for KeyedAdapter<'a, 'p, P> {
    type Ok = ();
    type Error = Error;

    fn serialize_key<T>(&mut self, key: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        if self.pending_key.is_some() {
            return Err(Error::EncodingInProgress {
                path: self.base.clone(),
            });
        }
        let key = key.serialize(KeySerializer { path: &self.base })?;
        self.pending_key = Some(key);
        Ok(())
    }

    fn serialize_value<T>(&mut self, value: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        let key = self
            .pending_key
            .take()
            .ok_or_else(|| Error::unsupported(&self.base, "map value without a key"))?;
        let item = self
            .slot
            .encode_child(self.base.child_key(key.canonical_key()), value)?;
        self.entries.push((key, item));
        Ok(())
    }

    fn end(self) -> Result<()> {
        self.finish()
    }
}

impl<'a, 'p, P: SerializerPolicy> ser::SerializeStruct for KeyedAdapter<'a, 'p, P> {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T>(&mut self, name: &'static str, value: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        self.field(name, value)
    }

    fn end(self) -> Result<()> {
        self.finish()
    }
}

impl<'a, 'p, P: SerializerPolicy> ser::SerializeStructVariant for KeyedAdapter<'a, 'p, P> {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T>(&mut self, name: &'static str, value: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        self.field(name, value)
    }

    fn end(self) -> Result<()> {
        self.finish()
    }
}

/// Serializes a map key. Only strings, object paths, signatures and
/// integers can be dictionary keys; anything else is refused here, before
/// any value is built.
pub(crate) struct KeySerializer<'k> {
    path: &'k CodingPath,
}

impl<'k> KeySerializer<'k> {
    fn rejected(&self, found: &str) -> Error {
        Error::type_mismatch(
            self.path,
            "string, object path, signature or integer key",
            found,
        )
    }
}

impl<'k> ser::Serializer for KeySerializer<'k> {
    type Ok = BasicValue;
    type Error = Error;

    type SerializeSeq = Impossible<BasicValue, Error>;
    type SerializeTuple = Impossible<BasicValue, Error>;
    type SerializeTupleStruct = Impossible<BasicValue, Error>;
    type SerializeTupleVariant = Impossible<BasicValue, Error>;
    type SerializeMap = Impossible<BasicValue, Error>;
    type SerializeStruct = Impossible<BasicValue, Error>;
    type SerializeStructVariant = Impossible<BasicValue, Error>;

    fn serialize_bool(self, _: bool) -> Result<BasicValue> {
        Err(self.rejected("boolean"))
    }

    fn serialize_i8(self, val: i8) -> Result<BasicValue> {
        Ok(BasicValue::Int16(i16::from(val)))
    }

    fn serialize_i16(self, val: i16) -> Result<BasicValue> {
        Ok(BasicValue::from(val))
    }

    fn serialize_i32(self, val: i32) -> Result<BasicValue> {
        Ok(BasicValue::from(val))
    }

    fn serialize_i64(self, val: i64) -> Result<BasicValue> {
        Ok(BasicValue::from(val))
    }

    fn serialize_u8(self, val: u8) -> Result<BasicValue> {
        Ok(BasicValue::from(val))
    }

    fn serialize_u16(self, val: u16) -> Result<BasicValue> {
        Ok(BasicValue::from(val))
    }

    fn serialize_u32(self, val: u32) -> Result<BasicValue> {
        Ok(BasicValue::from(val))
    }

    fn serialize_u64(self, val: u64) -> Result<BasicValue> {
        Ok(BasicValue::from(val))
    }

    fn serialize_f32(self, _: f32) -> Result<BasicValue> {
        Err(self.rejected("floating point number"))
    }

    fn serialize_f64(self, _: f64) -> Result<BasicValue> {
        Err(self.rejected("floating point number"))
    }

    fn serialize_char(self, val: char) -> Result<BasicValue> {
        Ok(BasicValue::String(val.to_string()))
    }

    fn serialize_str(self, val: &str) -> Result<BasicValue> {
        Ok(BasicValue::from(val))
    }

    fn serialize_bytes(self, _: &[u8]) -> Result<BasicValue> {
        Err(self.rejected("byte array"))
    }

    fn serialize_none(self) -> Result<BasicValue> {
        Err(self.rejected("None"))
    }

    fn serialize_some<T>(self, _: &T) -> Result<BasicValue>
    where
        T: Serialize + ?Sized,
    {
        Err(self.rejected("optional value"))
    }

    fn serialize_unit(self) -> Result<BasicValue> {
        Err(self.rejected("unit"))
    }

    fn serialize_unit_struct(self, name: &'static str) -> Result<BasicValue> {
        Err(self.rejected(name))
    }

    fn serialize_unit_variant(
        self,
        _: &'static str,
        _: u32,
        variant: &'static str,
    ) -> Result<BasicValue> {
        Ok(BasicValue::from(variant))
    }

    fn serialize_newtype_struct<T>(self, name: &'static str, value: &T) -> Result<BasicValue>
    where
        T: Serialize + ?Sized,
    {
        if name == VARIANT_TOKEN {
            return Err(self.rejected("variant"));
        }
        let path = self.path;
        let key = value.serialize(KeySerializer { path })?;
        Ok(match (name, key) {
            (OBJECT_PATH_TOKEN, BasicValue::String(text)) => BasicValue::ObjectPath(text),
            (SIGNATURE_TOKEN, BasicValue::String(text)) => BasicValue::Signature(text),
            (UNIX_FD_TOKEN, BasicValue::UInt32(fd)) => BasicValue::UnixFd(fd),
            (_, other) => other,
        })
    }

    fn serialize_newtype_variant<T>(
        self,
        _: &'static str,
        _: u32,
        variant: &'static str,
        _: &T,
    ) -> Result<BasicValue>
    where
        T: Serialize + ?Sized,
    {
        Err(self.rejected(variant))
    }

    fn serialize_seq(self, _: Option<usize>) -> Result<Self::SerializeSeq> {
        Err(self.rejected("sequence"))
    }

    fn serialize_tuple(self, _: usize) -> Result<Self::SerializeTuple> {
        Err(self.rejected("tuple"))
    }

    fn serialize_tuple_struct(
        self,
        name: &'static str,
        _: usize,
    ) -> Result<Self::SerializeTupleStruct> {
        Err(self.rejected(name))
    }

    fn serialize_tuple_variant(
        self,
        _: &'static str,
        _: u32,
        variant: &'static str,
        _: usize,
    ) -> Result<Self::SerializeTupleVariant> {
        Err(self.rejected(variant))
    }

    fn serialize_map(self, _: Option<usize>) -> Result<Self::SerializeMap> {
        Err(self.rejected("map"))
    }

    fn serialize_struct(self, name: &'static str, _: usize) -> Result<Self::SerializeStruct> {
        Err(self.rejected(name))
    }

    fn serialize_struct_variant(
        self,
        _: &'static str,
        _: u32,
        variant: &'static str,
        _: usize,
    ) -> Result<Self::SerializeStructVariant> {
        Err(self.rejected(variant))
    }
}
