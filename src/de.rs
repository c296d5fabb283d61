//! Deserialization: message body to [`Value`] to `T`.
//!
//! The message's own signature drives decoding, so the whole body is
//! checked before serde sees any of it. The Rust type then decides how the
//! decoded values are read: integers of any width fit any integer field
//! they fit exactly, a struct can be read from a DBus struct or from a
//! dictionary keyed by field name, and variants are transparent.

use std::convert::TryFrom;

use serde::de::value::{BorrowedStrDeserializer, U32Deserializer};
use serde::de::{
    self, DeserializeOwned, DeserializeSeed, EnumAccess, MapAccess, SeqAccess, VariantAccess,
    Visitor,
};
use serde::Deserialize;

use crate::error::{CodingPath, Error, Result};
use crate::message::Message;
use crate::value::{BasicValue, Value};

mod decoder;
pub use decoder::decode_message;

/// Decodes `mesg` and reads the result as a `T`.
///
/// A message with exactly one argument is read as that argument. Any other
/// number of arguments is read as a struct of them, so an empty body reads
/// as `()` and `(i32, String)` reads an `is` message.
pub fn from_message<T: DeserializeOwned>(mesg: &Message) -> Result<T> {
    let mut args = decode_message(mesg)?;
    let value = if args.len() == 1 {
        args.swap_remove(0)
    } else {
        Value::Struct(args)
    };
    from_value(&value)
}

/// Reads an intermediate [`Value`] tree as a `T`. Strings are borrowed
/// from `value` where `T` allows it.
pub fn from_value<'de, T: Deserialize<'de>>(value: &'de Value) -> Result<T> {
    T::deserialize(ValueDeserializer::new(value, CodingPath::root()))
}

macro_rules! deserialize_integer {
    ($method:ident, $visit:ident, $int:ty) => {
        fn $method<V>(self, visitor: V) -> Result<V::Value>
        where
            V: Visitor<'de>,
        {
            let n: $int = self.integer(stringify!($int))?;
            visitor.$visit(n)
        }
    };
}

/// Reads one [`Value`]. Variant wrappers are looked through.
pub struct ValueDeserializer<'de> {
    value: &'de Value,
    path: CodingPath,
}

impl<'de> ValueDeserializer<'de> {
    pub fn new(mut value: &'de Value, path: CodingPath) -> Self {
        while let Value::Variant(inner) = value {
            value = &**inner;
        }
        ValueDeserializer { value, path }
    }

    fn mismatch(&self, expected: &str) -> Error {
        Error::type_mismatch(&self.path, expected, self.value.describe())
    }

    fn basic(&self, expected: &str) -> Result<&'de BasicValue> {
        match self.value {
            Value::Basic(basic) => Ok(basic),
            _ => Err(self.mismatch(expected)),
        }
    }

    fn integer<N: TryFrom<i128>>(&self, target: &str) -> Result<N> {
        let basic = self.basic(target)?;
        let wide = basic
            .as_i128()
            .ok_or_else(|| Error::type_mismatch(&self.path, target, basic.kind().name()))?;
        N::try_from(wide).map_err(|_| Error::value_range(&self.path, wide, target))
    }

    fn items(&self, expected: &str) -> Result<&'de [Value]> {
        match self.value {
            Value::Array(items) | Value::Struct(items) => Ok(items),
            _ => Err(self.mismatch(expected)),
        }
    }

    fn visit_items<V>(self, items: &'de [Value], visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        let mut seq = SeqDeserializer {
            items: items.iter(),
            index: 0,
            path: &self.path,
        };
        let out = visitor.visit_seq(&mut seq)?;
        if !seq.items.as_slice().is_empty() {
            return Err(Error::type_mismatch(
                &self.path,
                format!("{} items", seq.index),
                format!("{} items", items.len()),
            ));
        }
        Ok(out)
    }

    fn visit_entries<V>(self, entries: &'de [(BasicValue, Value)], visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        visitor.visit_map(MapDeserializer {
            entries: entries.iter(),
            pending: None,
            path: &self.path,
        })
    }
}

impl<'de> de::Deserializer<'de> for ValueDeserializer<'de> {
    type Error = Error;

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        match self.value {
            Value::Basic(basic) => visit_basic(basic, visitor),
            Value::Array(items) | Value::Struct(items) => self.visit_items(items, visitor),
            Value::Dict(entries) => self.visit_entries(entries, visitor),
            Value::Variant(inner) => ValueDeserializer::new(inner, self.path).deserialize_any(visitor),
        }
    }

    fn deserialize_bool<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        match self.basic("boolean")? {
            BasicValue::Boolean(b) => visitor.visit_bool(*b),
            other => Err(Error::type_mismatch(&self.path, "boolean", other.kind().name())),
        }
    }

    deserialize_integer!(deserialize_i8, visit_i8, i8);
    deserialize_integer!(deserialize_i16, visit_i16, i16);
    deserialize_integer!(deserialize_i32, visit_i32, i32);
    deserialize_integer!(deserialize_i64, visit_i64, i64);
    deserialize_integer!(deserialize_u8, visit_u8, u8);
    deserialize_integer!(deserialize_u16, visit_u16, u16);
    deserialize_integer!(deserialize_u32, visit_u32, u32);
    deserialize_integer!(deserialize_u64, visit_u64, u64);

    fn deserialize_f32<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        match self.basic("f32")? {
            BasicValue::Double(d) if d.is_finite() && d.abs() > f64::from(f32::MAX) => {
                Err(Error::value_range(&self.path, d, "f32"))
            }
            BasicValue::Double(d) => visitor.visit_f32(*d as f32),
            other => Err(Error::type_mismatch(&self.path, "f32", other.kind().name())),
        }
    }

    fn deserialize_f64<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        match self.basic("double")? {
            BasicValue::Double(d) => visitor.visit_f64(*d),
            other => Err(Error::type_mismatch(&self.path, "double", other.kind().name())),
        }
    }

    fn deserialize_char<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        let basic = self.basic("char")?;
        if let Some(text) = basic.as_str() {
            let mut chars = text.chars();
            return match (chars.next(), chars.next()) {
                (Some(c), None) => visitor.visit_char(c),
                _ => Err(Error::value_range(&self.path, format!("{:?}", text), "char")),
            };
        }
        let code: u32 = self.integer("char")?;
        let c = std::char::from_u32(code)
            .ok_or_else(|| Error::value_range(&self.path, code, "char"))?;
        visitor.visit_char(c)
    }

    fn deserialize_str<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        let basic = self.basic("string")?;
        match basic.as_str() {
            Some(text) => visitor.visit_borrowed_str(text),
            None => Err(Error::type_mismatch(&self.path, "string", basic.kind().name())),
        }
    }

    fn deserialize_string<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        self.deserialize_str(visitor)
    }

    fn deserialize_bytes<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        let items = self.items("array of bytes")?;
        let mut bytes = Vec::with_capacity(items.len());
        for (ix, item) in items.iter().enumerate() {
            bytes.push(ValueDeserializer::new(item, self.path.child_index(ix)).integer::<u8>("byte")?);
        }
        visitor.visit_byte_buf(bytes)
    }

    fn deserialize_byte_buf<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        self.deserialize_bytes(visitor)
    }

    fn deserialize_option<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        // Absent values have no wire form; anything that decoded is present.
        visitor.visit_some(self)
    }

    fn deserialize_unit<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        match self.value {
            Value::Struct(items) if items.is_empty() => visitor.visit_unit(),
            other => Err(Error::unsupported(
                &self.path,
                format!("unit requested, found {}", other.describe()),
            )),
        }
    }

    fn deserialize_unit_struct<V>(self, _: &'static str, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        self.deserialize_unit(visitor)
    }

    fn deserialize_newtype_struct<V>(self, _: &'static str, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        let items = self.items("sequence")?;
        self.visit_items(items, visitor)
    }

    fn deserialize_tuple<V>(self, _: usize, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V>(self, _: &'static str, sz: usize, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        self.deserialize_tuple(sz, visitor)
    }

    fn deserialize_map<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        match self.value {
            Value::Dict(entries) => self.visit_entries(entries, visitor),
            _ => Err(self.mismatch("dictionary")),
        }
    }

    fn deserialize_struct<V>(
        self,
        name: &'static str,
        _: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        match self.value {
            Value::Array(items) | Value::Struct(items) => self.visit_items(items, visitor),
            Value::Dict(entries) => self.visit_entries(entries, visitor),
            _ => Err(self.mismatch(name)),
        }
    }

    fn deserialize_enum<V>(
        self,
        name: &'static str,
        _: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        match self.value {
            Value::Basic(basic) => {
                let tag = EnumTag::from_basic(basic, &self.path, name)?;
                visitor.visit_enum(EnumDeserializer {
                    tag,
                    payload: None,
                    path: self.path,
                })
            }
            Value::Dict(entries) => match entries.as_slice() {
                [(key, payload)] => {
                    let tag = EnumTag::from_basic(key, &self.path, name)?;
                    visitor.visit_enum(EnumDeserializer {
                        tag,
                        payload: Some(payload),
                        path: self.path.child_key(key.canonical_key()),
                    })
                }
                _ => Err(self.mismatch(name)),
            },
            _ => Err(self.mismatch(name)),
        }
    }

    fn deserialize_identifier<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        self.deserialize_any(visitor)
    }

    fn deserialize_ignored_any<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        visitor.visit_unit()
    }
}

fn visit_basic<'de, V>(basic: &'de BasicValue, visitor: V) -> Result<V::Value>
where
    V: Visitor<'de>,
{
    match basic {
        BasicValue::Byte(v) => visitor.visit_u8(*v),
        BasicValue::Boolean(v) => visitor.visit_bool(*v),
        BasicValue::Int16(v) => visitor.visit_i16(*v),
        BasicValue::UInt16(v) => visitor.visit_u16(*v),
        BasicValue::Int32(v) => visitor.visit_i32(*v),
        BasicValue::UInt32(v) | BasicValue::UnixFd(v) => visitor.visit_u32(*v),
        BasicValue::Int64(v) => visitor.visit_i64(*v),
        BasicValue::UInt64(v) => visitor.visit_u64(*v),
        BasicValue::Double(v) => visitor.visit_f64(*v),
        BasicValue::String(s) | BasicValue::ObjectPath(s) | BasicValue::Signature(s) => {
            visitor.visit_borrowed_str(s)
        }
    }
}

struct SeqDeserializer<'a, 'de> {
    items: std::slice::Iter<'de, Value>,
    index: usize,
    path: &'a CodingPath,
}

impl<'de, 'a> SeqAccess<'de> for SeqDeserializer<'a, 'de> {
    type Error = Error;

    fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>>
    where
        T: DeserializeSeed<'de>,
    {
        match self.items.next() {
            Some(item) => {
                let path = self.path.child_index(self.index);
                self.index += 1;
                seed.deserialize(ValueDeserializer::new(item, path)).map(Some)
            }
            None => Ok(None),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.items.len())
    }
}

struct MapDeserializer<'a, 'de> {
    entries: std::slice::Iter<'de, (BasicValue, Value)>,
    pending: Option<&'de (BasicValue, Value)>,
    path: &'a CodingPath,
}

impl<'de, 'a> MapAccess<'de> for MapDeserializer<'a, 'de> {
    type Error = Error;

    fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>>
    where
        K: DeserializeSeed<'de>,
    {
        match self.entries.next() {
            Some(entry) => {
                self.pending = Some(entry);
                let key = KeyDeserializer {
                    key: &entry.0,
                    path: self.path.child_key(entry.0.canonical_key()),
                };
                seed.deserialize(key).map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value>
    where
        V: DeserializeSeed<'de>,
    {
        let (key, value) = self
            .pending
            .take()
            .ok_or_else(|| Error::container_mismatch("map value requested before its key"))?;
        seed.deserialize(ValueDeserializer::new(
            value,
            self.path.child_key(key.canonical_key()),
        ))
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.entries.len())
    }
}

/// Reads a dictionary key. Keys are basic values, and numeric keys are
/// also readable as their decimal text (and text keys as numbers).
struct KeyDeserializer<'de> {
    key: &'de BasicValue,
    path: CodingPath,
}

impl<'de> KeyDeserializer<'de> {
    fn integer<N: TryFrom<i128>>(&self, target: &str) -> Result<N> {
        let wide = match (self.key.as_i128(), self.key.as_str()) {
            (Some(wide), _) => wide,
            (None, Some(text)) => text
                .parse::<i128>()
                .map_err(|_| Error::type_mismatch(&self.path, target, format!("{:?}", text)))?,
            (None, None) => {
                return Err(Error::type_mismatch(&self.path, target, self.key.kind().name()))
            }
        };
        N::try_from(wide).map_err(|_| Error::value_range(&self.path, wide, target))
    }
}

impl<'de> de::Deserializer<'de> for KeyDeserializer<'de> {
    type Error = Error;

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        visit_basic(self.key, visitor)
    }

    deserialize_integer!(deserialize_i8, visit_i8, i8);
    deserialize_integer!(deserialize_i16, visit_i16, i16);
    deserialize_integer!(deserialize_i32, visit_i32, i32);
    deserialize_integer!(deserialize_i64, visit_i64, i64);
    deserialize_integer!(deserialize_u8, visit_u8, u8);
    deserialize_integer!(deserialize_u16, visit_u16, u16);
    deserialize_integer!(deserialize_u32, visit_u32, u32);
    deserialize_integer!(deserialize_u64, visit_u64, u64);

    fn deserialize_str<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        match self.key.as_str() {
            Some(text) => visitor.visit_borrowed_str(text),
            None => visitor.visit_string(self.key.canonical_key()),
        }
    }

    fn deserialize_string<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        self.deserialize_str(visitor)
    }

    fn deserialize_identifier<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        self.deserialize_str(visitor)
    }

    fn deserialize_option<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        visitor.visit_some(self)
    }

    fn deserialize_newtype_struct<V>(self, _: &'static str, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V>(
        self,
        name: &'static str,
        _: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        let tag = EnumTag::from_basic(self.key, &self.path, name)?;
        visitor.visit_enum(EnumDeserializer {
            tag,
            payload: None,
            path: self.path,
        })
    }

    serde::forward_to_deserialize_any! {
        bool f32 f64 char bytes byte_buf unit unit_struct seq tuple
        tuple_struct map struct ignored_any
    }
}

/// Names an enum variant: by index, as unit variants are written, or by
/// name, as variants with data are keyed.
enum EnumTag<'de> {
    Index(u32),
    Name(&'de str),
}

impl<'de> EnumTag<'de> {
    fn from_basic(basic: &'de BasicValue, path: &CodingPath, name: &str) -> Result<Self> {
        if let Some(text) = basic.as_str() {
            return Ok(EnumTag::Name(text));
        }
        match basic.as_i128() {
            Some(wide) => u32::try_from(wide)
                .map(EnumTag::Index)
                .map_err(|_| Error::value_range(path, wide, "variant index")),
            None => Err(Error::type_mismatch(
                path,
                format!("variant of {}", name),
                basic.kind().name(),
            )),
        }
    }
}

struct EnumDeserializer<'de> {
    tag: EnumTag<'de>,
    payload: Option<&'de Value>,
    path: CodingPath,
}

impl<'de> EnumAccess<'de> for EnumDeserializer<'de> {
    type Error = Error;
    type Variant = VariantDeserializer<'de>;

    fn variant_seed<V>(self, seed: V) -> Result<(V::Value, Self::Variant)>
    where
        V: DeserializeSeed<'de>,
    {
        let variant = match self.tag {
            EnumTag::Index(ix) => seed.deserialize(U32Deserializer::<Error>::new(ix))?,
            EnumTag::Name(name) => seed.deserialize(BorrowedStrDeserializer::<Error>::new(name))?,
        };
        Ok((
            variant,
            VariantDeserializer {
                payload: self.payload,
                path: self.path,
            },
        ))
    }
}

struct VariantDeserializer<'de> {
    payload: Option<&'de Value>,
    path: CodingPath,
}

impl<'de> VariantDeserializer<'de> {
    fn payload(self, expected: &str) -> Result<ValueDeserializer<'de>> {
        match self.payload {
            Some(payload) => Ok(ValueDeserializer::new(payload, self.path)),
            None => Err(Error::type_mismatch(&self.path, expected, "unit variant")),
        }
    }
}

impl<'de> VariantAccess<'de> for VariantDeserializer<'de> {
    type Error = Error;

    fn unit_variant(self) -> Result<()> {
        match self.payload {
            None => Ok(()),
            Some(Value::Struct(items)) if items.is_empty() => Ok(()),
            Some(other) => Err(Error::type_mismatch(&self.path, "unit variant", other.describe())),
        }
    }

    fn newtype_variant_seed<T>(self, seed: T) -> Result<T::Value>
    where
        T: DeserializeSeed<'de>,
    {
        seed.deserialize(self.payload("newtype variant")?)
    }

    fn tuple_variant<V>(self, len: usize, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        de::Deserializer::deserialize_tuple(self.payload("tuple variant")?, len, visitor)
    }

    fn struct_variant<V>(self, fields: &'static [&'static str], visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        de::Deserializer::deserialize_struct(self.payload("struct variant")?, "", fields, visitor)
    }
}

#[cfg(test)]
mod tests {
    use super::{from_message, from_value};
    use crate::error::{Error, Result};
    use crate::message::{Endianness, Message, MessageKind};
    use crate::primitives::{ObjectPath, Signature, UnixFd};
    use crate::ser::{encode_value, serialize, to_message};
    use crate::value::{BasicValue, Value};
    use serde::de::DeserializeOwned;
    use serde::{Deserialize, Serialize};
    use std::collections::{BTreeMap, HashMap};
    use std::fmt::Debug;
    use test_log::test;

    fn round_trip<T: DeserializeOwned + Debug + Serialize + PartialEq>(val: T) -> Result<()> {
        let mesg = serialize(&val)?;
        let val2: T = from_message(&mesg)?;
        assert_eq!(val, val2);
        Ok(())
    }

    fn round_trip_as<T: DeserializeOwned + Debug + Serialize + PartialEq>(
        val: T,
        signature: &str,
    ) -> Result<()> {
        let mut mesg = Message::default();
        to_message(&val, signature, &mut mesg)?;
        let val2: T = from_message(&mesg)?;
        assert_eq!(val, val2);
        Ok(())
    }

    #[test]
    fn round_trip_bool() -> Result<()> {
        round_trip(true)
    }

    #[test]
    fn round_trip_int() -> Result<()> {
        round_trip(3)
    }

    #[test]
    fn round_trip_float() -> Result<()> {
        round_trip(3.14)
    }

    #[test]
    fn round_trip_some_string() -> Result<()> {
        round_trip(Some("string".to_owned()))
    }

    #[test]
    fn none_has_no_wire_form() {
        let b: Option<String> = None;
        assert!(matches!(
            serialize(b),
            Err(Error::UnsupportedValue { .. })
        ));
    }

    #[test]
    fn round_trip_unit() -> Result<()> {
        round_trip_as((), "")
    }

    #[test]
    fn round_trip_unit_struct() -> Result<()> {
        #[derive(Serialize, Deserialize, PartialEq, Debug)]
        struct Foo;

        round_trip_as(Foo, "")
    }

    #[test]
    fn round_trip_array0() -> Result<()> {
        round_trip(vec![1, 3, 5, 6])
    }

    #[test]
    fn round_trip_struct0() -> Result<()> {
        #[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
        struct StructSerialize {
            pub a: String,
            pub b: f64,
        }

        let data = StructSerialize {
            a: "Hi".to_owned(),
            b: 0.2,
        };

        round_trip(data.clone())?;
        round_trip_as(data, "(sd)")
    }

    #[test]
    fn round_trip_struct1() -> Result<()> {
        #[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
        struct StructSerialize {
            pub a: String,
            pub b: f64,
            pub c: (String, f64),
        }

        let data = StructSerialize {
            a: "Hi".to_owned(),
            b: 0.2,
            c: ("Hello".to_owned(), 8.3),
        };

        round_trip(data)
    }

    #[test]
    fn tuple_vs_struct() -> Result<()> {
        #[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
        struct StructSerialize {
            pub a: String,
            pub b: f64,
            pub c: (String, f64),
        }

        let data_tuple = ("Hi", 0.2, ("Hello", 8.3));
        let mesg_tuple = serialize(data_tuple)?;
        let data: StructSerialize = from_message(&mesg_tuple)?;
        assert_eq!(
            data,
            StructSerialize {
                a: "Hi".to_owned(),
                b: 0.2,
                c: ("Hello".to_owned(), 8.3),
            }
        );
        Ok(())
    }

    #[test]
    fn integer_extremes() -> Result<()> {
        round_trip_as(u8::MAX, "y")?;
        round_trip_as(i16::MIN, "n")?;
        round_trip_as(u64::MAX, "t")?;
        round_trip_as(i64::MIN, "x")
    }

    #[test]
    fn double_is_bit_identical() -> Result<()> {
        let avogadro = 6.0221409e23f64;
        let mut mesg = Message::default();
        to_message(&avogadro, "d", &mut mesg)?;
        let back: f64 = from_message(&mesg)?;
        assert_eq!(back.to_bits(), avogadro.to_bits());
        Ok(())
    }

    #[test]
    fn map_round_trip() -> Result<()> {
        let mut scores = HashMap::new();
        scores.insert("alpha".to_owned(), 1);
        scores.insert("beta".to_owned(), -2);
        scores.insert("gamma".to_owned(), 3);
        round_trip_as(scores, "a{si}")
    }

    #[test]
    fn numeric_keys() -> Result<()> {
        let mut names = BTreeMap::new();
        names.insert(4u32, "four".to_owned());
        names.insert(2u32, "two".to_owned());
        round_trip_as(names.clone(), "a{us}")?;

        // Numeric keys read as their decimal text.
        let mut mesg = Message::default();
        to_message(&names, "a{us}", &mut mesg)?;
        let by_text: BTreeMap<String, String> = from_message(&mesg)?;
        assert_eq!(by_text.get("4").map(String::as_str), Some("four"));
        Ok(())
    }

    #[test]
    fn variant_values() -> Result<()> {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Properties {
            name: String,
            size: u64,
            visible: bool,
        }

        let mut mesg = Message::default();
        let props = Value::Dict(vec![
            (BasicValue::from("name"), Value::variant("panel")),
            (BasicValue::from("size"), Value::variant(12u32)),
            (BasicValue::from("visible"), Value::variant(true)),
        ]);
        encode_value(&props, "a{sv}", &mut mesg)?;

        let decoded: Properties = from_message(&mesg)?;
        assert_eq!(
            decoded,
            Properties {
                name: "panel".to_owned(),
                size: 12,
                visible: true,
            }
        );
        Ok(())
    }

    #[test]
    fn multiple_arguments() -> Result<()> {
        let mut mesg = Message::default();
        to_message(&(7u32, "seven"), "us", &mut mesg)?;
        let (n, s): (u32, String) = from_message(&mesg)?;
        assert_eq!((n, s.as_str()), (7, "seven"));
        Ok(())
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let mesg = Message::from_parts(
            MessageKind::MethodReturn,
            Endianness::Little,
            "u",
            vec![1, 0, 0, 0, 0],
        );
        let decoded: Result<u32> = from_message(&mesg);
        assert!(matches!(decoded, Err(Error::DataCorrupted { .. })));
    }

    #[test]
    fn decoded_type_mismatch() -> Result<()> {
        let mut mesg = Message::default();
        to_message(&true, "b", &mut mesg)?;
        let decoded: Result<i32> = from_message(&mesg);
        assert!(matches!(decoded, Err(Error::TypeMismatch { .. })));

        let mut mesg = Message::default();
        to_message(&"text", "s", &mut mesg)?;
        let decoded: Result<f64> = from_message(&mesg);
        assert!(matches!(decoded, Err(Error::TypeMismatch { .. })));
        Ok(())
    }

    #[test]
    fn decoded_value_out_of_range() -> Result<()> {
        let mut mesg = Message::default();
        to_message(&300u32, "u", &mut mesg)?;
        let decoded: Result<u8> = from_message(&mesg);
        assert!(matches!(decoded, Err(Error::ValueRange { .. })));

        let mesg = serialize(vec![1i64, -1])?;
        match from_message::<Vec<u64>>(&mesg) {
            Err(Error::ValueRange { path, .. }) => assert_eq!(path.to_string(), "$[1]"),
            other => panic!("unexpected {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn object_path_round_trip() -> Result<()> {
        let path = ObjectPath::new("/org/freedesktop/DBus")?;
        let mesg = serialize(&path)?;
        assert_eq!(mesg.signature(), "o");
        let back: ObjectPath = from_message(&mesg)?;
        assert_eq!(back, path);
        Ok(())
    }

    #[test]
    fn uint16_signature_and_fd_round_trip() -> Result<()> {
        round_trip_as((7u16, Signature::new("a{sv}")?, UnixFd(3)), "qgh")
    }

    #[test]
    fn variant_array_keeps_order() -> Result<()> {
        round_trip_as(vec![0i32, 1, 2], "av")?;
        round_trip_as(
            vec!["a".to_owned(), "b".to_owned(), "c".to_owned()],
            "av",
        )
    }

    #[test]
    fn string_array_reads_back() -> Result<()> {
        let mut mesg = Message::default();
        to_message(&["Foo", "Bar", "Baz"], "as", &mut mesg)?;
        let back: Vec<String> = from_message(&mesg)?;
        assert_eq!(back, vec!["Foo", "Bar", "Baz"]);
        Ok(())
    }

    #[test]
    fn enums() -> Result<()> {
        #[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
        enum Shape {
            Empty,
            Circle(f64),
            Rect(u32, u32),
            Named { label: String },
        }

        round_trip(Shape::Empty)?;
        round_trip_as(Shape::Empty, "u")?;
        round_trip(Shape::Circle(1.5))?;
        round_trip(Shape::Rect(2, 3))?;
        round_trip(Shape::Named {
            label: "box".to_owned(),
        })
    }

    #[test]
    fn big_endian_round_trip() -> Result<()> {
        let mut mesg = Message::with_endianness(MessageKind::Signal, Endianness::Big);
        to_message(&(0x0102_0304u32, "be"), "us", &mut mesg)?;
        assert_eq!(&mesg.body()[..4], &[1, 2, 3, 4]);
        let (n, s): (u32, String) = from_message(&mesg)?;
        assert_eq!((n, s.as_str()), (0x0102_0304, "be"));
        Ok(())
    }

    #[test]
    fn borrowed_from_value() -> Result<()> {
        let value = Value::Struct(vec![
            Value::from("borrowed"),
            Value::Dict(vec![(BasicValue::from("k"), Value::variant(9u8))]),
        ]);
        let (text, map): (&str, HashMap<&str, u8>) = from_value(&value)?;
        assert_eq!(text, "borrowed");
        assert_eq!(map.get("k"), Some(&9));
        Ok(())
    }

    #[test]
    fn struct_with_extra_fields_is_rejected() -> Result<()> {
        #[derive(Debug, Deserialize)]
        struct Pair {
            _a: u32,
            _b: u32,
        }

        let mesg = serialize((1u32, 2u32, 3u32))?;
        assert!(matches!(
            from_message::<Pair>(&mesg),
            Err(Error::TypeMismatch { .. })
        ));
        Ok(())
    }
}
