use crate::error::{CodingPath, Error, Result};
use crate::signature::{BasicKind, TypeSignature};

use byteorder::ByteOrder;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{self, Display};
use std::mem::size_of;

// Newtype-struct names the serializer recognises. Any other serializer
// just sees an ordinary newtype around a string or integer.
pub(crate) const OBJECT_PATH_TOKEN: &str = "$dbus_marshal::ObjectPath";
pub(crate) const SIGNATURE_TOKEN: &str = "$dbus_marshal::Signature";
pub(crate) const UNIX_FD_TOKEN: &str = "$dbus_marshal::UnixFd";
pub(crate) const VARIANT_TOKEN: &str = "$dbus_marshal::Variant";

/// Fixed-width scalars, written at their natural alignment.
pub(crate) trait FixedPrimitive: Copy {
    fn size() -> usize;
    fn write<B: ByteOrder>(self, out: &mut [u8]);
    fn read<B: ByteOrder>(buf: &[u8]) -> Self;
}

macro_rules! fixed_primitive {
    ($type:ident, $write:ident, $read:ident) => {
        impl FixedPrimitive for $type {
            fn size() -> usize {
                size_of::<$type>()
            }

            fn write<B: ByteOrder>(self, out: &mut [u8]) {
                B::$write(out, self)
            }

            fn read<B: ByteOrder>(buf: &[u8]) -> Self {
                B::$read(buf)
            }
        }
    };
}

fixed_primitive!(i16, write_i16, read_i16);
fixed_primitive!(u16, write_u16, read_u16);
fixed_primitive!(i32, write_i32, read_i32);
fixed_primitive!(u32, write_u32, read_u32);
fixed_primitive!(i64, write_i64, read_i64);
fixed_primitive!(u64, write_u64, read_u64);
fixed_primitive!(f64, write_f64, read_f64);

impl FixedPrimitive for u8 {
    fn size() -> usize {
        1
    }

    fn write<B: ByteOrder>(self, out: &mut [u8]) {
        out[0] = self;
    }

    fn read<B: ByteOrder>(buf: &[u8]) -> Self {
        buf[0]
    }
}

pub(crate) fn check_object_path(path: &str) -> std::result::Result<(), &'static str> {
    if !path.starts_with('/') {
        return Err("must begin with '/'");
    }
    if path == "/" {
        return Ok(());
    }
    if path.ends_with('/') {
        return Err("must not end with '/'");
    }
    for element in path[1..].split('/') {
        if element.is_empty() {
            return Err("must not contain empty elements");
        }
        if !element
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_')
        {
            return Err("elements may only contain [A-Za-z0-9_]");
        }
    }
    Ok(())
}

/// Checks the text of a string, object path or signature against the rules
/// of its kind.
pub(crate) fn check_string_like(kind: BasicKind, text: &str) -> std::result::Result<(), String> {
    if text.contains('\0') {
        return Err("contains an interior NUL".to_owned());
    }
    match kind {
        BasicKind::ObjectPath => check_object_path(text).map_err(str::to_owned),
        BasicKind::Signature => TypeSignature::parse(text)
            .map(|_| ())
            .map_err(|e| e.to_string()),
        _ => Ok(()),
    }
}

fn rejected(kind: BasicKind, text: &str, reason: String) -> Error {
    Error::value_range(
        &CodingPath::root(),
        format!("{:?}", text),
        format!("{} ({})", kind, reason),
    )
}

/// A validated DBus object path, marshaled as `o`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectPath(String);

impl ObjectPath {
    pub fn new(path: impl Into<String>) -> Result<Self> {
        let path = path.into();
        check_string_like(BasicKind::ObjectPath, &path)
            .map_err(|reason| rejected(BasicKind::ObjectPath, &path, reason))?;
        Ok(ObjectPath(path))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl Display for ObjectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for ObjectPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_newtype_struct(OBJECT_PATH_TOKEN, self.0.as_str())
    }
}

impl<'de> Deserialize<'de> for ObjectPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let path = String::deserialize(deserializer)?;
        ObjectPath::new(path).map_err(de::Error::custom)
    }
}

/// A validated type signature carried as a value, marshaled as `g`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Signature(String);

impl Signature {
    pub fn new(signature: impl Into<String>) -> Result<Self> {
        let signature = signature.into();
        check_string_like(BasicKind::Signature, &signature)
            .map_err(|reason| rejected(BasicKind::Signature, &signature, reason))?;
        Ok(Signature(signature))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn parse(&self) -> Result<TypeSignature> {
        TypeSignature::parse(&self.0)
    }
}

impl Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_newtype_struct(SIGNATURE_TOKEN, self.0.as_str())
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let signature = String::deserialize(deserializer)?;
        Signature::new(signature).map_err(de::Error::custom)
    }
}

/// A unix file descriptor index, marshaled as `h`.
///
/// This is the index into the message's out-of-band descriptor list;
/// passing the descriptors themselves is the transport's business.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnixFd(pub u32);

impl Serialize for UnixFd {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_newtype_struct(UNIX_FD_TOKEN, &self.0)
    }
}

impl<'de> Deserialize<'de> for UnixFd {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        u32::deserialize(deserializer).map(UnixFd)
    }
}

/// Marks a value as variant-wrapped when its type has to be synthesized,
/// e.g. `HashMap<String, Variant<T>>` synthesizes `a{sv}`.
///
/// Decoding unwraps variants transparently, so deserializing a
/// `Variant<T>` is the same as deserializing a `T`.
#[derive(Clone, Debug, PartialEq)]
pub struct Variant<T>(pub T);

impl<T: Serialize> Serialize for Variant<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_newtype_struct(VARIANT_TOKEN, &self.0)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Variant<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        T::deserialize(deserializer).map(Variant)
    }
}

#[cfg(test)]
mod tests {
    use super::{check_object_path, FixedPrimitive, ObjectPath, Signature};
    use crate::error::Error;
    use byteorder::{BE, LE};
    use test_log::test;

    #[test]
    fn fixed_byte_orders() {
        let mut out = [0u8; 4];
        0x0102_0304u32.write::<LE>(&mut out);
        assert_eq!(out, [4, 3, 2, 1]);
        0x0102_0304u32.write::<BE>(&mut out);
        assert_eq!(out, [1, 2, 3, 4]);
        assert_eq!(u32::read::<BE>(&out), 0x0102_0304);
        assert_eq!(<f64 as FixedPrimitive>::size(), 8);
    }

    #[test]
    fn object_paths() {
        assert!(check_object_path("/").is_ok());
        assert!(check_object_path("/org/freedesktop/DBus").is_ok());
        assert!(check_object_path("/a_b/C1").is_ok());
        assert!(check_object_path("").is_err());
        assert!(check_object_path("org").is_err());
        assert!(check_object_path("/org/").is_err());
        assert!(check_object_path("/org//x").is_err());
        assert!(check_object_path("/org/free-desktop").is_err());
    }

    #[test]
    fn validated_newtypes() {
        assert!(ObjectPath::new("/Hello/World").is_ok());
        assert!(matches!(
            ObjectPath::new("Hello"),
            Err(Error::ValueRange { .. })
        ));
        assert!(Signature::new("a{sv}").is_ok());
        assert!(matches!(Signature::new("a{"), Err(Error::ValueRange { .. })));
    }
}
