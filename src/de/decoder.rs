use byteorder::{BigEndian, ByteOrder, LittleEndian};
use log::{debug, trace};

use crate::cursor::ReadCursor;
use crate::error::{CodingPath, Error, Result};
use crate::message::{Endianness, Message};
use crate::signature::TypeNode;
use crate::value::{BasicValue, Value};

/// Decodes the value under `cursor` without moving it.
///
/// Variants are unwrapped, however deeply they nest: the result holds the
/// innermost value.
pub(crate) fn decode_current<B: ByteOrder>(
    cursor: &ReadCursor<'_, B>,
    path: &CodingPath,
) -> Result<Value> {
    let node = cursor
        .current_type()
        .ok_or_else(|| Error::container_mismatch("no value left at this level").located(path))?;

    match node {
        TypeNode::Basic(_) => cursor
            .get_basic()
            .map(Value::Basic)
            .map_err(|e| e.located(path)),
        TypeNode::Array(_) if node.dict_types().is_some() => decode_dict(cursor, path),
        TypeNode::Array(_) | TypeNode::Struct(_) => {
            let mut inner = cursor.recurse_into().map_err(|e| e.located(path))?;
            let mut items = Vec::new();
            while inner.has_current() {
                items.push(decode_current(&inner, &path.child_index(items.len()))?);
                inner.advance().map_err(|e| e.located(path))?;
            }
            if let TypeNode::Array(_) = node {
                Ok(Value::Array(items))
            } else {
                Ok(Value::Struct(items))
            }
        }
        TypeNode::Variant => {
            let inner = cursor.recurse_into().map_err(|e| e.located(path))?;
            trace!("variant at {} holds {:?}", path, inner.current_type());
            decode_current(&inner, path)
        }
        TypeNode::DictEntry(_) => Err(Error::container_mismatch(
            "dict-entry outside of a dictionary array",
        )
        .located(path)),
    }
}

fn decode_dict<B: ByteOrder>(cursor: &ReadCursor<'_, B>, path: &CodingPath) -> Result<Value> {
    let mut inner = cursor.recurse_into().map_err(|e| e.located(path))?;
    let mut entries = Vec::new();
    while inner.has_current() {
        entries.push(decode_entry(&inner, path)?);
        inner.advance().map_err(|e| e.located(path))?;
    }
    Ok(Value::Dict(entries))
}

/// Decodes the key and value of the entry under `cursor`. Anything other
/// than exactly one basic key followed by one value is corrupt.
pub(crate) fn decode_entry<B: ByteOrder>(
    cursor: &ReadCursor<'_, B>,
    path: &CodingPath,
) -> Result<(BasicValue, Value)> {
    let mut fields = cursor.recurse_into().map_err(|e| e.located(path))?;
    let key = match fields.current_type() {
        Some(TypeNode::Basic(_)) => fields.get_basic().map_err(|e| e.located(path))?,
        Some(other) => {
            return Err(Error::type_mismatch(path, "basic dictionary key", other.to_string()))
        }
        None => {
            return Err(Error::corrupted(fields.position(), "dict-entry without a key").located(path))
        }
    };

    let entry_path = path.child_key(key.canonical_key());
    if !fields.advance().map_err(|e| e.located(&entry_path))? {
        return Err(
            Error::corrupted(fields.position(), "dict-entry without a value").located(&entry_path),
        );
    }
    let value = decode_current(&fields, &entry_path)?;
    if fields.advance().map_err(|e| e.located(&entry_path))? {
        return Err(Error::corrupted(
            fields.position(),
            "dict-entry holds more than a key and a value",
        )
        .located(&entry_path));
    }
    Ok((key, value))
}

fn decode_all<B: ByteOrder>(message: &Message) -> Result<Vec<Value>> {
    let mut cursor = ReadCursor::<B>::new(message)?;
    let count = cursor.field_count().unwrap_or(0);
    let mut args = Vec::with_capacity(count);
    while cursor.has_current() {
        let path = if count == 1 {
            CodingPath::root()
        } else {
            CodingPath::root().child_index(args.len())
        };
        args.push(decode_current(&cursor, &path)?);
        cursor.advance().map_err(|e| e.located(&path))?;
    }

    let trailing = message.body().len() - cursor.position();
    if trailing != 0 {
        return Err(Error::corrupted(
            cursor.position(),
            format!("{} bytes left over after the last argument", trailing),
        ));
    }
    Ok(args)
}

/// Decodes every top-level argument of `message`, as typed by its own
/// signature.
pub fn decode_message(message: &Message) -> Result<Vec<Value>> {
    debug!(
        "decoding {} body bytes as {:?} ({:?})",
        message.body().len(),
        message.signature(),
        message.endianness()
    );
    match message.endianness() {
        Endianness::Little => decode_all::<LittleEndian>(message),
        Endianness::Big => decode_all::<BigEndian>(message),
    }
}

#[cfg(test)]
mod tests {
    use super::{decode_entry, decode_message};
    use crate::cursor::ReadCursor;
    use crate::error::{CodingPath, Error, Result};
    use crate::message::{Endianness, Message, MessageKind};
    use crate::ser::encode_value;
    use crate::value::{BasicValue, Value};
    use byteorder::LE;
    use test_log::test;

    fn raw(signature: &str, body: Vec<u8>) -> Message {
        Message::from_parts(MessageKind::MethodReturn, Endianness::Little, signature, body)
    }

    #[test]
    fn arguments_in_order() -> Result<()> {
        let mut mesg = Message::default();
        let args = Value::Struct(vec![
            Value::from(7u8),
            Value::from(vec!["x", "y"]),
            Value::Dict(vec![(BasicValue::from("k"), Value::variant(1.5))]),
        ]);
        encode_value(&args, "yasa{sv}", &mut mesg)?;
        assert_eq!(
            decode_message(&mesg)?,
            vec![
                Value::from(7u8),
                Value::from(vec!["x", "y"]),
                Value::Dict(vec![(BasicValue::from("k"), Value::from(1.5))]),
            ]
        );
        Ok(())
    }

    #[test]
    fn nested_variants_unwrap_fully() -> Result<()> {
        let mut mesg = Message::default();
        encode_value(&Value::variant(Value::variant(5i32)), "v", &mut mesg)?;
        assert_eq!(decode_message(&mesg)?, vec![Value::from(5i32)]);
        Ok(())
    }

    #[test]
    fn trailing_bytes() {
        let mesg = raw("y", vec![1, 0]);
        assert!(matches!(
            decode_message(&mesg),
            Err(Error::DataCorrupted { offset: 1, .. })
        ));
    }

    #[test]
    fn entry_without_value() -> Result<()> {
        let mesg = raw("(s)", vec![1, 0, 0, 0, b'a', 0]);
        let cursor = ReadCursor::<LE>::new(&mesg)?;
        assert!(matches!(
            decode_entry(&cursor, &CodingPath::root()),
            Err(Error::DataCorrupted { .. })
        ));
        Ok(())
    }

    #[test]
    fn entry_with_extra_field() -> Result<()> {
        let mesg = raw(
            "(sii)",
            vec![1, 0, 0, 0, b'a', 0, 0, 0, 1, 0, 0, 0, 2, 0, 0, 0],
        );
        let cursor = ReadCursor::<LE>::new(&mesg)?;
        assert!(matches!(
            decode_entry(&cursor, &CodingPath::root()),
            Err(Error::DataCorrupted { .. })
        ));
        Ok(())
    }

    #[test]
    fn corrupt_element_is_located() {
        // `ab` whose second boolean is 7.
        let mesg = raw("ab", vec![8, 0, 0, 0, 1, 0, 0, 0, 7, 0, 0, 0]);
        match decode_message(&mesg) {
            Err(Error::DataCorrupted { path, offset, .. }) => {
                assert_eq!(path.to_string(), "$[1]");
                assert_eq!(offset, 8);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn runaway_variant_nesting() {
        let mut body = Vec::new();
        for _ in 0..70 {
            body.extend_from_slice(&[1, b'v', 0]);
        }
        body.extend_from_slice(&[1, b'y', 0, 5]);
        let mesg = raw("v", body);
        assert!(matches!(
            decode_message(&mesg),
            Err(Error::DepthLimitExceeded { limit: 64, .. })
        ));
    }

    #[test]
    fn bad_embedded_signature() {
        let mesg = raw("v", vec![2, b'i', b'i', 0, 1, 0, 0, 0, 2, 0, 0, 0]);
        assert!(matches!(
            decode_message(&mesg),
            Err(Error::DataCorrupted { .. })
        ));
    }
}
