use byteorder::ByteOrder;
use log::trace;

use crate::cursor::{AppendCursor, ContainerKind};
use crate::error::{CodingPath, Error, Result};
use crate::signature::{BasicKind, TypeNode, TypeSignature};
use crate::value::{BasicValue, Value};

// `Variant` wrappers only matter where a signature has to be synthesized.
// Against a concrete type they are looked through.
fn strip_markers(mut value: &Value) -> &Value {
    while let Value::Variant(inner) = value {
        value = &**inner;
    }
    value
}

// The items of an ordered or keyed value, with the path of each.
fn sequence_items<'v>(value: &'v Value, path: &CodingPath) -> Option<Vec<(CodingPath, &'v Value)>> {
    match value {
        Value::Array(items) | Value::Struct(items) => Some(
            items
                .iter()
                .enumerate()
                .map(|(ix, item)| (path.child_index(ix), item))
                .collect(),
        ),
        Value::Dict(entries) => Some(
            entries
                .iter()
                .map(|(key, item)| (path.child_key(key.canonical_key()), item))
                .collect(),
        ),
        Value::Basic(_) | Value::Variant(_) => None,
    }
}

/// Writes `value` as one complete value of type `node`.
pub(crate) fn encode_value<B: ByteOrder>(
    cursor: &mut AppendCursor<'_, B>,
    value: &Value,
    node: &TypeNode,
    path: &CodingPath,
) -> Result<()> {
    let value = if *node == TypeNode::Variant {
        value
    } else {
        strip_markers(value)
    };

    match node {
        TypeNode::Basic(kind) => {
            let basic = match value {
                Value::Basic(basic) => basic.convert_to(*kind, path)?,
                other => return Err(Error::type_mismatch(path, kind.name(), other.describe())),
            };
            cursor.append_basic(&basic).map_err(|e| e.located(path))
        }
        TypeNode::Array(element) => {
            if let Some((key, value_type)) = node.dict_types() {
                return encode_dict(cursor, value, element, key, value_type, path);
            }
            let items = match value {
                Value::Array(items) | Value::Struct(items) => items,
                other => {
                    return Err(Error::type_mismatch(
                        path,
                        format!("array of {}", element),
                        other.describe(),
                    ))
                }
            };
            cursor
                .with_container(ContainerKind::Array, Some(element), |c| {
                    for (ix, item) in items.iter().enumerate() {
                        encode_value(c, item, element, &path.child_index(ix))?;
                    }
                    Ok(())
                })
                .map_err(|e| e.located(path))
        }
        TypeNode::Struct(fields) => {
            let items = sequence_items(value, path)
                .ok_or_else(|| Error::type_mismatch(path, node.to_string(), value.describe()))?;
            if items.len() != fields.len() {
                return Err(Error::type_mismatch(
                    path,
                    format!("{} ({} fields)", node, fields.len()),
                    value.describe(),
                ));
            }
            cursor
                .with_container(ContainerKind::Struct, Some(node), |c| {
                    for ((item_path, item), field) in items.iter().zip(fields) {
                        encode_value(c, item, field, item_path)?;
                    }
                    Ok(())
                })
                .map_err(|e| e.located(path))
        }
        TypeNode::Variant => {
            let inner = match value {
                Value::Variant(inner) => &**inner,
                other => other,
            };
            let inner_type = inner.synthesize_type(path)?;
            trace!("variant at {} holds {}", path, inner_type);
            cursor
                .with_container(ContainerKind::Variant, Some(&inner_type), |c| {
                    encode_value(c, inner, &inner_type, path)
                })
                .map_err(|e| e.located(path))
        }
        TypeNode::DictEntry(_) => Err(Error::container_mismatch(
            "dict-entry outside of a dictionary array",
        )
        .located(path)),
    }
}

fn encode_dict<B: ByteOrder>(
    cursor: &mut AppendCursor<'_, B>,
    value: &Value,
    element: &TypeNode,
    key: BasicKind,
    value_type: &TypeNode,
    path: &CodingPath,
) -> Result<()> {
    let entries: &[(BasicValue, Value)] = match value {
        Value::Dict(entries) => entries,
        Value::Array(items) | Value::Struct(items) if items.is_empty() => &[],
        other => {
            return Err(Error::type_mismatch(
                path,
                format!("dictionary a{}", element),
                other.describe(),
            ))
        }
    };

    cursor
        .with_container(ContainerKind::Array, Some(element), |c| {
            for (entry_key, entry_value) in entries {
                let entry_path = path.child_key(entry_key.canonical_key());
                c.with_container(ContainerKind::DictEntry, None, |c| {
                    let wire_key = entry_key.convert_to(key, &entry_path)?;
                    c.append_basic(&wire_key)
                        .map_err(|e| e.located(&entry_path))?;
                    encode_value(c, entry_value, value_type, &entry_path)
                })?;
            }
            Ok(())
        })
        .map_err(|e| e.located(path))
}

/// Writes the top-level arguments.
///
/// A single-type signature takes `value` itself. Otherwise `value` must be
/// ordered or keyed with one item per type; an empty signature takes an
/// empty one.
pub(crate) fn encode_arguments<B: ByteOrder>(
    cursor: &mut AppendCursor<'_, B>,
    value: &Value,
    signature: &TypeSignature,
) -> Result<()> {
    let root = CodingPath::root();
    if let [single] = signature.nodes() {
        return encode_value(cursor, value, single, &root);
    }

    let items = sequence_items(strip_markers(value), &root).ok_or_else(|| {
        Error::type_mismatch(
            &root,
            format!("{} arguments", signature.len()),
            value.describe(),
        )
    })?;
    if items.len() != signature.len() {
        return Err(Error::type_mismatch(
            &root,
            format!("{} arguments ({})", signature.len(), signature),
            value.describe(),
        ));
    }
    for ((item_path, item), node) in items.iter().zip(signature.nodes()) {
        encode_value(cursor, item, node, item_path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{encode_arguments, encode_value};
    use crate::cursor::{AppendCursor, ReadCursor};
    use crate::error::{CodingPath, Error, PathSegment, Result};
    use crate::message::Message;
    use crate::signature::{BasicKind, TypeKind, TypeNode, TypeSignature};
    use crate::value::{BasicValue, Value};
    use byteorder::LE;
    use test_log::test;

    fn encode(value: &Value, signature: &str) -> Result<Message> {
        let signature = TypeSignature::parse(signature)?;
        let mut mesg = Message::default();
        let mut cursor = AppendCursor::<LE>::new(&mut mesg);
        encode_arguments(&mut cursor, value, &signature)?;
        cursor.finish()?;
        Ok(mesg)
    }

    #[test]
    fn widths_follow_the_signature() -> Result<()> {
        let mesg = encode(&Value::from(37i32), "t")?;
        assert_eq!(mesg.signature(), "t");
        assert_eq!(mesg.body(), &[37, 0, 0, 0, 0, 0, 0, 0]);

        let mesg = encode(&Value::from(vec![1u8, 2, 3]), "an")?;
        assert_eq!(mesg.body(), &[6, 0, 0, 0, 1, 0, 2, 0, 3, 0]);
        Ok(())
    }

    #[test]
    fn boolean_is_not_an_integer() {
        assert!(matches!(
            encode(&Value::from(true), "i"),
            Err(Error::TypeMismatch { .. })
        ));
    }

    #[test]
    fn byte_out_of_range() {
        assert!(matches!(
            encode(&Value::from(300i32), "y"),
            Err(Error::ValueRange { .. })
        ));
    }

    #[test]
    fn errors_carry_the_path() {
        let value = Value::Struct(vec![
            Value::from("name"),
            Value::from(vec![Value::from(1i32), Value::from(2i64), Value::from(true)]),
        ]);
        let err = match encode(&value, "(sax)") {
            Err(err) => err,
            Ok(_) => panic!("boolean encoded as int64"),
        };
        assert!(matches!(err, Error::TypeMismatch { .. }));
        assert_eq!(
            err.path().map(CodingPath::segments),
            Some(&[PathSegment::Index(1), PathSegment::Index(2)][..])
        );
    }

    #[test]
    fn keyed_record_as_struct() -> Result<()> {
        let record = Value::Dict(vec![
            (BasicValue::from("a"), Value::from("Hi")),
            (BasicValue::from("b"), Value::from(0.2)),
        ]);
        let mesg = encode(&record, "(sd)")?;
        let tuple = encode(&Value::Struct(vec![Value::from("Hi"), Value::from(0.2)]), "(sd)")?;
        assert_eq!(mesg, tuple);

        assert!(matches!(
            encode(&record, "(sdi)"),
            Err(Error::TypeMismatch { .. })
        ));
        Ok(())
    }

    #[test]
    fn numeric_dictionary_keys() -> Result<()> {
        let dict = Value::Dict(vec![(BasicValue::from(5i32), Value::from(true))]);
        let mesg = encode(&dict, "a{yb}")?;
        assert_eq!(
            mesg.body(),
            &[
                8, 0, 0, 0, // array length
                0, 0, 0, 0, // padding to the first dict-entry
                5, 0, 0, 0, // key byte and padding
                1, 0, 0, 0, // true
            ]
        );
        Ok(())
    }

    #[test]
    fn variant_array_synthesizes_element_types() -> Result<()> {
        let ints = Value::Array(vec![Value::from(0i32), Value::from(1i32), Value::from(2i32)]);
        let strings = Value::Array(vec![Value::from("a"), Value::from("b"), Value::from("c")]);

        for (items, code) in &[(ints, BasicKind::Int32), (strings, BasicKind::String)] {
            let mesg = encode(items, "av")?;
            let top = ReadCursor::<LE>::new(&mesg)?;
            let mut elements = top.recurse_into()?;
            let mut seen = 0;
            loop {
                assert_eq!(elements.current_wire_type(), Some(TypeKind::Variant));
                let inner = elements.recurse_into()?;
                assert_eq!(inner.current_type(), Some(&TypeNode::Basic(*code)));
                seen += 1;
                if !elements.advance()? {
                    break;
                }
            }
            assert_eq!(seen, 3);
        }
        Ok(())
    }

    #[test]
    fn top_level_argument_count() -> Result<()> {
        let pair = Value::Struct(vec![Value::from(1u32), Value::from("x")]);
        let mesg = encode(&pair, "us")?;
        assert_eq!(mesg.signature(), "us");
        assert!(matches!(
            encode(&pair, "usb"),
            Err(Error::TypeMismatch { .. })
        ));
        let mesg = encode(&Value::Struct(vec![]), "")?;
        assert!(mesg.body().is_empty());
        Ok(())
    }

    #[test]
    fn runaway_variant_nesting() -> Result<()> {
        let mut value = Value::from(1u8);
        for _ in 0..70 {
            value = Value::variant(value);
        }
        let node = TypeNode::Variant;
        let mut mesg = Message::default();
        let mut cursor = AppendCursor::<LE>::new(&mut mesg);
        let result = encode_value(&mut cursor, &value, &node, &CodingPath::root());
        assert!(matches!(result, Err(Error::DepthLimitExceeded { .. })));
        drop(cursor);
        assert!(mesg.is_abandoned());
        Ok(())
    }
}
