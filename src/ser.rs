use crate::cursor::AppendCursor;
use crate::error::{CodingPath, Error, Result};
use crate::message::{Endianness, Message, MessageKind};
use crate::signature::TypeSignature;
use crate::value::Value;

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use log::debug;
use serde::Serialize;

mod adapters;
mod encoder;
pub mod serializer_policy;

use adapters::SingleValueSlot;
use serializer_policy::{DefaultSerializerPolicy, SerializerPolicy};

/// Converts any `Serialize` value into the intermediate [`Value`] tree,
/// deciding the representation of named structs with `policy`.
pub fn to_value_with_policy<T>(value: &T, policy: impl SerializerPolicy) -> Result<Value>
where
    T: Serialize + ?Sized,
{
    let mut slot = SingleValueSlot::new(CodingPath::root(), &policy);
    value.serialize(&mut slot)?;
    slot.finish()
}

pub fn to_value<T>(value: &T) -> Result<Value>
where
    T: Serialize + ?Sized,
{
    to_value_with_policy(value, DefaultSerializerPolicy)
}

fn encode_with<B: ByteOrder>(
    value: &Value,
    signature: &TypeSignature,
    message: &mut Message,
) -> Result<()> {
    let mut cursor = AppendCursor::<B>::new(message);
    encoder::encode_arguments(&mut cursor, value, signature)?;
    cursor.finish()
}

/// Appends `value` to `message` as arguments of type `signature`.
///
/// The message's signature is extended by `signature`, so repeated calls
/// append further arguments. Every scalar has to fit its wire type
/// exactly, and any failure abandons the message.
pub fn encode_value(value: &Value, signature: &str, message: &mut Message) -> Result<()> {
    let signature = TypeSignature::parse(signature)?;
    if message.is_abandoned() {
        return Err(Error::container_mismatch(
            "message was abandoned by an earlier failed encode",
        ));
    }
    debug!(
        "encoding {} as {:?} ({:?})",
        value.describe(),
        signature.to_string(),
        message.endianness()
    );

    let result = match message.endianness() {
        Endianness::Little => encode_with::<LittleEndian>(value, &signature, message),
        Endianness::Big => encode_with::<BigEndian>(value, &signature, message),
    };
    if result.is_err() {
        message.abandon();
    }
    result
}

/// Serializes `value` into `message` against an explicit signature, with
/// a custom [`SerializerPolicy`].
///
/// [`SerializerPolicy`]: serializer_policy::SerializerPolicy
pub fn to_message_with_policy<T>(
    value: &T,
    signature: &str,
    message: &mut Message,
    policy: impl SerializerPolicy,
) -> Result<()>
where
    T: Serialize + ?Sized,
{
    let value = to_value_with_policy(value, policy)?;
    encode_value(&value, signature, message)
}

/// This is the main entry point to the serializer: the signature decides
/// the wire type of every value, and the value has to fit it.
///
/// Named structs go through [`DefaultSerializerPolicy`], so against a
/// struct signature their fields are taken in order, and against `a{sv}`
/// they become a dictionary keyed by field name.
///
/// [`DefaultSerializerPolicy`]: serializer_policy::DefaultSerializerPolicy
pub fn to_message<T>(value: &T, signature: &str, message: &mut Message) -> Result<()>
where
    T: Serialize + ?Sized,
{
    to_message_with_policy(value, signature, message, DefaultSerializerPolicy)
}

/// Serializes into a fresh method-call message whose signature is
/// synthesized from the value itself. The default serialization policy,
/// [`DefaultSerializerPolicy`], serializes tuples and tuple structs in
/// "struct" style, e.g. a tuple with two `i32`s and a `String` would
/// serialize as `(iis)`. Structs with named fields are serialized in
/// dictionary style, as `a{sv}` where the keys of the dictionary are the
/// names of the fields, and the values are the values of those fields,
/// wrapped in variants.
///
/// Instead, to always use struct-style serialization, you can use
/// [`StronglyTypedSerializerPolicy`].
///
/// Sequences whose items all synthesize the same type become arrays of
/// that type; mixed or empty ones become `av`.
///
/// [`DefaultSerializerPolicy`]: serializer_policy::DefaultSerializerPolicy
/// [`StronglyTypedSerializerPolicy`]: serializer_policy::StronglyTypedSerializerPolicy
pub fn serialize_with_policy(
    value: impl Serialize,
    config: impl SerializerPolicy,
) -> Result<Message> {
    let value = to_value_with_policy(&value, config)?;
    let signature = value.synthesize_type(&CodingPath::root())?.signature();
    let mut message = Message::new(MessageKind::MethodCall);
    encode_value(&value, &signature, &mut message)?;
    Ok(message)
}

/// This is a convenience function that simply calls [`serialize_with_policy`]
/// with the default policy.
///
/// [`serialize_with_policy`]: serialize_with_policy
pub fn serialize(value: impl Serialize) -> Result<Message> {
    serialize_with_policy(value, DefaultSerializerPolicy)
}
