//! Signature-driven marshaling of values into and out of DBus message
//! bodies.
//!
//! The goal of this crate is to turn garden-variety `Serialize` and
//! `Deserialize` instances from [serde] into the body of a [DBus] message
//! and back. Actually sending the messages, and the message header, are
//! outside of the scope of this crate; a complete messaging system like
//! [zbus] owns those.
//!
//! Everything goes through an intermediate [`Value`] tree. On the way out,
//! a value is first serialized into a [`Value`], and then written against
//! a type signature: the signature, not the Rust type, decides the wire
//! type of every scalar, and a scalar has to fit its wire type exactly.
//! On the way in, the message's own signature decodes the whole body into
//! [`Value`]s, which serde then reads as the requested Rust type.
//!
//! Bodies live in the [`Message`] type. Serialization is handled by the
//! [`ser`] module, and boils down to [`to_message`] when the signature is
//! known, or [`serialize`] when it should be synthesized from the value.
//! DBus allows the same data to be sent in different ways, and a struct
//! with named fields in particular may be a DBus struct or an `a{sv}`
//! dictionary; that choice is configured via the [`serializer_policy`]
//! module and [`serialize_with_policy`].
//!
//! Deserialization is handled by the [`de`] module, but really boils down
//! to the [`from_message`] function, as deserialization cannot be
//! substantially customized.
//!
//! The lower layers are public too: [`signature`] parses type signatures,
//! and [`cursor`] appends and reads single values and containers.
//!
//! [serde]: https://serde.rs
//! [DBus]: https://www.freedesktop.org/wiki/Software/dbus/
//! [zbus]: https://crates.io/crates/zbus
//! [`Message`]: crate::message::Message
//! [`Value`]: crate::value::Value
//! [`de`]: crate::de
//! [`from_message`]: crate::de::from_message()
//! [`ser`]: crate::ser
//! [`to_message`]: crate::ser::to_message()
//! [`serialize`]: crate::ser::serialize()
//! [`serializer_policy`]: crate::ser::serializer_policy
//! [`serialize_with_policy`]: crate::ser::serialize_with_policy()
//! [`signature`]: crate::signature
//! [`cursor`]: crate::cursor

mod align;
pub mod cursor;
pub mod de;
pub mod error;
pub mod message;
mod primitives;
pub mod ser;
pub mod signature;
pub mod value;

pub use de::{decode_message, from_message, from_value};
pub use error::{CodingPath, Error, Result};
pub use message::{Endianness, Message, MessageKind};
pub use primitives::{ObjectPath, Signature, UnixFd, Variant};
pub use ser::{
    encode_value, serialize, serialize_with_policy, to_message, to_message_with_policy, to_value,
};
pub use signature::TypeSignature;
pub use value::{BasicValue, Value};
