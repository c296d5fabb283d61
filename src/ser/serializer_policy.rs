//! Choices the serializer has to make that the wire format leaves open.
//!
//! A Rust struct with named fields can travel either as a DBus struct,
//! `(...)`, or as a dictionary keyed by field name, `a{sv}`. Which one a
//! peer expects is a property of the interface, so it is decided here,
//! per struct name.

/// How a struct with named fields is represented.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StructSerializationStyle {
    /// Fields in declaration order, `(...)` when the type is synthesized.
    StronglyTyped,
    /// Field name to value, `a{sv}` when the type is synthesized. Fields
    /// that are `None` are left out.
    Dict,
}

pub trait SerializerPolicy {
    fn query_struct_name(&self, name: &str) -> StructSerializationStyle;
}

impl<P: SerializerPolicy + ?Sized> SerializerPolicy for &P {
    fn query_struct_name(&self, name: &str) -> StructSerializationStyle {
        (**self).query_struct_name(name)
    }
}

/// Every named struct is a dictionary.
#[derive(Clone, Debug, Default)]
pub struct DefaultSerializerPolicy;

impl SerializerPolicy for DefaultSerializerPolicy {
    fn query_struct_name(&self, _: &str) -> StructSerializationStyle {
        StructSerializationStyle::Dict
    }
}

/// Every named struct is a DBus struct.
#[derive(Clone, Debug, Default)]
pub struct StronglyTypedSerializerPolicy;

impl SerializerPolicy for StronglyTypedSerializerPolicy {
    fn query_struct_name(&self, _: &str) -> StructSerializationStyle {
        StructSerializationStyle::StronglyTyped
    }
}

/// Dictionaries by default, DBus structs for the listed struct names.
#[derive(Clone, Debug, Default)]
pub struct NamedStructPolicy {
    strongly_typed: Vec<&'static str>,
}

impl NamedStructPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn strongly_typed(mut self, name: &'static str) -> Self {
        self.strongly_typed.push(name);
        self
    }
}

impl SerializerPolicy for NamedStructPolicy {
    fn query_struct_name(&self, name: &str) -> StructSerializationStyle {
        if self.strongly_typed.iter().any(|listed| *listed == name) {
            StructSerializationStyle::StronglyTyped
        } else {
            StructSerializationStyle::Dict
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{NamedStructPolicy, SerializerPolicy, StructSerializationStyle};
    use test_log::test;

    #[test]
    fn per_name_choice() {
        let policy = NamedStructPolicy::new().strongly_typed("Point");
        assert_eq!(
            policy.query_struct_name("Point"),
            StructSerializationStyle::StronglyTyped
        );
        assert_eq!(
            (&policy).query_struct_name("Properties"),
            StructSerializationStyle::Dict
        );
    }
}
