//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects have no identity and are compared by their attribute values.
/// To "modify" one, build a new value (e.g. an invoice recipient is replaced
/// wholesale or merged from a patch, never edited in place by identity).
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
