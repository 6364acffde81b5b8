//! Structured message values.
//!
//! A [`Message`] is an ordered mapping from field name to [`Value`]. Decoding
//! produces messages by value; encoding borrows them.

use crate::types::Decimal;
use chrono::{DateTime, Utc};

/// Tagged field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Explicit null.
    Null,
    /// Text value.
    Str(String),
    /// 32-bit integer.
    Int32(i32),
    /// 64-bit integer.
    Int64(i64),
    /// Single precision float.
    Float32(f32),
    /// Double precision float.
    Float64(f64),
    /// Scaled decimal.
    Decimal(Decimal),
    /// Timestamp.
    DateTime(DateTime<Utc>),
    /// Nested message (e.g. a header block).
    Message(Message),
}

impl Value {
    /// Returns a short name of the variant, used in error messages.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Str(_) => "string",
            Self::Int32(_) => "int32",
            Self::Int64(_) => "int64",
            Self::Float32(_) => "float32",
            Self::Float64(_) => "float64",
            Self::Decimal(_) => "decimal",
            Self::DateTime(_) => "datetime",
            Self::Message(_) => "message",
        }
    }

    /// Returns true for [`Value::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the integer content of integral variants.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int32(v) => Some(i64::from(*v)),
            Self::Int64(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the text content.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(v) => Some(v),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int32(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int64(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Self::Float32(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float64(value)
    }
}

impl From<Decimal> for Value {
    fn from(value: Decimal) -> Self {
        Self::Decimal(value)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Self::DateTime(value)
    }
}

impl From<Message> for Value {
    fn from(value: Message) -> Self {
        Self::Message(value)
    }
}

/// Structured message: name, namespace and ordered fields.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Message {
    name: String,
    namespace: String,
    fields: Vec<(String, Value)>,
}

impl Message {
    /// Creates an empty message.
    #[must_use]
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            fields: Vec::new(),
        }
    }

    /// Builder-style field setter.
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(field, value);
        self
    }

    /// Sets a field, replacing an existing value in place (order is kept).
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        let field = field.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(name, _)| *name == field) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((field, value)),
        }
    }

    /// Removes a field and returns its value.
    pub fn remove(&mut self, field: &str) -> Option<Value> {
        let index = self.fields.iter().position(|(name, _)| name == field)?;
        Some(self.fields.remove(index).1)
    }

    /// Returns the message name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the message namespace.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Looks up a field value.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value)
    }

    /// Returns true if the field is present (even if null).
    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    /// Returns a text field.
    #[must_use]
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(Value::as_str)
    }

    /// Returns an `Int32` field.
    #[must_use]
    pub fn get_i32(&self, field: &str) -> Option<i32> {
        match self.get(field)? {
            Value::Int32(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns an integral field widened to `i64`.
    #[must_use]
    pub fn get_i64(&self, field: &str) -> Option<i64> {
        self.get(field).and_then(Value::as_i64)
    }

    /// Returns a nested message.
    #[must_use]
    pub fn get_message(&self, field: &str) -> Option<&Message> {
        match self.get(field)? {
            Value::Message(m) => Some(m),
            _ => None,
        }
    }

    /// Iterates over fields in order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Returns the number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the message has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_builder_keeps_order() {
        let msg = Message::new("Logon", "NTG")
            .with("CompID", "TRADER1")
            .with("MessageVersion", 1)
            .with("CompID", "TRADER2");

        let names: Vec<&str> = msg.fields().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["CompID", "MessageVersion"]);
        assert_eq!(msg.get_str("CompID"), Some("TRADER2"));
        assert_eq!(msg.get_i32("MessageVersion"), Some(1));
        assert_eq!(msg.get_i64("MessageVersion"), Some(1));
    }

    #[test]
    fn test_message_nested_and_remove() {
        let header = Message::new("MessageHeader", "NTG").with("MessageType", "A");
        let mut msg = Message::new("Logon", "NTG").with("MessageHeader", header.clone());

        assert_eq!(msg.get_message("MessageHeader"), Some(&header));
        assert!(msg.remove("MessageHeader").is_some());
        assert!(msg.is_empty());
        assert!(msg.remove("MessageHeader").is_none());
    }

    #[test]
    fn test_value_kind() {
        assert_eq!(Value::Null.kind(), "null");
        assert_eq!(Value::from(1.5f64).kind(), "float64");
        assert!(Value::Null.is_null());
        assert_eq!(Value::from(7i64).as_i64(), Some(7));
    }
}
