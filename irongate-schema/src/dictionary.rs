//! Dictionary access.
//!
//! A dictionary is the named collection of message layouts one protocol uses.
//! How it is persisted is up to the provider; the codec only reads it once at
//! construction.

use crate::error::SchemaError;
use crate::field::FieldDescriptor;
use crate::messages::MessageSchema;
use std::collections::BTreeMap;

/// Read access to message and field layouts.
pub trait DictionaryProvider: Send + Sync {
    /// Returns the dictionary namespace.
    fn namespace(&self) -> &str;

    /// Returns the schema of a message.
    ///
    /// # Errors
    /// Returns [`SchemaError::MessageNotFound`] if the name is not defined.
    fn message_schema(&self, name: &str) -> Result<MessageSchema, SchemaError>;

    /// Returns a field definition by name.
    ///
    /// # Errors
    /// Returns [`SchemaError::FieldNotFound`] if no message defines the field.
    fn field_schema(&self, name: &str) -> Result<FieldDescriptor, SchemaError>;

    /// Returns all message names, sorted.
    fn message_names(&self) -> Vec<String>;
}

/// Dictionary held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDictionary {
    namespace: String,
    messages: BTreeMap<String, MessageSchema>,
    fields: BTreeMap<String, FieldDescriptor>,
}

impl InMemoryDictionary {
    /// Creates an empty dictionary.
    #[must_use]
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            ..Self::default()
        }
    }

    /// Adds a message, builder style.
    ///
    /// # Errors
    /// Returns [`SchemaError::DuplicateMessage`] if the name is already defined.
    pub fn with_message(mut self, schema: MessageSchema) -> Result<Self, SchemaError> {
        self.add_message(schema)?;
        Ok(self)
    }

    /// Adds a message.
    ///
    /// Fields become visible through [`DictionaryProvider::field_schema`]; the
    /// first message defining a field name wins.
    ///
    /// # Errors
    /// Returns [`SchemaError::DuplicateMessage`] if the name is already defined.
    pub fn add_message(&mut self, schema: MessageSchema) -> Result<(), SchemaError> {
        if self.messages.contains_key(schema.name()) {
            return Err(SchemaError::DuplicateMessage {
                name: schema.name().to_string(),
            });
        }
        for field in schema.fields() {
            self.fields
                .entry(field.name.clone())
                .or_insert_with(|| field.clone());
        }
        self.messages.insert(schema.name().to_string(), schema);
        Ok(())
    }

    /// Returns the number of messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns true if no messages are defined.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl DictionaryProvider for InMemoryDictionary {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn message_schema(&self, name: &str) -> Result<MessageSchema, SchemaError> {
        self.messages
            .get(name)
            .cloned()
            .ok_or_else(|| SchemaError::MessageNotFound {
                name: name.to_string(),
            })
    }

    fn field_schema(&self, name: &str) -> Result<FieldDescriptor, SchemaError> {
        self.fields
            .get(name)
            .cloned()
            .ok_or_else(|| SchemaError::FieldNotFound {
                name: name.to_string(),
            })
    }

    fn message_names(&self) -> Vec<String> {
        self.messages.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use irongate_core::FieldType;

    fn heartbeat() -> MessageSchema {
        MessageSchema::builder("Heartbeat", "NTG", b'0')
            .build()
            .unwrap()
    }

    fn logon() -> MessageSchema {
        MessageSchema::builder("Logon", "NTG", b'A')
            .field(FieldDescriptor::new("CompID", FieldType::Alpha, 11))
            .build()
            .unwrap()
    }

    #[test]
    fn test_lookup() {
        let dictionary = InMemoryDictionary::new("NTG")
            .with_message(logon())
            .unwrap()
            .with_message(heartbeat())
            .unwrap();

        assert_eq!(dictionary.namespace(), "NTG");
        assert_eq!(dictionary.len(), 2);
        assert_eq!(dictionary.message_names(), vec!["Heartbeat", "Logon"]);
        assert_eq!(dictionary.message_schema("Logon").unwrap().type_code(), b'A');
        assert_eq!(dictionary.field_schema("CompID").unwrap().length, 11);
    }

    #[test]
    fn test_missing_entries() {
        let dictionary = InMemoryDictionary::new("NTG");
        assert!(dictionary.is_empty());
        assert!(matches!(
            dictionary.message_schema("Logon"),
            Err(SchemaError::MessageNotFound { .. })
        ));
        assert!(matches!(
            dictionary.field_schema("CompID"),
            Err(SchemaError::FieldNotFound { .. })
        ));
    }

    #[test]
    fn test_duplicate_message() {
        let err = InMemoryDictionary::new("NTG")
            .with_message(logon())
            .unwrap()
            .with_message(logon())
            .unwrap_err();
        assert_eq!(
            err,
            SchemaError::DuplicateMessage {
                name: "Logon".to_string()
            }
        );
    }
}
