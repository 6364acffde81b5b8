//! Error types for schema construction and lookup.

use irongate_core::FieldType;
use thiserror::Error;

/// Error type for schema construction and dictionary lookups.
///
/// Schema errors are fatal for the codec being built from the schema.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// Two schemas share one wire type code.
    #[error("duplicate type code {type_code:#04x}: '{first}' and '{second}'")]
    DuplicateTypeCode {
        /// Shared type code.
        type_code: u8,
        /// First schema using the code.
        first: String,
        /// Second schema using the code.
        second: String,
    },

    /// A required attribute is missing on a field.
    #[error("missing required attribute '{attribute}' on field '{field}'")]
    MissingAttribute {
        /// Field name.
        field: String,
        /// Attribute name.
        attribute: String,
    },

    /// An attribute carries a value the field type cannot use.
    #[error("invalid value '{value}' for attribute '{attribute}' on field '{field}'")]
    InvalidAttribute {
        /// Field name.
        field: String,
        /// Attribute name.
        attribute: String,
        /// Offending value.
        value: String,
    },

    /// The declared width is not supported by the field type.
    #[error("unsupported length {length} for {field_type} field '{field}'")]
    UnsupportedLength {
        /// Field name.
        field: String,
        /// Field type.
        field_type: FieldType,
        /// Declared length.
        length: usize,
    },

    /// A field name appears twice in one message.
    #[error("duplicate field '{field}' in message '{message}'")]
    DuplicateField {
        /// Message name.
        message: String,
        /// Field name.
        field: String,
    },

    /// A field overlaps the previous one.
    #[error("field '{field}' at offset {offset} overlaps the previous field in '{message}'")]
    OverlappingField {
        /// Message name.
        message: String,
        /// Field name.
        field: String,
        /// Offending offset.
        offset: usize,
    },

    /// The payload does not fit the 16-bit MessageLength field.
    #[error("payload of message '{message}' is {length} bytes, maximum is {max}")]
    PayloadTooLarge {
        /// Message name.
        message: String,
        /// Computed payload length.
        length: usize,
        /// Maximum payload length.
        max: usize,
    },

    /// Message not found in the dictionary.
    #[error("message '{name}' not found")]
    MessageNotFound {
        /// Message name.
        name: String,
    },

    /// Field not found in the dictionary.
    #[error("field '{name}' not found")]
    FieldNotFound {
        /// Field name.
        name: String,
    },

    /// A message name is defined twice in the dictionary.
    #[error("duplicate message definition '{name}'")]
    DuplicateMessage {
        /// Message name.
        name: String,
    },
}

impl SchemaError {
    /// Creates a missing attribute error.
    pub fn missing_attr(field: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self::MissingAttribute {
            field: field.into(),
            attribute: attribute.into(),
        }
    }
}
