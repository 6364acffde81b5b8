//! Codec error types.

use irongate_core::FieldType;
use irongate_schema::SchemaError;
use thiserror::Error;

/// Error type for encode and decode operations.
///
/// Encoding errors are scoped to one message: the call fails and nothing is
/// written. Protocol errors (see [`CodecError::is_protocol_error`]) mean the
/// byte stream itself cannot be trusted.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// A required field was given an explicit null.
    #[error("null value for required field '{field}'")]
    NullFieldValue {
        /// Field name.
        field: String,
    },

    /// A string value does not fit its field.
    #[error("value of field '{field}' is {length} bytes, field is {max} bytes")]
    TooLongStringValue {
        /// Field name.
        field: String,
        /// Encoded value length.
        length: usize,
        /// Field length.
        max: usize,
    },

    /// The field width is not supported by its type.
    #[error("unsupported length {length} for {field_type} field '{field}'")]
    UnsupportedLength {
        /// Field name.
        field: String,
        /// Field type.
        field_type: FieldType,
        /// Field length.
        length: usize,
    },

    /// The representation attribute of a decimal field is missing or unknown.
    #[error("unknown attribute type {value:?} on field '{field}'")]
    UnknownAttributeType {
        /// Field name.
        field: String,
        /// Attribute value, `None` when absent.
        value: Option<String>,
    },

    /// A required field is absent and has no default.
    #[error("missing field '{field}' in message '{message}'")]
    MissingField {
        /// Message name.
        message: String,
        /// Field name.
        field: String,
    },

    /// The value variant cannot be written to the field type.
    #[error("cannot encode {found} value into {expected} field '{field}'")]
    TypeMismatch {
        /// Field name.
        field: String,
        /// Field type.
        expected: FieldType,
        /// Variant of the supplied value.
        found: &'static str,
    },

    /// The value does not fit the field width or representation.
    #[error("value {value} out of range for field '{field}'")]
    ValueOutOfRange {
        /// Field name.
        field: String,
        /// Offending value.
        value: String,
    },

    /// A character outside Latin-1.
    #[error("character {character:?} in field '{field}' is not Latin-1")]
    UnmappableCharacter {
        /// Field name.
        field: String,
        /// Offending character.
        character: char,
    },

    /// The payload cannot be described by the 16-bit length field.
    #[error("message '{message}' payload of {length} bytes exceeds the frame limit")]
    FrameTooLarge {
        /// Message name.
        message: String,
        /// Payload length.
        length: usize,
    },

    /// The frame is shorter than its schema's payload.
    #[error("frame of message '{message}' carries {length} payload bytes, schema needs {required}")]
    FrameTooShort {
        /// Message name.
        message: String,
        /// Announced payload length.
        length: usize,
        /// Schema payload length.
        required: usize,
    },

    /// No schema with this message name.
    #[error("unknown message '{name}'")]
    UnknownMessage {
        /// Message name.
        name: String,
    },

    /// The first frame byte is not the StartOfMessage marker.
    #[error("unexpected start of message {found:#04x}, expected {expected:#04x}")]
    UnexpectedStartOfMessage {
        /// Byte found.
        found: u8,
        /// Configured marker.
        expected: u8,
    },

    /// No schema with this type code.
    #[error("unknown message type {type_code:#04x}")]
    UnknownMessageType {
        /// Type code from the header.
        type_code: u8,
    },

    /// Unrecognized resync policy name.
    #[error("unknown resync policy '{value}'")]
    UnknownResyncPolicy {
        /// Offending name.
        value: String,
    },

    /// Schema error while building the codec.
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),
}

impl CodecError {
    /// Returns true when the byte stream is out of sync rather than one frame being bad.
    #[must_use]
    pub const fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            Self::UnexpectedStartOfMessage { .. } | Self::UnknownMessageType { .. }
        )
    }

    /// Creates a type mismatch error.
    pub fn type_mismatch(field: impl Into<String>, expected: FieldType, found: &'static str) -> Self {
        Self::TypeMismatch {
            field: field.into(),
            expected,
            found,
        }
    }

    /// Creates a value out of range error.
    pub fn out_of_range(field: impl Into<String>, value: impl ToString) -> Self {
        Self::ValueOutOfRange {
            field: field.into(),
            value: value.to_string(),
        }
    }
}

/// Result type alias for codec operations.
pub type Result<T> = std::result::Result<T, CodecError>;
