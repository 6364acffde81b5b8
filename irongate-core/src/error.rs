//! Error types for IronGate core operations.

use thiserror::Error;

/// Core error type for IronGate operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// Buffer is too short for the requested operation.
    #[error("buffer too short: required {required} bytes, available {available} bytes")]
    BufferTooShort {
        /// Required buffer size in bytes.
        required: usize,
        /// Available buffer size in bytes.
        available: usize,
    },

    /// Unknown field type name.
    #[error("unknown field type '{name}'")]
    UnknownFieldType {
        /// Offending type name.
        name: String,
    },

    /// Text that cannot be parsed as a decimal.
    #[error("invalid decimal '{value}'")]
    InvalidDecimal {
        /// Offending text.
        value: String,
    },

    /// Unknown time unit name.
    #[error("unknown time unit '{name}'")]
    UnknownTimeUnit {
        /// Offending unit name.
        name: String,
    },
}

impl Error {
    /// Creates an invalid decimal error.
    pub fn invalid_decimal(value: impl Into<String>) -> Self {
        Self::InvalidDecimal {
            value: value.into(),
        }
    }
}

/// Result type alias for IronGate core operations.
pub type Result<T> = std::result::Result<T, Error>;
