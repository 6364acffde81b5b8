//! Error types for session operations.

use crate::state::SessionState;
use irongate_codec::CodecError;
use irongate_schema::SchemaError;
use irongate_transport::TransportError;
use std::time::Duration;
use thiserror::Error;

/// Error type for session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Operation not allowed in the current state.
    #[error("cannot {operation} in state {state}")]
    InvalidState {
        /// Current state.
        state: SessionState,
        /// Attempted operation.
        operation: &'static str,
    },

    /// The peer rejected the logon.
    #[error("logon rejected: {reason}")]
    LogonRejected {
        /// Reason reported by the peer.
        reason: String,
    },

    /// No logon reply within the login timeout.
    #[error("no logon reply within {timeout:?}")]
    LoginTimeout {
        /// Configured timeout.
        timeout: Duration,
    },

    /// The session has no open transport.
    #[error("session is not connected")]
    NotConnected,

    /// A client session was built without a connector.
    #[error("client session '{name}' has no connector")]
    NoConnector {
        /// Session name.
        name: String,
    },

    /// A settings entry could not be parsed.
    #[error("invalid setting {key}='{value}'")]
    InvalidSetting {
        /// Settings key.
        key: String,
        /// Offending value.
        value: String,
    },

    /// Codec error.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// Transport error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Schema error while building the session codec.
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),
}

impl SessionError {
    /// Creates an invalid state error.
    pub fn invalid_state(state: SessionState, operation: &'static str) -> Self {
        Self::InvalidState { state, operation }
    }

    /// Creates an invalid setting error.
    pub fn invalid_setting(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidSetting {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Result type alias for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;
