//! Error types for transport operations.

use irongate_codec::CodecError;
use thiserror::Error;

/// Error type for transport operations.
#[derive(Debug, Error)]
pub enum TransportError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Connection timeout.
    #[error("connection to {addr} timed out")]
    ConnectTimeout {
        /// Target address.
        addr: String,
    },

    /// Connection closed.
    #[error("connection closed")]
    ConnectionClosed,

    /// Host name did not resolve to any address.
    #[error("could not resolve '{addr}'")]
    Unresolved {
        /// Target address.
        addr: String,
    },

    /// Codec error that ends the stream (protocol error under the disconnect policy,
    /// or an outbound message that could not be encoded).
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
}

impl TransportError {
    /// Returns true if the error came from the peer closing or resetting the stream.
    #[must_use]
    pub fn is_disconnect(&self) -> bool {
        match self {
            Self::ConnectionClosed => true,
            Self::Io(err) => matches!(
                err.kind(),
                std::io::ErrorKind::UnexpectedEof
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::ConnectionAborted
            ),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_disconnect() {
        assert!(TransportError::ConnectionClosed.is_disconnect());
        assert!(TransportError::from(std::io::Error::from(std::io::ErrorKind::BrokenPipe)).is_disconnect());
        assert!(
            !TransportError::ConnectTimeout {
                addr: "127.0.0.1:9000".to_string()
            }
            .is_disconnect()
        );
    }
}
