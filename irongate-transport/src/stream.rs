//! Stream abstraction shared by TCP and in-memory transports.

use crate::error::TransportError;
use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

/// A bidirectional byte stream a session can own.
pub trait AsyncStream: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

impl<T> AsyncStream for T where T: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

/// Type-erased stream handed to sessions.
pub type BoxedStream = Box<dyn AsyncStream>;

/// Opens the stream for a client session.
///
/// Kept as a seam so sessions can be driven over `tokio::io::duplex` in tests.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Opens a new stream to the peer.
    ///
    /// # Errors
    /// Returns [`TransportError`] if the peer cannot be reached.
    async fn connect(&self) -> Result<BoxedStream, TransportError>;

    /// Human-readable peer description used in logs.
    fn peer(&self) -> String;
}
