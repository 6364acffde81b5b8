//! # IronGate Transport
//!
//! Byte-stream plumbing underneath a session.
//!
//! This crate provides:
//! - [`FrameCodec`] - a `tokio_util` codec turning a byte stream into decoded messages
//! - [`Connector`] - how a client session obtains its stream
//! - [`tcp`] - TCP connector and acceptor

pub mod error;
pub mod framing;
pub mod stream;
pub mod tcp;

pub use error::TransportError;
pub use framing::FrameCodec;
pub use stream::{AsyncStream, BoxedStream, Connector};
pub use tcp::{TcpAcceptor, TcpClientConfig, TcpConnector, TcpServerConfig};
