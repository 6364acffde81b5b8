//! TCP transport module.
//!
//! Provides the TCP connector used by client sessions and the acceptor used
//! by server services.

pub mod client;
pub mod server;

pub use client::{TcpClientConfig, TcpConnector};
pub use server::{TcpAcceptor, TcpServerConfig};
