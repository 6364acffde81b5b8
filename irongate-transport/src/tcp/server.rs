//! TCP acceptor.

use crate::error::TransportError;
use crate::stream::BoxedStream;
use std::net::SocketAddr;
use tokio::net::TcpListener;

/// Configuration for TCP server.
#[derive(Debug, Clone)]
pub struct TcpServerConfig {
    /// Address to bind to.
    pub bind_addr: SocketAddr,
    /// Maximum number of concurrent sessions.
    pub max_connections: usize,
    /// Enable TCP_NODELAY.
    pub tcp_nodelay: bool,
}

impl Default for TcpServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 9000)),
            max_connections: 1000,
            tcp_nodelay: true,
        }
    }
}

impl TcpServerConfig {
    /// Creates a new server config with the specified bind address.
    #[must_use]
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            ..Default::default()
        }
    }

    /// Sets the maximum number of concurrent sessions.
    #[must_use]
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }
}

/// Accepts inbound TCP streams for server sessions.
#[derive(Debug)]
pub struct TcpAcceptor {
    listener: TcpListener,
    config: TcpServerConfig,
}

impl TcpAcceptor {
    /// Binds to the configured address.
    ///
    /// # Errors
    /// Returns `TransportError` if binding fails.
    pub async fn bind(config: TcpServerConfig) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(config.bind_addr).await?;
        tracing::info!(addr = %listener.local_addr()?, "tcp acceptor listening");
        Ok(Self { listener, config })
    }

    /// Accepts the next connection.
    ///
    /// # Errors
    /// Returns `TransportError` if accept fails.
    pub async fn accept(&self) -> Result<(BoxedStream, SocketAddr), TransportError> {
        let (stream, addr) = self.listener.accept().await?;
        stream.set_nodelay(self.config.tcp_nodelay)?;
        tracing::debug!(peer = %addr, "accepted tcp connection");
        Ok((Box::new(stream), addr))
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &TcpServerConfig {
        &self.config
    }

    /// Returns the local address the acceptor is bound to.
    ///
    /// # Errors
    /// Returns `TransportError` if the socket has no local address.
    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        Ok(self.listener.local_addr()?)
    }
}
