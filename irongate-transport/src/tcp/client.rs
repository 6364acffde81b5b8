//! TCP client connector.

use crate::error::TransportError;
use crate::stream::{BoxedStream, Connector};
use async_trait::async_trait;
use socket2::SockRef;
use std::time::Duration;
use tokio::net::TcpStream;

/// Configuration for TCP client.
#[derive(Debug, Clone)]
pub struct TcpClientConfig {
    /// Host name or address to connect to.
    pub host: String,
    /// Port to connect to.
    pub port: u16,
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// Enable TCP_NODELAY.
    pub tcp_nodelay: bool,
    /// Receive buffer size.
    pub recv_buffer_size: Option<usize>,
    /// Send buffer size.
    pub send_buffer_size: Option<usize>,
}

impl Default for TcpClientConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9000,
            connect_timeout: Duration::from_secs(5),
            tcp_nodelay: true,
            recv_buffer_size: None,
            send_buffer_size: None,
        }
    }
}

impl TcpClientConfig {
    /// Creates a new client config for the given peer.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Sets the connection timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets TCP_NODELAY option.
    #[must_use]
    pub fn tcp_nodelay(mut self, enabled: bool) -> Self {
        self.tcp_nodelay = enabled;
        self
    }

    /// Sets the socket receive and send buffer sizes.
    #[must_use]
    pub fn buffer_sizes(mut self, recv: usize, send: usize) -> Self {
        self.recv_buffer_size = Some(recv);
        self.send_buffer_size = Some(send);
        self
    }

    /// Returns `host:port`.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Opens TCP streams to a fixed peer.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    config: TcpClientConfig,
}

impl TcpConnector {
    /// Creates a connector.
    #[must_use]
    pub fn new(config: TcpClientConfig) -> Self {
        Self { config }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &TcpClientConfig {
        &self.config
    }

    /// Connects and applies socket options.
    ///
    /// # Errors
    /// Returns `TransportError` if resolution or connection fails.
    pub async fn connect_tcp(&self) -> Result<TcpStream, TransportError> {
        let addr = self.config.address();
        let stream = tokio::time::timeout(self.config.connect_timeout, TcpStream::connect(&addr))
            .await
            .map_err(|_| TransportError::ConnectTimeout { addr: addr.clone() })?
            .map_err(|err| match err.kind() {
                std::io::ErrorKind::NotFound => TransportError::Unresolved { addr: addr.clone() },
                _ => TransportError::Io(err),
            })?;

        stream.set_nodelay(self.config.tcp_nodelay)?;
        let socket = SockRef::from(&stream);
        if let Some(size) = self.config.recv_buffer_size {
            socket.set_recv_buffer_size(size)?;
        }
        if let Some(size) = self.config.send_buffer_size {
            socket.set_send_buffer_size(size)?;
        }

        tracing::debug!(peer = %addr, "tcp connection established");
        Ok(stream)
    }
}

#[async_trait]
impl Connector for TcpConnector {
    async fn connect(&self) -> Result<BoxedStream, TransportError> {
        Ok(Box::new(self.connect_tcp().await?))
    }

    fn peer(&self) -> String {
        self.config.address()
    }
}
