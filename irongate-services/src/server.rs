//! NTG server service.

use crate::bridge::SessionBridge;
use async_trait::async_trait;
use irongate_registry::{
    EventLevel, Service, ServiceContext, ServiceDescriptor, ServiceError, ServiceHandler,
    ServiceStatus,
};
use irongate_session::{NtgProtocol, Session, SessionConfig, SessionRole};
use irongate_transport::{TcpAcceptor, TcpServerConfig};
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Service type name of [`NtgServerService`].
pub const NTG_SERVER: &str = "NTG_SERVER";

/// Setting capping the number of concurrently open sessions.
pub const MAX_CONNECTIONS: &str = "max_connections";

/// Session cap used when [`MAX_CONNECTIONS`] is absent.
pub const DEFAULT_MAX_CONNECTIONS: usize = 1000;

#[derive(Clone)]
struct Prepared {
    context: ServiceContext,
    config: SessionConfig,
    max_connections: usize,
}

struct Listening {
    cancel: CancellationToken,
    task: JoinHandle<()>,
    local_addr: SocketAddr,
}

/// An NTG acceptor managed as a service.
///
/// Every accepted connection gets its own server-role [`Session`] that
/// authenticates the peer against the configured credentials.
pub struct NtgServerService {
    name: String,
    protocol: Arc<NtgProtocol>,
    handler: Arc<dyn ServiceHandler>,
    status: Mutex<ServiceStatus>,
    prepared: Mutex<Option<Prepared>>,
    listening: Mutex<Option<Listening>>,
    sessions: Arc<Mutex<Vec<Session>>>,
}

impl NtgServerService {
    /// Creates the service for `descriptor`.
    ///
    /// # Errors
    /// Returns an error if the NTG dictionary cannot be built.
    pub fn new(
        descriptor: &ServiceDescriptor,
        handler: Arc<dyn ServiceHandler>,
    ) -> Result<Self, ServiceError> {
        let protocol = NtgProtocol::new()
            .map_err(|err| ServiceError::with_source("NTG dictionary is inconsistent", err))?;
        Ok(Self {
            name: descriptor.name.clone(),
            protocol: Arc::new(protocol),
            handler,
            status: Mutex::new(ServiceStatus::Created),
            prepared: Mutex::new(None),
            listening: Mutex::new(None),
            sessions: Arc::new(Mutex::new(Vec::new())),
        })
    }

    /// Service name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Address the acceptor is bound to, once started.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listening.lock().as_ref().map(|listening| listening.local_addr)
    }

    /// Sessions accepted so far that have not been cleaned up.
    #[must_use]
    pub fn sessions(&self) -> Vec<Session> {
        self.sessions.lock().clone()
    }

    fn set_status(&self, status: ServiceStatus) {
        *self.status.lock() = status;
    }

    fn fail(&self, message: impl Into<String>) -> ServiceError {
        self.set_status(ServiceStatus::Error);
        ServiceError::new(message)
    }

    async fn shutdown(&self) {
        let listening = self.listening.lock().take();
        if let Some(listening) = listening {
            listening.cancel.cancel();
            if let Err(err) = listening.task.await {
                tracing::warn!(service = %self.name, error = %err, "accept loop ended abnormally");
            }
        }
        let sessions = std::mem::take(&mut *self.sessions.lock());
        for session in sessions {
            session.dispose().await;
        }
    }
}

impl std::fmt::Debug for NtgServerService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NtgServerService")
            .field("name", &self.name)
            .field("status", &self.status())
            .field("local_addr", &self.local_addr())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Service for NtgServerService {
    async fn init(&self, context: ServiceContext) -> Result<(), ServiceError> {
        self.set_status(ServiceStatus::Initializing);
        self.shutdown().await;

        let config = match SessionConfig::from_settings(&context.settings) {
            Ok(config) => config,
            Err(err) => {
                self.set_status(ServiceStatus::Error);
                return Err(ServiceError::with_source("invalid session settings", err));
            }
        };
        let max_connections = match context.settings.get(MAX_CONNECTIONS) {
            None => DEFAULT_MAX_CONNECTIONS,
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(max) if max > 0 => max,
                _ => return Err(self.fail(format!("invalid value for {MAX_CONNECTIONS}: {raw:?}"))),
            },
        };

        *self.prepared.lock() = Some(Prepared {
            context: context.clone(),
            config,
            max_connections,
        });
        self.set_status(ServiceStatus::Initialized);
        context.publish(EventLevel::Info, Some(ServiceStatus::Initialized), "server ready to bind");
        Ok(())
    }

    async fn start(&self) -> Result<(), ServiceError> {
        let prepared = self
            .prepared
            .lock()
            .clone()
            .ok_or_else(|| ServiceError::new("server service is not initialized"))?;
        self.set_status(ServiceStatus::Starting);

        let host = prepared.config.host.as_str();
        let bind_addr = match tokio::net::lookup_host((host, prepared.config.port)).await {
            Ok(mut addrs) => addrs
                .next()
                .ok_or_else(|| self.fail(format!("no address for {host}")))?,
            Err(err) => {
                self.set_status(ServiceStatus::Error);
                return Err(ServiceError::with_source(format!("cannot resolve {host}"), err));
            }
        };
        let acceptor = match TcpAcceptor::bind(
            TcpServerConfig::new(bind_addr).max_connections(prepared.max_connections),
        )
        .await
        {
            Ok(acceptor) => acceptor,
            Err(err) => {
                self.set_status(ServiceStatus::Error);
                return Err(ServiceError::with_source(format!("cannot bind {bind_addr}"), err));
            }
        };
        let local_addr = acceptor.local_addr().unwrap_or(bind_addr);
        tracing::info!(service = %self.name, %local_addr, "server listening");

        let cancel = CancellationToken::new();
        let task = tokio::spawn(accept_loop(
            acceptor,
            prepared.clone(),
            self.protocol.clone(),
            self.handler.clone(),
            self.sessions.clone(),
            cancel.clone(),
        ));
        *self.listening.lock() = Some(Listening {
            cancel,
            task,
            local_addr,
        });
        self.set_status(ServiceStatus::Started);
        prepared.context.publish(
            EventLevel::Info,
            Some(ServiceStatus::Started),
            format!("listening on {local_addr}"),
        );
        Ok(())
    }

    async fn dispose(&self) {
        self.set_status(ServiceStatus::Disposing);
        self.shutdown().await;
        self.set_status(ServiceStatus::Disposed);
    }

    fn status(&self) -> ServiceStatus {
        let status = *self.status.lock();
        if status == ServiceStatus::Started
            && let Some(listening) = self.listening.lock().as_ref()
            && listening.task.is_finished()
        {
            return ServiceStatus::Error;
        }
        status
    }

    fn handler(&self) -> Arc<dyn ServiceHandler> {
        self.handler.clone()
    }
}

async fn accept_loop(
    acceptor: TcpAcceptor,
    prepared: Prepared,
    protocol: Arc<NtgProtocol>,
    handler: Arc<dyn ServiceHandler>,
    sessions: Arc<Mutex<Vec<Session>>>,
    cancel: CancellationToken,
) {
    let service = prepared.context.identity.to_string();
    let mut next_id = 0u64;
    loop {
        let accepted = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            accepted = acceptor.accept() => accepted,
        };
        let (stream, peer) = match accepted {
            Ok(accepted) => accepted,
            Err(err) => {
                tracing::error!(%service, error = %err, "accept failed");
                continue;
            }
        };

        sessions.lock().retain(Session::is_connected);
        if sessions.lock().len() >= acceptor.config().max_connections {
            tracing::warn!(%service, %peer, "max connections reached, rejecting");
            continue;
        }

        next_id += 1;
        let built = Session::builder(format!("{service}#{next_id}"), protocol.clone())
            .role(SessionRole::Server)
            .config(prepared.config.clone())
            .listener(Arc::new(SessionBridge::new(prepared.context.clone(), handler.clone())))
            .build();
        let session = match built {
            Ok(session) => session,
            Err(err) => {
                tracing::error!(%service, error = %err, "cannot build session");
                continue;
            }
        };
        if let Err(err) = session.attach(stream).await {
            tracing::error!(%service, %peer, error = %err, "cannot attach session");
            continue;
        }
        tracing::info!(%service, session = session.name(), %peer, "session accepted");
        sessions.lock().push(session);
    }
    tracing::info!(%service, "server stopped accepting");
}
