//! NTG client service.

use crate::bridge::SessionBridge;
use async_trait::async_trait;
use irongate_registry::{
    EventLevel, Service, ServiceContext, ServiceDescriptor, ServiceError, ServiceHandler,
    ServiceStatus,
};
use irongate_session::{NtgProtocol, Session, SessionConfig};
use irongate_transport::TcpConnector;
use parking_lot::Mutex;
use std::sync::Arc;

/// Service type name of [`NtgClientService`].
pub const NTG_CLIENT: &str = "NTG_CLIENT";

/// A client session to an NTG gateway, managed as a service.
///
/// `init` parses the session settings and builds the session, `start`
/// connects and logs on, `dispose` logs out and closes. A started service
/// whose session has since dropped reports [`ServiceStatus::Error`].
pub struct NtgClientService {
    name: String,
    protocol: Arc<NtgProtocol>,
    handler: Arc<dyn ServiceHandler>,
    status: Mutex<ServiceStatus>,
    session: Mutex<Option<Session>>,
}

impl NtgClientService {
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
            session: Mutex::new(None),
        })
    }

    /// Service name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The session built by the last `init`.
    #[must_use]
    pub fn session(&self) -> Option<Session> {
        self.session.lock().clone()
    }

    fn set_status(&self, status: ServiceStatus) {
        *self.status.lock() = status;
    }

    fn fail(&self, message: &str, err: irongate_session::SessionError) -> ServiceError {
        self.set_status(ServiceStatus::Error);
        ServiceError::with_source(message, err)
    }
}

impl std::fmt::Debug for NtgClientService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NtgClientService")
            .field("name", &self.name)
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Service for NtgClientService {
    async fn init(&self, context: ServiceContext) -> Result<(), ServiceError> {
        self.set_status(ServiceStatus::Initializing);
        let previous = self.session.lock().take();
        if let Some(previous) = previous {
            previous.dispose().await;
        }

        let config = SessionConfig::from_settings(&context.settings)
            .map_err(|err| self.fail("invalid session settings", err))?;
        let connector = Arc::new(TcpConnector::new(config.tcp_client_config()));
        tracing::debug!(service = %context.identity, host = %config.host, port = config.port, "client configured");

        let session = Session::builder(context.identity.to_string(), self.protocol.clone())
            .config(config)
            .connector(connector)
            .listener(Arc::new(SessionBridge::new(context.clone(), self.handler.clone())))
            .build()
            .map_err(|err| self.fail("session could not be built", err))?;

        *self.session.lock() = Some(session);
        self.set_status(ServiceStatus::Initialized);
        context.publish(EventLevel::Info, Some(ServiceStatus::Initialized), "client session ready");
        Ok(())
    }

    async fn start(&self) -> Result<(), ServiceError> {
        let session = self
            .session()
            .ok_or_else(|| ServiceError::new("client service is not initialized"))?;
        self.set_status(ServiceStatus::Starting);
        session
            .connect()
            .await
            .map_err(|err| self.fail("client session failed to start", err))?;
        self.set_status(ServiceStatus::Started);
        Ok(())
    }

    async fn dispose(&self) {
        self.set_status(ServiceStatus::Disposing);
        if let Some(session) = self.session() {
            session.dispose().await;
        }
        self.set_status(ServiceStatus::Disposed);
    }

    fn status(&self) -> ServiceStatus {
        let status = *self.status.lock();
        if status == ServiceStatus::Started
            && let Some(session) = self.session.lock().as_ref()
            && !session.is_connected()
        {
            return ServiceStatus::Error;
        }
        status
    }

    fn handler(&self) -> Arc<dyn ServiceHandler> {
        self.handler.clone()
    }
}
