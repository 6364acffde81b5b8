//! Service capability trait and the types passed through it.

use crate::descriptor::{ServiceDescriptor, ServiceIdentity};
use crate::error::RegistryError;
use crate::events::{EventLevel, EventSink, ServiceEvent};
use async_trait::async_trait;
use irongate_core::Message;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Lifecycle status of a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ServiceStatus {
    /// Constructed, never initialized.
    #[default]
    Created,
    /// `init` in progress.
    Initializing,
    /// Ready to start.
    Initialized,
    /// `start` in progress.
    Starting,
    /// Running.
    Started,
    /// `dispose` in progress.
    Disposing,
    /// Stopped on request.
    Disposed,
    /// Stopped by a failure.
    Error,
}

impl ServiceStatus {
    /// Returns true for `Started`.
    #[must_use]
    pub const fn is_started(&self) -> bool {
        matches!(self, Self::Started)
    }

    /// Returns true for `Starting` and `Started`.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        matches!(self, Self::Starting | Self::Started)
    }

    /// Returns true if `init` may be called.
    #[must_use]
    pub const fn can_init(&self) -> bool {
        matches!(self, Self::Created | Self::Disposed | Self::Error)
    }
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Failure reported by a [`Service`] implementation.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ServiceError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ServiceError {
    /// Creates an error with a message only.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an error wrapping an underlying cause.
    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Returns the message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Everything a service receives at `init`.
#[derive(Clone)]
pub struct ServiceContext {
    /// Registry key of the service.
    pub identity: ServiceIdentity,
    /// Settings with placeholders already resolved.
    pub settings: BTreeMap<String, String>,
    /// Sink for service-originated events.
    pub events: EventSink,
}

impl ServiceContext {
    /// Creates a context.
    #[must_use]
    pub fn new(identity: ServiceIdentity, settings: BTreeMap<String, String>, events: EventSink) -> Self {
        Self {
            identity,
            settings,
            events,
        }
    }

    /// Publishes an event attributed to this service.
    pub fn publish(&self, level: EventLevel, status: Option<ServiceStatus>, message: impl Into<String>) {
        self.events
            .publish(&ServiceEvent::new(self.identity.clone(), level, status, message));
    }
}

impl fmt::Debug for ServiceContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceContext")
            .field("identity", &self.identity)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

/// Receives the application messages of a service.
pub trait ServiceHandler: Send + Sync {
    /// Handler name as used in descriptors.
    fn name(&self) -> &str;

    /// Called for every inbound message.
    fn on_message(&self, _service: &ServiceIdentity, _message: &Message) {}

    /// Called when the owning service changes status.
    fn on_status(&self, _service: &ServiceIdentity, _status: ServiceStatus) {}
}

/// Handler used when a descriptor names none.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHandler;

impl ServiceHandler for NoopHandler {
    fn name(&self) -> &str {
        ""
    }
}

/// A managed, protocol-specific service.
///
/// The registry serializes calls for one identity, so implementations only
/// need interior mutability, not their own operation ordering.
#[async_trait]
pub trait Service: Send + Sync {
    /// Prepares the service from its resolved settings.
    async fn init(&self, context: ServiceContext) -> Result<(), ServiceError>;

    /// Starts the service.
    async fn start(&self) -> Result<(), ServiceError>;

    /// Stops the service and releases its resources. Must not fail.
    async fn dispose(&self);

    /// Current status.
    fn status(&self) -> ServiceStatus;

    /// Handler receiving this service's messages.
    fn handler(&self) -> Arc<dyn ServiceHandler>;
}

type ServiceConstructor = dyn Fn(&ServiceDescriptor, Arc<dyn ServiceHandler>) -> Result<Arc<dyn Service>, ServiceError>
    + Send
    + Sync;
type HandlerConstructor = dyn Fn() -> Arc<dyn ServiceHandler> + Send + Sync;

/// Creates services and handlers by name.
#[derive(Clone, Default)]
pub struct ServiceFactory {
    services: BTreeMap<String, Arc<ServiceConstructor>>,
    handlers: BTreeMap<String, Arc<HandlerConstructor>>,
}

impl ServiceFactory {
    /// Creates an empty factory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a service type.
    #[must_use]
    pub fn with_service_type<F>(mut self, service_type: impl Into<String>, constructor: F) -> Self
    where
        F: Fn(&ServiceDescriptor, Arc<dyn ServiceHandler>) -> Result<Arc<dyn Service>, ServiceError>
            + Send
            + Sync
            + 'static,
    {
        self.services
            .insert(service_type.into(), Arc::new(constructor));
        self
    }

    /// Registers a handler.
    #[must_use]
    pub fn with_handler<F>(mut self, name: impl Into<String>, constructor: F) -> Self
    where
        F: Fn() -> Arc<dyn ServiceHandler> + Send + Sync + 'static,
    {
        self.handlers.insert(name.into(), Arc::new(constructor));
        self
    }

    /// Registered service types, sorted.
    #[must_use]
    pub fn service_types(&self) -> Vec<String> {
        self.services.keys().cloned().collect()
    }

    /// Registered handler names, sorted.
    #[must_use]
    pub fn handler_names(&self) -> Vec<String> {
        self.handlers.keys().cloned().collect()
    }

    /// Builds the handler and the service for `descriptor`.
    ///
    /// An empty handler name selects [`NoopHandler`].
    ///
    /// # Errors
    /// Returns `UnknownServiceType`, `UnknownHandler`, or `Service` if the
    /// constructor fails.
    pub fn create(&self, descriptor: &ServiceDescriptor) -> crate::error::Result<Arc<dyn Service>> {
        let constructor = self.services.get(&descriptor.service_type).ok_or_else(|| {
            RegistryError::UnknownServiceType {
                service_type: descriptor.service_type.clone(),
            }
        })?;
        let handler: Arc<dyn ServiceHandler> = if descriptor.handler_class_name.is_empty() {
            Arc::new(NoopHandler)
        } else {
            let make = self
                .handlers
                .get(&descriptor.handler_class_name)
                .ok_or_else(|| RegistryError::UnknownHandler {
                    name: descriptor.handler_class_name.clone(),
                })?;
            make()
        };
        constructor(descriptor, handler)
            .map_err(|err| RegistryError::service(&descriptor.identity(), err))
    }
}

impl fmt::Debug for ServiceFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceFactory")
            .field("services", &self.service_types())
            .field("handlers", &self.handler_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct Dummy {
        handler: Arc<dyn ServiceHandler>,
        status: Mutex<ServiceStatus>,
    }

    #[async_trait]
    impl Service for Dummy {
        async fn init(&self, _context: ServiceContext) -> Result<(), ServiceError> {
            *self.status.lock() = ServiceStatus::Initialized;
            Ok(())
        }

        async fn start(&self) -> Result<(), ServiceError> {
            Ok(())
        }

        async fn dispose(&self) {}

        fn status(&self) -> ServiceStatus {
            *self.status.lock()
        }

        fn handler(&self) -> Arc<dyn ServiceHandler> {
            self.handler.clone()
        }
    }

    struct Named;

    impl ServiceHandler for Named {
        fn name(&self) -> &str {
            "named"
        }
    }

    fn factory() -> ServiceFactory {
        ServiceFactory::new()
            .with_service_type("DUMMY", |_, handler| {
                Ok(Arc::new(Dummy {
                    handler,
                    status: Mutex::new(ServiceStatus::Created),
                }) as Arc<dyn Service>)
            })
            .with_service_type("BROKEN", |_, _| Err(ServiceError::new("missing host")))
            .with_handler("named", || Arc::new(Named))
    }

    #[test]
    fn test_status_predicates() {
        assert!(ServiceStatus::Created.can_init());
        assert!(ServiceStatus::Error.can_init());
        assert!(!ServiceStatus::Started.can_init());
        assert!(ServiceStatus::Started.is_started());
        assert_eq!(ServiceStatus::default(), ServiceStatus::Created);
    }

    #[test]
    fn test_factory_create() {
        let factory = factory();
        let service = factory
            .create(&ServiceDescriptor::new("a", "DUMMY").handler("named"))
            .unwrap();
        assert_eq!(service.handler().name(), "named");
        assert_eq!(service.status(), ServiceStatus::Created);

        let service = factory.create(&ServiceDescriptor::new("a", "DUMMY")).unwrap();
        assert_eq!(service.handler().name(), "");
    }

    #[test]
    fn test_factory_errors() {
        let factory = factory();
        assert!(matches!(
            factory.create(&ServiceDescriptor::new("a", "FIX")),
            Err(RegistryError::UnknownServiceType { .. })
        ));
        assert!(matches!(
            factory.create(&ServiceDescriptor::new("a", "DUMMY").handler("nope")),
            Err(RegistryError::UnknownHandler { .. })
        ));
        assert!(matches!(
            factory.create(&ServiceDescriptor::new("a", "BROKEN")),
            Err(RegistryError::Service { .. })
        ));
        assert_eq!(factory.service_types(), vec!["BROKEN", "DUMMY"]);
    }
}
