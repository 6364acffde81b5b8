//! Live state of one registered service.

use crate::descriptor::{ServiceDescriptor, ServiceIdentity};
use crate::service::{Service, ServiceHandler, ServiceStatus};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Descriptor plus live service. Exactly one per identity; owned by the
/// registry.
pub struct ServiceRuntime {
    identity: ServiceIdentity,
    descriptor: ServiceDescriptor,
    service: Arc<dyn Service>,
    operation: Arc<Mutex<()>>,
    removed: AtomicBool,
    stale_context: AtomicBool,
}

impl ServiceRuntime {
    pub(crate) fn new(descriptor: ServiceDescriptor, service: Arc<dyn Service>) -> Self {
        Self {
            identity: descriptor.identity(),
            descriptor,
            service,
            operation: Arc::new(Mutex::new(())),
            removed: AtomicBool::new(false),
            stale_context: AtomicBool::new(false),
        }
    }

    /// Same service under another descriptor (used by environment rename).
    ///
    /// A service initialized before the move still holds a context naming
    /// the old identity, so the moved runtime requires a fresh `init`.
    pub(crate) fn moved(&self, descriptor: ServiceDescriptor) -> Self {
        let next = Self::new(descriptor, self.service.clone());
        let initialized = self.requires_init() || self.status() != ServiceStatus::Created;
        next.stale_context.store(initialized, Ordering::Release);
        next
    }

    /// Registry key.
    #[must_use]
    pub fn identity(&self) -> &ServiceIdentity {
        &self.identity
    }

    /// Descriptor the service was created from.
    #[must_use]
    pub fn descriptor(&self) -> &ServiceDescriptor {
        &self.descriptor
    }

    /// The live service.
    #[must_use]
    pub fn service(&self) -> &Arc<dyn Service> {
        &self.service
    }

    /// The service's handler.
    #[must_use]
    pub fn handler(&self) -> Arc<dyn ServiceHandler> {
        self.service.handler()
    }

    /// Current status as reported by the service.
    #[must_use]
    pub fn status(&self) -> ServiceStatus {
        self.service.status()
    }

    /// Serializes init/start/dispose for this identity.
    pub(crate) async fn lock_operation(&self) -> OwnedMutexGuard<()> {
        self.operation.clone().lock_owned().await
    }

    pub(crate) fn try_lock_operation(&self) -> Option<OwnedMutexGuard<()>> {
        self.operation.clone().try_lock_owned().ok()
    }

    /// Returns true once the runtime left the registry.
    #[must_use]
    pub fn is_removed(&self) -> bool {
        self.removed.load(Ordering::Acquire)
    }

    pub(crate) fn mark_removed(&self) {
        self.removed.store(true, Ordering::Release);
    }

    /// Returns true if the service context predates an environment rename.
    #[must_use]
    pub fn requires_init(&self) -> bool {
        self.stale_context.load(Ordering::Acquire)
    }

    pub(crate) fn mark_initialized(&self) {
        self.stale_context.store(false, Ordering::Release);
    }
}

impl std::fmt::Debug for ServiceRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceRuntime")
            .field("identity", &self.identity)
            .field("status", &self.status())
            .field("removed", &self.is_removed())
            .field("requires_init", &self.requires_init())
            .finish()
    }
}
