//! Service events and their fan-out.

use crate::descriptor::ServiceIdentity;
use crate::service::ServiceStatus;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

/// Severity of a [`ServiceEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventLevel {
    /// Normal lifecycle progress.
    Info,
    /// Anomaly that did not stop the service.
    Warn,
    /// Failure.
    Error,
}

/// Something that happened to a service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceEvent {
    /// When the event was raised.
    pub timestamp: DateTime<Utc>,
    /// Service the event belongs to.
    pub identity: ServiceIdentity,
    /// Severity.
    pub level: EventLevel,
    /// Status after the event, if it changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ServiceStatus>,
    /// Description.
    pub message: String,
}

impl ServiceEvent {
    /// Creates an event stamped with the current time.
    #[must_use]
    pub fn new(
        identity: ServiceIdentity,
        level: EventLevel,
        status: Option<ServiceStatus>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            identity,
            level,
            status,
            message: message.into(),
        }
    }
}

/// Consumer of service events.
pub trait EventListener: Send + Sync {
    /// Receives one event.
    ///
    /// # Errors
    /// A returned error is logged; other listeners still receive the event.
    fn on_event(&self, event: &ServiceEvent) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Fan-out of events to registered listeners.
///
/// A listener that fails or panics is logged and skipped; delivery to the
/// remaining listeners continues.
#[derive(Clone, Default)]
pub struct EventSink {
    listeners: Arc<RwLock<Vec<Arc<dyn EventListener>>>>,
}

impl EventSink {
    /// Creates a sink with no listeners.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener.
    pub fn subscribe(&self, listener: Arc<dyn EventListener>) {
        self.listeners.write().push(listener);
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    /// Delivers `event` to every listener.
    pub fn publish(&self, event: &ServiceEvent) {
        let listeners = self.listeners.read().clone();
        for (index, listener) in listeners.iter().enumerate() {
            match catch_unwind(AssertUnwindSafe(|| listener.on_event(event))) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    tracing::warn!(listener = index, identity = %event.identity, error = %err, "event listener failed");
                }
                Err(_) => {
                    tracing::error!(listener = index, identity = %event.identity, "event listener panicked");
                }
            }
        }
    }
}

impl std::fmt::Debug for EventSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSink")
            .field("listeners", &self.listener_count())
            .finish()
    }
}
