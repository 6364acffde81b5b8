//! Application message handlers.

use irongate_core::Message;
use irongate_registry::{ServiceHandler, ServiceIdentity, ServiceStatus};
use parking_lot::Mutex;
use std::time::Duration;
use tokio::sync::Notify;

/// Registered name of [`CollectingHandler`].
pub const COLLECTING_HANDLER: &str = "collecting";

/// Registered name of [`LoggingHandler`].
pub const LOGGING_HANDLER: &str = "logging";

/// Logs every application message at `info`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

impl ServiceHandler for LoggingHandler {
    fn name(&self) -> &str {
        LOGGING_HANDLER
    }

    fn on_message(&self, service: &ServiceIdentity, message: &Message) {
        tracing::info!(%service, message = message.name(), fields = message.len(), "message");
    }

    fn on_status(&self, service: &ServiceIdentity, status: ServiceStatus) {
        tracing::info!(%service, %status, "status");
    }
}

/// Keeps every message and status it sees, for assertions and inspection.
#[derive(Debug, Default)]
pub struct CollectingHandler {
    messages: Mutex<Vec<(ServiceIdentity, Message)>>,
    statuses: Mutex<Vec<(ServiceIdentity, ServiceStatus)>>,
    notify: Notify,
}

impl CollectingHandler {
    /// Creates an empty handler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages received so far, oldest first.
    #[must_use]
    pub fn messages(&self) -> Vec<Message> {
        self.messages
            .lock()
            .iter()
            .map(|(_, message)| message.clone())
            .collect()
    }

    /// Messages with the given name received by `service`.
    #[must_use]
    pub fn messages_for(&self, service: &ServiceIdentity, name: &str) -> Vec<Message> {
        self.messages
            .lock()
            .iter()
            .filter(|(identity, message)| identity == service && message.name() == name)
            .map(|(_, message)| message.clone())
            .collect()
    }

    /// Statuses reported so far.
    #[must_use]
    pub fn statuses(&self) -> Vec<(ServiceIdentity, ServiceStatus)> {
        self.statuses.lock().clone()
    }

    /// Forgets everything collected.
    pub fn clear(&self) {
        self.messages.lock().clear();
        self.statuses.lock().clear();
    }

    /// Waits until at least `count` messages were collected.
    ///
    /// Returns false if `timeout` elapsed first.
    pub async fn wait_for_messages(&self, count: usize, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, async {
            loop {
                let notified = self.notify.notified();
                if self.messages.lock().len() >= count {
                    return;
                }
                notified.await;
            }
        })
        .await
        .is_ok()
    }
}

impl ServiceHandler for CollectingHandler {
    fn name(&self) -> &str {
        COLLECTING_HANDLER
    }

    fn on_message(&self, service: &ServiceIdentity, message: &Message) {
        self.messages.lock().push((service.clone(), message.clone()));
        self.notify.notify_waiters();
    }

    fn on_status(&self, service: &ServiceIdentity, status: ServiceStatus) {
        self.statuses.lock().push((service.clone(), status));
    }
}
