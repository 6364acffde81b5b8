//! Adapter from session callbacks to service handlers and events.

use irongate_core::Message;
use irongate_registry::{EventLevel, ServiceContext, ServiceHandler};
use irongate_session::{SessionListener, SessionSnapshot, SessionState, SessionStatus};
use std::sync::Arc;

/// Forwards application messages to the service handler and publishes
/// session state changes as service events.
pub struct SessionBridge {
    context: ServiceContext,
    handler: Arc<dyn ServiceHandler>,
}

impl SessionBridge {
    /// Creates a bridge for the service described by `context`.
    #[must_use]
    pub fn new(context: ServiceContext, handler: Arc<dyn ServiceHandler>) -> Self {
        Self { context, handler }
    }
}

impl std::fmt::Debug for SessionBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionBridge")
            .field("service", &self.context.identity)
            .field("handler", &self.handler.name())
            .finish()
    }
}

impl SessionListener for SessionBridge {
    fn on_state_change(&self, session: &str, snapshot: SessionSnapshot) {
        let level = match snapshot.status {
            SessionStatus::Error => EventLevel::Error,
            _ if snapshot.state == SessionState::SessionClosed => EventLevel::Warn,
            _ => EventLevel::Info,
        };
        self.context.publish(
            level,
            None,
            format!("session {session} {} ({})", snapshot.state, snapshot.status),
        );
    }

    fn on_message(&self, _session: &str, message: &Message) {
        self.handler.on_message(&self.context.identity, message);
    }

    fn on_protocol_error(&self, session: &str, error: &irongate_codec::CodecError) {
        self.context.publish(
            EventLevel::Warn,
            None,
            format!("session {session} dropped a frame: {error}"),
        );
    }
}
