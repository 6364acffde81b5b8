//! Session observation hooks.

use crate::state::SessionSnapshot;
use irongate_codec::CodecError;
use irongate_core::Message;

/// Receives session events.
///
/// Callbacks run on the session's reader or heartbeat task and must not block.
pub trait SessionListener: Send + Sync {
    /// Called after every state or status change.
    fn on_state_change(&self, _session: &str, _snapshot: SessionSnapshot) {}

    /// Called for every inbound message, session-level ones included.
    fn on_message(&self, _session: &str, _message: &Message) {}

    /// Called when an inbound frame could not be decoded and was dropped.
    fn on_protocol_error(&self, _session: &str, _error: &CodecError) {}
}
