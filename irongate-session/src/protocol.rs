//! Protocol seam of the session state machine.
//!
//! The state machine is protocol-agnostic: which messages mean Logon,
//! Heartbeat or Logout, and how credentials are checked, comes from a
//! [`SessionProtocol`].

use crate::config::SessionConfig;
use irongate_core::Message;
use irongate_schema::DictionaryProvider;
use std::sync::Arc;

/// Outcome of a logon attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogonOutcome {
    /// Logon accepted.
    Accepted,
    /// Logon rejected.
    Rejected {
        /// Protocol reject code.
        code: i32,
        /// Human-readable reason.
        reason: String,
    },
}

impl LogonOutcome {
    /// Returns true for [`LogonOutcome::Accepted`].
    #[must_use]
    pub const fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }
}

/// Session-level meaning of an inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminMessage {
    /// Logon request.
    Logon,
    /// Answer to a logon request.
    LogonReply(LogonOutcome),
    /// Heartbeat.
    Heartbeat,
    /// Logout.
    Logout,
    /// Anything else.
    Application,
}

/// Protocol-specific message construction and classification.
pub trait SessionProtocol: Send + Sync {
    /// Short protocol name used in logs.
    fn name(&self) -> &str;

    /// Dictionary the session codec is built from.
    fn dictionary(&self) -> Arc<dyn DictionaryProvider>;

    /// Builds the Logon request.
    fn logon(&self, config: &SessionConfig) -> Message;

    /// Checks an inbound Logon against the server configuration.
    fn authenticate(&self, logon: &Message, config: &SessionConfig) -> LogonOutcome;

    /// Builds the answer to a Logon.
    fn logon_reply(&self, outcome: &LogonOutcome) -> Message;

    /// Builds a Heartbeat.
    fn heartbeat(&self) -> Message;

    /// Builds a Logout.
    fn logout(&self, reason: Option<&str>) -> Message;

    /// Classifies an inbound message.
    fn classify(&self, message: &Message) -> AdminMessage;
}
