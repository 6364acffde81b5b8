//! NTG session protocol.

use super::dictionary::{
    HEARTBEAT, LOGON, LOGON_REPLY, LOGOUT, NAMESPACE, fields, ntg_dictionary,
};
use crate::config::SessionConfig;
use crate::protocol::{AdminMessage, LogonOutcome, SessionProtocol};
use irongate_core::Message;
use irongate_schema::{DictionaryProvider, InMemoryDictionary, SchemaError};
use std::sync::Arc;

/// Reject code for an unknown CompID or a wrong password.
pub const INVALID_CREDENTIALS: i32 = 1;

/// Reject code for a CompID that is not allowed to log on.
pub const NOT_AUTHORISED: i32 = 3;

/// Protocol version written into Logon.
pub const MESSAGE_VERSION: i32 = 1;

/// The NTG implementation of [`SessionProtocol`].
#[derive(Debug, Clone)]
pub struct NtgProtocol {
    dictionary: Arc<InMemoryDictionary>,
}

impl NtgProtocol {
    /// Creates the protocol with the built-in dictionary.
    ///
    /// # Errors
    /// Returns [`SchemaError`] if the dictionary is inconsistent.
    pub fn new() -> Result<Self, SchemaError> {
        Ok(Self {
            dictionary: Arc::new(ntg_dictionary()?),
        })
    }

    /// Returns the human-readable text for a reject code.
    #[must_use]
    pub fn reject_reason(code: i32) -> &'static str {
        match code {
            INVALID_CREDENTIALS => "Invalid CompID or password",
            NOT_AUTHORISED => "Not authorised to log on",
            _ => "Logon rejected",
        }
    }
}

impl SessionProtocol for NtgProtocol {
    fn name(&self) -> &str {
        NAMESPACE
    }

    fn dictionary(&self) -> Arc<dyn DictionaryProvider> {
        self.dictionary.clone()
    }

    fn logon(&self, config: &SessionConfig) -> Message {
        Message::new(LOGON, NAMESPACE)
            .with(fields::COMP_ID, config.username.as_str())
            .with(fields::PASSWORD, config.password.as_str())
            .with(fields::MESSAGE_VERSION, MESSAGE_VERSION)
    }

    fn authenticate(&self, logon: &Message, config: &SessionConfig) -> LogonOutcome {
        let comp_id = logon.get_str(fields::COMP_ID).unwrap_or_default();
        let password = logon.get_str(fields::PASSWORD).unwrap_or_default();
        if comp_id.is_empty() {
            return LogonOutcome::Rejected {
                code: NOT_AUTHORISED,
                reason: Self::reject_reason(NOT_AUTHORISED).to_string(),
            };
        }
        let user_ok = config.username.is_empty() || config.username == comp_id;
        let password_ok = config.password.is_empty() || config.password == password;
        if user_ok && password_ok {
            LogonOutcome::Accepted
        } else {
            LogonOutcome::Rejected {
                code: INVALID_CREDENTIALS,
                reason: Self::reject_reason(INVALID_CREDENTIALS).to_string(),
            }
        }
    }

    fn logon_reply(&self, outcome: &LogonOutcome) -> Message {
        let code = match outcome {
            LogonOutcome::Accepted => 0,
            LogonOutcome::Rejected { code, .. } => *code,
        };
        Message::new(LOGON_REPLY, NAMESPACE).with(fields::REJECT_CODE, code)
    }

    fn heartbeat(&self) -> Message {
        Message::new(HEARTBEAT, NAMESPACE)
    }

    fn logout(&self, reason: Option<&str>) -> Message {
        let message = Message::new(LOGOUT, NAMESPACE);
        match reason {
            Some(reason) => message.with(fields::REASON, reason),
            None => message,
        }
    }

    fn classify(&self, message: &Message) -> AdminMessage {
        match message.name() {
            LOGON => AdminMessage::Logon,
            LOGON_REPLY => match message.get_i32(fields::REJECT_CODE).unwrap_or_default() {
                0 => AdminMessage::LogonReply(LogonOutcome::Accepted),
                code => AdminMessage::LogonReply(LogonOutcome::Rejected {
                    code,
                    reason: Self::reject_reason(code).to_string(),
                }),
            },
            HEARTBEAT => AdminMessage::Heartbeat,
            LOGOUT => AdminMessage::Logout,
            _ => AdminMessage::Application,
        }
    }
}
