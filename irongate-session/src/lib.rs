//! # IronGate Session
//!
//! Session layer on top of the codec and transport crates.
//!
//! This crate provides:
//! - The session state machine: logon, heartbeats, logout and closure
//! - A protocol seam ([`SessionProtocol`]) for the administrative messages
//! - The NTG reference protocol and its dictionary
//! - Session configuration parsed from service settings

pub mod config;
pub mod error;
pub mod heartbeat;
pub mod listener;
pub mod ntg;
pub mod protocol;
pub mod session;
pub mod state;

pub use config::{HeartbeatStrategy, SessionConfig};
pub use error::{Result, SessionError};
pub use heartbeat::{HeartbeatAction, HeartbeatMonitor};
pub use listener::SessionListener;
pub use ntg::NtgProtocol;
pub use protocol::{AdminMessage, LogonOutcome, SessionProtocol};
pub use session::{Session, SessionBuilder};
pub use state::{SessionRole, SessionSnapshot, SessionState, SessionStatus};
