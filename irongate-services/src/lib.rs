//! # IronGate Services
//!
//! NTG services ready to be registered with a
//! [`ConnectionManager`](irongate_registry::ConnectionManager).
//!
//! This crate provides:
//! - [`NtgClientService`] - a session connecting out to an NTG gateway
//! - [`NtgServerService`] - an NTG acceptor running one session per connection
//! - Handlers for collecting or logging application messages
//! - [`default_factory`] registering all of the above by name

pub mod bridge;
pub mod client;
pub mod factory;
pub mod handler;
pub mod server;

pub use bridge::SessionBridge;
pub use client::{NTG_CLIENT, NtgClientService};
pub use factory::default_factory;
pub use handler::{COLLECTING_HANDLER, CollectingHandler, LOGGING_HANDLER, LoggingHandler};
pub use server::{DEFAULT_MAX_CONNECTIONS, MAX_CONNECTIONS, NTG_SERVER, NtgServerService};
