//! # IronGate
//!
//! Dictionary-driven binary trading protocols for Rust.
//!
//! IronGate encodes and decodes length-framed binary messages described by a
//! data dictionary, runs logon/heartbeat/logout sessions over TCP, and manages
//! many such sessions as services grouped into environments.
//!
//! ## Features
//!
//! - **Dictionary-driven codec** - Message layouts come from data, not code
//! - **Session state machine** - Logon, heartbeats, logout and failure handling
//! - **Connection manager** - Pooled, ordered lifecycle operations over many services
//! - **NTG reference protocol** - Client and server services ready to register
//!
//! ## Quick Start
//!
//! ```ignore
//! use irongate::prelude::*;
//!
//! let manager = ConnectionManager::builder(default_factory()).build()?;
//! manager
//!     .add_service(
//!         ServiceDescriptor::new("gateway", NTG_CLIENT)
//!             .setting("host", "127.0.0.1")
//!             .setting("port", "9000")
//!             .handler(LOGGING_HANDLER),
//!     )
//!     .await?;
//! let identity = ServiceIdentity::in_default("gateway");
//! manager.init_service(identity.clone()).await?;
//! manager.start_service(identity).await?;
//! ```
//!
//! ## Crate Organization
//!
//! - [`core`] - Values, messages, buffers and the frame header
//! - [`schema`] - Field and message layouts, dictionaries
//! - [`codec`] - Message encoding and decoding
//! - [`transport`] - Stream framing and TCP
//! - [`session`] - Session state machine and the NTG protocol
//! - [`registry`] - The connection manager
//! - [`services`] - NTG client and server services

pub mod prelude;

/// Values, messages and buffer primitives.
pub mod core {
    pub use irongate_core::*;
}

/// Dictionaries and message layouts.
pub mod schema {
    pub use irongate_schema::*;
}

/// Message codec.
pub mod codec {
    pub use irongate_codec::*;
}

/// Stream framing and TCP transport.
pub mod transport {
    pub use irongate_transport::*;
}

/// Session state machine.
pub mod session {
    pub use irongate_session::*;
}

/// Connection manager and service lifecycle.
pub mod registry {
    pub use irongate_registry::*;
}

/// Built-in NTG services.
pub mod services {
    pub use irongate_services::*;
}

pub use irongate_codec::{Codec, CodecConfig, ResyncPolicy};
pub use irongate_core::{Decimal, Message, Value};
pub use irongate_registry::{ConnectionManager, ServiceDescriptor, ServiceIdentity};
pub use irongate_services::default_factory;
pub use irongate_session::{Session, SessionConfig};
