//! Native Trading Gateway (NTG) reference protocol.
//!
//! A compact subset of the NTG binary protocol: the session-level messages
//! plus order entry and execution reports.

pub mod dictionary;
pub mod protocol;

pub use dictionary::{NAMESPACE, ntg_dictionary};
pub use protocol::NtgProtocol;
