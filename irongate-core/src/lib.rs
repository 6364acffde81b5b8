//! # IronGate Core
//!
//! Core wire types shared by the IronGate codec, session and registry crates.
//!
//! This crate provides:
//! - Buffer traits for little-endian reads/writes of variable integer widths
//! - Latin-1 text helpers for fixed-width, space padded fields
//! - The fixed frame header (StartOfMessage, MessageLength, MessageType)
//! - Field types, scaled decimals and the tagged [`Value`] variant
//! - The structured [`Message`] value produced by decode and consumed by encode

pub mod buffer;
pub mod error;
pub mod header;
pub mod message;
pub mod types;

pub use buffer::{ReadBuffer, WriteBuffer, decode_latin1, encode_latin1};
pub use error::{Error, Result};
pub use header::{DEFAULT_START_OF_MESSAGE, FrameHeader};
pub use message::{Message, Value};
pub use types::{Decimal, FieldType, TimeUnit};
