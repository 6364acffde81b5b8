//! # IronGate Schema
//!
//! Immutable descriptions of binary message layouts.
//!
//! This crate provides:
//! - [`FieldDescriptor`] and [`MessageSchema`] definitions
//! - Schema validation (widths, offsets, type codes)
//! - The [`DictionaryProvider`] collaborator interface and an in-memory dictionary

pub mod dictionary;
pub mod error;
pub mod field;
pub mod messages;
pub mod validation;

pub use dictionary::{DictionaryProvider, InMemoryDictionary};
pub use error::SchemaError;
pub use field::{FieldDescriptor, Presence, TYPE_ATTRIBUTE, UNIT_ATTRIBUTE};
pub use messages::{MessageSchema, MessageSchemaBuilder};
pub use validation::{MAX_PAYLOAD_LENGTH, validate_fields, validate_type_codes};
