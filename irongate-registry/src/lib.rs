//! # IronGate Registry
//!
//! The connection manager: a concurrent registry owning the lifecycle of many
//! long-lived services.
//!
//! This crate provides:
//! - [`ConnectionManager`] with pooled, totally ordered lifecycle operations
//! - The [`Service`] capability trait and a name-keyed [`ServiceFactory`]
//! - An advisory exclusive-use lock over service names
//! - Descriptor stores (in-memory and JSON files), variable sets and an
//!   event sink

pub mod descriptor;
pub mod error;
pub mod events;
pub mod listener;
pub mod manager;
pub mod pool;
pub mod runtime;
pub mod service;
pub mod store;
pub mod usage;
pub mod variables;

pub use descriptor::{DEFAULT_ENVIRONMENT, ServiceDescriptor, ServiceIdentity};
pub use error::{RegistryError, Result, StoreError};
pub use events::{EventLevel, EventListener, EventSink, ServiceEvent};
pub use listener::ServiceListener;
pub use manager::{ConnectionManager, ConnectionManagerBuilder, ManagerConfig};
pub use pool::{TaskHandle, WorkerPool};
pub use runtime::ServiceRuntime;
pub use service::{
    NoopHandler, Service, ServiceContext, ServiceError, ServiceFactory, ServiceHandler,
    ServiceStatus,
};
pub use store::{FileServiceStore, InMemoryServiceStore, ServiceStore};
pub use usage::UsageLock;
pub use variables::{InMemoryVariableSetStore, VariableSet, VariableSetStore, resolve_settings};
