//! Error types for registry operations.

use crate::descriptor::ServiceIdentity;
use crate::service::{ServiceError, ServiceStatus};
use thiserror::Error;

/// Error type for registry (lifecycle) operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A service with this identity is already registered.
    #[error("service {identity} already exists")]
    ServiceAlreadyExists {
        /// Offending identity.
        identity: ServiceIdentity,
    },

    /// No service with this identity.
    #[error("service {identity} not found")]
    ServiceNotFound {
        /// Missing identity.
        identity: ServiceIdentity,
    },

    /// The service is in the wrong state for the operation.
    #[error("cannot {operation} service {identity} in status {status}")]
    InvalidState {
        /// Service identity.
        identity: ServiceIdentity,
        /// Current status.
        status: ServiceStatus,
        /// Attempted operation.
        operation: &'static str,
    },

    /// The service was moved to another environment after `init` and must
    /// be initialized again under its new identity.
    #[error("service {identity} was renamed and must be initialized again before {operation}")]
    InitRequired {
        /// Service identity after the move.
        identity: ServiceIdentity,
        /// Attempted operation.
        operation: &'static str,
    },

    /// The environment already exists.
    #[error("environment '{name}' already exists")]
    EnvironmentAlreadyExists {
        /// Environment name.
        name: String,
    },

    /// The environment does not exist.
    #[error("environment '{name}' not found")]
    EnvironmentNotFound {
        /// Environment name.
        name: String,
    },

    /// The environment still has started services.
    #[error("environment '{name}' has started services: {services:?}")]
    EnvironmentInUse {
        /// Environment name.
        name: String,
        /// Names of the started services.
        services: Vec<String>,
    },

    /// The default environment cannot be removed or renamed.
    #[error("cannot {operation} the default environment")]
    DefaultEnvironment {
        /// Attempted operation.
        operation: &'static str,
    },

    /// No constructor registered for the service type.
    #[error("unknown service type '{service_type}'")]
    UnknownServiceType {
        /// Requested type.
        service_type: String,
    },

    /// No constructor registered for the handler.
    #[error("unknown handler '{name}'")]
    UnknownHandler {
        /// Requested handler name.
        name: String,
    },

    /// The descriptor refers to a variable set that does not exist.
    #[error("variable set '{name}' not found")]
    VariableSetNotFound {
        /// Variable set name.
        name: String,
    },

    /// A `${key}` placeholder has no value.
    #[error("unresolved variable '{key}' in setting '{setting}'")]
    UnresolvedVariable {
        /// Setting being resolved.
        setting: String,
        /// Missing variable.
        key: String,
    },

    /// Persistent store failure.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The service itself failed.
    #[error("service {identity} failed: {source}")]
    Service {
        /// Service identity.
        identity: ServiceIdentity,
        /// Underlying failure.
        #[source]
        source: ServiceError,
    },

    /// A blocking wait was cancelled.
    #[error("operation cancelled")]
    Cancelled,

    /// The manager is shutting down and accepts no more work.
    #[error("connection manager is shutting down")]
    ShuttingDown,

    /// A pooled task panicked or was aborted.
    #[error("task failed: {message}")]
    TaskFailed {
        /// Join error description.
        message: String,
    },
}

impl RegistryError {
    /// Creates an invalid state error.
    pub fn invalid_state(
        identity: &ServiceIdentity,
        status: ServiceStatus,
        operation: &'static str,
    ) -> Self {
        Self::InvalidState {
            identity: identity.clone(),
            status,
            operation,
        }
    }

    /// Creates a not found error.
    pub fn not_found(identity: &ServiceIdentity) -> Self {
        Self::ServiceNotFound {
            identity: identity.clone(),
        }
    }

    /// Wraps a service failure.
    pub fn service(identity: &ServiceIdentity, source: ServiceError) -> Self {
        Self::Service {
            identity: identity.clone(),
            source,
        }
    }
}

/// Error type for [`ServiceStore`](crate::store::ServiceStore) implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// (De)serialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A descriptor with this identity is already stored.
    #[error("descriptor {identity} already stored")]
    AlreadyExists {
        /// Offending identity.
        identity: ServiceIdentity,
    },

    /// No stored descriptor with this identity.
    #[error("descriptor {identity} not stored")]
    NotFound {
        /// Missing identity.
        identity: ServiceIdentity,
    },

    /// Backend-specific failure.
    #[error("{message}")]
    Backend {
        /// Description.
        message: String,
    },
}

/// Result type for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let identity = ServiceIdentity::new("uat", "ntg-client");
        let err = RegistryError::ServiceAlreadyExists {
            identity: identity.clone(),
        };
        assert_eq!(err.to_string(), "service uat/ntg-client already exists");

        let err = RegistryError::invalid_state(&identity, ServiceStatus::Started, "update");
        assert_eq!(
            err.to_string(),
            "cannot update service uat/ntg-client in status Started"
        );

        let err = RegistryError::InitRequired {
            identity,
            operation: "start",
        };
        assert_eq!(
            err.to_string(),
            "service uat/ntg-client was renamed and must be initialized again before start"
        );
    }

    #[test]
    fn test_store_error_conversion() {
        let io = std::io::Error::other("disk full");
        let err: RegistryError = StoreError::from(io).into();
        assert!(matches!(err, RegistryError::Store(StoreError::Io(_))));
    }
}
