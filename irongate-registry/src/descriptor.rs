//! Service identities and persisted descriptors.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Name of the environment that always exists.
pub const DEFAULT_ENVIRONMENT: &str = "default";

fn default_environment() -> String {
    DEFAULT_ENVIRONMENT.to_string()
}

/// Unique key of a service in the registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ServiceIdentity {
    /// Environment the service belongs to.
    pub environment: String,
    /// Service name, unique within the environment.
    pub name: String,
}

impl ServiceIdentity {
    /// Creates an identity.
    #[must_use]
    pub fn new(environment: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            environment: environment.into(),
            name: name.into(),
        }
    }

    /// Creates an identity in the default environment.
    #[must_use]
    pub fn in_default(name: impl Into<String>) -> Self {
        Self::new(DEFAULT_ENVIRONMENT, name)
    }
}

impl fmt::Display for ServiceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.environment, self.name)
    }
}

/// Persisted configuration of a service.
///
/// `settings` are protocol specific and may contain `${key}` placeholders
/// resolved from `variable_set` before the service is initialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDescriptor {
    /// Service name.
    pub name: String,
    /// Owning environment.
    #[serde(default = "default_environment")]
    pub environment: String,
    /// Registered service type, e.g. `NTG_CLIENT`.
    #[serde(rename = "type")]
    pub service_type: String,
    /// Protocol-specific settings.
    #[serde(default)]
    pub settings: BTreeMap<String, String>,
    /// Name of the handler receiving the service's messages.
    #[serde(default)]
    pub handler_class_name: String,
    /// Variable set used to resolve placeholders.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variable_set: Option<String>,
}

impl ServiceDescriptor {
    /// Creates a descriptor in the default environment with no settings.
    #[must_use]
    pub fn new(name: impl Into<String>, service_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            environment: default_environment(),
            service_type: service_type.into(),
            settings: BTreeMap::new(),
            handler_class_name: String::new(),
            variable_set: None,
        }
    }

    /// Sets the environment.
    #[must_use]
    pub fn environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    /// Adds one setting.
    #[must_use]
    pub fn setting(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.settings.insert(key.into(), value.into());
        self
    }

    /// Sets the handler name.
    #[must_use]
    pub fn handler(mut self, name: impl Into<String>) -> Self {
        self.handler_class_name = name.into();
        self
    }

    /// Sets the variable set.
    #[must_use]
    pub fn variable_set(mut self, name: impl Into<String>) -> Self {
        self.variable_set = Some(name.into());
        self
    }

    /// Returns the registry key of this descriptor.
    #[must_use]
    pub fn identity(&self) -> ServiceIdentity {
        ServiceIdentity::new(self.environment.clone(), self.name.clone())
    }

    /// Returns a copy moved to `identity`.
    #[must_use]
    pub fn with_identity(&self, identity: &ServiceIdentity) -> Self {
        Self {
            name: identity.name.clone(),
            environment: identity.environment.clone(),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_display_and_order() {
        let a = ServiceIdentity::new("prod", "b");
        let b = ServiceIdentity::in_default("a");
        assert_eq!(a.to_string(), "prod/b");
        assert!(b < a);
    }

    #[test]
    fn test_descriptor_json_shape() {
        let descriptor = ServiceDescriptor::new("gw1", "NTG_CLIENT")
            .environment("uat")
            .setting("host", "127.0.0.1")
            .handler("collecting");
        let json = serde_json::to_value(&descriptor).unwrap();
        assert_eq!(json["type"], "NTG_CLIENT");
        assert_eq!(json["handlerClassName"], "collecting");
        assert!(json.get("variableSet").is_none());

        let parsed: ServiceDescriptor =
            serde_json::from_str(r#"{"name":"gw2","type":"NTG_SERVER"}"#).unwrap();
        assert_eq!(parsed.environment, DEFAULT_ENVIRONMENT);
        assert!(parsed.settings.is_empty());
    }

    #[test]
    fn test_with_identity() {
        let descriptor = ServiceDescriptor::new("gw1", "NTG_CLIENT").setting("port", "9000");
        let copy = descriptor.with_identity(&ServiceIdentity::new("uat", "gw2"));
        assert_eq!(copy.identity(), ServiceIdentity::new("uat", "gw2"));
        assert_eq!(copy.settings, descriptor.settings);
    }
}
