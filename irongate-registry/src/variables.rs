//! Variable sets and `${key}` placeholder resolution.

use crate::error::{RegistryError, Result};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};

/// A named set of variables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableSet {
    /// Set name.
    pub name: String,
    /// Variable values.
    pub variables: BTreeMap<String, String>,
}

impl VariableSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variables: BTreeMap::new(),
        }
    }

    /// Adds one variable.
    #[must_use]
    pub fn variable(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(key.into(), value.into());
        self
    }
}

/// Lookup of variable sets by name.
pub trait VariableSetStore: Send + Sync {
    /// Returns the set named `name`.
    fn variable_set(&self, name: &str) -> Option<VariableSet>;
}

/// In-memory [`VariableSetStore`].
#[derive(Debug, Default)]
pub struct InMemoryVariableSetStore {
    sets: RwLock<HashMap<String, VariableSet>>,
}

impl InMemoryVariableSetStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a set.
    pub fn insert(&self, set: VariableSet) {
        self.sets.write().insert(set.name.clone(), set);
    }
}

impl VariableSetStore for InMemoryVariableSetStore {
    fn variable_set(&self, name: &str) -> Option<VariableSet> {
        self.sets.read().get(name).cloned()
    }
}

/// Replaces every `${key}` in `settings` with the value from `variables`.
///
/// Text without placeholders passes through unchanged. A `${` without a
/// closing brace is kept literally.
///
/// # Errors
/// Returns [`RegistryError::UnresolvedVariable`] for a placeholder with no
/// value.
pub fn resolve_settings(
    settings: &BTreeMap<String, String>,
    variables: Option<&VariableSet>,
) -> Result<BTreeMap<String, String>> {
    settings
        .iter()
        .map(|(setting, raw)| Ok((setting.clone(), resolve_value(setting, raw, variables)?)))
        .collect()
}

fn resolve_value(setting: &str, raw: &str, variables: Option<&VariableSet>) -> Result<String> {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(start) = rest.find("${") {
        let Some(len) = rest[start + 2..].find('}') else {
            break;
        };
        let key = &rest[start + 2..start + 2 + len];
        let value = variables
            .and_then(|set| set.variables.get(key))
            .ok_or_else(|| RegistryError::UnresolvedVariable {
                setting: setting.to_string(),
                key: key.to_string(),
            })?;
        out.push_str(&rest[..start]);
        out.push_str(value);
        rest = &rest[start + 3 + len..];
    }
    out.push_str(rest);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_resolve_placeholders() {
        let set = VariableSet::new("uat")
            .variable("gw_host", "10.0.0.5")
            .variable("gw_port", "9001");
        let resolved = resolve_settings(
            &settings(&[
                ("host", "${gw_host}"),
                ("port", "${gw_port}"),
                ("username", "TRADER1"),
                ("url", "tcp://${gw_host}:${gw_port}/x"),
            ]),
            Some(&set),
        )
        .unwrap();
        assert_eq!(resolved["host"], "10.0.0.5");
        assert_eq!(resolved["username"], "TRADER1");
        assert_eq!(resolved["url"], "tcp://10.0.0.5:9001/x");
    }

    #[test]
    fn test_unresolved_and_unterminated() {
        let err = resolve_settings(&settings(&[("host", "${missing}")]), None).unwrap_err();
        assert!(matches!(err, RegistryError::UnresolvedVariable { ref key, .. } if key == "missing"));

        let resolved = resolve_settings(&settings(&[("text", "cost ${ 5")]), None).unwrap();
        assert_eq!(resolved["text"], "cost ${ 5");
    }

    #[test]
    fn test_store_lookup() {
        let store = InMemoryVariableSetStore::new();
        store.insert(VariableSet::new("uat").variable("a", "1"));
        assert_eq!(store.variable_set("uat").unwrap().variables["a"], "1");
        assert!(store.variable_set("prod").is_none());
    }
}
