//! Namespaced registry keys and the machine catalog.
//!
//! Registry keys are stable string identifiers used for authoring and
//! data-driven logic (e.g., `gw:smelter`). They are ordered and validated to
//! support deterministic iteration and stable persistence.
//!
//! Machine kinds live in an explicit [`MachineCatalog`] value populated once
//! at startup by the process entry point; there is no implicit discovery.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Default namespace used when a key omits an explicit namespace.
pub const DEFAULT_NAMESPACE: &str = "gw";

/// Error returned when parsing an invalid [`RegistryKey`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryKeyError {
    message: String,
}

impl RegistryKeyError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for RegistryKeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for RegistryKeyError {}

/// A namespaced key of the form `namespace:path`.
///
/// Ordering is lexical by `(namespace, path)` and is stable across runs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RegistryKey {
    namespace: String,
    path: String,
}

impl RegistryKey {
    /// Parse a registry key.
    ///
    /// Accepts either:
    /// - `namespace:path`
    /// - `path` (uses [`DEFAULT_NAMESPACE`])
    pub fn parse(input: &str) -> Result<Self, RegistryKeyError> {
        Self::parse_with_default_namespace(input, DEFAULT_NAMESPACE)
    }

    /// Parse a registry key using a caller-provided default namespace.
    pub fn parse_with_default_namespace(
        input: &str,
        default_namespace: &str,
    ) -> Result<Self, RegistryKeyError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(RegistryKeyError::new("RegistryKey cannot be empty"));
        }

        let (namespace, path) = match input.split_once(':') {
            Some((ns, p)) => (ns, p),
            None => (default_namespace, input),
        };

        let namespace = namespace.trim();
        let path = path.trim();

        validate_namespace(namespace)?;
        validate_path(path)?;

        Ok(Self {
            namespace: namespace.to_string(),
            path: path.to_string(),
        })
    }

    /// Registry key namespace.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Registry key path.
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl fmt::Display for RegistryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.path)
    }
}

impl FromStr for RegistryKey {
    type Err = RegistryKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn validate_namespace(ns: &str) -> Result<(), RegistryKeyError> {
    if ns.is_empty() {
        return Err(RegistryKeyError::new("RegistryKey namespace cannot be empty"));
    }
    if ns.len() > 64 {
        return Err(RegistryKeyError::new(
            "RegistryKey namespace too long (max 64)",
        ));
    }
    if !ns
        .chars()
        .all(|c| matches!(c, 'a'..='z' | '0'..='9' | '_' | '-' | '.'))
    {
        return Err(RegistryKeyError::new(
            "RegistryKey namespace has invalid characters (allowed: a-z0-9_.-)",
        ));
    }
    Ok(())
}

fn validate_path(path: &str) -> Result<(), RegistryKeyError> {
    if path.is_empty() {
        return Err(RegistryKeyError::new("RegistryKey path cannot be empty"));
    }
    if path.len() > 128 {
        return Err(RegistryKeyError::new("RegistryKey path too long (max 128)"));
    }
    if !path.chars().all(|c| {
        matches!(c, 'a'..='z' | '0'..='9' | '_' | '-' | '.' | '/' )
    }) {
        return Err(RegistryKeyError::new(
            "RegistryKey path has invalid characters (allowed: a-z0-9_./-)",
        ));
    }
    Ok(())
}

/// Static description of a machine kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineSpec {
    /// Stable key identifying the kind.
    pub key: RegistryKey,
    /// Human-readable name used when a reference has no custom name.
    pub display_name: String,
    /// Number of input slots on a machine of this kind.
    pub input_slots: usize,
    /// Number of output slots on a machine of this kind.
    pub output_slots: usize,
}

/// Explicit registry of machine kinds, keyed by [`RegistryKey`].
///
/// Populated once at startup; iteration order is deterministic.
#[derive(Debug, Clone, Default)]
pub struct MachineCatalog {
    specs: BTreeMap<RegistryKey, MachineSpec>,
}

impl MachineCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a catalog populated with the built-in machine kinds.
    pub fn with_defaults() -> Self {
        let mut catalog = Self::new();
        catalog.register(MachineSpec {
            key: RegistryKey::parse("gw:smelter").expect("builtin key"),
            display_name: "Smelter".to_string(),
            input_slots: 2,
            output_slots: 2,
        });
        catalog.register(MachineSpec {
            key: RegistryKey::parse("gw:crusher").expect("builtin key"),
            display_name: "Crusher".to_string(),
            input_slots: 1,
            output_slots: 1,
        });
        catalog
    }

    /// Register a machine kind, replacing any previous spec under the key.
    pub fn register(&mut self, spec: MachineSpec) {
        self.specs.insert(spec.key.clone(), spec);
    }

    /// Look up the spec for a machine kind.
    pub fn get(&self, key: &RegistryKey) -> Option<&MachineSpec> {
        self.specs.get(key)
    }

    /// Whether a machine kind is registered.
    pub fn contains(&self, key: &RegistryKey) -> bool {
        self.specs.contains_key(key)
    }

    /// Iterate over all registered specs in key order.
    pub fn iter(&self) -> impl Iterator<Item = &MachineSpec> {
        self.specs.values()
    }

    /// Number of registered machine kinds.
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// Whether the catalog has no entries.
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_namespaced_key() {
        let key = RegistryKey::parse("gw:smelter").unwrap();
        assert_eq!(key.namespace(), "gw");
        assert_eq!(key.path(), "smelter");
        assert_eq!(key.to_string(), "gw:smelter");
    }

    #[test]
    fn parses_with_default_namespace() {
        let key = RegistryKey::parse("smelter").unwrap();
        assert_eq!(key.to_string(), "gw:smelter");
    }

    #[test]
    fn rejects_empty() {
        assert!(RegistryKey::parse("").is_err());
        assert!(RegistryKey::parse("   ").is_err());
    }

    #[test]
    fn rejects_invalid_chars() {
        assert!(RegistryKey::parse("gw:Smelter").is_err());
        assert!(RegistryKey::parse("GW:smelter").is_err());
        assert!(RegistryKey::parse("gw:smelter?").is_err());
        assert!(RegistryKey::parse("gw:").is_err());
        assert!(RegistryKey::parse(":smelter").is_err());
    }

    #[test]
    fn default_catalog_has_builtin_kinds() {
        let catalog = MachineCatalog::with_defaults();
        assert!(!catalog.is_empty());
        assert!(catalog.contains(&RegistryKey::parse("gw:smelter").unwrap()));
        assert!(catalog.contains(&RegistryKey::parse("gw:crusher").unwrap()));
        assert!(!catalog.contains(&RegistryKey::parse("gw:unknown").unwrap()));
    }

    #[test]
    fn register_replaces_existing_spec() {
        let mut catalog = MachineCatalog::with_defaults();
        let key = RegistryKey::parse("gw:crusher").unwrap();
        let before = catalog.len();
        catalog.register(MachineSpec {
            key: key.clone(),
            display_name: "Heavy Crusher".to_string(),
            input_slots: 2,
            output_slots: 2,
        });
        assert_eq!(catalog.len(), before);
        assert_eq!(catalog.get(&key).unwrap().display_name, "Heavy Crusher");
    }
}
