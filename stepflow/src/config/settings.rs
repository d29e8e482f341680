//! Settings namespaces.
//!
//! Settings are namespaced extension configuration. A key is either a general
//! key such as `docker` or a stack component key `<component_type>.<flavor>`.

use crate::errors::StepInterfaceError;
use parking_lot::RwLock;
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

/// General settings keys known out of the box.
pub const GENERAL_SETTINGS_KEYS: &[&str] = &["docker", "resources"];

/// Stack component types that accept flavor settings.
pub const STACK_COMPONENT_TYPES: &[&str] = &[
    "orchestrator",
    "step_operator",
    "experiment_tracker",
    "artifact_store",
    "container_registry",
    "model_deployer",
    "alerter",
];

#[allow(clippy::expect_used)]
static COMPONENT_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([a-z][a-z0-9_]*)\.([a-z][a-z0-9_\-]*)$").expect("component key pattern is valid")
});

/// Registry of recognized settings namespaces.
#[derive(Debug)]
pub struct SettingsRegistry {
    general_keys: RwLock<Vec<String>>,
    component_types: RwLock<Vec<String>>,
}

impl Default for SettingsRegistry {
    fn default() -> Self {
        let registry = Self::empty();
        for key in GENERAL_SETTINGS_KEYS {
            registry.register_general_key(*key);
        }
        for component_type in STACK_COMPONENT_TYPES {
            registry.register_component_type(*component_type);
        }
        registry
    }
}

impl SettingsRegistry {
    /// Creates a registry with the built-in namespaces.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry without any namespace.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            general_keys: RwLock::new(Vec::new()),
            component_types: RwLock::new(Vec::new()),
        }
    }

    /// Registers a general settings key.
    pub fn register_general_key(&self, key: impl Into<String>) {
        let key = key.into();
        let mut keys = self.general_keys.write();
        if !keys.contains(&key) {
            keys.push(key);
        }
    }

    /// Registers a stack component type.
    pub fn register_component_type(&self, component_type: impl Into<String>) {
        let component_type = component_type.into();
        let mut types = self.component_types.write();
        if !types.contains(&component_type) {
            types.push(component_type);
        }
    }

    /// Returns true if the key belongs to a recognized namespace.
    #[must_use]
    pub fn is_valid_key(&self, key: &str) -> bool {
        self.check_key(key).is_ok()
    }

    fn check_key(&self, key: &str) -> Result<(), String> {
        if self.general_keys.read().iter().any(|k| k == key) {
            return Ok(());
        }
        let Some(captures) = COMPONENT_KEY.captures(key) else {
            return Err(
                "not a general settings key and not of the form `<component_type>.<flavor>`"
                    .to_string(),
            );
        };
        let component_type = &captures[1];
        if self.component_types.read().iter().any(|t| t == component_type) {
            Ok(())
        } else {
            Err(format!("unknown stack component type '{component_type}'"))
        }
    }

    /// Validates a settings map owned by `owner` (a step or pipeline name).
    ///
    /// # Errors
    ///
    /// Returns an error for the first key outside every namespace or whose
    /// value is not a JSON object.
    pub fn validate(&self, owner: &str, settings: &Map<String, Value>) -> Result<(), StepInterfaceError> {
        for (key, value) in settings {
            let invalid = |reason: String| StepInterfaceError::InvalidSettingsKey {
                step: owner.to_string(),
                key: key.clone(),
                reason,
            };
            self.check_key(key).map_err(invalid)?;
            if !value.is_object() {
                return Err(invalid("settings must be a JSON object".to_string()));
            }
        }
        Ok(())
    }
}
