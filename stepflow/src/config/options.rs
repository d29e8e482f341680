//! Definition options: process-level knobs for step definition and pipeline assembly.

use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

/// Environment variable selecting the [`DuplicateInputPolicy`].
pub const ENV_DUPLICATE_INPUT_POLICY: &str = "STEPFLOW_DUPLICATE_INPUT_POLICY";

/// Environment variable overriding the name of a single unnamed output.
pub const ENV_DEFAULT_OUTPUT_NAME: &str = "STEPFLOW_DEFAULT_OUTPUT_NAME";

/// What happens when an input is bound both to an artifact and to a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateInputPolicy {
    /// Log a warning and use the artifact.
    #[default]
    PreferArtifact,
    /// Fail finalization.
    Reject,
}

impl FromStr for DuplicateInputPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "prefer_artifact" => Ok(Self::PreferArtifact),
            "reject" => Ok(Self::Reject),
            other => Err(format!("unknown duplicate input policy '{other}'")),
        }
    }
}

/// Options that shape how steps are defined and pipelines are assembled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefinitionOptions {
    /// Precedence between artifact bindings and parameters with the same name.
    pub duplicate_input_policy: DuplicateInputPolicy,
    /// Name given to a single unnamed output.
    pub default_output_name: String,
    /// Disable caching for steps that take a context, unless set explicitly.
    pub disable_cache_with_context: bool,
}

impl Default for DefinitionOptions {
    fn default() -> Self {
        Self {
            duplicate_input_policy: DuplicateInputPolicy::default(),
            default_output_name: "output".to_string(),
            disable_cache_with_context: true,
        }
    }
}

impl DefinitionOptions {
    /// Creates the default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads options from the environment, falling back to defaults.
    ///
    /// Unparseable values are logged and ignored.
    #[must_use]
    pub fn from_env() -> Self {
        let mut options = Self::default();

        if let Ok(raw) = env::var(ENV_DUPLICATE_INPUT_POLICY) {
            match raw.parse() {
                Ok(policy) => options.duplicate_input_policy = policy,
                Err(err) => tracing::warn!(variable = ENV_DUPLICATE_INPUT_POLICY, "{err}"),
            }
        }
        if let Ok(name) = env::var(ENV_DEFAULT_OUTPUT_NAME) {
            if name.trim().is_empty() {
                tracing::warn!(variable = ENV_DEFAULT_OUTPUT_NAME, "ignoring empty output name");
            } else {
                options.default_output_name = name;
            }
        }

        options
    }

    /// Sets the duplicate input policy.
    #[must_use]
    pub const fn with_duplicate_input_policy(mut self, policy: DuplicateInputPolicy) -> Self {
        self.duplicate_input_policy = policy;
        self
    }

    /// Sets the default output name.
    #[must_use]
    pub fn with_default_output_name(mut self, name: impl Into<String>) -> Self {
        self.default_output_name = name.into();
        self
    }

    /// Sets whether context steps have caching disabled by default.
    #[must_use]
    pub const fn with_disable_cache_with_context(mut self, disable: bool) -> Self {
        self.disable_cache_with_context = disable;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = DefinitionOptions::default();
        assert_eq!(options.duplicate_input_policy, DuplicateInputPolicy::PreferArtifact);
        assert_eq!(options.default_output_name, "output");
        assert!(options.disable_cache_with_context);
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!("reject".parse(), Ok(DuplicateInputPolicy::Reject));
        assert_eq!(" Prefer_Artifact ".parse(), Ok(DuplicateInputPolicy::PreferArtifact));
        assert!("strict".parse::<DuplicateInputPolicy>().is_err());
    }

    #[test]
    fn test_deserialize_partial() {
        let options: DefinitionOptions =
            serde_json::from_str(r#"{"duplicate_input_policy": "reject"}"#).unwrap();
        assert_eq!(options.duplicate_input_policy, DuplicateInputPolicy::Reject);
        assert_eq!(options.default_output_name, "output");
    }

    #[test]
    fn test_builder() {
        let options = DefinitionOptions::new()
            .with_default_output_name("result")
            .with_disable_cache_with_context(false);
        assert_eq!(options.default_output_name, "result");
        assert!(!options.disable_cache_with_context);
    }
}
