//! Pipeline configuration. Pipeline values act as defaults for every step.

use super::merge::{merge_or_replace, recursive_update};
use super::PartialStepConfiguration;
use crate::source::Source;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Configuration of a pipeline.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfiguration {
    /// Pipeline name.
    pub name: String,
    /// Default cache flag for every step.
    pub enable_cache: Option<bool>,
    /// Default artifact metadata flag for every step.
    pub enable_artifact_metadata: Option<bool>,
    /// Settings shared by every step.
    pub settings: Map<String, Value>,
    /// Extra configuration shared by every step.
    pub extra: Map<String, Value>,
    /// Failure hook used by steps without their own.
    pub failure_hook_source: Option<Source>,
    /// Success hook used by steps without their own.
    pub success_hook_source: Option<Source>,
}

/// A set of changes to a pipeline configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfigurationUpdate {
    /// New cache flag.
    pub enable_cache: Option<bool>,
    /// New artifact metadata flag.
    pub enable_artifact_metadata: Option<bool>,
    /// Settings to merge or replace.
    pub settings: Option<Map<String, Value>>,
    /// Extra configuration to merge or replace.
    pub extra: Option<Map<String, Value>>,
    /// New failure hook.
    pub failure_hook_source: Option<Source>,
    /// New success hook.
    pub success_hook_source: Option<Source>,
}

impl PipelineConfiguration {
    /// Creates an empty configuration for the named pipeline.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Returns a copy with the update applied, with the same merge rules as steps.
    #[must_use]
    pub fn apply(&self, update: &PipelineConfigurationUpdate, merge: bool) -> Self {
        let mut next = self.clone();
        if update.enable_cache.is_some() {
            next.enable_cache = update.enable_cache;
        }
        if update.enable_artifact_metadata.is_some() {
            next.enable_artifact_metadata = update.enable_artifact_metadata;
        }
        if update.failure_hook_source.is_some() {
            next.failure_hook_source.clone_from(&update.failure_hook_source);
        }
        if update.success_hook_source.is_some() {
            next.success_hook_source.clone_from(&update.success_hook_source);
        }
        next.settings = merge_or_replace(&self.settings, update.settings.as_ref(), merge);
        next.extra = merge_or_replace(&self.extra, update.extra.as_ref(), merge);
        next
    }

    /// Layers a step configuration on top of the pipeline defaults.
    ///
    /// Step values win. Settings and extra are merged recursively with the
    /// step values on top.
    #[must_use]
    pub fn apply_defaults(&self, step: &PartialStepConfiguration) -> PartialStepConfiguration {
        let mut merged = step.clone();
        merged.enable_cache = step.enable_cache.or(self.enable_cache);
        merged.enable_artifact_metadata = step
            .enable_artifact_metadata
            .or(self.enable_artifact_metadata);
        merged.settings = recursive_update(&self.settings, &step.settings);
        merged.extra = recursive_update(&self.extra, &step.extra);
        if merged.failure_hook_source.is_none() {
            merged.failure_hook_source.clone_from(&self.failure_hook_source);
        }
        if merged.success_hook_source.is_none() {
            merged.success_hook_source.clone_from(&self.success_hook_source);
        }
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_step_values_win() {
        let pipeline = PipelineConfiguration {
            enable_cache: Some(true),
            settings: json!({"docker": {"image": "base", "env": {"A": "1"}}})
                .as_object()
                .cloned()
                .unwrap(),
            ..PipelineConfiguration::new("training")
        };
        let mut step = PartialStepConfiguration::new("trainer");
        step.enable_cache = Some(false);
        step.settings = json!({"docker": {"image": "gpu"}}).as_object().cloned().unwrap();

        let merged = pipeline.apply_defaults(&step);
        assert_eq!(merged.enable_cache, Some(false));
        assert_eq!(
            Value::Object(merged.settings),
            json!({"docker": {"image": "gpu", "env": {"A": "1"}}})
        );
    }

    #[test]
    fn test_hooks_fall_back_to_pipeline() {
        let hook = Source::from_import_path("hooks::notify").unwrap();
        let pipeline = PipelineConfiguration {
            failure_hook_source: Some(hook.clone()),
            enable_artifact_metadata: Some(false),
            ..PipelineConfiguration::new("training")
        };

        let merged = pipeline.apply_defaults(&PartialStepConfiguration::new("trainer"));
        assert_eq!(merged.failure_hook_source, Some(hook));
        assert_eq!(merged.success_hook_source, None);
        assert_eq!(merged.enable_artifact_metadata, Some(false));
    }

    #[test]
    fn test_pipeline_update_replace() {
        let update = |value: Value| PipelineConfigurationUpdate {
            extra: value.as_object().cloned(),
            ..PipelineConfigurationUpdate::default()
        };
        let config = PipelineConfiguration::new("p")
            .apply(&update(json!({"a": 1})), true)
            .apply(&update(json!({"b": 2})), false);

        assert_eq!(Value::Object(config.extra), json!({"b": 2}));
    }
}
