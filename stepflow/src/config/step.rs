//! Step configuration records.
//!
//! A step starts with a [`PartialStepConfiguration`] that every `configure`
//! call replaces with an updated copy. Finalization turns it into the
//! complete [`StepConfiguration`] handed to the orchestrator.

use super::merge::merge_or_replace;
use crate::errors::StepInterfaceError;
use crate::source::Source;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Per-output configuration while a step is being configured.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PartialArtifactConfiguration {
    /// Source of the materializer, once known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub materializer_source: Option<Source>,
}

impl PartialArtifactConfiguration {
    /// Creates an output configuration with a materializer.
    #[must_use]
    pub const fn with_materializer(source: Source) -> Self {
        Self {
            materializer_source: Some(source),
        }
    }
}

/// Per-output configuration of a finalized step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactConfiguration {
    /// Source of the materializer.
    pub materializer_source: Source,
}

/// The upstream output an input is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InputSpec {
    /// The producing step.
    pub step_name: String,
    /// The output of the producing step.
    pub output_name: String,
}

/// A set of changes to a step configuration. Absent fields are left alone.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StepConfigurationUpdate {
    /// Step name.
    pub name: Option<String>,
    /// Whether the orchestrator may skip the step on a cache hit.
    pub enable_cache: Option<bool>,
    /// Whether artifact metadata is extracted.
    pub enable_artifact_metadata: Option<bool>,
    /// Name of the experiment tracker to use.
    pub experiment_tracker: Option<String>,
    /// Name of the step operator to run on.
    pub step_operator: Option<String>,
    /// Literal parameter values.
    pub parameters: Option<Map<String, Value>>,
    /// Namespaced settings.
    pub settings: Option<Map<String, Value>>,
    /// Free-form extra configuration.
    pub extra: Option<Map<String, Value>>,
    /// Hook called when the step fails.
    pub failure_hook_source: Option<Source>,
    /// Hook called when the step succeeds.
    pub success_hook_source: Option<Source>,
    /// Per-output configuration.
    pub outputs: Option<IndexMap<String, PartialArtifactConfiguration>>,
}

impl StepConfigurationUpdate {
    /// An update that only sets parameters.
    #[must_use]
    pub fn parameters(parameters: Map<String, Value>) -> Self {
        Self {
            parameters: Some(parameters),
            ..Self::default()
        }
    }
}

/// Step configuration with every field optional.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PartialStepConfiguration {
    /// Step name.
    pub name: String,
    /// Whether the orchestrator may skip the step on a cache hit.
    pub enable_cache: Option<bool>,
    /// Whether artifact metadata is extracted.
    pub enable_artifact_metadata: Option<bool>,
    /// Name of the experiment tracker to use.
    pub experiment_tracker: Option<String>,
    /// Name of the step operator to run on.
    pub step_operator: Option<String>,
    /// Literal parameter values.
    pub parameters: Map<String, Value>,
    /// Namespaced settings.
    pub settings: Map<String, Value>,
    /// Free-form extra configuration.
    pub extra: Map<String, Value>,
    /// Hook called when the step fails.
    pub failure_hook_source: Option<Source>,
    /// Hook called when the step succeeds.
    pub success_hook_source: Option<Source>,
    /// Per-output configuration.
    pub outputs: IndexMap<String, PartialArtifactConfiguration>,
    /// Artifact bindings of inputs.
    pub inputs: IndexMap<String, InputSpec>,
    /// Caching fingerprint.
    pub caching_parameters: BTreeMap<String, String>,
}

impl PartialStepConfiguration {
    /// Creates an empty configuration for the named step.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Returns a copy with the update applied.
    ///
    /// Scalars are replaced when present. Dict fields and outputs are merged
    /// recursively when `merge` is set and replaced wholesale otherwise.
    #[must_use]
    pub fn apply(&self, update: &StepConfigurationUpdate, merge: bool) -> Self {
        let mut next = self.clone();

        if let Some(ref name) = update.name {
            next.name.clone_from(name);
        }
        if update.enable_cache.is_some() {
            next.enable_cache = update.enable_cache;
        }
        if update.enable_artifact_metadata.is_some() {
            next.enable_artifact_metadata = update.enable_artifact_metadata;
        }
        if update.experiment_tracker.is_some() {
            next.experiment_tracker.clone_from(&update.experiment_tracker);
        }
        if update.step_operator.is_some() {
            next.step_operator.clone_from(&update.step_operator);
        }
        if update.failure_hook_source.is_some() {
            next.failure_hook_source.clone_from(&update.failure_hook_source);
        }
        if update.success_hook_source.is_some() {
            next.success_hook_source.clone_from(&update.success_hook_source);
        }

        next.parameters = merge_or_replace(&self.parameters, update.parameters.as_ref(), merge);
        next.settings = merge_or_replace(&self.settings, update.settings.as_ref(), merge);
        next.extra = merge_or_replace(&self.extra, update.extra.as_ref(), merge);

        if let Some(ref outputs) = update.outputs {
            if merge {
                for (name, output) in outputs {
                    let entry = next.outputs.entry(name.clone()).or_default();
                    if output.materializer_source.is_some() {
                        entry.materializer_source.clone_from(&output.materializer_source);
                    }
                }
            } else {
                next.outputs.clone_from(outputs);
            }
        }

        next
    }

    /// Returns the materializer sources configured so far, by output name.
    pub fn materializer_sources(&self) -> impl Iterator<Item = (&str, &Source)> {
        self.outputs.iter().filter_map(|(name, output)| {
            output
                .materializer_source
                .as_ref()
                .map(|source| (name.as_str(), source))
        })
    }
}

/// The complete, validated configuration of a finalized step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepConfiguration {
    /// Step name.
    pub name: String,
    /// Whether the orchestrator may skip the step on a cache hit.
    pub enable_cache: Option<bool>,
    /// Whether artifact metadata is extracted.
    pub enable_artifact_metadata: Option<bool>,
    /// Name of the experiment tracker to use.
    pub experiment_tracker: Option<String>,
    /// Name of the step operator to run on.
    pub step_operator: Option<String>,
    /// Literal parameter values.
    pub parameters: Map<String, Value>,
    /// Namespaced settings.
    pub settings: Map<String, Value>,
    /// Free-form extra configuration.
    pub extra: Map<String, Value>,
    /// Hook called when the step fails.
    pub failure_hook_source: Option<Source>,
    /// Hook called when the step succeeds.
    pub success_hook_source: Option<Source>,
    /// Per-output configuration.
    pub outputs: IndexMap<String, ArtifactConfiguration>,
    /// Artifact bindings of inputs.
    pub inputs: IndexMap<String, InputSpec>,
    /// Caching fingerprint.
    pub caching_parameters: BTreeMap<String, String>,
}

impl StepConfiguration {
    /// Returns true unless caching was disabled.
    #[must_use]
    pub fn cache_enabled(&self) -> bool {
        self.enable_cache.unwrap_or(true)
    }

    /// Returns a digest over the caching fingerprint and the resolved parameters.
    #[must_use]
    pub fn cache_key(&self) -> String {
        crate::caching::cache_key(&self.caching_parameters, &self.parameters)
    }
}

impl TryFrom<PartialStepConfiguration> for StepConfiguration {
    type Error = StepInterfaceError;

    fn try_from(partial: PartialStepConfiguration) -> Result<Self, Self::Error> {
        let missing: Vec<String> = partial
            .outputs
            .iter()
            .filter(|(_, output)| output.materializer_source.is_none())
            .map(|(name, _)| name.clone())
            .collect();
        if !missing.is_empty() {
            return Err(StepInterfaceError::IncompleteConfiguration {
                step: partial.name,
                outputs: missing,
            });
        }

        let outputs = partial
            .outputs
            .into_iter()
            .filter_map(|(name, output)| {
                output
                    .materializer_source
                    .map(|materializer_source| (name, ArtifactConfiguration { materializer_source }))
            })
            .collect();

        Ok(Self {
            name: partial.name,
            enable_cache: partial.enable_cache,
            enable_artifact_metadata: partial.enable_artifact_metadata,
            experiment_tracker: partial.experiment_tracker,
            step_operator: partial.step_operator,
            parameters: partial.parameters,
            settings: partial.settings,
            extra: partial.extra,
            failure_hook_source: partial.failure_hook_source,
            success_hook_source: partial.success_hook_source,
            outputs,
            inputs: partial.inputs,
            caching_parameters: partial.caching_parameters,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn extra_update(value: Value) -> StepConfigurationUpdate {
        StepConfigurationUpdate {
            extra: Some(map(value)),
            ..StepConfigurationUpdate::default()
        }
    }

    #[test]
    fn test_apply_merges_disjoint_keys() {
        let config = PartialStepConfiguration::new("trainer");
        let twice = config
            .apply(&extra_update(json!({"a": 1})), true)
            .apply(&extra_update(json!({"b": 2})), true);
        let once = config.apply(&extra_update(json!({"a": 1, "b": 2})), true);

        assert_eq!(twice, once);
    }

    #[test]
    fn test_apply_later_value_wins() {
        let config = PartialStepConfiguration::new("trainer")
            .apply(&extra_update(json!({"a": 1})), true)
            .apply(&extra_update(json!({"a": 3})), true);

        assert_eq!(Value::Object(config.extra), json!({"a": 3}));
    }

    #[test]
    fn test_apply_replace() {
        let config = PartialStepConfiguration::new("trainer")
            .apply(&extra_update(json!({"a": 1})), true)
            .apply(&extra_update(json!({"b": 2})), false);

        assert_eq!(Value::Object(config.extra), json!({"b": 2}));
    }

    #[test]
    fn test_apply_leaves_original_untouched() {
        let config = PartialStepConfiguration::new("trainer");
        let update = StepConfigurationUpdate {
            enable_cache: Some(false),
            ..StepConfigurationUpdate::default()
        };
        let next = config.apply(&update, true);

        assert_eq!(config.enable_cache, None);
        assert_eq!(next.enable_cache, Some(false));
    }

    #[test]
    fn test_apply_outputs_per_name() {
        let csv = Source::from_import_path("pkg::CsvMaterializer").unwrap();
        let json_source = Source::from_import_path("pkg::JsonMaterializer").unwrap();
        let outputs = |name: &str, source: &Source| StepConfigurationUpdate {
            outputs: Some(IndexMap::from([(
                name.to_string(),
                PartialArtifactConfiguration::with_materializer(source.clone()),
            )])),
            ..StepConfigurationUpdate::default()
        };

        let merged = PartialStepConfiguration::new("s")
            .apply(&outputs("a", &csv), true)
            .apply(&outputs("b", &json_source), true);
        assert_eq!(merged.outputs.len(), 2);

        let replaced = merged.apply(&outputs("b", &csv), false);
        assert_eq!(replaced.outputs.len(), 1);
        assert_eq!(replaced.outputs["b"].materializer_source, Some(csv));
    }

    #[test]
    fn test_complete_requires_every_materializer() {
        let mut partial = PartialStepConfiguration::new("loader");
        partial.outputs.insert("a".to_string(), PartialArtifactConfiguration::default());
        partial.outputs.insert("b".to_string(), PartialArtifactConfiguration::default());

        let err = StepConfiguration::try_from(partial).unwrap_err();
        assert_eq!(
            err,
            StepInterfaceError::IncompleteConfiguration {
                step: "loader".to_string(),
                outputs: vec!["a".to_string(), "b".to_string()],
            }
        );
    }

    #[test]
    fn test_complete_configuration() {
        let source = Source::from_import_path("pkg::CsvMaterializer").unwrap();
        let mut partial = PartialStepConfiguration::new("loader");
        partial.outputs.insert(
            "frame".to_string(),
            PartialArtifactConfiguration::with_materializer(source.clone()),
        );

        let complete = StepConfiguration::try_from(partial).unwrap();
        assert_eq!(complete.outputs["frame"].materializer_source, source);
        assert!(complete.cache_enabled());
        assert_eq!(complete.cache_key().len(), 64);
    }
}
