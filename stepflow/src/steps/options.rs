//! Step configuration options.

use super::{HookSpec, ParametersObject};
use crate::errors::StepInterfaceError;
use crate::materializers::MaterializerClass;
use crate::source::{Source, SourceObject, SourceResolver};
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// Reference to a materializer.
#[derive(Debug, Clone, PartialEq)]
pub enum MaterializerSpec {
    /// A `::` separated import path.
    ImportPath(String),
    /// A resolved source.
    Source(Source),
    /// A materializer class.
    Class(Arc<MaterializerClass>),
}

impl From<&str> for MaterializerSpec {
    fn from(path: &str) -> Self {
        Self::ImportPath(path.to_string())
    }
}

impl From<Source> for MaterializerSpec {
    fn from(source: Source) -> Self {
        Self::Source(source)
    }
}

impl From<Arc<MaterializerClass>> for MaterializerSpec {
    fn from(class: Arc<MaterializerClass>) -> Self {
        Self::Class(class)
    }
}

impl fmt::Display for MaterializerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ImportPath(path) => f.write_str(path),
            Self::Source(source) => fmt::Display::fmt(source, f),
            Self::Class(class) => fmt::Display::fmt(class.source(), f),
        }
    }
}

impl MaterializerSpec {
    /// Resolves the spec to the source of a materializer.
    pub(crate) fn resolve(
        &self,
        step: &str,
        output: &str,
        resolver: &dyn SourceResolver,
    ) -> Result<Source, StepInterfaceError> {
        let invalid = |reason: String| StepInterfaceError::InvalidMaterializer {
            step: step.to_string(),
            output: output.to_string(),
            source_path: self.to_string(),
            reason,
        };

        let source = match self {
            Self::ImportPath(path) => resolver.resolve(path).map_err(|e| invalid(e.to_string()))?,
            Self::Source(source) => source.clone(),
            Self::Class(class) => class.source().clone(),
        };
        match resolver.load(&source).map_err(|e| invalid(e.to_string()))? {
            SourceObject::Materializer(_) => Ok(source),
            other => Err(invalid(format!("loads to a {}", other.kind()))),
        }
    }
}

/// A parameters object or a plain map of parameter values.
#[derive(Debug, Clone, PartialEq)]
pub enum ParametersOrDict {
    /// A constructed parameters object.
    Object(ParametersObject),
    /// Raw parameter values.
    Dict(Map<String, Value>),
}

impl From<ParametersObject> for ParametersOrDict {
    fn from(object: ParametersObject) -> Self {
        Self::Object(object)
    }
}

impl From<Map<String, Value>> for ParametersOrDict {
    fn from(values: Map<String, Value>) -> Self {
        Self::Dict(values)
    }
}

/// Options accepted by `Step::configure`.
///
/// Unset options leave the configuration alone. Dict options are merged into
/// the existing values unless [`StepOptions::replace`] was called.
#[derive(Debug, Clone)]
pub struct StepOptions {
    pub(crate) name: Option<String>,
    pub(crate) enable_cache: Option<bool>,
    pub(crate) enable_artifact_metadata: Option<bool>,
    pub(crate) experiment_tracker: Option<String>,
    pub(crate) step_operator: Option<String>,
    pub(crate) parameters: Option<ParametersOrDict>,
    pub(crate) parameter_values: Map<String, Value>,
    pub(crate) output_materializers: IndexMap<String, MaterializerSpec>,
    pub(crate) all_outputs_materializer: Option<MaterializerSpec>,
    pub(crate) output_artifacts: IndexMap<String, String>,
    pub(crate) settings: Map<String, Value>,
    pub(crate) extra: Map<String, Value>,
    pub(crate) on_failure: Option<HookSpec>,
    pub(crate) on_success: Option<HookSpec>,
    pub(crate) merge: bool,
}

impl Default for StepOptions {
    fn default() -> Self {
        Self {
            name: None,
            enable_cache: None,
            enable_artifact_metadata: None,
            experiment_tracker: None,
            step_operator: None,
            parameters: None,
            parameter_values: Map::new(),
            output_materializers: IndexMap::new(),
            all_outputs_materializer: None,
            output_artifacts: IndexMap::new(),
            settings: Map::new(),
            extra: Map::new(),
            on_failure: None,
            on_success: None,
            merge: true,
        }
    }
}

impl StepOptions {
    /// Creates empty options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Deprecated: step names cannot be changed through `configure`.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Enables or disables caching.
    #[must_use]
    pub const fn enable_cache(mut self, enable: bool) -> Self {
        self.enable_cache = Some(enable);
        self
    }

    /// Enables or disables artifact metadata.
    #[must_use]
    pub const fn enable_artifact_metadata(mut self, enable: bool) -> Self {
        self.enable_artifact_metadata = Some(enable);
        self
    }

    /// Sets the experiment tracker.
    #[must_use]
    pub fn experiment_tracker(mut self, name: impl Into<String>) -> Self {
        self.experiment_tracker = Some(name.into());
        self
    }

    /// Sets the step operator.
    #[must_use]
    pub fn step_operator(mut self, name: impl Into<String>) -> Self {
        self.step_operator = Some(name.into());
        self
    }

    /// Sets the parameters object or parameter values.
    #[must_use]
    pub fn parameters(mut self, parameters: impl Into<ParametersOrDict>) -> Self {
        self.parameters = Some(parameters.into());
        self
    }

    /// Sets a single parameter value.
    #[must_use]
    pub fn parameter(mut self, name: impl Into<String>, value: Value) -> Self {
        self.parameter_values.insert(name.into(), value);
        self
    }

    /// Sets the materializer of one output.
    #[must_use]
    pub fn output_materializer(mut self, output: impl Into<String>, spec: impl Into<MaterializerSpec>) -> Self {
        self.output_materializers.insert(output.into(), spec.into());
        self
    }

    /// Sets the same materializer for every output.
    #[must_use]
    pub fn output_materializers(mut self, spec: impl Into<MaterializerSpec>) -> Self {
        self.all_outputs_materializer = Some(spec.into());
        self
    }

    /// Deprecated: artifact classes are ignored.
    #[must_use]
    pub fn output_artifact(mut self, output: impl Into<String>, artifact_class: impl Into<String>) -> Self {
        self.output_artifacts.insert(output.into(), artifact_class.into());
        self
    }

    /// Sets one settings namespace.
    #[must_use]
    pub fn setting(mut self, key: impl Into<String>, value: Value) -> Self {
        self.settings.insert(key.into(), value);
        self
    }

    /// Sets one extra value.
    #[must_use]
    pub fn extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Sets the failure hook.
    #[must_use]
    pub fn on_failure(mut self, hook: impl Into<HookSpec>) -> Self {
        self.on_failure = Some(hook.into());
        self
    }

    /// Sets the success hook.
    #[must_use]
    pub fn on_success(mut self, hook: impl Into<HookSpec>) -> Self {
        self.on_success = Some(hook.into());
        self
    }

    /// Replaces dict options wholesale instead of merging them.
    #[must_use]
    pub const fn replace(mut self) -> Self {
        self.merge = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::materializers::{register_builtin_materializers, MaterializerRegistry, BUILTIN_MATERIALIZER};
    use crate::source::InMemorySourceRegistry;
    use serde_json::json;

    fn builtin_sources() -> InMemorySourceRegistry {
        let sources = InMemorySourceRegistry::new();
        register_builtin_materializers(&MaterializerRegistry::new(), &sources);
        sources
    }

    #[test]
    fn test_defaults_merge() {
        let options = StepOptions::new();
        assert!(options.merge);
        assert!(!options.replace().merge);
    }

    #[test]
    fn test_builder_collects_values() {
        let options = StepOptions::new()
            .enable_cache(false)
            .parameter("lr", json!(0.1))
            .setting("docker", json!({"image": "x"}))
            .output_materializer("out", BUILTIN_MATERIALIZER)
            .on_failure("hooks::alert");

        assert_eq!(options.enable_cache, Some(false));
        assert_eq!(options.parameter_values["lr"], json!(0.1));
        assert!(options.settings.contains_key("docker"));
        assert_eq!(options.output_materializers.len(), 1);
        assert_eq!(options.on_failure, Some(HookSpec::from("hooks::alert")));
    }

    #[test]
    fn test_resolve_materializer_spec() {
        let sources = builtin_sources();
        let spec = MaterializerSpec::from(BUILTIN_MATERIALIZER);

        let source = spec.resolve("s", "out", &sources).unwrap();
        assert_eq!(source.import_path(), BUILTIN_MATERIALIZER);
    }

    #[test]
    fn test_resolve_rejects_non_materializer() {
        let sources = builtin_sources();
        let helper = Source::from_import_path("pkg::helper").unwrap();
        sources.register_code(helper.clone(), "fn helper() {}");

        let err = MaterializerSpec::from(helper).resolve("s", "out", &sources).unwrap_err();
        assert!(matches!(err, StepInterfaceError::InvalidMaterializer { ref output, .. } if output == "out"));

        let err = MaterializerSpec::from("pkg::Missing").resolve("s", "out", &sources).unwrap_err();
        assert!(err.to_string().contains("pkg::Missing"));
    }
}
