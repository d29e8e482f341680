//! Pipeline definitions.

use super::{PipelineContext, PipelineGraph};
use crate::collaborators::Collaborators;
use crate::config::{PipelineConfiguration, PipelineConfigurationUpdate};
use crate::errors::{StepInterfaceError, StepflowError};
use crate::observability::{DefinitionEmitter, DefinitionSpanAttributes, LoggingDefinitionEmitter, SpanTimer};
use crate::steps::{resolve_hook, HookKind, HookSpec, StepOptions};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// The body of a pipeline: calls steps and wires their outputs together.
pub type PipelineBody = Arc<dyn Fn() -> Result<(), StepflowError> + Send + Sync>;

/// Options accepted by [`Pipeline::configure`].
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    enable_cache: Option<bool>,
    enable_artifact_metadata: Option<bool>,
    settings: Map<String, Value>,
    extra: Map<String, Value>,
    on_failure: Option<HookSpec>,
    on_success: Option<HookSpec>,
    merge: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            enable_cache: None,
            enable_artifact_metadata: None,
            settings: Map::new(),
            extra: Map::new(),
            on_failure: None,
            on_success: None,
            merge: true,
        }
    }
}

impl PipelineOptions {
    /// Creates empty options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the default cache flag of every step.
    #[must_use]
    pub const fn enable_cache(mut self, enable: bool) -> Self {
        self.enable_cache = Some(enable);
        self
    }

    /// Sets the default artifact metadata flag of every step.
    #[must_use]
    pub const fn enable_artifact_metadata(mut self, enable: bool) -> Self {
        self.enable_artifact_metadata = Some(enable);
        self
    }

    /// Sets one settings namespace for every step.
    #[must_use]
    pub fn setting(mut self, key: impl Into<String>, value: Value) -> Self {
        self.settings.insert(key.into(), value);
        self
    }

    /// Sets one extra value for every step.
    #[must_use]
    pub fn extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Sets the default failure hook.
    #[must_use]
    pub fn on_failure(mut self, hook: impl Into<HookSpec>) -> Self {
        self.on_failure = Some(hook.into());
        self
    }

    /// Sets the default success hook.
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

/// A pipeline: a named body plus pipeline-level configuration.
pub struct Pipeline {
    body: PipelineBody,
    configuration: PipelineConfiguration,
    step_overrides: Vec<(String, StepOptions)>,
    collaborators: Collaborators,
    emitter: Arc<dyn DefinitionEmitter>,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("configuration", &self.configuration)
            .field("step_overrides", &self.step_overrides)
            .field("emitter", &self.emitter)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Creates a pipeline.
    pub fn new<F>(name: impl Into<String>, collaborators: Collaborators, body: F) -> Self
    where
        F: Fn() -> Result<(), StepflowError> + Send + Sync + 'static,
    {
        Self {
            body: Arc::new(body),
            configuration: PipelineConfiguration::new(name),
            step_overrides: Vec::new(),
            collaborators,
            emitter: Arc::new(LoggingDefinitionEmitter),
        }
    }

    /// Returns the pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.configuration.name
    }

    /// Returns the pipeline configuration.
    #[must_use]
    pub const fn configuration(&self) -> &PipelineConfiguration {
        &self.configuration
    }

    /// Sets the emitter notified about definitions.
    #[must_use]
    pub fn with_emitter(mut self, emitter: Arc<dyn DefinitionEmitter>) -> Self {
        self.emitter = emitter;
        self
    }

    /// Applies pipeline-level options.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown settings namespaces and invalid hooks.
    pub fn configure(&mut self, options: PipelineOptions) -> Result<&mut Self, StepflowError> {
        let sources = self.collaborators.sources.as_ref();
        let settings = if options.settings.is_empty() {
            None
        } else {
            self.collaborators
                .settings
                .validate(&self.configuration.name, &options.settings)?;
            Some(options.settings)
        };
        let update = PipelineConfigurationUpdate {
            enable_cache: options.enable_cache,
            enable_artifact_metadata: options.enable_artifact_metadata,
            settings,
            extra: (!options.extra.is_empty()).then_some(options.extra),
            failure_hook_source: options
                .on_failure
                .as_ref()
                .map(|hook| resolve_hook(hook, HookKind::Failure, sources))
                .transpose()?,
            success_hook_source: options
                .on_success
                .as_ref()
                .map(|hook| resolve_hook(hook, HookKind::Success, sources))
                .transpose()?,
        };

        self.configuration = self.configuration.apply(&update, options.merge);
        tracing::debug!(pipeline = %self.configuration.name, "Applied pipeline configuration update");
        Ok(self)
    }

    /// Configures one invocation by its unique name before finalization.
    ///
    /// Unknown names are reported by [`Pipeline::define`].
    pub fn configure_step(&mut self, step_name: impl Into<String>, options: StepOptions) -> &mut Self {
        self.step_overrides.push((step_name.into(), options));
        self
    }

    /// Runs the body inside a fresh pipeline context and finalizes every
    /// recorded invocation.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by the body, a step override or the
    /// finalization of a step, or a graph validation error.
    pub fn define(&self) -> Result<PipelineGraph, StepflowError> {
        let context = Arc::new(PipelineContext::new(self.name()));
        let timer = SpanTimer::start();
        let attributes =
            DefinitionSpanAttributes::new(self.name()).with_pipeline_id(context.id().to_string());
        self.emitter.definition_started(&attributes);

        let result = self.define_in(&context);
        let attributes = attributes.with_duration_ms(timer.elapsed_ms());
        match result {
            Ok(ref graph) => self
                .emitter
                .definition_completed(&attributes.with_graph_size(graph.len(), graph.edges().len())),
            Err(ref err) => self.emitter.definition_failed(&attributes, err),
        }
        result
    }

    fn define_in(&self, context: &Arc<PipelineContext>) -> Result<PipelineGraph, StepflowError> {
        {
            let _guard = Arc::clone(context).activate()?;
            (self.body)()?;
        }

        let mut invocations = context.take_invocations();
        for (step_name, options) in &self.step_overrides {
            let invocation = invocations.get_mut(step_name).ok_or_else(|| {
                StepInterfaceError::UnknownStepOverride {
                    pipeline: self.name().to_string(),
                    step: step_name.clone(),
                }
            })?;
            invocation.step_mut().configure(options.clone())?;
        }

        let steps = invocations
            .values()
            .map(|invocation| invocation.finalize(&self.configuration))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(PipelineGraph::new(self.configuration.clone(), steps)?)
    }
}
