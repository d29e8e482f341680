//! Recorded step invocations.

use super::FinalizedStep;
use crate::config::PipelineConfiguration;
use crate::errors::StepflowError;
use crate::steps::{OutputArtifact, Step};
use indexmap::{IndexMap, IndexSet};
use serde_json::{Map, Value};

/// One call of a step inside a pipeline definition.
#[derive(Debug, Clone)]
pub struct StepInvocation {
    id: String,
    step: Step,
    input_artifacts: IndexMap<String, OutputArtifact>,
    parameters: Map<String, Value>,
    upstream_steps: IndexSet<String>,
}

impl StepInvocation {
    /// Creates an invocation. The id is assigned when it is added to a context.
    #[must_use]
    pub fn new(
        step: Step,
        input_artifacts: IndexMap<String, OutputArtifact>,
        parameters: Map<String, Value>,
        upstream_steps: IndexSet<String>,
    ) -> Self {
        Self {
            id: step.name().to_string(),
            step,
            input_artifacts,
            parameters,
            upstream_steps,
        }
    }

    /// Returns the unique id of the invocation.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the invoked step.
    #[must_use]
    pub const fn step(&self) -> &Step {
        &self.step
    }

    /// Returns the invoked step for pipeline-level overrides.
    pub fn step_mut(&mut self) -> &mut Step {
        &mut self.step
    }

    /// Returns the artifacts bound to inputs.
    #[must_use]
    pub const fn input_artifacts(&self) -> &IndexMap<String, OutputArtifact> {
        &self.input_artifacts
    }

    /// Returns the literal arguments bound at call time.
    #[must_use]
    pub const fn parameters(&self) -> &Map<String, Value> {
        &self.parameters
    }

    /// Returns the steps this invocation runs after.
    #[must_use]
    pub const fn upstream_steps(&self) -> &IndexSet<String> {
        &self.upstream_steps
    }

    pub(crate) fn assign_id(&mut self, id: &str) {
        self.id = id.to_string();
        self.step.set_name(id);
    }

    /// Completes the step configuration of the invocation.
    ///
    /// # Errors
    ///
    /// Returns an error if a materializer, parameter or input is missing.
    pub fn finalize(&self, pipeline: &PipelineConfiguration) -> Result<FinalizedStep, StepflowError> {
        let configuration = self
            .step
            .finalize_configuration(&self.input_artifacts, pipeline)?;
        Ok(FinalizedStep {
            name: self.id.clone(),
            configuration,
            upstream_steps: self.upstream_steps.iter().cloned().collect(),
        })
    }
}
