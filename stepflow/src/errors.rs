//! Error types for the stepflow framework.
//!
//! Every error raised while defining steps and assembling pipelines is a
//! configuration error: a user authoring mistake that is reported at the
//! point of detection and never retried.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// The main error type for stepflow operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StepflowError {
    /// The declared entrypoint signature is invalid.
    #[error("{0}")]
    Signature(#[from] StepSignatureError),

    /// A step was called or configured in a way its interface does not allow.
    #[error("{0}")]
    Interface(#[from] StepInterfaceError),

    /// Required parameters-object fields were never bound.
    #[error("{0}")]
    MissingParameters(#[from] MissingStepParameterError),

    /// The active pipeline context was misused.
    #[error("{0}")]
    Context(#[from] PipelineContextError),

    /// A source reference could not be resolved or loaded.
    #[error("{0}")]
    Source(#[from] SourceError),

    /// A step executed outside of a pipeline failed.
    #[error("Step execution error: {0}")]
    Execution(String),
}

impl StepflowError {
    /// Returns the structured error info, if the underlying error carries one.
    #[must_use]
    pub fn error_info(&self) -> Option<ErrorInfo> {
        match self {
            Self::Interface(err) => err.error_info(),
            Self::MissingParameters(err) => Some(err.error_info()),
            Self::Context(err) => err.error_info(),
            _ => None,
        }
    }
}

/// Metadata about an error for better diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ErrorInfo {
    /// Error code (e.g., "STEP-OUTPUT-MATERIALIZER").
    pub code: String,
    /// Short summary of the error.
    pub summary: String,
    /// Hint for fixing the error.
    pub fix_hint: Option<String>,
    /// URL to documentation.
    pub doc_url: Option<String>,
    /// Additional context key-value pairs.
    #[serde(default)]
    pub context: HashMap<String, String>,
}

impl ErrorInfo {
    /// Creates a new error info.
    #[must_use]
    pub fn new(code: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            summary: summary.into(),
            fix_hint: None,
            doc_url: None,
            context: HashMap::new(),
        }
    }

    /// Sets the fix hint.
    #[must_use]
    pub fn with_fix_hint(mut self, hint: impl Into<String>) -> Self {
        self.fix_hint = Some(hint.into());
        self
    }

    /// Sets the documentation URL.
    #[must_use]
    pub fn with_doc_url(mut self, url: impl Into<String>) -> Self {
        self.doc_url = Some(url.into());
        self
    }

    /// Adds a single context entry.
    #[must_use]
    pub fn with_context_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("code".to_string(), serde_json::Value::String(self.code.clone()));
        map.insert("summary".to_string(), serde_json::Value::String(self.summary.clone()));

        if let Some(ref hint) = self.fix_hint {
            map.insert("fix_hint".to_string(), serde_json::Value::String(hint.clone()));
        }
        if let Some(ref url) = self.doc_url {
            map.insert("doc_url".to_string(), serde_json::Value::String(url.clone()));
        }
        if !self.context.is_empty() {
            let context_map: serde_json::Map<String, serde_json::Value> = self
                .context
                .iter()
                .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
                .collect();
            map.insert("context".to_string(), serde_json::Value::Object(context_map));
        }

        map
    }
}

/// Errors detected while introspecting a declared step entrypoint.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StepSignatureError {
    /// The entrypoint declares `*args` or `**kwargs`.
    #[error(
        "Unable to create step '{step}' with variable arguments '{argument}'. \
         Step signatures must have a fixed parameter list."
    )]
    VariableArguments {
        /// The step name.
        step: String,
        /// The variadic argument, rendered with its star prefix.
        argument: String,
    },

    /// A parameter has no type annotation.
    #[error(
        "Missing type annotation for argument '{argument}' when trying to create step '{step}'. \
         Please include type annotations for all step inputs and outputs."
    )]
    MissingAnnotation {
        /// The step name.
        step: String,
        /// The parameter name.
        argument: String,
    },

    /// The entrypoint has no return annotation.
    #[error(
        "Missing return type annotation when trying to create step '{step}'. \
         If the step returns nothing, declare that explicitly."
    )]
    MissingReturnAnnotation {
        /// The step name.
        step: String,
    },

    /// No entrypoint callable was given.
    #[error("Step '{step}' has no entrypoint. Pass the step function with `run`.")]
    MissingEntrypoint {
        /// The step name.
        step: String,
    },

    /// No source text was given or could be loaded for the step.
    #[error(
        "Step '{step}' has no source code. Set it with `code` or load it from a source \
         resolver with `code_from`; the caching fingerprint is computed from it."
    )]
    MissingSourceCode {
        /// The step name.
        step: String,
    },

    /// More than one parameters-object parameter was declared.
    #[error(
        "Found multiple parameter arguments ('{first}' and '{second}') when trying to create \
         step '{step}'. Only one parameters object is allowed per step."
    )]
    MultipleParameterObjects {
        /// The step name.
        step: String,
        /// The first parameters-object parameter.
        first: String,
        /// The second parameters-object parameter.
        second: String,
    },

    /// More than one context parameter was declared.
    #[error(
        "Found multiple context arguments ('{first}' and '{second}') when trying to create \
         step '{step}'. Only one step context is allowed per step."
    )]
    MultipleContexts {
        /// The step name.
        step: String,
        /// The first context parameter.
        first: String,
        /// The second context parameter.
        second: String,
    },

    /// A parameter name appears twice.
    #[error("Duplicate argument '{argument}' in the signature of step '{step}'.")]
    DuplicateArgument {
        /// The step name.
        step: String,
        /// The duplicated parameter name.
        argument: String,
    },

    /// An output name appears twice or is empty.
    #[error("Invalid output name '{output}' in the return annotation of step '{step}'.")]
    InvalidOutputName {
        /// The step name.
        step: String,
        /// The offending output name.
        output: String,
    },
}

/// Errors raised when a step is configured, called or finalized incorrectly.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StepInterfaceError {
    /// Call arguments could not be bound to the signature.
    #[error("Wrong arguments when calling step '{step}': {reason}")]
    WrongArguments {
        /// The step name.
        step: String,
        /// Why binding failed.
        reason: String,
    },

    /// A literal argument has no JSON representation.
    #[error(
        "Argument type (`{type_name}`) for argument '{argument}' of step '{step}' \
         is not JSON serializable: {reason}"
    )]
    NotJsonSerializable {
        /// The step name.
        step: String,
        /// The argument name.
        argument: String,
        /// The Rust type of the rejected value.
        type_name: String,
        /// The serializer message.
        reason: String,
    },

    /// A literal argument does not match the declared parameter type.
    #[error(
        "Wrong argument type for argument '{argument}' of step '{step}'. The argument should \
         either be an output of a previous step or of type `{expected}`, got {actual}."
    )]
    WrongArgumentType {
        /// The step name.
        step: String,
        /// The argument name.
        argument: String,
        /// The declared type.
        expected: String,
        /// A short rendering of the received value.
        actual: String,
    },

    /// A settings key does not belong to any recognized namespace.
    #[error("Invalid settings key '{key}' for step '{step}': {reason}")]
    InvalidSettingsKey {
        /// The step or pipeline name.
        step: String,
        /// The offending key.
        key: String,
        /// Why the key was rejected.
        reason: String,
    },

    /// A configured parameter is neither a signature input nor a parameters field.
    #[error("Can't set parameter '{parameter}' on step '{step}': {reason}")]
    UnknownParameter {
        /// The step name.
        step: String,
        /// The parameter name.
        parameter: String,
        /// Why the parameter was rejected.
        reason: String,
    },

    /// An output override references an output the signature does not declare.
    #[error(
        "Got unexpected materializers for non-existent output '{output}' in step '{step}'. \
         Only materializers for the outputs {allowed:?} of this step can be registered."
    )]
    UnknownOutput {
        /// The step name.
        step: String,
        /// The offending output name.
        output: String,
        /// The declared output names.
        allowed: Vec<String>,
    },

    /// A materializer source does not load to a materializer.
    #[error(
        "Materializer source `{source_path}` for output '{output}' of step '{step}' does not \
         resolve to a materializer: {reason}"
    )]
    InvalidMaterializer {
        /// The step name.
        step: String,
        /// The output name.
        output: String,
        /// The import path of the configured source.
        source_path: String,
        /// Why the source was rejected.
        reason: String,
    },

    /// A hook specification is invalid.
    #[error("Invalid {kind} hook `{hook}`: {reason}")]
    InvalidHook {
        /// `failure` or `success`.
        kind: String,
        /// The hook import path.
        hook: String,
        /// Why the hook was rejected.
        reason: String,
    },

    /// No materializer was configured or registered for an output type.
    #[error(
        "Unable to find materializer for output '{output}' of type `{type_name}` in step \
         '{step}'. Either set a materializer explicitly for this output or register a default \
         materializer for the type."
    )]
    MissingMaterializer {
        /// The step name.
        step: String,
        /// The output name.
        output: String,
        /// The declared output type.
        type_name: String,
    },

    /// A signature input is bound neither to an artifact nor to a literal.
    #[error("Missing entrypoint input '{input}' for step '{step}'.")]
    MissingInput {
        /// The step name.
        step: String,
        /// The unbound input.
        input: String,
    },

    /// A literal was given for an input that is already bound to an artifact.
    #[error("Got duplicate value for input '{input}' of step '{step}'.")]
    DuplicateInput {
        /// The step name.
        step: String,
        /// The doubly bound input.
        input: String,
    },

    /// The parameters object rejected the resolved values.
    #[error("Failed to validate parameters of step '{step}' against `{class}`: {reason}")]
    InvalidParameters {
        /// The step name.
        step: String,
        /// The parameters class name.
        class: String,
        /// The validation message.
        reason: String,
    },

    /// A configuration was completed while outputs still lacked a materializer.
    #[error("Step '{step}' has no materializer for outputs {outputs:?}.")]
    IncompleteConfiguration {
        /// The step name.
        step: String,
        /// Every output without a materializer.
        outputs: Vec<String>,
    },

    /// A pipeline-level override targets a step that was never invoked.
    #[error("Configuration override for unknown step '{step}' in pipeline '{pipeline}'.")]
    UnknownStepOverride {
        /// The pipeline name.
        pipeline: String,
        /// The unknown step name.
        step: String,
    },
}

impl StepInterfaceError {
    /// Returns structured error info for errors that have a well known fix.
    #[must_use]
    pub fn error_info(&self) -> Option<ErrorInfo> {
        match self {
            Self::MissingMaterializer {
                step,
                output,
                type_name,
            } => Some(
                ErrorInfo::new(
                    "STEP-OUTPUT-MATERIALIZER",
                    format!("No materializer for output '{output}' of type `{type_name}`"),
                )
                .with_fix_hint(
                    "Configure `output_materializer` for this output or register a default \
                     materializer for the type.",
                )
                .with_doc_url("https://docs.stepflow.dev/advanced/materializers")
                .with_context_entry("step", step.clone()),
            ),
            Self::InvalidSettingsKey { key, .. } => Some(
                ErrorInfo::new("STEP-SETTINGS-KEY", format!("Unknown settings namespace '{key}'"))
                    .with_fix_hint(
                        "Use a general settings key or `<component_type>.<flavor>`.",
                    ),
            ),
            Self::MissingInput { step, input } => Some(
                ErrorInfo::new("STEP-MISSING-INPUT", format!("Input '{input}' is unbound"))
                    .with_fix_hint("Pass an upstream output or a literal value for every input.")
                    .with_context_entry("step", step.clone()),
            ),
            _ => None,
        }
    }
}

/// Error raised when required parameters-object fields are never bound.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error(
    "Missing parameters {missing:?} for '{step}' step. There are three ways to solve this \
     issue: (1) specify a default value in the parameters class `{class}`, (2) pass the \
     parameters object when creating the step, or (3) set the values through the pipeline \
     configuration."
)]
pub struct MissingStepParameterError {
    /// The step name.
    pub step: String,
    /// Every missing field name, in declaration order.
    pub missing: Vec<String>,
    /// The parameters class name.
    pub class: String,
}

impl MissingStepParameterError {
    /// Creates a new missing parameter error.
    #[must_use]
    pub fn new(step: impl Into<String>, missing: Vec<String>, class: impl Into<String>) -> Self {
        Self {
            step: step.into(),
            missing,
            class: class.into(),
        }
    }

    /// Returns the structured error info.
    #[must_use]
    pub fn error_info(&self) -> ErrorInfo {
        ErrorInfo::new(
            "STEP-MISSING-PARAMETERS",
            format!("Parameters {} were never set", self.missing.join(", ")),
        )
        .with_fix_hint(
            "Give the fields defaults, pass a parameters object or configure the step.",
        )
        .with_context_entry("step", self.step.clone())
    }
}

/// Errors caused by misuse of the active pipeline context.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PipelineContextError {
    /// A pipeline definition started while another one is active.
    #[error(
        "Unable to define pipeline '{requested}' while pipeline '{active}' is being defined. \
         Pipelines cannot be nested."
    )]
    NestedPipeline {
        /// The pipeline already being defined.
        active: String,
        /// The pipeline that tried to activate.
        requested: String,
    },

    /// An artifact reference was consumed outside its own pipeline context.
    #[error(
        "Got input artifact '{output}' of step '{producer}' from a different pipeline \
         (argument '{argument}' of step '{step}')."
    )]
    ForeignArtifact {
        /// The consuming step.
        step: String,
        /// The argument the artifact was bound to.
        argument: String,
        /// The producing step.
        producer: String,
        /// The output name.
        output: String,
    },

    /// A custom step id is already taken.
    #[error("Duplicate step id '{id}' in pipeline '{pipeline}'.")]
    DuplicateStepId {
        /// The pipeline name.
        pipeline: String,
        /// The duplicated id.
        id: String,
    },

    /// An ordering hint references a step that does not exist.
    #[error("Step '{step}' is configured to run after unknown step '{upstream}'.")]
    UnknownUpstreamStep {
        /// The downstream step.
        step: String,
        /// The missing upstream step.
        upstream: String,
    },

    /// A step was ordered after itself.
    #[error("Step '{step}' cannot run after itself.")]
    SelfDependency {
        /// The step name.
        step: String,
    },

    /// Ordering hints introduced a cycle.
    #[error("Cycle detected in pipeline: {}", cycle_path.join(" -> "))]
    CycleDetected {
        /// The path of steps forming the cycle.
        cycle_path: Vec<String>,
    },
}

impl PipelineContextError {
    /// Returns structured error info for errors that have a well known fix.
    #[must_use]
    pub fn error_info(&self) -> Option<ErrorInfo> {
        match self {
            Self::CycleDetected { cycle_path } => Some(
                ErrorInfo::new(
                    "PIPELINE-CYCLE",
                    format!("Pipeline contains a dependency cycle: {}", cycle_path.join(" -> ")),
                )
                .with_fix_hint("Remove one of the `after` hints in the cycle to break it."),
            ),
            Self::UnknownUpstreamStep { upstream, .. } => Some(
                ErrorInfo::new("PIPELINE-MISSING-UPSTREAM", format!("Step '{upstream}' not found"))
                    .with_fix_hint("Check the step id used in `after` for typos."),
            ),
            Self::NestedPipeline { .. } => {
                Some(ErrorInfo::new("PIPELINE-NESTED", "Pipelines cannot be nested"))
            }
            _ => None,
        }
    }
}

/// Errors raised while resolving or loading sources.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceError {
    /// The import path is syntactically invalid.
    #[error("Invalid import path '{path}': {reason}")]
    InvalidImportPath {
        /// The offending path.
        path: String,
        /// Why the path was rejected.
        reason: String,
    },

    /// Nothing is registered under the import path.
    #[error("Unable to load source '{path}': nothing is registered under this path.")]
    NotFound {
        /// The import path.
        path: String,
    },
}

/// Provides default suggestions for common error codes.
pub struct ErrorSuggestions;

impl ErrorSuggestions {
    /// Gets a suggestion for a given error code.
    #[must_use]
    pub fn get(code: &str) -> Option<&'static str> {
        match code {
            "STEP-OUTPUT-MATERIALIZER" => Some(
                "Every step output needs a materializer. Register one for the output type \
                 or set it explicitly on the step.",
            ),
            "STEP-MISSING-PARAMETERS" => Some(
                "Parameters without defaults must be passed when the step is created or \
                 configured before the pipeline is defined.",
            ),
            "STEP-MISSING-INPUT" => Some(
                "Every entrypoint input must receive either an upstream output or a literal.",
            ),
            "STEP-SETTINGS-KEY" => Some(
                "Settings keys are either general keys like `docker` or stack component keys \
                 like `orchestrator.kubernetes`.",
            ),
            "PIPELINE-CYCLE" => Some(
                "Check the `after` hints of your steps for circular references.",
            ),
            "PIPELINE-MISSING-UPSTREAM" => Some(
                "`after` hints must name steps invoked in the same pipeline.",
            ),
            "PIPELINE-NESTED" => Some(
                "Define pipelines one after another instead of inside each other.",
            ),
            _ => None,
        }
    }
}
