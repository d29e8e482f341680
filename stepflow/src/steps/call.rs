//! Step call arguments, binding and results.

use super::{OutputArtifact, ParamDecl, ParamKind, ParametersObject};
use crate::errors::StepInterfaceError;
use anyhow::Context as _;
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// The callable behind a step.
pub type Entrypoint = Arc<dyn Fn(&EntrypointArgs) -> anyhow::Result<Value> + Send + Sync>;

/// One argument of a step call.
#[derive(Debug, Clone, PartialEq)]
pub enum CallArg {
    /// An output of an earlier step in the same pipeline.
    Artifact(OutputArtifact),
    /// A JSON value.
    Literal(Value),
    /// A value that failed to serialize. Rejected when the call is bound.
    Unserializable {
        /// The Rust type of the value.
        type_name: String,
        /// The serializer message.
        reason: String,
    },
}

impl CallArg {
    /// Serializes a value into a literal argument.
    ///
    /// Serialization failures are kept and reported when the call is bound.
    pub fn literal<T: Serialize + ?Sized>(value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(value) => Self::Literal(value),
            Err(err) => Self::Unserializable {
                type_name: std::any::type_name::<T>().to_string(),
                reason: err.to_string(),
            },
        }
    }
}

impl From<OutputArtifact> for CallArg {
    fn from(artifact: OutputArtifact) -> Self {
        Self::Artifact(artifact)
    }
}

impl From<&OutputArtifact> for CallArg {
    fn from(artifact: &OutputArtifact) -> Self {
        Self::Artifact(artifact.clone())
    }
}

impl From<Value> for CallArg {
    fn from(value: Value) -> Self {
        Self::Literal(value)
    }
}

/// Arguments of a step call.
#[derive(Debug, Clone, Default)]
pub struct CallArgs {
    pub(crate) args: Vec<CallArg>,
    pub(crate) kwargs: IndexMap<String, CallArg>,
    pub(crate) id: Option<String>,
    pub(crate) after: Vec<String>,
}

impl CallArgs {
    /// Creates an empty argument list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a positional argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<CallArg>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Sets a keyword argument.
    #[must_use]
    pub fn kwarg(mut self, name: impl Into<String>, arg: impl Into<CallArg>) -> Self {
        self.kwargs.insert(name.into(), arg.into());
        self
    }

    /// Sets a custom id for the invocation.
    #[must_use]
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Orders the invocation after another step of the pipeline.
    #[must_use]
    pub fn after(mut self, step_name: impl Into<String>) -> Self {
        self.after.push(step_name.into());
        self
    }
}

/// A call argument after partitioning.
#[derive(Debug, Clone, PartialEq)]
pub enum Bound {
    /// Bound to an upstream output.
    Artifact(OutputArtifact),
    /// Bound to a literal parameter.
    Literal(Value),
}

/// Binds call arguments to parameters.
///
/// Positionals fill positional-or-keyword parameters in order, keywords are
/// matched by name and unbound parameters with a default receive it. Other
/// parameters stay unbound. The result follows parameter order.
pub(crate) fn bind_arguments(
    step: &str,
    params: &[&ParamDecl],
    args: &[CallArg],
    kwargs: &IndexMap<String, CallArg>,
) -> Result<IndexMap<String, CallArg>, StepInterfaceError> {
    let wrong = |reason: String| StepInterfaceError::WrongArguments {
        step: step.to_string(),
        reason,
    };

    let positional: Vec<&ParamDecl> = params
        .iter()
        .copied()
        .filter(|p| p.kind == ParamKind::PositionalOrKeyword)
        .collect();
    if args.len() > positional.len() {
        return Err(wrong(format!(
            "too many positional arguments: expected at most {}, got {}",
            positional.len(),
            args.len()
        )));
    }

    let mut bound: HashMap<&str, CallArg> = positional
        .iter()
        .zip(args)
        .map(|(param, arg)| (param.name.as_str(), arg.clone()))
        .collect();

    for (name, arg) in kwargs {
        if !params.iter().any(|p| p.name == *name) {
            return Err(wrong(format!("got an unexpected keyword argument '{name}'")));
        }
        if bound.contains_key(name.as_str()) {
            return Err(wrong(format!("got multiple values for argument '{name}'")));
        }
        bound.insert(name.as_str(), arg.clone());
    }

    Ok(params
        .iter()
        .filter_map(|param| {
            bound
                .remove(param.name.as_str())
                .or_else(|| param.default.clone().map(CallArg::Literal))
                .map(|arg| (param.name.clone(), arg))
        })
        .collect())
}

/// Runtime information handed to steps that declare a context parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepContext {
    step_name: String,
    output_names: Vec<String>,
}

impl StepContext {
    /// Creates a context for the named step.
    #[must_use]
    pub fn new(step_name: impl Into<String>, output_names: Vec<String>) -> Self {
        Self {
            step_name: step_name.into(),
            output_names,
        }
    }

    /// Returns the step name.
    #[must_use]
    pub fn step_name(&self) -> &str {
        &self.step_name
    }

    /// Returns the output names of the step.
    #[must_use]
    pub fn output_names(&self) -> &[String] {
        &self.output_names
    }
}

/// Arguments an entrypoint runs with.
#[derive(Debug, Clone, Default)]
pub struct EntrypointArgs {
    values: IndexMap<String, Value>,
    parameters: Option<ParametersObject>,
    context: Option<StepContext>,
}

impl EntrypointArgs {
    /// Creates empty arguments.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an input value.
    #[must_use]
    pub fn with_value(mut self, name: impl Into<String>, value: Value) -> Self {
        self.values.insert(name.into(), value);
        self
    }

    /// Sets the parameters object.
    #[must_use]
    pub fn with_parameters(mut self, parameters: ParametersObject) -> Self {
        self.parameters = Some(parameters);
        self
    }

    /// Sets the step context.
    #[must_use]
    pub fn with_context(mut self, context: StepContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Returns an input value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Deserializes an input value.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is missing or has the wrong shape.
    pub fn value<T: DeserializeOwned>(&self, name: &str) -> anyhow::Result<T> {
        let value = self
            .values
            .get(name)
            .with_context(|| format!("missing input '{name}'"))?;
        serde_json::from_value(value.clone()).with_context(|| format!("invalid input '{name}'"))
    }

    /// Returns all input values.
    #[must_use]
    pub const fn values(&self) -> &IndexMap<String, Value> {
        &self.values
    }

    /// Returns the parameters object.
    #[must_use]
    pub const fn parameters(&self) -> Option<&ParametersObject> {
        self.parameters.as_ref()
    }

    /// Returns the step context.
    #[must_use]
    pub const fn context(&self) -> Option<&StepContext> {
        self.context.as_ref()
    }
}

/// The result of calling a step.
#[derive(Debug, Clone, PartialEq)]
pub enum StepCallOutput {
    /// The value computed by a direct call.
    Computed(Value),
    /// The reference to the only output of a recorded invocation.
    Artifact(OutputArtifact),
    /// References to every output of a recorded invocation.
    Artifacts(Vec<OutputArtifact>),
}

impl StepCallOutput {
    /// Returns the computed value of a direct call.
    #[must_use]
    pub const fn computed(&self) -> Option<&Value> {
        match self {
            Self::Computed(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the single artifact reference.
    #[must_use]
    pub const fn artifact(&self) -> Option<&OutputArtifact> {
        match self {
            Self::Artifact(artifact) => Some(artifact),
            _ => None,
        }
    }

    /// Returns every artifact reference, in output order.
    #[must_use]
    pub fn artifacts(&self) -> Vec<OutputArtifact> {
        match self {
            Self::Computed(_) => Vec::new(),
            Self::Artifact(artifact) => vec![artifact.clone()],
            Self::Artifacts(artifacts) => artifacts.clone(),
        }
    }
}
