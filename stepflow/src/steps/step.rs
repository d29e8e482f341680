//! Step instances.
//!
//! A [`Step`] is callable in two modes. Without an active pipeline definition
//! a call runs the entrypoint and returns its value. Inside a definition a
//! call records an invocation and returns artifact references instead.

use super::call::bind_arguments;
use super::hooks::{resolve_hook, HookKind};
use super::types::describe_value;
use super::{
    Bound, CallArg, CallArgs, EntrypointArgs, MaterializerSpec, OutputArtifact, ParamDecl,
    ParametersClass, ParametersObject, ParametersOrDict, StepCallOutput, StepContext,
    StepDefinition, StepOptions, StepSignature,
};
use crate::caching::compute_caching_parameters;
use crate::collaborators::Collaborators;
use crate::config::{
    DuplicateInputPolicy, InputSpec, PartialArtifactConfiguration, PartialStepConfiguration,
    PipelineConfiguration, StepConfiguration, StepConfigurationUpdate,
};
use crate::errors::{
    MissingStepParameterError, PipelineContextError, StepInterfaceError, StepflowError,
};
use crate::pipeline::{PipelineContext, StepInvocation};
use indexmap::{IndexMap, IndexSet};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

/// A configured instance of a step definition.
#[derive(Debug, Clone)]
pub struct Step {
    definition: StepDefinition,
    configuration: PartialStepConfiguration,
    upstream_steps: IndexSet<String>,
    collaborators: Collaborators,
}

impl Step {
    pub(crate) fn new(definition: StepDefinition, collaborators: Collaborators) -> Result<Self, StepflowError> {
        let mut configuration = PartialStepConfiguration::new(definition.name());
        if definition.signature().context_name().is_some()
            && collaborators.options.disable_cache_with_context
        {
            tracing::debug!(step = %definition.name(), "Step takes a context, disabling cache by default");
            configuration.enable_cache = Some(false);
        }

        let class_options = definition.class_options().cloned();
        let mut step = Self {
            definition,
            configuration,
            upstream_steps: IndexSet::new(),
            collaborators,
        };
        if let Some(options) = class_options {
            step.configure(options)?;
        }
        Ok(step)
    }

    /// Returns the configured step name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.configuration.name
    }

    /// Returns the step definition.
    #[must_use]
    pub const fn definition(&self) -> &StepDefinition {
        &self.definition
    }

    /// Returns the entrypoint signature.
    #[must_use]
    pub fn signature(&self) -> &StepSignature {
        self.definition.signature()
    }

    /// Returns the current configuration.
    #[must_use]
    pub const fn configuration(&self) -> &PartialStepConfiguration {
        &self.configuration
    }

    /// Returns the steps this step must run after.
    #[must_use]
    pub const fn upstream_steps(&self) -> &IndexSet<String> {
        &self.upstream_steps
    }

    /// Orders every later invocation of this step after the named step.
    pub fn after(&mut self, step_name: impl Into<String>) -> &mut Self {
        self.upstream_steps.insert(step_name.into());
        self
    }

    /// Returns the source text of the step.
    #[must_use]
    pub fn source_code(&self) -> &str {
        self.definition.source_code()
    }

    /// Returns the documentation of the step.
    #[must_use]
    pub fn docstring(&self) -> Option<&str> {
        self.definition.docstring()
    }

    /// Computes the caching fingerprint over the materializers configured so far.
    ///
    /// # Errors
    ///
    /// Returns an error if a materializer source cannot be hashed.
    pub fn caching_parameters(&self) -> Result<BTreeMap<String, String>, StepflowError> {
        Ok(compute_caching_parameters(
            self.source_code(),
            self.configuration.materializer_sources(),
            self.collaborators.sources.as_ref(),
        )?)
    }

    /// Applies configuration options.
    ///
    /// Either every option is applied or, on error, none is.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown settings namespaces, parameters or
    /// outputs, and for materializers or hooks that cannot be resolved.
    pub fn configure(&mut self, options: StepOptions) -> Result<&mut Self, StepflowError> {
        let merge = options.merge;
        let update = self.build_update(options)?;
        self.validate_parameters(&update)?;

        let next = self.configuration.apply(&update, merge);
        tracing::debug!(step = %self.name(), merge, "Applied configuration update");
        self.configuration = next;
        Ok(self)
    }

    fn build_update(&self, options: StepOptions) -> Result<StepConfigurationUpdate, StepflowError> {
        let step = self.name().to_string();
        let signature = self.signature();
        let sources = self.collaborators.sources.as_ref();

        if let Some(ref name) = options.name {
            tracing::warn!(step = %step, ignored = %name, "Step names cannot be changed through `configure`, ignoring `name`");
        }
        for (output, artifact_class) in &options.output_artifacts {
            tracing::warn!(
                step = %step,
                output = %output,
                artifact_class = %artifact_class,
                "`output_artifacts` is deprecated and has no effect"
            );
        }

        let mut parameters = match options.parameters {
            None => None,
            Some(ParametersOrDict::Dict(values)) => Some(values),
            Some(ParametersOrDict::Object(object)) => Some(self.parameters_object_values(object)?),
        };
        if !options.parameter_values.is_empty() {
            parameters
                .get_or_insert_with(Map::new)
                .extend(options.parameter_values);
        }

        let settings = if options.settings.is_empty() {
            None
        } else {
            self.collaborators.settings.validate(&step, &options.settings)?;
            Some(options.settings)
        };

        let mut specs: IndexMap<String, MaterializerSpec> = IndexMap::new();
        if let Some(spec) = options.all_outputs_materializer {
            for output in signature.outputs().keys() {
                specs.insert(output.clone(), spec.clone());
            }
        }
        specs.extend(options.output_materializers);

        let outputs = if specs.is_empty() {
            None
        } else {
            let mut outputs = IndexMap::new();
            for (output, spec) in &specs {
                if !signature.outputs().contains_key(output) {
                    return Err(StepInterfaceError::UnknownOutput {
                        step,
                        output: output.clone(),
                        allowed: signature.output_names(),
                    }
                    .into());
                }
                let source = spec.resolve(&step, output, sources)?;
                outputs.insert(output.clone(), PartialArtifactConfiguration::with_materializer(source));
            }
            Some(outputs)
        };

        let failure_hook_source = options
            .on_failure
            .as_ref()
            .map(|hook| resolve_hook(hook, HookKind::Failure, sources))
            .transpose()?;
        let success_hook_source = options
            .on_success
            .as_ref()
            .map(|hook| resolve_hook(hook, HookKind::Success, sources))
            .transpose()?;

        Ok(StepConfigurationUpdate {
            name: None,
            enable_cache: options.enable_cache,
            enable_artifact_metadata: options.enable_artifact_metadata,
            experiment_tracker: options.experiment_tracker,
            step_operator: options.step_operator,
            parameters,
            settings,
            extra: (!options.extra.is_empty()).then_some(options.extra),
            failure_hook_source,
            success_hook_source,
            outputs,
        })
    }

    fn parameters_object_values(&self, object: ParametersObject) -> Result<Map<String, Value>, StepflowError> {
        match self.signature().parameters_class() {
            Some(class) if class.name() == object.class().name() => Ok(object.into_values()),
            Some(class) => Err(StepInterfaceError::InvalidParameters {
                step: self.name().to_string(),
                class: class.name().to_string(),
                reason: format!("got a parameters object of class `{}`", object.class().name()),
            }
            .into()),
            None => Err(StepInterfaceError::InvalidParameters {
                step: self.name().to_string(),
                class: object.class().name().to_string(),
                reason: "the step does not declare a parameters object".to_string(),
            }
            .into()),
        }
    }

    fn validate_parameters(&self, update: &StepConfigurationUpdate) -> Result<(), StepInterfaceError> {
        let Some(ref parameters) = update.parameters else {
            return Ok(());
        };
        let signature = self.signature();
        if signature.parameters_class().is_some() {
            return Ok(());
        }
        for key in parameters.keys() {
            if !signature.inputs().contains_key(key) {
                return Err(StepInterfaceError::UnknownParameter {
                    step: self.name().to_string(),
                    parameter: key.clone(),
                    reason: format!(
                        "the step has no parameters object and no input with this name; inputs are {:?}",
                        signature.input_names()
                    ),
                });
            }
        }
        Ok(())
    }

    /// Calls the step.
    ///
    /// Inside an active pipeline definition the call is recorded and artifact
    /// references are returned; otherwise the entrypoint runs immediately.
    ///
    /// # Errors
    ///
    /// Returns an error if the arguments cannot be bound, an artifact belongs
    /// to another pipeline definition, or the entrypoint fails.
    pub fn call(&self, args: CallArgs) -> Result<StepCallOutput, StepflowError> {
        match PipelineContext::active() {
            Some(context) => self.record_invocation(&context, args),
            None => self.run_directly(args),
        }
    }

    fn record_invocation(&self, context: &Arc<PipelineContext>, args: CallArgs) -> Result<StepCallOutput, StepflowError> {
        let signature = self.signature();
        let params: Vec<&ParamDecl> = signature
            .params()
            .iter()
            .filter(|param| !signature.is_special(&param.name))
            .collect();
        let bound = bind_arguments(self.name(), &params, &args.args, &args.kwargs)?;

        let mut artifacts = IndexMap::new();
        let mut literals = Map::new();
        for (name, arg) in bound {
            match self.partition(&name, arg, Some(context.id()))? {
                Bound::Artifact(artifact) => {
                    artifacts.insert(name, artifact);
                }
                Bound::Literal(value) => {
                    literals.insert(name, value);
                }
            }
        }

        let mut invocation_step = self.clone();
        if !literals.is_empty() {
            invocation_step.configuration = self
                .configuration
                .apply(&StepConfigurationUpdate::parameters(literals.clone()), true);
        }

        let mut upstream_steps: IndexSet<String> = artifacts
            .values()
            .map(|artifact| artifact.step_name().to_string())
            .collect();
        upstream_steps.extend(args.after);
        upstream_steps.extend(self.upstream_steps.iter().cloned());

        let invocation = StepInvocation::new(invocation_step, artifacts, literals, upstream_steps);
        let invocation_id = context.add_step(invocation, args.id)?;

        let outputs: Vec<OutputArtifact> = signature
            .outputs()
            .keys()
            .map(|output| OutputArtifact::new(output, &invocation_id, context.id()))
            .collect();
        if let [single] = outputs.as_slice() {
            Ok(StepCallOutput::Artifact(single.clone()))
        } else {
            Ok(StepCallOutput::Artifacts(outputs))
        }
    }

    fn run_directly(&self, args: CallArgs) -> Result<StepCallOutput, StepflowError> {
        let step = self.name().to_string();
        let signature = self.signature();
        let params: Vec<&ParamDecl> = signature
            .params()
            .iter()
            .filter(|param| signature.context_name() != Some(param.name.as_str()))
            .collect();
        let bound = bind_arguments(&step, &params, &args.args, &args.kwargs)?;

        let mut entrypoint_args = EntrypointArgs::new();
        let mut parameters_arg = None;
        for (name, arg) in bound {
            if signature.parameters_name() == Some(name.as_str()) {
                parameters_arg = Some((name, arg));
                continue;
            }
            match self.partition(&name, arg, None)? {
                Bound::Literal(value) => entrypoint_args = entrypoint_args.with_value(name, value),
                Bound::Artifact(artifact) => return Err(self.foreign_artifact(&name, &artifact)),
            }
        }

        for param in &params {
            if !signature.is_special(&param.name) && entrypoint_args.get(&param.name).is_none() {
                return Err(StepInterfaceError::WrongArguments {
                    step,
                    reason: format!("missing a required argument: '{}'", param.name),
                }
                .into());
            }
        }

        if let Some(class) = signature.parameters_class() {
            let values = match parameters_arg {
                None => self.parameter_field_values(),
                Some((name, arg)) => match self.partition(&name, arg, None)? {
                    Bound::Literal(Value::Object(values)) => values,
                    Bound::Literal(other) => {
                        return Err(StepInterfaceError::InvalidParameters {
                            step,
                            class: class.name().to_string(),
                            reason: format!("expected a dict, got {}", describe_value(&other)),
                        }
                        .into())
                    }
                    Bound::Artifact(artifact) => return Err(self.foreign_artifact(&name, &artifact)),
                },
            };
            entrypoint_args = entrypoint_args.with_parameters(self.construct_parameters(class, &values)?);
        }
        if signature.context_name().is_some() {
            entrypoint_args =
                entrypoint_args.with_context(StepContext::new(&step, signature.output_names()));
        }

        tracing::debug!(step = %step, "Running step outside of a pipeline");
        let value = (self.definition.entrypoint())(&entrypoint_args)
            .map_err(|err| StepflowError::Execution(format!("step '{step}' failed: {err:#}")))?;
        Ok(StepCallOutput::Computed(value))
    }

    fn partition(&self, name: &str, arg: CallArg, pipeline_id: Option<Uuid>) -> Result<Bound, StepflowError> {
        match arg {
            CallArg::Artifact(artifact) if Some(artifact.pipeline_id()) == pipeline_id => {
                Ok(Bound::Artifact(artifact))
            }
            CallArg::Artifact(artifact) => Err(self.foreign_artifact(name, &artifact)),
            CallArg::Unserializable { type_name, reason } => Err(StepInterfaceError::NotJsonSerializable {
                step: self.name().to_string(),
                argument: name.to_string(),
                type_name,
                reason,
            }
            .into()),
            CallArg::Literal(value) => {
                self.check_literal(name, &value)?;
                Ok(Bound::Literal(value))
            }
        }
    }

    fn check_literal(&self, name: &str, value: &Value) -> Result<(), StepInterfaceError> {
        match self.signature().inputs().get(name) {
            Some(type_ref) if !type_ref.accepts(value) => Err(StepInterfaceError::WrongArgumentType {
                step: self.name().to_string(),
                argument: name.to_string(),
                expected: type_ref.to_string(),
                actual: describe_value(value).to_string(),
            }),
            _ => Ok(()),
        }
    }

    fn foreign_artifact(&self, argument: &str, artifact: &OutputArtifact) -> StepflowError {
        PipelineContextError::ForeignArtifact {
            step: self.name().to_string(),
            argument: argument.to_string(),
            producer: artifact.step_name().to_string(),
            output: artifact.name().to_string(),
        }
        .into()
    }

    /// Configured parameter values that are not plain inputs.
    fn parameter_field_values(&self) -> Map<String, Value> {
        let inputs = self.signature().inputs();
        self.configuration
            .parameters
            .iter()
            .filter(|(key, _)| !inputs.contains_key(*key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    fn construct_parameters(
        &self,
        class: &Arc<ParametersClass>,
        values: &Map<String, Value>,
    ) -> Result<ParametersObject, StepflowError> {
        let missing: Vec<String> = class
            .fields()
            .values()
            .filter(|field| field.is_required() && !values.contains_key(field.name()))
            .map(|field| field.name().to_string())
            .collect();
        if !missing.is_empty() {
            return Err(MissingStepParameterError::new(self.name(), missing, class.name()).into());
        }

        class.construct(values).map_err(|reason| {
            StepInterfaceError::InvalidParameters {
                step: self.name().to_string(),
                class: class.name().to_string(),
                reason,
            }
            .into()
        })
    }

    /// Completes the configuration of one invocation.
    pub(crate) fn finalize_configuration(
        &self,
        input_artifacts: &IndexMap<String, OutputArtifact>,
        pipeline: &PipelineConfiguration,
    ) -> Result<StepConfiguration, StepflowError> {
        let step = self.name().to_string();
        let signature = self.signature();
        let mut config = pipeline.apply_defaults(&self.configuration);

        for (output, type_ref) in signature.outputs() {
            let entry = config.outputs.entry(output.clone()).or_default();
            if entry.materializer_source.is_some() {
                continue;
            }
            let Some(class) = self.collaborators.materializers.lookup(type_ref.name()) else {
                return Err(StepInterfaceError::MissingMaterializer {
                    step,
                    output: output.clone(),
                    type_name: type_ref.name().to_string(),
                }
                .into());
            };
            entry.materializer_source = Some(class.source().clone());
        }

        for input in input_artifacts.keys() {
            if config.parameters.contains_key(input) {
                if self.collaborators.options.duplicate_input_policy == DuplicateInputPolicy::Reject {
                    return Err(StepInterfaceError::DuplicateInput {
                        step,
                        input: input.clone(),
                    }
                    .into());
                }
                tracing::warn!(step = %step, input = %input, "Got duplicate value for step input, using the artifact");
                config.parameters.remove(input);
            }
        }

        if let Some(class) = signature.parameters_class() {
            let values: Map<String, Value> = config
                .parameters
                .iter()
                .filter(|(key, _)| !signature.inputs().contains_key(*key))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect();
            let object = self.construct_parameters(class, &values)?;
            config.parameters.extend(object.into_values());
        }

        let mut inputs = IndexMap::new();
        for input in signature.inputs().keys() {
            if let Some(artifact) = input_artifacts.get(input) {
                inputs.insert(
                    input.clone(),
                    InputSpec {
                        step_name: artifact.step_name().to_string(),
                        output_name: artifact.name().to_string(),
                    },
                );
            } else if let Some(value) = config.parameters.get(input) {
                self.check_literal(input, value)?;
            } else {
                return Err(StepInterfaceError::MissingInput {
                    step,
                    input: input.clone(),
                }
                .into());
            }
        }
        config.inputs = inputs;

        config.caching_parameters = compute_caching_parameters(
            self.source_code(),
            config.materializer_sources(),
            self.collaborators.sources.as_ref(),
        )?;

        tracing::debug!(
            step = %step,
            inputs = config.inputs.len(),
            outputs = config.outputs.len(),
            "Finalized step configuration"
        );
        Ok(StepConfiguration::try_from(config)?)
    }

    pub(crate) fn set_name(&mut self, name: &str) {
        self.configuration.name = name.to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DefinitionOptions;
    use crate::steps::{EntrypointSpec, TypeRef};
    use crate::testing::{
        adder_step, consumer_step, producer_step, trainer_parameters, trainer_step,
        TestCollaborators,
    };
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn context_step() -> StepDefinition {
        StepDefinition::builder(
            "reporter",
            EntrypointSpec::new()
                .param(ParamDecl::new("context", TypeRef::context()))
                .returns_single(TypeRef::string()),
        )
        .run(|args| {
            let context = args
                .context()
                .ok_or_else(|| anyhow::anyhow!("no context"))?;
            Ok(json!(context.step_name()))
        })
        .code("fn reporter(context: StepContext) -> String { context.step_name() }")
        .build()
        .unwrap()
    }

    #[test]
    fn test_configure_merges_and_replaces() {
        let fixture = TestCollaborators::new();
        let mut step = adder_step().instance(&fixture.collaborators).unwrap();

        step.configure(StepOptions::new().extra("tags", json!({"team": "ml"})))
            .unwrap();
        step.configure(StepOptions::new().extra("owner", json!("alice")))
            .unwrap();
        assert_eq!(
            step.configuration().extra,
            json!({"tags": {"team": "ml"}, "owner": "alice"})
                .as_object()
                .cloned()
                .unwrap()
        );

        step.configure(StepOptions::new().extra("owner", json!("bob")).replace())
            .unwrap();
        assert_eq!(
            step.configuration().extra,
            json!({"owner": "bob"}).as_object().cloned().unwrap()
        );
    }

    #[test]
    fn test_configure_unknown_output_changes_nothing() {
        let fixture = TestCollaborators::new();
        let mut step = adder_step().instance(&fixture.collaborators).unwrap();
        let before = step.configuration().clone();

        let err = step
            .configure(
                StepOptions::new()
                    .enable_cache(false)
                    .output_materializer("missing", crate::materializers::BUILTIN_MATERIALIZER),
            )
            .unwrap_err();

        assert_eq!(
            err,
            StepflowError::Interface(StepInterfaceError::UnknownOutput {
                step: "adder".to_string(),
                output: "missing".to_string(),
                allowed: vec!["output".to_string()],
            })
        );
        assert_eq!(step.configuration(), &before);
    }

    #[test]
    fn test_configure_unknown_parameter() {
        let fixture = TestCollaborators::new();
        let mut step = adder_step().instance(&fixture.collaborators).unwrap();

        step.configure(StepOptions::new().parameter("a", json!(1)))
            .unwrap();
        let err = step
            .configure(StepOptions::new().parameter("c", json!(1)))
            .unwrap_err();
        assert!(matches!(
            err,
            StepflowError::Interface(StepInterfaceError::UnknownParameter { ref parameter, .. }) if parameter == "c"
        ));
    }

    #[test]
    fn test_configure_settings_namespaces() {
        let fixture = TestCollaborators::new();
        let mut step = adder_step().instance(&fixture.collaborators).unwrap();

        step.configure(
            StepOptions::new()
                .setting("resources", json!({"cpu_count": 2}))
                .setting("orchestrator.kubernetes", json!({"pod": {}})),
        )
        .unwrap();
        assert_eq!(step.configuration().settings.len(), 2);

        let err = step
            .configure(StepOptions::new().setting("gpu", json!({})))
            .unwrap_err();
        assert!(matches!(
            err,
            StepflowError::Interface(StepInterfaceError::InvalidSettingsKey { .. })
        ));
    }

    #[test]
    fn test_configure_materializer_must_resolve_to_materializer() {
        let fixture = TestCollaborators::new();
        fixture
            .sources
            .register_code(crate::testing::source("my_pkg::helper"), "fn helper() {}");
        let mut step = adder_step().instance(&fixture.collaborators).unwrap();

        let err = step
            .configure(StepOptions::new().output_materializers("my_pkg::helper"))
            .unwrap_err();
        assert!(matches!(
            err,
            StepflowError::Interface(StepInterfaceError::InvalidMaterializer { .. })
        ));
        assert!(step.configuration().outputs.is_empty());
    }

    #[test]
    fn test_context_disables_cache_by_default() {
        let fixture = TestCollaborators::new();
        let step = context_step().instance(&fixture.collaborators).unwrap();
        assert_eq!(step.configuration().enable_cache, Some(false));

        let fixture = TestCollaborators::new()
            .with_options(DefinitionOptions::new().with_disable_cache_with_context(false));
        let step = context_step().instance(&fixture.collaborators).unwrap();
        assert_eq!(step.configuration().enable_cache, None);
    }

    #[test]
    fn test_direct_call_injects_context() {
        let fixture = TestCollaborators::new();
        let step = context_step().instance(&fixture.collaborators).unwrap();

        let output = step.call(CallArgs::new()).unwrap();
        assert_eq!(output.computed(), Some(&json!("reporter")));
    }

    #[test]
    fn test_recorded_invocation_keeps_literal_parameters() {
        let fixture = TestCollaborators::new();
        let loader = producer_step("loader", &[("number", TypeRef::int())])
            .instance(&fixture.collaborators)
            .unwrap();
        let adder = adder_step().instance(&fixture.collaborators).unwrap();

        let context = Arc::new(PipelineContext::new("adding"));
        {
            let _guard = Arc::clone(&context).activate().unwrap();
            let number = loader.call(CallArgs::new()).unwrap();
            let number = number.artifact().unwrap().clone();
            adder
                .call(CallArgs::new().arg(number).kwarg("b", json!(5)))
                .unwrap();
            adder.call(CallArgs::new().arg(json!(2))).unwrap();
        }

        let invocations = context.take_invocations();
        assert_eq!(
            invocations.keys().cloned().collect::<Vec<_>>(),
            vec!["loader", "adder", "adder_2"]
        );

        let with_artifact = &invocations["adder"];
        assert_eq!(with_artifact.parameters(), json!({"b": 5}).as_object().unwrap());
        assert_eq!(
            with_artifact.input_artifacts().keys().cloned().collect::<Vec<_>>(),
            vec!["a"]
        );

        let literal_only = &invocations["adder_2"];
        assert_eq!(literal_only.parameters(), json!({"a": 2, "b": 1}).as_object().unwrap());
        assert!(literal_only.input_artifacts().is_empty());
        assert!(invocations["loader"].parameters().is_empty());
    }

    #[test]
    fn test_direct_call_argument_errors() {
        let fixture = TestCollaborators::new();
        let step = adder_step().instance(&fixture.collaborators).unwrap();

        let err = step.call(CallArgs::new()).unwrap_err();
        assert_eq!(
            err,
            StepflowError::Interface(StepInterfaceError::WrongArguments {
                step: "adder".to_string(),
                reason: "missing a required argument: 'a'".to_string(),
            })
        );

        let err = step.call(CallArgs::new().arg(json!("two"))).unwrap_err();
        assert_eq!(
            err,
            StepflowError::Interface(StepInterfaceError::WrongArgumentType {
                step: "adder".to_string(),
                argument: "a".to_string(),
                expected: "int".to_string(),
                actual: "str".to_string(),
            })
        );

        let err = step
            .call(CallArgs::new().arg(json!(1)).kwarg("c", json!(2)))
            .unwrap_err();
        assert!(matches!(
            err,
            StepflowError::Interface(StepInterfaceError::WrongArguments { .. })
        ));
    }

    #[test]
    fn test_direct_call_entrypoint_failure() {
        let fixture = TestCollaborators::new();
        let step = StepDefinition::builder("broken", EntrypointSpec::new().returns_nothing())
            .run(|_| Err(anyhow::anyhow!("disk full")))
            .code("fn broken() { write_to_disk() }")
            .build()
            .unwrap()
            .instance(&fixture.collaborators)
            .unwrap();

        let err = step.call(CallArgs::new()).unwrap_err();
        assert_eq!(
            err,
            StepflowError::Execution("step 'broken' failed: disk full".to_string())
        );
    }

    #[test]
    fn test_direct_call_with_parameters_object() {
        let fixture = TestCollaborators::new();
        let parameters = trainer_parameters();
        let object = parameters
            .construct(json!({"learning_rate": 0.5}).as_object().unwrap())
            .unwrap();
        let step = trainer_step(Arc::clone(&parameters))
            .instance_with_parameters(&fixture.collaborators, object)
            .unwrap();

        let output = step
            .call(CallArgs::new().kwarg("data", json!([1.0])))
            .unwrap();
        assert_eq!(output.computed(), Some(&json!(0.5)));

        let unconfigured = trainer_step(parameters)
            .instance(&fixture.collaborators)
            .unwrap();
        let err = unconfigured
            .call(CallArgs::new().kwarg("data", json!([1.0])))
            .unwrap_err();
        assert!(matches!(err, StepflowError::MissingParameters(_)));
    }

    #[test]
    fn test_parameters_object_of_other_class_is_rejected() {
        let fixture = TestCollaborators::new();
        let other = Arc::new(ParametersClass::new("OtherParameters"));
        let object = other.construct(&Map::new()).unwrap();

        let err = trainer_step(trainer_parameters())
            .instance_with_parameters(&fixture.collaborators, object.clone())
            .unwrap_err();
        assert!(matches!(
            err,
            StepflowError::Interface(StepInterfaceError::InvalidParameters { ref class, .. }) if class == "TrainerParameters"
        ));

        let err = adder_step()
            .instance_with_parameters(&fixture.collaborators, object)
            .unwrap_err();
        assert!(matches!(
            err,
            StepflowError::Interface(StepInterfaceError::InvalidParameters { .. })
        ));
    }

    #[test]
    fn test_unserializable_argument() {
        let fixture = TestCollaborators::new();
        let step = consumer_step("consume", &[("a", TypeRef::dict())])
            .instance(&fixture.collaborators)
            .unwrap();
        let value: std::collections::HashMap<(i32, i32), i32> = [((1, 2), 3)].into_iter().collect();

        let err = step
            .call(CallArgs::new().arg(CallArg::literal(&value)))
            .unwrap_err();
        assert!(matches!(
            err,
            StepflowError::Interface(StepInterfaceError::NotJsonSerializable { ref argument, .. }) if argument == "a"
        ));
    }

    #[test]
    fn test_caching_parameters_follow_configured_materializers() {
        let fixture = TestCollaborators::new();
        let mut step = producer_step("load", &[("x", TypeRef::int())])
            .instance(&fixture.collaborators)
            .unwrap();

        let parameters = step.caching_parameters().unwrap();
        assert_eq!(parameters.len(), 1);
        assert!(parameters.contains_key(crate::caching::STEP_SOURCE_PARAMETER_NAME));

        step.configure(
            StepOptions::new().output_materializer("x", crate::materializers::BUILTIN_MATERIALIZER),
        )
        .unwrap();
        let parameters = step.caching_parameters().unwrap();
        assert!(parameters.contains_key("x_materializer_source"));
    }

    #[test]
    fn test_after_accumulates() {
        let fixture = TestCollaborators::new();
        let mut step = adder_step().instance(&fixture.collaborators).unwrap();
        step.after("load").after("clean").after("load");

        assert_eq!(
            step.upstream_steps().iter().cloned().collect::<Vec<_>>(),
            vec!["load".to_string(), "clean".to_string()]
        );
    }
}
