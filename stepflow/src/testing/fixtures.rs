//! Fixtures for step and pipeline tests.

use std::sync::Arc;

use serde_json::json;

use crate::collaborators::Collaborators;
use crate::config::DefinitionOptions;
use crate::materializers::MaterializerClass;
use crate::source::{InMemorySourceRegistry, Source};
use crate::steps::{
    EntrypointSpec, HookDecl, ParamDecl, ParameterField, ParametersClass, StepDefinition, TypeRef,
};

/// Collaborators backed by an in-memory source registry with the built-in
/// materializers registered.
#[derive(Debug, Clone)]
pub struct TestCollaborators {
    /// The registry behind `collaborators.sources`.
    pub sources: Arc<InMemorySourceRegistry>,
    /// The bundle handed to steps and pipelines.
    pub collaborators: Collaborators,
}

impl Default for TestCollaborators {
    fn default() -> Self {
        Self::new()
    }
}

impl TestCollaborators {
    /// Creates collaborators with default options.
    #[must_use]
    pub fn new() -> Self {
        let sources = Arc::new(InMemorySourceRegistry::new());
        let collaborators = Collaborators::with_builtin_materializers(Arc::clone(&sources));
        Self {
            sources,
            collaborators,
        }
    }

    /// Replaces the definition options.
    #[must_use]
    pub fn with_options(mut self, options: DefinitionOptions) -> Self {
        self.collaborators = self.collaborators.with_options(options);
        self
    }

    /// Registers a materializer class with source text, without making it a default.
    pub fn register_materializer(
        &self,
        import_path: &str,
        types: &[&str],
        code: &str,
    ) -> Arc<MaterializerClass> {
        let class = Arc::new(MaterializerClass::new(source(import_path), types.iter().copied()));
        self.sources.register_materializer(Arc::clone(&class), code);
        class
    }

    /// Registers a materializer class and makes it the default for its types.
    pub fn register_default_materializer(
        &self,
        import_path: &str,
        types: &[&str],
        code: &str,
    ) -> Arc<MaterializerClass> {
        let class = self.register_materializer(import_path, types, code);
        self.collaborators.materializers.register(Arc::clone(&class));
        class
    }

    /// Registers a hook.
    pub fn register_hook(&self, import_path: &str, hook: HookDecl) {
        self.sources.register_hook(source(import_path), hook, format!("fn {}() {{}}", hook_name(import_path)));
    }
}

fn hook_name(import_path: &str) -> &str {
    import_path.rsplit("::").next().unwrap_or(import_path)
}

/// Parses an import path, panicking on invalid input.
#[must_use]
#[allow(clippy::expect_used)]
pub fn source(import_path: &str) -> Source {
    Source::from_import_path(import_path).expect("valid import path in test fixture")
}

/// A step without inputs and with the given named outputs.
#[must_use]
#[allow(clippy::expect_used)]
pub fn producer_step(name: &str, outputs: &[(&str, TypeRef)]) -> StepDefinition {
    let values: serde_json::Map<String, serde_json::Value> = outputs
        .iter()
        .enumerate()
        .map(|(index, (output, _))| ((*output).to_string(), json!(index)))
        .collect();
    StepDefinition::builder(
        name,
        EntrypointSpec::new().returns_outputs(outputs.iter().map(|(n, t)| (*n, t.clone()))),
    )
    .run(move |_| Ok(serde_json::Value::Object(values.clone())))
    .code(format!("fn {name}() -> Outputs {{ produce() }}"))
    .build()
    .expect("valid producer step")
}

/// A step with the given inputs and no outputs.
#[must_use]
#[allow(clippy::expect_used)]
pub fn consumer_step(name: &str, inputs: &[(&str, TypeRef)]) -> StepDefinition {
    let spec = inputs.iter().fold(EntrypointSpec::new(), |spec, (input, type_ref)| {
        spec.param(ParamDecl::new(*input, type_ref.clone()))
    });
    StepDefinition::builder(name, spec.returns_nothing())
        .run(|_| Ok(serde_json::Value::Null))
        .code(format!("fn {name}(..) {{ consume() }}"))
        .build()
        .expect("valid consumer step")
}

/// A step adding two integers, returning a single `int` output.
#[must_use]
#[allow(clippy::expect_used)]
pub fn adder_step() -> StepDefinition {
    StepDefinition::builder(
        "adder",
        EntrypointSpec::new()
            .param(ParamDecl::new("a", TypeRef::int()))
            .param(ParamDecl::new("b", TypeRef::int()).with_default(json!(1)))
            .returns_single(TypeRef::int()),
    )
    .run(|args| Ok(json!(args.value::<i64>("a")? + args.value::<i64>("b")?)))
    .code("fn adder(a: i64, b: i64) -> i64 { a + b }")
    .docstring("Adds two integers.")
    .build()
    .expect("valid adder step")
}

/// A parameters class with a required `learning_rate` and a defaulted `epochs`.
#[must_use]
pub fn trainer_parameters() -> Arc<ParametersClass> {
    Arc::new(
        ParametersClass::new("TrainerParameters")
            .field(ParameterField::required("learning_rate", TypeRef::float()))
            .field(ParameterField::with_default("epochs", TypeRef::int(), json!(10))),
    )
}

/// A step taking a list input and a parameters object, returning a `float`.
#[must_use]
#[allow(clippy::expect_used)]
pub fn trainer_step(parameters: Arc<ParametersClass>) -> StepDefinition {
    StepDefinition::builder(
        "trainer",
        EntrypointSpec::new()
            .param(ParamDecl::new("data", TypeRef::list()))
            .param(ParamDecl::new("params", TypeRef::parameters(parameters)))
            .returns_single(TypeRef::float()),
    )
    .run(|args| {
        let params = args
            .parameters()
            .ok_or_else(|| anyhow::anyhow!("parameters were not bound"))?;
        Ok(params.get("learning_rate").cloned().unwrap_or_default())
    })
    .code("fn trainer(data: Vec<f64>, params: TrainerParameters) -> f64 { fit(data, params) }")
    .build()
    .expect("valid trainer step")
}
