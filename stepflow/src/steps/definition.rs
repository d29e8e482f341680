//! Step definitions: introspected once, instantiated many times.

use super::{
    Entrypoint, EntrypointArgs, EntrypointSpec, ParametersObject, Step, StepOptions, StepSignature,
};
use crate::collaborators::Collaborators;
use crate::config::DefinitionOptions;
use crate::errors::{SourceError, StepSignatureError, StepflowError};
use crate::source::{hash_source_code, Source, SourceResolver};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

struct DefinitionInner {
    name: String,
    signature: StepSignature,
    entrypoint: Entrypoint,
    source: Source,
    source_code: String,
    docstring: Option<String>,
    options: Option<StepOptions>,
}

/// An immutable step descriptor.
///
/// Cloning is cheap; clones share the introspected signature.
#[derive(Clone)]
pub struct StepDefinition {
    inner: Arc<DefinitionInner>,
}

impl fmt::Debug for StepDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepDefinition")
            .field("name", &self.inner.name)
            .field("source", &self.inner.source)
            .field("signature", &self.inner.signature)
            .finish_non_exhaustive()
    }
}

impl StepDefinition {
    /// Starts building a definition.
    #[must_use]
    pub fn builder(name: impl Into<String>, entrypoint: EntrypointSpec) -> StepDefinitionBuilder {
        StepDefinitionBuilder::new(name, entrypoint)
    }

    /// Returns the step name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Returns the introspected signature.
    #[must_use]
    pub fn signature(&self) -> &StepSignature {
        &self.inner.signature
    }

    /// Returns the entrypoint callable.
    #[must_use]
    pub fn entrypoint(&self) -> &Entrypoint {
        &self.inner.entrypoint
    }

    /// Returns the source of the step.
    #[must_use]
    pub fn source(&self) -> &Source {
        &self.inner.source
    }

    /// Returns the source text of the step.
    #[must_use]
    pub fn source_code(&self) -> &str {
        &self.inner.source_code
    }

    /// Returns the hash of the step's source text.
    #[must_use]
    pub fn source_hash(&self) -> String {
        hash_source_code(&self.inner.source_code)
    }

    /// Returns the documentation of the step.
    #[must_use]
    pub fn docstring(&self) -> Option<&str> {
        self.inner.docstring.as_deref()
    }

    /// Returns the options applied to every instance.
    #[must_use]
    pub fn class_options(&self) -> Option<&StepOptions> {
        self.inner.options.as_ref()
    }

    /// Creates a step instance.
    ///
    /// # Errors
    ///
    /// Returns an error if the class-level options are invalid.
    pub fn instance(&self, collaborators: &Collaborators) -> Result<Step, StepflowError> {
        Step::new(self.clone(), collaborators.clone())
    }

    /// Creates a step instance with a parameters object.
    ///
    /// # Errors
    ///
    /// Returns an error if the step has no parameters class or the object is
    /// of a different class.
    pub fn instance_with_parameters(
        &self,
        collaborators: &Collaborators,
        parameters: ParametersObject,
    ) -> Result<Step, StepflowError> {
        let mut step = self.instance(collaborators)?;
        step.configure(StepOptions::new().parameters(parameters))?;
        Ok(step)
    }
}

/// Builder for [`StepDefinition`].
pub struct StepDefinitionBuilder {
    name: String,
    spec: EntrypointSpec,
    entrypoint: Option<Entrypoint>,
    source: Option<Source>,
    source_code: Option<String>,
    docstring: Option<String>,
    options: Option<StepOptions>,
}

impl StepDefinitionBuilder {
    /// Creates a builder for the named step.
    #[must_use]
    pub fn new(name: impl Into<String>, spec: EntrypointSpec) -> Self {
        Self {
            name: name.into(),
            spec,
            entrypoint: None,
            source: None,
            source_code: None,
            docstring: None,
            options: None,
        }
    }

    /// Sets the entrypoint callable.
    #[must_use]
    pub fn run<F>(mut self, entrypoint: F) -> Self
    where
        F: Fn(&EntrypointArgs) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.entrypoint = Some(Arc::new(entrypoint));
        self
    }

    /// Sets the source of the step.
    #[must_use]
    pub fn source(mut self, source: Source) -> Self {
        self.source = Some(source);
        self
    }

    /// Sets the source text hashed into the caching fingerprint.
    #[must_use]
    pub fn code(mut self, code: impl Into<String>) -> Self {
        self.source_code = Some(code.into());
        self
    }

    /// Loads the source text of the step's source through a resolver.
    ///
    /// # Errors
    ///
    /// Returns an error if the resolver has no source text for the step.
    pub fn code_from(mut self, resolver: &dyn SourceResolver) -> Result<Self, SourceError> {
        self.source_code = Some(resolver.source_code(&self.step_source())?);
        Ok(self)
    }

    fn step_source(&self) -> Source {
        self.source
            .clone()
            .unwrap_or_else(|| Source::new("steps", Some(self.name.clone())))
    }

    /// Sets the documentation.
    #[must_use]
    pub fn docstring(mut self, docstring: impl Into<String>) -> Self {
        self.docstring = Some(docstring.into());
        self
    }

    /// Sets options applied to every instance.
    #[must_use]
    pub fn options(mut self, options: StepOptions) -> Self {
        self.options = Some(options);
        self
    }

    /// Builds the definition with default options.
    ///
    /// # Errors
    ///
    /// Returns an error if the entrypoint signature is invalid, or if the
    /// entrypoint or the source text is missing.
    pub fn build(self) -> Result<StepDefinition, StepflowError> {
        self.build_with(&DefinitionOptions::default())
    }

    /// Builds the definition.
    ///
    /// # Errors
    ///
    /// Returns an error if the entrypoint signature is invalid, or if the
    /// entrypoint or the source text is missing.
    pub fn build_with(self, options: &DefinitionOptions) -> Result<StepDefinition, StepflowError> {
        let signature =
            StepSignature::introspect(&self.name, &self.spec, &options.default_output_name)?;
        let source = self.step_source();
        let Some(entrypoint) = self.entrypoint else {
            return Err(StepSignatureError::MissingEntrypoint { step: self.name }.into());
        };
        let Some(source_code) = self.source_code.filter(|code| !code.trim().is_empty()) else {
            return Err(StepSignatureError::MissingSourceCode { step: self.name }.into());
        };

        tracing::debug!(
            step = %self.name,
            inputs = signature.inputs().len(),
            outputs = signature.outputs().len(),
            "Defined step"
        );

        Ok(StepDefinition {
            inner: Arc::new(DefinitionInner {
                name: self.name,
                signature,
                entrypoint,
                source,
                source_code,
                docstring: self.docstring,
                options: self.options,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::InMemorySourceRegistry;
    use crate::steps::{ParamDecl, TypeRef};
    use serde_json::json;

    #[test]
    fn test_build_definition() {
        let definition = StepDefinition::builder(
            "adder",
            EntrypointSpec::new()
                .param(ParamDecl::new("a", TypeRef::int()))
                .returns_single(TypeRef::int()),
        )
        .run(|args| Ok(json!(args.value::<i64>("a")? + 1)))
        .code("fn adder(a: i64) -> i64 { a + 1 }")
        .docstring("Adds one.")
        .build()
        .unwrap();

        assert_eq!(definition.name(), "adder");
        assert_eq!(definition.source().import_path(), "steps::adder");
        assert_eq!(definition.docstring(), Some("Adds one."));
        assert_eq!(definition.signature().output_names(), vec!["output"]);
        assert_eq!(
            definition.source_hash(),
            hash_source_code("fn adder(a: i64) -> i64 { a + 1 }")
        );

        let result = (definition.entrypoint())(&EntrypointArgs::new().with_value("a", json!(1)));
        assert_eq!(result.unwrap(), json!(2));
    }

    #[test]
    fn test_build_rejects_invalid_signature() {
        let err = StepDefinition::builder("bad", EntrypointSpec::new())
            .build()
            .unwrap_err();

        assert!(matches!(
            err,
            StepflowError::Signature(StepSignatureError::MissingReturnAnnotation { .. })
        ));
    }

    #[test]
    fn test_build_with_output_name() {
        let definition = StepDefinition::builder("s", EntrypointSpec::new().returns_single(TypeRef::int()))
            .run(|_| Ok(json!(1)))
            .code("fn s() -> i64 { 1 }")
            .build_with(&DefinitionOptions::new().with_default_output_name("result"))
            .unwrap();
        assert_eq!(definition.signature().output_names(), vec!["result"]);
    }

    #[test]
    fn test_build_requires_entrypoint() {
        let err = StepDefinition::builder("s", EntrypointSpec::new().returns_nothing())
            .code("fn s() {}")
            .build()
            .unwrap_err();

        assert_eq!(
            err,
            StepflowError::Signature(StepSignatureError::MissingEntrypoint {
                step: "s".to_string()
            })
        );
    }

    #[test]
    fn test_build_requires_source_code() {
        let missing = StepDefinition::builder("s", EntrypointSpec::new().returns_nothing())
            .run(|_| Ok(Value::Null))
            .build()
            .unwrap_err();
        let blank = StepDefinition::builder("s", EntrypointSpec::new().returns_nothing())
            .run(|_| Ok(Value::Null))
            .code("  \n")
            .build()
            .unwrap_err();

        let expected = StepflowError::Signature(StepSignatureError::MissingSourceCode {
            step: "s".to_string(),
        });
        assert_eq!(missing, expected);
        assert_eq!(blank, expected);
    }

    #[test]
    fn test_code_from_resolver_gives_distinct_hashes() {
        let registry = InMemorySourceRegistry::new();
        registry.register_code(Source::new("steps", Some("first".to_string())), "fn first() {}");
        registry.register_code(Source::new("steps", Some("second".to_string())), "fn second() {}");

        let build = |name: &str| {
            StepDefinition::builder(name, EntrypointSpec::new().returns_nothing())
                .run(|_| Ok(Value::Null))
                .code_from(&registry)
                .unwrap()
                .build()
                .unwrap()
        };
        let first = build("first");
        let second = build("second");

        assert_eq!(first.source_code(), "fn first() {}");
        assert_eq!(first.source_hash(), hash_source_code("fn first() {}"));
        assert_ne!(first.source_hash(), second.source_hash());
    }

    #[test]
    fn test_code_from_resolver_uses_explicit_source() {
        let registry = InMemorySourceRegistry::new();
        let source = Source::new("my_steps::training", Some("train".to_string()));
        registry.register_code(source.clone(), "fn train() {}");

        let definition = StepDefinition::builder("trainer", EntrypointSpec::new().returns_nothing())
            .run(|_| Ok(Value::Null))
            .source(source)
            .code_from(&registry)
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(definition.source_code(), "fn train() {}");
    }

    #[test]
    fn test_code_from_unregistered_source_fails() {
        let registry = InMemorySourceRegistry::new();
        let err = StepDefinition::builder("ghost", EntrypointSpec::new().returns_nothing())
            .code_from(&registry)
            .map(|_| ())
            .unwrap_err();

        assert_eq!(
            err,
            SourceError::NotFound {
                path: "steps::ghost".to_string()
            }
        );
    }
}
