//! Step signature introspection.
//!
//! An entrypoint is declared as plain data ([`EntrypointSpec`]) and turned into
//! a [`StepSignature`] once, when the step definition is built.

use super::{ParametersClass, TypeKind, TypeRef};
use crate::errors::StepSignatureError;
use indexmap::{IndexMap, IndexSet};
use serde_json::Value;
use std::sync::Arc;

/// Name of the implicit receiver parameter that introspection drops.
pub const RECEIVER_NAME: &str = "self";

/// How a parameter may be passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKind {
    /// Positionally or by keyword.
    PositionalOrKeyword,
    /// Only by keyword.
    KeywordOnly,
    /// Collects extra positional arguments.
    VarPositional,
    /// Collects extra keyword arguments.
    VarKeyword,
}

/// A declared entrypoint parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamDecl {
    /// Parameter name.
    pub name: String,
    /// How the parameter may be passed.
    pub kind: ParamKind,
    /// Declared type, if annotated.
    pub annotation: Option<TypeRef>,
    /// Default value.
    pub default: Option<Value>,
}

impl ParamDecl {
    /// An annotated positional-or-keyword parameter.
    #[must_use]
    pub fn new(name: impl Into<String>, annotation: TypeRef) -> Self {
        Self {
            name: name.into(),
            kind: ParamKind::PositionalOrKeyword,
            annotation: Some(annotation),
            default: None,
        }
    }

    /// An annotated keyword-only parameter.
    #[must_use]
    pub fn keyword_only(name: impl Into<String>, annotation: TypeRef) -> Self {
        Self {
            kind: ParamKind::KeywordOnly,
            ..Self::new(name, annotation)
        }
    }

    /// A parameter without annotation.
    #[must_use]
    pub fn unannotated(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ParamKind::PositionalOrKeyword,
            annotation: None,
            default: None,
        }
    }

    /// The implicit receiver.
    #[must_use]
    pub fn receiver() -> Self {
        Self::unannotated(RECEIVER_NAME)
    }

    /// A variadic positional parameter.
    #[must_use]
    pub fn var_positional(name: impl Into<String>) -> Self {
        Self {
            kind: ParamKind::VarPositional,
            ..Self::unannotated(name)
        }
    }

    /// A variadic keyword parameter.
    #[must_use]
    pub fn var_keyword(name: impl Into<String>) -> Self {
        Self {
            kind: ParamKind::VarKeyword,
            ..Self::unannotated(name)
        }
    }

    /// Sets the default value.
    #[must_use]
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }
}

/// A declared return annotation.
#[derive(Debug, Clone, PartialEq)]
pub enum ReturnAnnotation {
    /// The entrypoint has no outputs.
    None,
    /// A single unnamed output.
    Single(TypeRef),
    /// Named outputs, in order.
    Outputs(Vec<(String, TypeRef)>),
}

/// A declared entrypoint.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EntrypointSpec {
    /// Parameters in declaration order.
    pub params: Vec<ParamDecl>,
    /// Return annotation, if any.
    pub returns: Option<ReturnAnnotation>,
}

impl EntrypointSpec {
    /// Creates an entrypoint without parameters or return annotation.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a parameter.
    #[must_use]
    pub fn param(mut self, param: ParamDecl) -> Self {
        self.params.push(param);
        self
    }

    /// Sets the return annotation.
    #[must_use]
    pub fn returns(mut self, returns: ReturnAnnotation) -> Self {
        self.returns = Some(returns);
        self
    }

    /// Declares a single unnamed output.
    #[must_use]
    pub fn returns_single(self, type_ref: TypeRef) -> Self {
        self.returns(ReturnAnnotation::Single(type_ref))
    }

    /// Declares named outputs.
    #[must_use]
    pub fn returns_outputs<N: Into<String>>(self, outputs: impl IntoIterator<Item = (N, TypeRef)>) -> Self {
        self.returns(ReturnAnnotation::Outputs(
            outputs.into_iter().map(|(name, t)| (name.into(), t)).collect(),
        ))
    }

    /// Declares that the entrypoint has no outputs.
    #[must_use]
    pub fn returns_nothing(self) -> Self {
        self.returns(ReturnAnnotation::None)
    }
}

/// The typed input/output contract of a step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepSignature {
    params: Vec<ParamDecl>,
    inputs: IndexMap<String, TypeRef>,
    outputs: IndexMap<String, TypeRef>,
    parameters_name: Option<String>,
    parameters_class: Option<Arc<ParametersClass>>,
    context_name: Option<String>,
}

impl StepSignature {
    /// Introspects an entrypoint.
    ///
    /// A single unnamed output is named `default_output_name`.
    ///
    /// # Errors
    ///
    /// Returns an error for variadic or unannotated parameters, a missing
    /// return annotation, duplicate names, or more than one parameters-object
    /// or context parameter.
    pub fn introspect(
        step: &str,
        spec: &EntrypointSpec,
        default_output_name: &str,
    ) -> Result<Self, StepSignatureError> {
        let declared = match spec.params.first() {
            Some(first) if first.name == RECEIVER_NAME && first.annotation.is_none() => &spec.params[1..],
            _ => &spec.params[..],
        };

        let mut signature = Self {
            params: Vec::with_capacity(declared.len()),
            inputs: IndexMap::new(),
            outputs: IndexMap::new(),
            parameters_name: None,
            parameters_class: None,
            context_name: None,
        };
        let mut seen = IndexSet::new();

        for param in declared {
            match param.kind {
                ParamKind::VarPositional | ParamKind::VarKeyword => {
                    let stars = if param.kind == ParamKind::VarPositional { "*" } else { "**" };
                    return Err(StepSignatureError::VariableArguments {
                        step: step.to_string(),
                        argument: format!("{stars}{}", param.name),
                    });
                }
                ParamKind::PositionalOrKeyword | ParamKind::KeywordOnly => {}
            }
            if !seen.insert(param.name.as_str()) {
                return Err(StepSignatureError::DuplicateArgument {
                    step: step.to_string(),
                    argument: param.name.clone(),
                });
            }
            let Some(ref annotation) = param.annotation else {
                return Err(StepSignatureError::MissingAnnotation {
                    step: step.to_string(),
                    argument: param.name.clone(),
                });
            };

            match annotation.kind() {
                TypeKind::Parameters(class) => {
                    if let Some(ref first) = signature.parameters_name {
                        return Err(StepSignatureError::MultipleParameterObjects {
                            step: step.to_string(),
                            first: first.clone(),
                            second: param.name.clone(),
                        });
                    }
                    signature.parameters_name = Some(param.name.clone());
                    signature.parameters_class = Some(Arc::clone(class));
                }
                TypeKind::Context => {
                    if let Some(ref first) = signature.context_name {
                        return Err(StepSignatureError::MultipleContexts {
                            step: step.to_string(),
                            first: first.clone(),
                            second: param.name.clone(),
                        });
                    }
                    signature.context_name = Some(param.name.clone());
                }
                TypeKind::Value(_) | TypeKind::Opaque => {
                    signature.inputs.insert(param.name.clone(), annotation.clone());
                }
            }
            signature.params.push(param.clone());
        }

        match spec.returns {
            None => {
                return Err(StepSignatureError::MissingReturnAnnotation {
                    step: step.to_string(),
                })
            }
            Some(ReturnAnnotation::None) => {}
            Some(ReturnAnnotation::Single(ref type_ref)) => {
                signature
                    .outputs
                    .insert(default_output_name.to_string(), type_ref.clone());
            }
            Some(ReturnAnnotation::Outputs(ref outputs)) => {
                for (name, type_ref) in outputs {
                    if name.trim().is_empty() || signature.outputs.contains_key(name) {
                        return Err(StepSignatureError::InvalidOutputName {
                            step: step.to_string(),
                            output: name.clone(),
                        });
                    }
                    signature.outputs.insert(name.clone(), type_ref.clone());
                }
            }
        }

        Ok(signature)
    }

    /// Returns the declared parameters without the receiver.
    #[must_use]
    pub fn params(&self) -> &[ParamDecl] {
        &self.params
    }

    /// Returns the plain inputs and their types.
    #[must_use]
    pub const fn inputs(&self) -> &IndexMap<String, TypeRef> {
        &self.inputs
    }

    /// Returns the outputs and their types.
    #[must_use]
    pub const fn outputs(&self) -> &IndexMap<String, TypeRef> {
        &self.outputs
    }

    /// Returns the input names in declaration order.
    #[must_use]
    pub fn input_names(&self) -> Vec<String> {
        self.inputs.keys().cloned().collect()
    }

    /// Returns the output names in declaration order.
    #[must_use]
    pub fn output_names(&self) -> Vec<String> {
        self.outputs.keys().cloned().collect()
    }

    /// Returns the name of the parameters-object parameter.
    #[must_use]
    pub fn parameters_name(&self) -> Option<&str> {
        self.parameters_name.as_deref()
    }

    /// Returns the parameters class.
    #[must_use]
    pub const fn parameters_class(&self) -> Option<&Arc<ParametersClass>> {
        self.parameters_class.as_ref()
    }

    /// Returns the name of the context parameter.
    #[must_use]
    pub fn context_name(&self) -> Option<&str> {
        self.context_name.as_deref()
    }

    /// Returns true if the parameter is the parameters object or the context.
    #[must_use]
    pub fn is_special(&self, name: &str) -> bool {
        self.parameters_name.as_deref() == Some(name) || self.context_name.as_deref() == Some(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::steps::ParameterField;
    use pretty_assertions::assert_eq;

    fn params_class(name: &str) -> Arc<ParametersClass> {
        Arc::new(ParametersClass::new(name).field(ParameterField::required("n", TypeRef::int())))
    }

    fn introspect(spec: &EntrypointSpec) -> Result<StepSignature, StepSignatureError> {
        StepSignature::introspect("step", spec, "output")
    }

    #[test]
    fn test_classifies_parameters() {
        let spec = EntrypointSpec::new()
            .param(ParamDecl::receiver())
            .param(ParamDecl::new("data", TypeRef::opaque("DataFrame")))
            .param(ParamDecl::new("params", TypeRef::parameters(params_class("P"))))
            .param(ParamDecl::keyword_only("context", TypeRef::context()))
            .param(ParamDecl::new("scale", TypeRef::float()).with_default(serde_json::json!(1.0)))
            .returns_single(TypeRef::int());

        let signature = introspect(&spec).unwrap();
        assert_eq!(signature.input_names(), vec!["data", "scale"]);
        assert_eq!(signature.parameters_name(), Some("params"));
        assert_eq!(signature.context_name(), Some("context"));
        assert_eq!(signature.output_names(), vec!["output"]);
        assert_eq!(signature.params().len(), 4);
        assert!(signature.is_special("params"));
        assert!(!signature.is_special("data"));
    }

    #[test]
    fn test_introspection_is_idempotent() {
        let spec = EntrypointSpec::new()
            .param(ParamDecl::new("a", TypeRef::int()))
            .returns_outputs([("x", TypeRef::int()), ("y", TypeRef::string())]);

        assert_eq!(introspect(&spec).unwrap(), introspect(&spec).unwrap());
    }

    #[test]
    fn test_default_output_name() {
        let spec = EntrypointSpec::new().returns_single(TypeRef::int());
        let signature = StepSignature::introspect("step", &spec, "result").unwrap();
        assert_eq!(signature.output_names(), vec!["result"]);
    }

    #[test]
    fn test_no_outputs() {
        let spec = EntrypointSpec::new().returns_nothing();
        assert!(introspect(&spec).unwrap().outputs().is_empty());
    }

    #[test]
    fn test_rejects_variadic() {
        let spec = EntrypointSpec::new()
            .param(ParamDecl::var_keyword("kwargs"))
            .returns_nothing();
        assert_eq!(
            introspect(&spec).unwrap_err(),
            StepSignatureError::VariableArguments {
                step: "step".to_string(),
                argument: "**kwargs".to_string(),
            }
        );

        let spec = EntrypointSpec::new()
            .param(ParamDecl::var_positional("args"))
            .returns_nothing();
        assert!(introspect(&spec).unwrap_err().to_string().contains("*args"));
    }

    #[test]
    fn test_rejects_missing_annotations() {
        let spec = EntrypointSpec::new()
            .param(ParamDecl::unannotated("a"))
            .returns_nothing();
        assert!(matches!(
            introspect(&spec).unwrap_err(),
            StepSignatureError::MissingAnnotation { ref argument, .. } if argument == "a"
        ));

        let spec = EntrypointSpec::new().param(ParamDecl::new("a", TypeRef::int()));
        assert!(matches!(
            introspect(&spec).unwrap_err(),
            StepSignatureError::MissingReturnAnnotation { .. }
        ));
    }

    #[test]
    fn test_receiver_only_dropped_first() {
        let spec = EntrypointSpec::new()
            .param(ParamDecl::new("a", TypeRef::int()))
            .param(ParamDecl::receiver())
            .returns_nothing();
        assert!(matches!(
            introspect(&spec).unwrap_err(),
            StepSignatureError::MissingAnnotation { ref argument, .. } if argument == "self"
        ));
    }

    #[test]
    fn test_rejects_second_special_parameter() {
        let spec = EntrypointSpec::new()
            .param(ParamDecl::new("p1", TypeRef::parameters(params_class("A"))))
            .param(ParamDecl::new("p2", TypeRef::parameters(params_class("B"))))
            .returns_nothing();
        assert_eq!(
            introspect(&spec).unwrap_err(),
            StepSignatureError::MultipleParameterObjects {
                step: "step".to_string(),
                first: "p1".to_string(),
                second: "p2".to_string(),
            }
        );

        let spec = EntrypointSpec::new()
            .param(ParamDecl::new("c1", TypeRef::context()))
            .param(ParamDecl::new("c2", TypeRef::context()))
            .returns_nothing();
        let message = introspect(&spec).unwrap_err().to_string();
        assert!(message.contains("c1") && message.contains("c2"));
    }

    #[test]
    fn test_rejects_duplicate_names() {
        let spec = EntrypointSpec::new()
            .param(ParamDecl::new("a", TypeRef::int()))
            .param(ParamDecl::new("a", TypeRef::string()))
            .returns_nothing();
        assert!(matches!(
            introspect(&spec).unwrap_err(),
            StepSignatureError::DuplicateArgument { .. }
        ));

        let spec = EntrypointSpec::new().returns_outputs([("x", TypeRef::int()), ("x", TypeRef::int())]);
        assert!(matches!(
            introspect(&spec).unwrap_err(),
            StepSignatureError::InvalidOutputName { .. }
        ));
    }
}
