//! Declared types of step inputs, outputs and parameters.
//!
//! A [`TypeRef`] carries an explicit capability tag ([`TypeKind`]) so the
//! signature introspector can classify parameters without walking a type
//! hierarchy at runtime.

use super::ParametersClass;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// JSON-representable value kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    /// Accepts every value.
    Any,
    /// Booleans.
    Bool,
    /// Integers.
    Int,
    /// Numbers, integers included.
    Float,
    /// Strings.
    Str,
    /// Arrays.
    List,
    /// Objects.
    Dict,
}

impl ValueKind {
    /// Returns the canonical type name.
    #[must_use]
    pub const fn type_name(self) -> &'static str {
        match self {
            Self::Any => "Any",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::Str => "str",
            Self::List => "list",
            Self::Dict => "dict",
        }
    }

    /// Returns true if the value is of this kind.
    #[must_use]
    pub fn matches(self, value: &Value) -> bool {
        match self {
            Self::Any => true,
            Self::Bool => value.is_boolean(),
            Self::Int => value.is_i64() || value.is_u64(),
            Self::Float => value.is_number(),
            Self::Str => value.is_string(),
            Self::List => value.is_array(),
            Self::Dict => value.is_object(),
        }
    }
}

/// Capability tag of a declared type.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeKind {
    /// A JSON-representable value; may be passed as a literal.
    Value(ValueKind),
    /// A type that only flows between steps as an artifact.
    Opaque,
    /// A parameters object.
    Parameters(Arc<ParametersClass>),
    /// The step execution context.
    Context,
}

/// A declared type.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeRef {
    name: String,
    kind: TypeKind,
    optional: bool,
}

impl TypeRef {
    /// A JSON value type.
    #[must_use]
    pub fn value(kind: ValueKind) -> Self {
        Self {
            name: kind.type_name().to_string(),
            kind: TypeKind::Value(kind),
            optional: false,
        }
    }

    /// Any value.
    #[must_use]
    pub fn any() -> Self {
        Self::value(ValueKind::Any)
    }

    /// A boolean.
    #[must_use]
    pub fn bool() -> Self {
        Self::value(ValueKind::Bool)
    }

    /// An integer.
    #[must_use]
    pub fn int() -> Self {
        Self::value(ValueKind::Int)
    }

    /// A float.
    #[must_use]
    pub fn float() -> Self {
        Self::value(ValueKind::Float)
    }

    /// A string.
    #[must_use]
    pub fn string() -> Self {
        Self::value(ValueKind::Str)
    }

    /// A list.
    #[must_use]
    pub fn list() -> Self {
        Self::value(ValueKind::List)
    }

    /// A dict.
    #[must_use]
    pub fn dict() -> Self {
        Self::value(ValueKind::Dict)
    }

    /// A type that can only be passed between steps as an artifact.
    #[must_use]
    pub fn opaque(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: TypeKind::Opaque,
            optional: false,
        }
    }

    /// A parameters object of the given class.
    #[must_use]
    pub fn parameters(class: Arc<ParametersClass>) -> Self {
        Self {
            name: class.name().to_string(),
            kind: TypeKind::Parameters(class),
            optional: false,
        }
    }

    /// The step execution context.
    #[must_use]
    pub fn context() -> Self {
        Self {
            name: "StepContext".to_string(),
            kind: TypeKind::Context,
            optional: false,
        }
    }

    /// Marks the type as optional, so `null` is accepted.
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Returns the type name used for materializer lookup.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the capability tag.
    #[must_use]
    pub const fn kind(&self) -> &TypeKind {
        &self.kind
    }

    /// Returns true if `null` is accepted.
    #[must_use]
    pub const fn is_optional(&self) -> bool {
        self.optional
    }

    /// Returns the parameters class if this is a parameters-object type.
    #[must_use]
    pub fn parameters_class(&self) -> Option<&Arc<ParametersClass>> {
        match self.kind {
            TypeKind::Parameters(ref class) => Some(class),
            _ => None,
        }
    }

    /// Returns true if this is the execution context type.
    #[must_use]
    pub const fn is_context(&self) -> bool {
        matches!(self.kind, TypeKind::Context)
    }

    /// Returns true if a literal value is acceptable for this type.
    #[must_use]
    pub fn accepts(&self, value: &Value) -> bool {
        if value.is_null() {
            return self.optional || self.kind == TypeKind::Value(ValueKind::Any);
        }
        match self.kind {
            TypeKind::Value(kind) => kind.matches(value),
            TypeKind::Parameters(ref class) => value
                .as_object()
                .is_some_and(|values| class.construct(values).is_ok()),
            TypeKind::Opaque | TypeKind::Context => false,
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.optional {
            write!(f, "Option<{}>", self.name)
        } else {
            f.write_str(&self.name)
        }
    }
}

/// Short description of a value's kind for error messages.
#[must_use]
pub fn describe_value(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}
