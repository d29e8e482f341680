//! Parameters objects: structured bundles of named, typed, defaultable values.

use super::TypeRef;
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::sync::Arc;

/// One field of a parameters class.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterField {
    name: String,
    type_ref: TypeRef,
    default: Option<Value>,
}

impl ParameterField {
    /// A field without a default value.
    #[must_use]
    pub fn required(name: impl Into<String>, type_ref: TypeRef) -> Self {
        Self {
            name: name.into(),
            type_ref,
            default: None,
        }
    }

    /// A field with a default value.
    #[must_use]
    pub fn with_default(name: impl Into<String>, type_ref: TypeRef, default: Value) -> Self {
        Self {
            name: name.into(),
            type_ref,
            default: Some(default),
        }
    }

    /// Returns the field name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the field type.
    #[must_use]
    pub const fn type_ref(&self) -> &TypeRef {
        &self.type_ref
    }

    /// Returns the default value.
    #[must_use]
    pub const fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// Returns true if the field has no default.
    #[must_use]
    pub const fn is_required(&self) -> bool {
        self.default.is_none()
    }
}

/// A parameters class: the declaration a parameters object is built from.
#[derive(Debug, Clone, PartialEq)]
pub struct ParametersClass {
    name: String,
    fields: IndexMap<String, ParameterField>,
}

impl ParametersClass {
    /// Creates a class without fields.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: IndexMap::new(),
        }
    }

    /// Adds a field, replacing any field with the same name.
    #[must_use]
    pub fn field(mut self, field: ParameterField) -> Self {
        self.fields.insert(field.name.clone(), field);
        self
    }

    /// Returns the class name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the fields in declaration order.
    #[must_use]
    pub const fn fields(&self) -> &IndexMap<String, ParameterField> {
        &self.fields
    }

    /// Returns a field by name.
    #[must_use]
    pub fn get_field(&self, name: &str) -> Option<&ParameterField> {
        self.fields.get(name)
    }

    /// Builds a parameters object, filling unset fields from their defaults.
    ///
    /// # Errors
    ///
    /// Returns a description of every problem found: unknown fields, missing
    /// required fields and values of the wrong type.
    pub fn construct(self: &Arc<Self>, values: &Map<String, Value>) -> Result<ParametersObject, String> {
        let mut problems = Vec::new();

        for key in values.keys() {
            if !self.fields.contains_key(key) {
                problems.push(format!("unexpected field '{key}'"));
            }
        }

        let mut resolved = Map::new();
        for (name, field) in &self.fields {
            match values.get(name).or(field.default.as_ref()) {
                Some(value) if field.type_ref.accepts(value) => {
                    resolved.insert(name.clone(), value.clone());
                }
                Some(value) => problems.push(format!(
                    "field '{name}' expects `{}`, got {}",
                    field.type_ref,
                    super::types::describe_value(value)
                )),
                None => problems.push(format!("field '{name}' is required")),
            }
        }

        if problems.is_empty() {
            Ok(ParametersObject {
                class: Arc::clone(self),
                values: resolved,
            })
        } else {
            Err(problems.join("; "))
        }
    }
}

/// An instance of a parameters class.
#[derive(Debug, Clone, PartialEq)]
pub struct ParametersObject {
    class: Arc<ParametersClass>,
    values: Map<String, Value>,
}

impl ParametersObject {
    /// Returns the class of the object.
    #[must_use]
    pub const fn class(&self) -> &Arc<ParametersClass> {
        &self.class
    }

    /// Returns a field value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Returns all field values.
    #[must_use]
    pub const fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    /// Converts the object into its field map.
    #[must_use]
    pub fn into_values(self) -> Map<String, Value> {
        self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn trainer_params() -> Arc<ParametersClass> {
        Arc::new(
            ParametersClass::new("TrainerParameters")
                .field(ParameterField::required("learning_rate", TypeRef::float()))
                .field(ParameterField::with_default("epochs", TypeRef::int(), json!(10))),
        )
    }

    #[test]
    fn test_construct_fills_defaults() {
        let class = trainer_params();
        let values = json!({"learning_rate": 0.1});
        let params = class.construct(values.as_object().unwrap()).unwrap();

        assert_eq!(params.get("learning_rate"), Some(&json!(0.1)));
        assert_eq!(params.get("epochs"), Some(&json!(10)));
        assert_eq!(params.class().name(), "TrainerParameters");
    }

    #[test]
    fn test_construct_reports_every_problem() {
        let class = trainer_params();
        let values = json!({"epochs": "many", "momentum": 0.9});
        let err = class.construct(values.as_object().unwrap()).unwrap_err();

        assert!(err.contains("momentum"));
        assert!(err.contains("epochs"));
        assert!(err.contains("learning_rate"));
    }

    #[test]
    fn test_field_flags() {
        let class = trainer_params();
        assert!(class.get_field("learning_rate").unwrap().is_required());
        assert!(!class.get_field("epochs").unwrap().is_required());
        assert_eq!(class.fields().len(), 2);
    }
}
