//! Materializers: per-type serializers resolved for every step output.
//!
//! This crate never runs a materializer. It only needs to know which
//! materializer class handles which output type, where that class lives
//! and what its source text hashes to.

mod builtin;
mod registry;

pub use builtin::{
    builtin_materializers, register_builtin_materializers, ARRAY_MATERIALIZER,
    BUILTIN_CONTAINER_MATERIALIZER, BUILTIN_MATERIALIZER,
};
pub use registry::MaterializerRegistry;

use crate::source::Source;
use serde::{Deserialize, Serialize};

/// A materializer class known by its source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterializerClass {
    source: Source,
    associated_types: Vec<String>,
}

impl MaterializerClass {
    /// Creates a materializer class handling the given type names.
    #[must_use]
    pub fn new(source: Source, associated_types: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            source,
            associated_types: associated_types.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns the class name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.source.attribute.as_deref().unwrap_or(&self.source.module)
    }

    /// Returns the source of the class.
    #[must_use]
    pub const fn source(&self) -> &Source {
        &self.source
    }

    /// Returns the type names this materializer handles.
    #[must_use]
    pub fn associated_types(&self) -> &[String] {
        &self.associated_types
    }

    /// Returns true if the materializer handles the given type name.
    #[must_use]
    pub fn handles(&self, type_name: &str) -> bool {
        self.associated_types.iter().any(|t| t == type_name)
    }
}
