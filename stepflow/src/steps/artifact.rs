//! Output artifact references.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Placeholder for a step output that has not been computed yet.
///
/// Returned by step calls inside a pipeline definition. It may only be passed
/// to other steps of the same definition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutputArtifact {
    name: String,
    step_name: String,
    pipeline_id: Uuid,
}

impl OutputArtifact {
    /// Creates a new artifact reference.
    #[must_use]
    pub fn new(name: impl Into<String>, step_name: impl Into<String>, pipeline_id: Uuid) -> Self {
        Self {
            name: name.into(),
            step_name: step_name.into(),
            pipeline_id,
        }
    }

    /// Returns the output name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the unique name of the producing step.
    #[must_use]
    pub fn step_name(&self) -> &str {
        &self.step_name
    }

    /// Returns the id of the pipeline definition that produced the reference.
    #[must_use]
    pub const fn pipeline_id(&self) -> Uuid {
        self.pipeline_id
    }
}

impl fmt::Display for OutputArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.step_name, self.name)
    }
}
