//! Configuration layer.
//!
//! Configuration records are values: updates produce new records through a
//! pure merge function instead of mutating fields in place.

mod merge;
mod options;
mod pipeline;
mod settings;
mod step;

pub use merge::{merge_or_replace, recursive_update};
pub use options::{
    DefinitionOptions, DuplicateInputPolicy, ENV_DEFAULT_OUTPUT_NAME, ENV_DUPLICATE_INPUT_POLICY,
};
pub use pipeline::{PipelineConfiguration, PipelineConfigurationUpdate};
pub use settings::{SettingsRegistry, GENERAL_SETTINGS_KEYS, STACK_COMPONENT_TYPES};
pub use step::{
    ArtifactConfiguration, InputSpec, PartialArtifactConfiguration, PartialStepConfiguration,
    StepConfiguration, StepConfigurationUpdate,
};
