//! Steps: typed entrypoints, their definitions and configurable instances.

mod artifact;
mod call;
mod definition;
mod hooks;
mod options;
mod parameters;
mod signature;
mod step;
mod types;

pub use artifact::OutputArtifact;
pub use call::{
    Bound, CallArg, CallArgs, Entrypoint, EntrypointArgs, StepCallOutput, StepContext,
};
pub use definition::{StepDefinition, StepDefinitionBuilder};
pub use hooks::{resolve_hook, HookArgument, HookDecl, HookKind, HookSpec};
pub use options::{MaterializerSpec, ParametersOrDict, StepOptions};
pub use parameters::{ParameterField, ParametersClass, ParametersObject};
pub use signature::{EntrypointSpec, ParamDecl, ParamKind, ReturnAnnotation, StepSignature};
pub use step::Step;
pub use types::{describe_value, TypeKind, TypeRef, ValueKind};
