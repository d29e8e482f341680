//! # Stepflow
//!
//! Typed step definitions, layered step configuration and pipeline graph
//! assembly for ML workflows.
//!
//! Stepflow turns plain functions into pipeline steps:
//!
//! - **Step definitions**: entrypoint signatures are validated once and
//!   classified into artifact inputs, a parameters object and a context
//! - **Configuration**: settings, parameters, materializers and hooks are
//!   merged or replaced layer by layer, with pipeline-level defaults
//! - **Graph assembly**: calling steps inside a pipeline body records
//!   invocations; artifact references between them become edges
//! - **Caching**: every finalized step carries a content-addressed fingerprint
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use stepflow::prelude::*;
//!
//! let load = StepDefinition::builder(
//!     "load",
//!     EntrypointSpec::new().returns_single(TypeRef::list()),
//! )
//! .run(|_| Ok(serde_json::json!([1, 2, 3])))
//! .code("fn load() -> Vec<i64> { vec![1, 2, 3] }")
//! .build()?
//! .instance(&collaborators)?;
//!
//! let pipeline = Pipeline::new("training", collaborators, move || {
//!     load.call(CallArgs::new())?;
//!     Ok(())
//! });
//! let graph = pipeline.define()?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod caching;
pub mod collaborators;
pub mod config;
pub mod errors;
pub mod materializers;
pub mod observability;
pub mod pipeline;
pub mod source;
pub mod steps;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::collaborators::Collaborators;
    pub use crate::config::{
        DefinitionOptions, DuplicateInputPolicy, PartialStepConfiguration, StepConfiguration,
    };
    pub use crate::errors::{
        ErrorInfo, MissingStepParameterError, PipelineContextError, SourceError,
        StepInterfaceError, StepSignatureError, StepflowError,
    };
    pub use crate::materializers::{MaterializerClass, MaterializerRegistry};
    pub use crate::observability::{
        init_tracing, DefinitionEmitter, LoggingDefinitionEmitter, NoOpDefinitionEmitter,
    };
    pub use crate::pipeline::{Pipeline, PipelineGraph, PipelineOptions};
    pub use crate::source::{InMemorySourceRegistry, Source, SourceResolver};
    pub use crate::steps::{
        CallArg, CallArgs, EntrypointArgs, EntrypointSpec, HookArgument, HookDecl, OutputArtifact,
        ParamDecl, ParameterField, ParametersClass, Step, StepCallOutput, StepContext,
        StepDefinition, StepOptions, TypeRef,
    };
}
