//! Pipeline graph assembly.
//!
//! A [`Pipeline`] runs its body inside a [`PipelineContext`]. Every step
//! call in the body becomes a [`StepInvocation`]; once the body returns the
//! invocations are finalized into a [`PipelineGraph`].

mod context;
mod definition;
mod graph;
mod invocation;


pub use context::{ActivationGuard, PipelineContext};
pub use definition::{Pipeline, PipelineBody, PipelineOptions};
pub use graph::{FinalizedStep, PipelineGraph};
pub use invocation::StepInvocation;
