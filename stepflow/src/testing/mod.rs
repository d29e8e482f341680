//! Testing utilities for step definitions and pipelines.
//!
//! This module provides:
//! - Collaborators backed by an in-memory source registry
//! - Ready-made step definitions
//! - Assertions for finalized graphs

mod assertions;
mod fixtures;

pub use assertions::{assert_edge, assert_materializer, assert_root, assert_step_names};
pub use fixtures::{
    adder_step, consumer_step, producer_step, source, trainer_parameters, trainer_step,
    TestCollaborators,
};
