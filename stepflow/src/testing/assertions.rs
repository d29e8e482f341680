//! Assertions for finalized pipeline graphs.

use crate::config::StepConfiguration;
use crate::pipeline::PipelineGraph;

/// Asserts that the graph contains exactly the given steps, in invocation order.
pub fn assert_step_names(graph: &PipelineGraph, expected: &[&str]) {
    let names = graph.step_names();
    assert_eq!(
        names, expected,
        "Expected steps {:?}, got {:?}",
        expected, names
    );
}

/// Asserts that the graph contains the edge `upstream -> downstream`.
pub fn assert_edge(graph: &PipelineGraph, upstream: &str, downstream: &str) {
    let edges = graph.edges();
    assert!(
        edges.iter().any(|(from, to)| from == upstream && to == downstream),
        "Expected edge {} -> {}, got {:?}",
        upstream,
        downstream,
        edges
    );
}

/// Asserts that a step has no upstream steps.
pub fn assert_root(graph: &PipelineGraph, step: &str) {
    let upstream = graph.get(step).map(|s| s.upstream_steps.clone());
    assert_eq!(
        upstream,
        Some(Vec::new()),
        "Expected '{}' to be a root step, got upstream {:?}",
        step,
        upstream
    );
}

/// Asserts that an output resolved to the materializer at `import_path`.
pub fn assert_materializer(configuration: &StepConfiguration, output: &str, import_path: &str) {
    let actual = configuration
        .outputs
        .get(output)
        .map(|artifact| artifact.materializer_source.import_path());
    assert_eq!(
        actual.as_deref(),
        Some(import_path),
        "Unexpected materializer for output '{}' of step '{}'",
        output,
        configuration.name
    );
}
