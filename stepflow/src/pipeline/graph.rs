//! The finalized pipeline graph handed to an orchestrator.

use crate::config::{PipelineConfiguration, StepConfiguration};
use crate::errors::PipelineContextError;
use chrono::{DateTime, Utc};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A step with its complete configuration and upstream step names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalizedStep {
    /// Unique name within the pipeline.
    pub name: String,
    /// Complete configuration.
    pub configuration: StepConfiguration,
    /// Steps that must run first.
    pub upstream_steps: Vec<String>,
}

/// A validated, acyclic pipeline graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineGraph {
    configuration: PipelineConfiguration,
    steps: IndexMap<String, FinalizedStep>,
    created_at: DateTime<Utc>,
}

impl PipelineGraph {
    /// Builds a graph from finalized steps.
    ///
    /// # Errors
    ///
    /// Returns an error if a step runs after an unknown step or after itself,
    /// or if the upstream relation contains a cycle.
    pub fn new(
        configuration: PipelineConfiguration,
        steps: impl IntoIterator<Item = FinalizedStep>,
    ) -> Result<Self, PipelineContextError> {
        let steps: IndexMap<String, FinalizedStep> = steps
            .into_iter()
            .map(|step| (step.name.clone(), step))
            .collect();

        for step in steps.values() {
            for upstream in &step.upstream_steps {
                if *upstream == step.name {
                    return Err(PipelineContextError::SelfDependency {
                        step: step.name.clone(),
                    });
                }
                if !steps.contains_key(upstream) {
                    return Err(PipelineContextError::UnknownUpstreamStep {
                        step: step.name.clone(),
                        upstream: upstream.clone(),
                    });
                }
            }
        }

        let graph = Self {
            configuration,
            steps,
            created_at: Utc::now(),
        };
        graph.detect_cycles()?;
        Ok(graph)
    }

    fn detect_cycles(&self) -> Result<(), PipelineContextError> {
        fn visit<'a>(
            node: &'a str,
            graph: &'a PipelineGraph,
            visited: &mut HashSet<&'a str>,
            path: &mut IndexSet<&'a str>,
        ) -> Result<(), Vec<String>> {
            if let Some(start) = path.get_index_of(node) {
                let mut cycle: Vec<String> = path.iter().skip(start).map(ToString::to_string).collect();
                cycle.push(node.to_string());
                return Err(cycle);
            }
            if !visited.insert(node) {
                return Ok(());
            }

            path.insert(node);
            if let Some(step) = graph.steps.get(node) {
                for upstream in &step.upstream_steps {
                    visit(upstream, graph, visited, path)?;
                }
            }
            path.pop();
            Ok(())
        }

        let mut visited = HashSet::new();
        for name in self.steps.keys() {
            visit(name, self, &mut visited, &mut IndexSet::new())
                .map_err(|cycle_path| PipelineContextError::CycleDetected { cycle_path })?;
        }
        Ok(())
    }

    /// Returns the pipeline configuration.
    #[must_use]
    pub const fn configuration(&self) -> &PipelineConfiguration {
        &self.configuration
    }

    /// Returns the pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.configuration.name
    }

    /// Returns when the graph was built.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the steps in invocation order.
    pub fn steps(&self) -> impl Iterator<Item = &FinalizedStep> {
        self.steps.values()
    }

    /// Returns a step by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FinalizedStep> {
        self.steps.get(name)
    }

    /// Returns the step names in invocation order.
    #[must_use]
    pub fn step_names(&self) -> Vec<String> {
        self.steps.keys().cloned().collect()
    }

    /// Returns the number of steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns true if the pipeline has no steps.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Returns every `(upstream, downstream)` edge.
    #[must_use]
    pub fn edges(&self) -> Vec<(String, String)> {
        self.steps
            .values()
            .flat_map(|step| {
                step.upstream_steps
                    .iter()
                    .map(|upstream| (upstream.clone(), step.name.clone()))
            })
            .collect()
    }

    /// Returns the step names so that every step comes after its upstream steps.
    ///
    /// Ties are broken by invocation order.
    #[must_use]
    pub fn topological_order(&self) -> Vec<String> {
        let mut placed: IndexSet<&str> = IndexSet::with_capacity(self.steps.len());
        while placed.len() < self.steps.len() {
            let ready = self.steps.values().find(|step| {
                !placed.contains(step.name.as_str())
                    && step
                        .upstream_steps
                        .iter()
                        .all(|upstream| placed.contains(upstream.as_str()))
            });
            match ready {
                Some(step) => {
                    placed.insert(step.name.as_str());
                }
                None => break,
            }
        }
        placed.into_iter().map(ToString::to_string).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PartialStepConfiguration;
    use pretty_assertions::assert_eq;

    fn step(name: &str, upstream: &[&str]) -> FinalizedStep {
        FinalizedStep {
            name: name.to_string(),
            configuration: StepConfiguration::try_from(PartialStepConfiguration::new(name)).unwrap(),
            upstream_steps: upstream.iter().map(ToString::to_string).collect(),
        }
    }

    fn graph(steps: Vec<FinalizedStep>) -> Result<PipelineGraph, PipelineContextError> {
        PipelineGraph::new(PipelineConfiguration::new("p"), steps)
    }

    #[test]
    fn test_edges_and_order() {
        let graph = graph(vec![
            step("load", &[]),
            step("report", &["train", "load"]),
            step("train", &["load"]),
        ])
        .unwrap();

        assert_eq!(
            graph.edges(),
            vec![
                ("train".to_string(), "report".to_string()),
                ("load".to_string(), "report".to_string()),
                ("load".to_string(), "train".to_string()),
            ]
        );
        assert_eq!(graph.topological_order(), vec!["load", "train", "report"]);
        assert_eq!(graph.len(), 3);
    }

    #[test]
    fn test_unknown_upstream() {
        let err = graph(vec![step("a", &["ghost"])]).unwrap_err();
        assert_eq!(
            err,
            PipelineContextError::UnknownUpstreamStep {
                step: "a".to_string(),
                upstream: "ghost".to_string(),
            }
        );
    }

    #[test]
    fn test_self_dependency() {
        let err = graph(vec![step("a", &["a"])]).unwrap_err();
        assert!(matches!(err, PipelineContextError::SelfDependency { .. }));
    }

    #[test]
    fn test_cycle() {
        let err = graph(vec![step("a", &["b"]), step("b", &["a"])]).unwrap_err();
        match err {
            PipelineContextError::CycleDetected { cycle_path } => {
                assert_eq!(cycle_path, vec!["a", "b", "a"]);
            }
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn test_serializes() {
        let graph = graph(vec![step("a", &[])]).unwrap();
        let value = serde_json::to_value(&graph).unwrap();
        assert_eq!(value["configuration"]["name"], "p");
        assert!(value["steps"]["a"].is_object());
    }
}
