//! Structured logging of pipeline definitions.

use crate::errors::{ErrorSuggestions, StepflowError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Debug;
use std::time::Instant;

/// Span attributes describing one pipeline definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DefinitionSpanAttributes {
    /// Pipeline name.
    pub pipeline_name: String,
    /// Id of the pipeline context.
    pub pipeline_id: Option<String>,
    /// Number of finalized steps.
    pub step_count: Option<usize>,
    /// Number of edges between steps.
    pub edge_count: Option<usize>,
    /// Definition time in milliseconds.
    pub duration_ms: Option<f64>,
}

impl DefinitionSpanAttributes {
    /// Creates attributes for the named pipeline.
    #[must_use]
    pub fn new(pipeline_name: impl Into<String>) -> Self {
        Self {
            pipeline_name: pipeline_name.into(),
            ..Self::default()
        }
    }

    /// Sets the pipeline context id.
    #[must_use]
    pub fn with_pipeline_id(mut self, id: impl Into<String>) -> Self {
        self.pipeline_id = Some(id.into());
        self
    }

    /// Sets the graph size.
    #[must_use]
    pub const fn with_graph_size(mut self, steps: usize, edges: usize) -> Self {
        self.step_count = Some(steps);
        self.edge_count = Some(edges);
        self
    }

    /// Sets the duration.
    #[must_use]
    pub const fn with_duration_ms(mut self, duration_ms: f64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    /// Converts to OpenTelemetry attributes.
    #[must_use]
    pub fn to_otel_attributes(&self) -> HashMap<String, String> {
        let mut attrs = HashMap::new();
        attrs.insert("pipeline.name".to_string(), self.pipeline_name.clone());

        if let Some(ref v) = self.pipeline_id {
            attrs.insert("pipeline.id".to_string(), v.clone());
        }
        if let Some(v) = self.step_count {
            attrs.insert("pipeline.step_count".to_string(), v.to_string());
        }
        if let Some(v) = self.edge_count {
            attrs.insert("pipeline.edge_count".to_string(), v.to_string());
        }
        if let Some(v) = self.duration_ms {
            attrs.insert("pipeline.definition_ms".to_string(), format!("{v:.3}"));
        }

        attrs
    }
}

/// Measures how long a definition takes.
#[derive(Debug)]
pub struct SpanTimer {
    start: Instant,
}

impl SpanTimer {
    /// Starts the timer.
    #[must_use]
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Returns the elapsed time in milliseconds.
    #[must_use]
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

/// Receives pipeline definition lifecycle events.
pub trait DefinitionEmitter: Send + Sync + Debug {
    /// A definition started.
    fn definition_started(&self, attributes: &DefinitionSpanAttributes);

    /// A definition produced a graph.
    fn definition_completed(&self, attributes: &DefinitionSpanAttributes);

    /// A definition failed.
    fn definition_failed(&self, attributes: &DefinitionSpanAttributes, error: &StepflowError);
}

/// Discards every event.
#[derive(Debug, Clone, Default)]
pub struct NoOpDefinitionEmitter;

impl DefinitionEmitter for NoOpDefinitionEmitter {
    fn definition_started(&self, _attributes: &DefinitionSpanAttributes) {}
    fn definition_completed(&self, _attributes: &DefinitionSpanAttributes) {}
    fn definition_failed(&self, _attributes: &DefinitionSpanAttributes, _error: &StepflowError) {}
}

/// Logs every event through `tracing`.
#[derive(Debug, Clone, Default)]
pub struct LoggingDefinitionEmitter;

impl DefinitionEmitter for LoggingDefinitionEmitter {
    fn definition_started(&self, attributes: &DefinitionSpanAttributes) {
        tracing::info!(pipeline = %attributes.pipeline_name, "Defining pipeline");
    }

    fn definition_completed(&self, attributes: &DefinitionSpanAttributes) {
        tracing::info!(
            pipeline = %attributes.pipeline_name,
            steps = attributes.step_count,
            edges = attributes.edge_count,
            duration_ms = attributes.duration_ms,
            "Pipeline defined"
        );
    }

    fn definition_failed(&self, attributes: &DefinitionSpanAttributes, error: &StepflowError) {
        let code = error.error_info().map(|info| info.code);
        let suggestion = code.as_deref().and_then(ErrorSuggestions::get);
        tracing::error!(
            pipeline = %attributes.pipeline_name,
            error = %error,
            code = ?code,
            suggestion = ?suggestion,
            duration_ms = attributes.duration_ms,
            "Pipeline definition failed"
        );
    }
}
