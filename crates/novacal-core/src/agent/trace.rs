//! Reasoning trace

use serde::{Deserialize, Serialize};

/// One step of the reasoning trace shown to the user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TraceStep {
    /// The model invoked a tool
    ToolCall {
        tool: String,
        input: serde_json::Value,
    },
    /// What the tool returned
    Observation {
        tool: String,
        output: String,
        is_error: bool,
    },
}

/// Receives trace steps as the turn progresses
pub trait TraceSink: Send + Sync {
    fn record(&self, step: &TraceStep);
}

/// Sink that discards every step
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTrace;

impl TraceSink for NoopTrace {
    fn record(&self, _step: &TraceStep) {}
}

impl<F> TraceSink for F
where
    F: Fn(&TraceStep) + Send + Sync,
{
    fn record(&self, step: &TraceStep) {
        self(step)
    }
}
