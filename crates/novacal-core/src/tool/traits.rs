//! Tool trait definition
//!
//! Defines the core trait for implementing tools that the model can
//! request during a turn.

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use super::context::TurnContext;
use crate::Result;

/// Tool execution result
#[derive(Debug, Clone, PartialEq)]
pub struct ToolResult {
    /// Output string from tool execution
    pub output: String,
    /// Whether the execution resulted in an error
    pub is_error: bool,
}

impl ToolResult {
    /// Create a successful tool result
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            is_error: false,
        }
    }

    /// Create an error tool result
    pub fn error(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            is_error: true,
        }
    }
}

/// A capability the model may invoke by name
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name as advertised to the model
    fn name(&self) -> &str;

    /// Description shown to the model when selecting tools
    fn description(&self) -> &str;

    /// JSON schema for the tool's input parameters
    fn input_schema(&self) -> JsonValue;

    /// Execute the tool with the given input.
    ///
    /// `turn` holds the event identifiers resolved so far in the current
    /// turn. Lookups record into it; mutations consult it.
    async fn execute(&self, input: JsonValue, turn: &TurnContext) -> Result<ToolResult>;
}
