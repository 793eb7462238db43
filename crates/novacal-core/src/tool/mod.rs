//! Tool system
//!
//! Tools are the capabilities the model may invoke during a turn. Each
//! execution receives the turn's [`TurnContext`].

pub mod context;
pub mod definition;
pub mod manager;
pub mod traits;

pub use context::TurnContext;
pub use definition::{SchemaBuilder, ToolDefinition};
pub use manager::ToolManager;
pub use traits::{Tool, ToolResult};
