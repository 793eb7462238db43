//! novacal-core: NovaCal core library
//!
//! Model client, tool system, conversation memory, agent orchestration and
//! the session lifecycle shared by the CLI and the HTTP API.

pub mod agent;
pub mod config;
pub mod error;
pub mod failure;
pub mod llm;
pub mod memory;
pub mod session;
pub mod tool;

pub use agent::{Orchestrator, PromptTemplate, TraceSink, TraceStep, TurnOutcome};
pub use config::{
    AgentConfig, ApiConfig, CalendarSettings, Config, LlmConfig, LlmProvider, SecretsConfig,
};
pub use error::{Error, Result};
pub use failure::{Failure, FailureKind, FailureSite};
pub use llm::{LlmClient, Message, MessageContent, ToolDefinition};
pub use memory::ConversationMemory;
pub use session::{AgentFactory, ChatMessage, ChatRole, Session, SessionState, SubmitError};
pub use tool::{SchemaBuilder, Tool, ToolManager, ToolResult, TurnContext};
