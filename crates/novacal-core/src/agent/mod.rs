//! Agent orchestration
//!
//! ```text
//!  user input ──► Orchestrator ──► LlmClient ──► tool calls? ──► ToolManager
//!                     ▲                              │               │
//!                     └──────── observations ◄───────┴───────────────┘
//! ```
//!
//! One [`Orchestrator`] lives as long as the session's agent handle. The
//! prompt's time anchor is fixed when it is built.

pub mod orchestrator;
pub mod prompt;
pub mod trace;

pub use orchestrator::{Orchestrator, TurnOutcome, EMPTY_ANSWER, ITERATION_LIMIT_ANSWER};
pub use prompt::{PromptTemplate, CURRENT_TIME_FORMAT, DEFAULT_PROMPT};
pub use trace::{NoopTrace, TraceSink, TraceStep};
