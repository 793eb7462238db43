//! LLM API client and types
//!
//! Supports both Claude API and OpenAI-compatible APIs (Gemini, etc.)

mod client;
mod types;

pub use client::LlmClient;
pub use types::*;
