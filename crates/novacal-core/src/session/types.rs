//! Session types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who wrote a transcript message
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    Human,
    Ai,
}

/// One entry of the visible transcript
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn human(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Human,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn ai(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Ai,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Lifecycle of a session
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No API key
    Uninitialized,
    /// Key present, agent not built yet
    Authenticated,
    /// Model, memory and agent are built
    Ready,
}

pub const NOTICE_KEY_UPDATED: &str = "API Key updated! System environment reset.";
pub const NOTICE_SCREEN_CLEARED: &str = "Screen cleared! AI context retained.";
pub const NOTICE_FULL_RESET: &str = "System fully reset. AI memory and context wiped!";
pub const NOTICE_MISSING_KEY: &str = "Please enter your Google API Key to proceed.";
