//! Error types for novacal-core

use thiserror::Error;

/// Main error type for novacal-core
#[derive(Error, Debug)]
pub enum Error {
    /// The model backend answered with a non-success status
    #[error("LLM API error ({}): {message}", status_label(.status))]
    LlmApi {
        status: Option<u16>,
        message: String,
    },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// Calendar OAuth credential is missing, expired or revoked
    #[error("Calendar authentication error: {0}")]
    Auth(String),

    /// The instruction template could not be rendered
    #[error("Prompt template error: {0}")]
    Template(String),

    /// The model produced output that could not be interpreted
    #[error("Output parsing error: {0}")]
    Parse(String),

    #[error("Tool execution error: {0}")]
    ToolExecution(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

fn status_label(status: &Option<u16>) -> String {
    status
        .map(|s| s.to_string())
        .unwrap_or_else(|| "no status".to_string())
}

impl Error {
    /// HTTP status carried by the error, if the backend provided one
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::LlmApi { status, .. } => *status,
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Result type alias for novacal-core
pub type Result<T> = std::result::Result<T, Error>;
