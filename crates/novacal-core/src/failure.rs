//! Failure classification
//!
//! Converts errors raised while building the agent or running a turn into a
//! fixed set of user-facing messages. Structured signals (HTTP status, error
//! variant) are consulted first; lowercase substring matching is only used
//! for errors that carry no structured information.

use std::fmt;

use crate::error::Error;

/// Where the failure was caught
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureSite {
    /// Building the model handle, the calendar toolkit or the prompt
    Initialization,
    /// Running one orchestrator turn
    Turn,
}

/// Failure category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    QuotaExceeded,
    InvalidCredential,
    PromptTemplate,
    OAuthToken,
    Reasoning,
    Unclassified,
}

/// A classified failure, ready to be shown to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub site: FailureSite,
    pub kind: FailureKind,
    /// Raw error text
    pub detail: String,
}

impl Failure {
    /// Classify an error caught at `site`
    pub fn classify(site: FailureSite, error: &Error) -> Self {
        let detail = error.to_string();
        let kind = structured_kind(site, error)
            .unwrap_or_else(|| kind_from_text(site, &detail));
        Self { site, kind, detail }
    }

    /// Classify a bare error message (no structured information available)
    pub fn from_message(site: FailureSite, message: impl Into<String>) -> Self {
        let detail = message.into();
        let kind = kind_from_text(site, &detail);
        Self { site, kind, detail }
    }

    /// Fixed user-facing message for this failure
    pub fn user_message(&self) -> String {
        match (self.site, self.kind) {
            (FailureSite::Initialization, FailureKind::QuotaExceeded) => {
                "🚨 **API Quota Exceeded**\n\nThe AI Engine is temporarily busy. The model provider's limits have been reached. Please wait a minute and try again.".to_string()
            }
            (FailureSite::Initialization, FailureKind::InvalidCredential) => {
                "🔑 **Invalid API Key**\n\nAuthentication failed. Please check the API key you provided. Ensure it is active and has permissions.".to_string()
            }
            (FailureSite::Initialization, FailureKind::PromptTemplate) => {
                "🧩 **Prompt Template Error**\n\nFailed to construct the Agent's reasoning prompt. Please check the prompt structure.".to_string()
            }
            (FailureSite::Initialization, FailureKind::OAuthToken) => {
                "🔐 **Google Calendar Auth Error**\n\nThe system could not authenticate with your Google Calendar. Please verify your 'token.json' file.".to_string()
            }
            (FailureSite::Initialization, _) => format!(
                "❌ **System Initialization Failed**\n\nAn unexpected error occurred while building the Agent Engine.\n\n**Technical Details:** `{}`",
                self.detail.to_lowercase()
            ),
            (FailureSite::Turn, FailureKind::QuotaExceeded) => {
                "⏳ API Quota Exceeded. Please wait a moment or verify your Google Cloud billing status.".to_string()
            }
            (FailureSite::Turn, FailureKind::InvalidCredential) => {
                "🔑 Authentication Failed. Please verify your API Key.".to_string()
            }
            (FailureSite::Turn, FailureKind::Reasoning) => {
                "🧩 Reasoning Error. The AI encountered an issue structuring its response. Please rephrase.".to_string()
            }
            (FailureSite::Turn, FailureKind::OAuthToken) => {
                "🔐 OAuth Token Expired. Please re-authenticate your token.json file with Google Calendar.".to_string()
            }
            (FailureSite::Turn, _) => {
                format!("❌ An unexpected system error occurred: {}", self.detail)
            }
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.user_message())
    }
}

fn structured_kind(site: FailureSite, error: &Error) -> Option<FailureKind> {
    match error {
        Error::Auth(_) => Some(FailureKind::OAuthToken),
        Error::Template(_) => match site {
            FailureSite::Initialization => Some(FailureKind::PromptTemplate),
            FailureSite::Turn => None,
        },
        Error::Parse(_) | Error::Json(_) => match site {
            FailureSite::Turn => Some(FailureKind::Reasoning),
            FailureSite::Initialization => None,
        },
        _ => match error.status()? {
            429 => Some(FailureKind::QuotaExceeded),
            401 | 403 => Some(FailureKind::InvalidCredential),
            // Gemini reports a bad key as 400 with no distinct status
            _ => None,
        },
    }
}

fn kind_from_text(site: FailureSite, text: &str) -> FailureKind {
    let text = text.to_lowercase();
    let has = |needles: &[&str]| needles.iter().any(|n| text.contains(n));

    match site {
        FailureSite::Initialization => {
            if has(&["429", "quota", "resource exhausted"]) {
                FailureKind::QuotaExceeded
            } else if has(&["api_key", "403", "permission denied"]) {
                FailureKind::InvalidCredential
            } else if has(&["template", "placeholder"]) {
                FailureKind::PromptTemplate
            } else if has(&["credentials", "token", "oauth"]) {
                FailureKind::OAuthToken
            } else {
                FailureKind::Unclassified
            }
        }
        FailureSite::Turn => {
            if has(&["429", "resource"]) {
                FailureKind::QuotaExceeded
            } else if has(&["api_key", "400"]) {
                FailureKind::InvalidCredential
            } else if has(&["parsing"]) {
                FailureKind::Reasoning
            } else if has(&["invalid_grant", "token"]) {
                FailureKind::OAuthToken
            } else {
                FailureKind::Unclassified
            }
        }
    }
}
