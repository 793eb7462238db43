//! Error types for novacal-calendar

use thiserror::Error;

/// novacal-calendar error type
#[derive(Error, Debug)]
pub enum CalendarError {
    /// Google answered with a non-success status
    #[error("Calendar API error {status} ({reason}): {message}")]
    Api {
        status: u16,
        reason: String,
        message: String,
    },

    /// token.json is missing, unreadable, expired or revoked
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A success status whose body lacks the event's identity or times
    #[error("Incomplete response: {0}")]
    IncompleteResponse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CalendarError {
    /// HTTP status of an API error
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Whether the service reported the resource as already gone
    pub fn is_gone(&self) -> bool {
        matches!(self.status(), Some(404 | 410))
    }
}

impl From<CalendarError> for novacal_core::Error {
    fn from(err: CalendarError) -> Self {
        match err {
            CalendarError::Auth(msg) => novacal_core::Error::Auth(msg),
            CalendarError::Http(e) => novacal_core::Error::Http(e),
            CalendarError::Io(e) => novacal_core::Error::Io(e),
            CalendarError::Json(e) => novacal_core::Error::Json(e),
            other => novacal_core::Error::ToolExecution(other.to_string()),
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, CalendarError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gone_statuses() {
        let gone = CalendarError::Api {
            status: 410,
            reason: "deleted".to_string(),
            message: "Resource has been deleted".to_string(),
        };
        assert!(gone.is_gone());

        let forbidden = CalendarError::Api {
            status: 403,
            reason: "forbidden".to_string(),
            message: "Forbidden".to_string(),
        };
        assert!(!forbidden.is_gone());
    }

    #[test]
    fn test_auth_maps_to_core_auth() {
        let err: novacal_core::Error = CalendarError::Auth("invalid_grant".to_string()).into();
        assert!(matches!(err, novacal_core::Error::Auth(_)));
    }
}
