//! Error type for novacal-api

use axum::{
    response::{IntoResponse, Response},
    Json,
};
use http::StatusCode;
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use novacal_core::{Failure, SubmitError};

/// Errors returned by the HTTP handlers
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Authentication failed")]
    AuthFailed,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Building the model or the agent failed
    #[error("{0}")]
    Initialization(Failure),

    #[error("{0}")]
    Submit(#[from] SubmitError),

    /// The calendar service could not be read
    #[error("{0}")]
    Calendar(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::AuthFailed => StatusCode::UNAUTHORIZED,
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Initialization(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Submit(SubmitError::Offline | SubmitError::NotInitialized) => {
                StatusCode::CONFLICT
            }
            ApiError::Submit(SubmitError::Turn(_)) | ApiError::Calendar(_) => {
                StatusCode::BAD_GATEWAY
            }
        }
    }
}

/// Body of every error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!("Request failed with {}: {}", status, self);
        }
        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use novacal_core::{FailureKind, FailureSite};

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::Submit(SubmitError::Offline).status(),
            StatusCode::CONFLICT
        );

        let failure = Failure {
            site: FailureSite::Turn,
            kind: FailureKind::QuotaExceeded,
            detail: "429".to_string(),
        };
        let err = ApiError::Submit(SubmitError::Turn(failure));
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
        assert!(err.to_string().starts_with("⏳ API Quota Exceeded"));
    }
}
