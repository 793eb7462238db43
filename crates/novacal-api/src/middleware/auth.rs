//! Bearer key authentication
//!
//! Active only when `api.key` is configured.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use tracing::debug;

use crate::error::ApiError;
use crate::server::AppState;

/// Reject requests whose bearer token does not match the configured key
pub async fn auth_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let provided = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    if validate_api_key(provided, state.api_key.as_deref()) {
        Ok(next.run(request).await)
    } else {
        debug!("Rejected request to {}", request.uri().path());
        Err(ApiError::AuthFailed)
    }
}

/// Whether `provided` satisfies `expected`; no expected key allows everything
pub fn validate_api_key(provided: Option<&str>, expected: Option<&str>) -> bool {
    match (provided, expected) {
        (Some(p), Some(e)) => p == e,
        (_, None) => true,
        (None, Some(_)) => false,
    }
}
