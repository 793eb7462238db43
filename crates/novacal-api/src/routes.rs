//! Route definitions

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::handlers::{agenda, calendar, chat, clear_screen, health, messages, reset, set_key};
use crate::server::AppState;

/// Routes reachable without the bearer key
pub fn public_routes() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

/// Routes behind the bearer key
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/api/chat", post(chat))
        .route("/api/messages", get(messages))
        .route("/api/session/clear", post(clear_screen))
        .route("/api/session/reset", post(reset))
        .route("/api/session/key", put(set_key))
        .route("/api/agenda", get(agenda))
        .route("/api/calendar", get(calendar))
}
