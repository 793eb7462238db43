//! HTTP API handlers

use axum::{extract::State, Json};
use chrono::Local;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use novacal_calendar::{ViewEvent, EMPTY_VIEW_MESSAGE};
use novacal_core::{ChatMessage, SessionState, TraceStep};

use crate::error::{ApiError, Result};
use crate::server::AppState;

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub answer: String,
    /// Tool calls and observations of the turn, in order
    pub trace: Vec<TraceStep>,
}

#[derive(Debug, Deserialize)]
pub struct KeyRequest {
    pub api_key: String,
}

/// Lifecycle notice plus the resulting state
#[derive(Debug, Serialize)]
pub struct NoticeResponse {
    pub notice: String,
    pub state: SessionState,
}

#[derive(Debug, Serialize)]
pub struct AgendaResponse {
    pub date: String,
    pub summary: String,
}

#[derive(Debug, Serialize)]
pub struct CalendarResponse {
    pub events: Vec<ViewEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}

// ============================================================================
// Handler functions
// ============================================================================

/// Health check endpoint
pub async fn health() -> &'static str {
    "OK"
}

/// Run one chat turn on the shared session
pub async fn chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>> {
    let message = req.message.trim();
    if message.is_empty() {
        return Err(ApiError::InvalidRequest("message must not be empty".to_string()));
    }

    let mut session = state.session.lock().await;
    session
        .ensure_ready(state.factory.as_ref())
        .map_err(ApiError::Initialization)?;

    let sink = |step: &TraceStep| debug!("Trace: {:?}", step);
    let outcome = session.submit(message, &sink).await?;

    info!(
        "Chat turn finished in {} iteration(s), {} trace step(s)",
        outcome.iterations,
        outcome.steps.len()
    );

    Ok(Json(ChatResponse {
        answer: outcome.answer,
        trace: outcome.steps,
    }))
}

/// Visible transcript
pub async fn messages(State(state): State<AppState>) -> Json<Vec<ChatMessage>> {
    let session = state.session.lock().await;
    Json(session.transcript().to_vec())
}

/// Clear the transcript, keep the model's memory
pub async fn clear_screen(State(state): State<AppState>) -> Json<NoticeResponse> {
    let mut session = state.session.lock().await;
    let notice = session.clear_screen();
    Json(NoticeResponse {
        notice: notice.to_string(),
        state: session.state(),
    })
}

/// Drop transcript, model, memory and agent
pub async fn reset(State(state): State<AppState>) -> Json<NoticeResponse> {
    let mut session = state.session.lock().await;
    let notice = session.full_reset();
    Json(NoticeResponse {
        notice: notice.to_string(),
        state: session.state(),
    })
}

/// Replace the model API key; everything built from the old one is dropped
pub async fn set_key(
    State(state): State<AppState>,
    Json(req): Json<KeyRequest>,
) -> Result<Json<NoticeResponse>> {
    if req.api_key.trim().is_empty() {
        return Err(ApiError::InvalidRequest("api_key must not be empty".to_string()));
    }

    let mut session = state.session.lock().await;
    let notice = session.set_api_key(req.api_key);
    Ok(Json(NoticeResponse {
        notice: notice.to_string(),
        state: session.state(),
    }))
}

/// Today's schedule on the primary and holiday calendars
pub async fn agenda(State(state): State<AppState>) -> Json<AgendaResponse> {
    let today = Local::now().format("%Y-%m-%d").to_string();
    let summary = state.lookup.range_summary(&today, &today, None).await;
    Json(AgendaResponse {
        date: today,
        summary,
    })
}

/// Records for the visual calendar grid
pub async fn calendar(State(state): State<AppState>) -> Result<Json<CalendarResponse>> {
    let events = state.view.events().await.map_err(ApiError::Calendar)?;
    let notice = events.is_empty().then(|| EMPTY_VIEW_MESSAGE.to_string());
    Ok(Json(CalendarResponse { events, notice }))
}
