//! HTTP API Server
//!
//! Starts and manages the axum-based HTTP server.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{middleware::from_fn_with_state, Router};
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use novacal_calendar::{CalendarToolkit, CalendarView, EventLookup};
use novacal_core::{AgentFactory, Session};

use crate::middleware::auth::auth_middleware;
use crate::routes::{api_routes, public_routes};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// The single assistant session; one interaction at a time
    pub session: Arc<Mutex<Session>>,
    pub factory: Arc<dyn AgentFactory>,
    pub lookup: Arc<EventLookup>,
    pub view: Arc<CalendarView>,
    /// Bearer key required on `/api` routes
    pub api_key: Option<String>,
}

impl AppState {
    pub fn new(
        session: Session,
        factory: Arc<dyn AgentFactory>,
        toolkit: &CalendarToolkit,
        api_key: Option<String>,
    ) -> Self {
        Self {
            session: Arc::new(Mutex::new(session)),
            factory,
            lookup: toolkit.lookup(),
            view: toolkit.view(),
            api_key: api_key.filter(|k| !k.is_empty()),
        }
    }
}

/// Build the application router
pub fn app(state: AppState) -> Router {
    let api = api_routes().route_layer(from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes())
        .merge(api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the HTTP API server
pub async fn start_server(port: u16, state: AppState) -> anyhow::Result<()> {
    let app = app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("HTTP API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down HTTP API");
        })
        .await?;

    Ok(())
}
