//! novacal-api: HTTP API for NovaCal
//!
//! Exposes the assistant session over REST: chat turns, transcript, session
//! resets, today's agenda and the visual calendar feed. Built with axum.

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod server;

pub use error::{ApiError, Result};
pub use server::{AppState, app, start_server};
