//! WebAPI - HTTP and WebSocket Endpoints
//!
//! ## Responsibilities
//!
//! - HTTP API routes
//! - Multipart upload parsing
//! - WebSocket session handling
//! - Response formatting

mod routes;

pub use routes::create_router;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

use crate::formats::{ACCEPTED_FORMATS, ONE_MB};
use crate::models::{FormatsResponse, HealthResponse};
use crate::state::AppState;

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let stats = state.store.stats().await;

    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_sec: state.started_at.elapsed().as_secs(),
        artifact_count: stats.artifact_count,
        stored_bytes: stats.total_bytes,
        ws_clients: state.realtime.connection_count().await,
    })
}

/// Accepted formats and size ceiling
pub async fn formats(State(state): State<AppState>) -> impl IntoResponse {
    let max_size_bytes = state.ingress.max_file_size();

    Json(FormatsResponse {
        formats: ACCEPTED_FORMATS.iter().map(|f| f.to_string()).collect(),
        max_size_bytes,
        max_size_mb: max_size_bytes / ONE_MB,
    })
}
