//! Health check and fallback handlers.

use axum::{extract::State, http::StatusCode, http::Uri, Json};
use serde_json::json;

use super::ServerState;
use crate::models::HealthResponse;

/// `GET /health`
pub async fn health_handler(State(state): State<ServerState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        timestamp: chrono::Utc::now().to_rfc3339(),
        uptime: state.uptime_secs(),
        version: crate::VERSION,
    })
}

/// Unknown `/api` routes.
pub async fn not_found_handler(uri: Uri) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "Not found",
            "path": uri.path(),
        })),
    )
}
