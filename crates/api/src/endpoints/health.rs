//! Health probes.

use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::get};
use serde_json::json;

use crate::middleware::AppState;

/// Overall health with per-dependency status.
async fn health(State(state): State<AppState>) -> impl IntoResponse {
    match state.comment_service.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "status": "healthy", "services": { "database": "healthy" } })),
        ),
        Err(e) => {
            tracing::error!(error = %e, "Database health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unhealthy", "services": { "database": "unhealthy" } })),
            )
        }
    }
}

/// Readiness: the store answers.
async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    if state.comment_service.ping().await.is_ok() {
        (StatusCode::OK, Json(json!({ "ready": true })))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "ready": false, "message": "database unavailable" })),
        )
    }
}

async fn live() -> Json<serde_json::Value> {
    Json(json!({ "status": "alive" }))
}

/// Probe routes, mounted at the root.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route("/live", get(live))
}
