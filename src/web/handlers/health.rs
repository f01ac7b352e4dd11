//! Health check endpoints

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use utoipa::ToSchema;

use crate::web::AppState;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

/// Basic readiness: healthy when the registry database answers
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service healthy", body = HealthResponse),
        (status = 503, description = "A dependency is down"),
    ),
    tag = "health"
)]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.database.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "healthy".to_string(),
            }),
        ),
        Err(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponse {
                status: "database unreachable".to_string(),
            }),
        ),
    }
}

/// Per-component readiness for operators
#[utoipa::path(
    get,
    path = "/health/detailed",
    responses((status = 200, description = "Component status map")),
    tag = "health"
)]
pub async fn detailed_health_check(State(state): State<AppState>) -> impl IntoResponse {
    let database = match state.database.ping().await {
        Ok(()) => serde_json::json!({"status": "connected"}),
        Err(e) => serde_json::json!({"status": "error", "error": e.to_string()}),
    };

    let nodes = state.directory.snapshot().await;
    let alive = nodes.iter().filter(|n| n.alive).count();

    Json(serde_json::json!({
        "database": database,
        "directory": {
            "nodes_registered": nodes.len(),
            "nodes_alive": alive,
        },
        "analytics": {
            "outbox_depth": state.analytics.outbox_depth(),
            "dropped_events": state.analytics.dropped_events(),
        },
    }))
}
