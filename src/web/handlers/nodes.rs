//! Node registration and reporting endpoints
//!
//! The heartbeat path is the only mutator of the node directory; progress
//! reports drive artifact lifecycle transitions asynchronously.

use axum::{Json, extract::State};
use serde::Serialize;
use utoipa::ToSchema;

use crate::errors::AppError;
use crate::models::{Node, NodeHeartbeat};
use crate::services::node_report_service::ArtifactProgressReport;
use crate::web::{AppState, responses::ApiResponse};

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HeartbeatAck {
    pub registered: bool,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReportAck {
    /// Whether the report moved the artifact; stale reports do not
    pub applied: bool,
}

/// Node registration/heartbeat upsert
#[utoipa::path(
    post,
    path = "/api/v1/nodes/heartbeat",
    request_body = NodeHeartbeat,
    responses(
        (status = 200, description = "Node registered", body = HeartbeatAck),
        (status = 400, description = "Empty node id"),
    ),
    tag = "nodes"
)]
pub async fn heartbeat(
    State(state): State<AppState>,
    Json(report): Json<NodeHeartbeat>,
) -> Result<Json<ApiResponse<HeartbeatAck>>, AppError> {
    state.directory.upsert_node(report).await?;
    Ok(Json(ApiResponse::success(HeartbeatAck { registered: true })))
}

/// Operator listing of the full fleet, stale nodes included
#[utoipa::path(
    get,
    path = "/api/v1/nodes",
    responses((status = 200, description = "Directory snapshot", body = [Node])),
    tag = "nodes"
)]
pub async fn list_nodes(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<Node>>>, AppError> {
    Ok(Json(ApiResponse::success(state.directory.snapshot().await)))
}

/// Asynchronous artifact progress report from a node agent
#[utoipa::path(
    post,
    path = "/api/v1/nodes/artifacts/report",
    request_body = ArtifactProgressReport,
    responses(
        (status = 200, description = "Report processed", body = ReportAck),
        (status = 404, description = "Unknown artifact"),
    ),
    tag = "nodes"
)]
pub async fn artifact_report(
    State(state): State<AppState>,
    Json(report): Json<ArtifactProgressReport>,
) -> Result<Json<ApiResponse<ReportAck>>, AppError> {
    let applied = state.node_report_service.apply_report(report).await?;
    Ok(Json(ApiResponse::success(ReportAck { applied })))
}
