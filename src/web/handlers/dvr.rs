//! DVR control endpoints

use axum::{
    Json,
    extract::{Path, Query, State},
};

use crate::errors::AppError;
use crate::models::Artifact;
use crate::services::DeleteOutcome;
use crate::services::dvr_service::{StartDvrRequest, StartDvrResponse};
use crate::web::{
    AppState,
    extractors::ListQuery,
    responses::{ApiResponse, PaginatedResponse},
};

/// Start recording a live stream; idempotent per stream
#[utoipa::path(
    post,
    path = "/api/v1/dvr/start",
    request_body = StartDvrRequest,
    responses(
        (status = 200, description = "Session started or already active", body = StartDvrResponse),
        (status = 400, description = "Missing required fields"),
        (status = 503, description = "No eligible node"),
    ),
    tag = "dvr"
)]
pub async fn start_dvr(
    State(state): State<AppState>,
    Json(request): Json<StartDvrRequest>,
) -> Result<Json<ApiResponse<StartDvrResponse>>, AppError> {
    let response = state.dvr_service.start_dvr(request).await?;
    Ok(Json(ApiResponse::success(response)))
}

/// Stop an active recording; the node's flush completes it
#[utoipa::path(
    post,
    path = "/api/v1/dvr/{dvr_hash}/stop",
    params(("dvr_hash" = String, Path, description = "32-hex DVR hash")),
    responses(
        (status = 200, description = "Session stopping", body = StartDvrResponse),
        (status = 404, description = "Unknown recording"),
        (status = 409, description = "Recording is not active"),
    ),
    tag = "dvr"
)]
pub async fn stop_dvr(
    State(state): State<AppState>,
    Path(dvr_hash): Path<String>,
) -> Result<Json<ApiResponse<StartDvrResponse>>, AppError> {
    let response = state.dvr_service.stop_dvr(&dvr_hash).await?;
    Ok(Json(ApiResponse::success(response)))
}

/// Delete a recording; repeating the call is a no-op
#[utoipa::path(
    delete,
    path = "/api/v1/dvr/{dvr_hash}",
    params(("dvr_hash" = String, Path, description = "32-hex DVR hash")),
    responses(
        (status = 200, description = "Outcome of the delete", body = DeleteOutcome),
        (status = 404, description = "Unknown recording"),
    ),
    tag = "dvr"
)]
pub async fn delete_dvr(
    State(state): State<AppState>,
    Path(dvr_hash): Path<String>,
) -> Result<Json<ApiResponse<DeleteOutcome>>, AppError> {
    let outcome = state.dvr_service.delete_dvr(&dvr_hash).await?;
    Ok(Json(ApiResponse::success(outcome)))
}

/// List a stream's recordings with bidirectional keyset pagination
#[utoipa::path(
    get,
    path = "/api/v1/dvr",
    params(
        ("internal_name" = String, Query, description = "Stream internal name"),
        ("cursor" = Option<String>, Query, description = "Keyset cursor"),
        ("limit" = Option<u64>, Query, description = "Page size, max 100"),
        ("backward" = Option<bool>, Query, description = "Traverse toward newer rows"),
    ),
    responses((status = 200, description = "One page of recordings", body = PaginatedResponse<Artifact>)),
    tag = "dvr"
)]
pub async fn list_dvr(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ApiResponse<PaginatedResponse<Artifact>>>, AppError> {
    let page = state
        .dvr_service
        .list_dvr(
            &query.internal_name,
            query.cursor.as_deref(),
            query.limit,
            query.backward,
        )
        .await?;
    Ok(Json(ApiResponse::success(PaginatedResponse {
        items: page.items,
        has_next_page: page.has_next_page,
        has_previous_page: page.has_previous_page,
        start_cursor: page.start_cursor,
        end_cursor: page.end_cursor,
    })))
}
