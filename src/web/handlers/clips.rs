//! Clip control endpoints

use axum::{
    Json,
    extract::{Path, Query, State},
};

use crate::errors::AppError;
use crate::models::Artifact;
use crate::services::clip_service::{CreateClipRequest, CreateClipResponse};
use crate::services::DeleteOutcome;
use crate::web::{
    AppState,
    extractors::ListQuery,
    responses::{ApiResponse, PaginatedResponse},
};

/// Create a clip from a live stream's buffer
#[utoipa::path(
    post,
    path = "/api/v1/clips",
    request_body = CreateClipRequest,
    responses(
        (status = 200, description = "Clip queued", body = CreateClipResponse),
        (status = 400, description = "Missing required fields"),
        (status = 503, description = "No eligible node"),
    ),
    tag = "clips"
)]
pub async fn create_clip(
    State(state): State<AppState>,
    Json(request): Json<CreateClipRequest>,
) -> Result<Json<ApiResponse<CreateClipResponse>>, AppError> {
    let response = state.clip_service.create_clip(request).await?;
    Ok(Json(ApiResponse::success(response)))
}

/// Delete a clip; repeating the call is a no-op
#[utoipa::path(
    delete,
    path = "/api/v1/clips/{clip_hash}",
    params(("clip_hash" = String, Path, description = "32-hex clip hash")),
    responses(
        (status = 200, description = "Outcome of the delete", body = DeleteOutcome),
        (status = 404, description = "Unknown clip"),
    ),
    tag = "clips"
)]
pub async fn delete_clip(
    State(state): State<AppState>,
    Path(clip_hash): Path<String>,
) -> Result<Json<ApiResponse<DeleteOutcome>>, AppError> {
    let outcome = state.clip_service.delete_clip(&clip_hash).await?;
    Ok(Json(ApiResponse::success(outcome)))
}

/// List a stream's clips with bidirectional keyset pagination
#[utoipa::path(
    get,
    path = "/api/v1/clips",
    params(
        ("internal_name" = String, Query, description = "Stream internal name"),
        ("cursor" = Option<String>, Query, description = "Keyset cursor"),
        ("limit" = Option<u64>, Query, description = "Page size, max 100"),
        ("backward" = Option<bool>, Query, description = "Traverse toward newer rows"),
    ),
    responses((status = 200, description = "One page of clips", body = PaginatedResponse<Artifact>)),
    tag = "clips"
)]
pub async fn list_clips(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ApiResponse<PaginatedResponse<Artifact>>>, AppError> {
    let page = state
        .clip_service
        .list_clips(
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
