//! VOD upload and asset endpoints

use axum::{
    Json,
    extract::{Path, State},
};

use crate::errors::AppError;
use crate::services::DeleteOutcome;
use crate::services::vod_service::{
    CompleteVodUploadRequest, CompleteVodUploadResponse, CreateVodUploadRequest,
    CreateVodUploadResponse,
};
use crate::web::{AppState, responses::ApiResponse};

/// Begin a multipart VOD upload and hand out presigned part URLs
#[utoipa::path(
    post,
    path = "/api/v1/vod/uploads",
    request_body = CreateVodUploadRequest,
    responses(
        (status = 200, description = "Upload created", body = CreateVodUploadResponse),
        (status = 400, description = "Missing required fields"),
    ),
    tag = "vod"
)]
pub async fn create_upload(
    State(state): State<AppState>,
    Json(request): Json<CreateVodUploadRequest>,
) -> Result<Json<ApiResponse<CreateVodUploadResponse>>, AppError> {
    let response = state.vod_service.create_upload(request).await?;
    Ok(Json(ApiResponse::success(response)))
}

/// Seal a completed multipart upload
#[utoipa::path(
    post,
    path = "/api/v1/vod/uploads/{artifact_hash}/complete",
    params(("artifact_hash" = String, Path, description = "32-hex VOD hash")),
    request_body = CompleteVodUploadRequest,
    responses(
        (status = 200, description = "Asset ready", body = CompleteVodUploadResponse),
        (status = 404, description = "Unknown upload"),
        (status = 409, description = "Upload is not in progress"),
    ),
    tag = "vod"
)]
pub async fn complete_upload(
    State(state): State<AppState>,
    Path(artifact_hash): Path<String>,
    Json(request): Json<CompleteVodUploadRequest>,
) -> Result<Json<ApiResponse<CompleteVodUploadResponse>>, AppError> {
    let response = state
        .vod_service
        .complete_upload(&artifact_hash, request)
        .await?;
    Ok(Json(ApiResponse::success(response)))
}

/// Abort an in-flight upload, removing the artifact entirely
#[utoipa::path(
    post,
    path = "/api/v1/vod/uploads/{artifact_hash}/abort",
    params(("artifact_hash" = String, Path, description = "32-hex VOD hash")),
    responses(
        (status = 200, description = "Upload aborted", body = DeleteOutcome),
        (status = 404, description = "Unknown upload"),
        (status = 409, description = "Upload is not in progress"),
    ),
    tag = "vod"
)]
pub async fn abort_upload(
    State(state): State<AppState>,
    Path(artifact_hash): Path<String>,
) -> Result<Json<ApiResponse<DeleteOutcome>>, AppError> {
    let outcome = state.vod_service.abort_upload(&artifact_hash).await?;
    Ok(Json(ApiResponse::success(outcome)))
}

/// Delete a stored VOD asset; repeating the call is a no-op
#[utoipa::path(
    delete,
    path = "/api/v1/vod/{artifact_hash}",
    params(("artifact_hash" = String, Path, description = "32-hex VOD hash")),
    responses(
        (status = 200, description = "Outcome of the delete", body = DeleteOutcome),
        (status = 404, description = "Unknown asset"),
    ),
    tag = "vod"
)]
pub async fn delete_asset(
    State(state): State<AppState>,
    Path(artifact_hash): Path<String>,
) -> Result<Json<ApiResponse<DeleteOutcome>>, AppError> {
    let outcome = state.vod_service.delete_asset(&artifact_hash).await?;
    Ok(Json(ApiResponse::success(outcome)))
}
