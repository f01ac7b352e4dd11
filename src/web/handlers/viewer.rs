//! Viewer resolution endpoint

use axum::{Json, extract::State};

use crate::errors::AppError;
use crate::services::viewer_service::{ResolveViewerRequest, ResolveViewerResponse};
use crate::web::{AppState, extractors::RequestContext, responses::ApiResponse};

/// Resolve a public content ID to playback endpoints on the best node
///
/// The payment header and client IP come from the transport; the body's
/// `content_type` is never consulted.
#[utoipa::path(
    post,
    path = "/api/v1/resolve",
    request_body = ResolveViewerRequest,
    responses(
        (status = 200, description = "Playback endpoints", body = ResolveViewerResponse),
        (status = 402, description = "Payment required, requirements in body"),
        (status = 404, description = "Unknown content id"),
        (status = 503, description = "No node available or artifact defrosting"),
    ),
    tag = "viewer"
)]
pub async fn resolve(
    State(state): State<AppState>,
    context: RequestContext,
    Json(mut request): Json<ResolveViewerRequest>,
) -> Result<Json<ApiResponse<ResolveViewerResponse>>, AppError> {
    request.payment = context.payment;
    request.client_ip = context.client_ip;
    let response = state.viewer_service.resolve_viewer_endpoint(request).await?;
    Ok(Json(ApiResponse::success(response)))
}
