//! Tenant enforcement endpoints

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::errors::AppError;
use crate::services::tenant_service::TerminateStreamsResponse;
use crate::web::{AppState, responses::ApiResponse};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct TerminateRequest {
    pub reason: Option<String>,
}

/// Stop every active session of a tenant's streams across the fleet
#[utoipa::path(
    post,
    path = "/api/v1/tenants/{tenant_id}/terminate",
    params(("tenant_id" = String, Path, description = "Tenant to enforce against")),
    request_body = TerminateRequest,
    responses((status = 200, description = "Audit of terminated streams", body = TerminateStreamsResponse)),
    tag = "tenants"
)]
pub async fn terminate_streams(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
    Json(request): Json<TerminateRequest>,
) -> Result<Json<ApiResponse<TerminateStreamsResponse>>, AppError> {
    let reason = request.reason.unwrap_or_else(|| "operator request".to_string());
    let response = state
        .tenant_service
        .terminate_tenant_streams(&tenant_id, &reason)
        .await?;
    Ok(Json(ApiResponse::success(response)))
}

/// Drop a tenant's cached billing state so the next resolve refetches
#[utoipa::path(
    post,
    path = "/api/v1/tenants/{tenant_id}/invalidate-cache",
    params(("tenant_id" = String, Path, description = "Tenant whose cache entry to drop")),
    responses((status = 200, description = "Whether an entry was removed", body = bool)),
    tag = "tenants"
)]
pub async fn invalidate_cache(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
) -> Result<Json<ApiResponse<bool>>, AppError> {
    let removed = state.tenant_service.invalidate_tenant_cache(&tenant_id).await?;
    Ok(Json(ApiResponse::success(removed)))
}
