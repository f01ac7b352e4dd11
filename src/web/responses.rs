//! HTTP response types and error mapping
//!
//! Every endpoint speaks the same `ApiResponse` envelope. Application errors
//! map to status codes here and nowhere else: invalid input is 400, missing
//! resources 404, payment blocks 402 with machine-readable requirements,
//! idempotent no-ops 409, transient conditions 503 with an optional
//! Retry-After, everything else 500.

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::errors::AppError;
use crate::models::PaymentRequirements;

/// Standard API response wrapper
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    /// Whether the operation was successful
    pub success: bool,
    /// Response data (present on success)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Error message (present on failure)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Structured payment requirements when the error is a payment block
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_requirements: Option<PaymentRequirements>,
    /// Request timestamp
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl<T> ApiResponse<T>
where
    T: Serialize,
{
    /// Create a successful response
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            payment_requirements: None,
            timestamp: chrono::Utc::now(),
        }
    }
}

impl ApiResponse<()> {
    /// Create an error response
    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            payment_requirements: None,
            timestamp: chrono::Utc::now(),
        }
    }
}

/// Paginated listing wrapper with keyset cursors
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub has_next_page: bool,
    pub has_previous_page: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_cursor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_cursor: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, retry_after, requirements) = match &self {
            AppError::InvalidInput { .. } => (StatusCode::BAD_REQUEST, None, None),
            AppError::NotFound { .. } => (StatusCode::NOT_FOUND, None, None),
            AppError::PaymentRequired { requirements, .. } => {
                (StatusCode::PAYMENT_REQUIRED, None, requirements.clone())
            }
            AppError::Conflict { .. } => (StatusCode::CONFLICT, None, None),
            AppError::Defrosting { retry_after, .. } => {
                (StatusCode::SERVICE_UNAVAILABLE, Some(*retry_after), None)
            }
            AppError::Unavailable { retry_after, .. } => {
                (StatusCode::SERVICE_UNAVAILABLE, *retry_after, None)
            }
            _ => (StatusCode::INTERNAL_SERVER_ERROR, None, None),
        };

        // internals are logged with detail but surfaced generically
        let message = match &self {
            AppError::Database(_) | AppError::Repository(_) | AppError::Internal { .. } => {
                tracing::error!(error = %self, "internal error");
                "internal error".to_string()
            }
            other => other.to_string(),
        };

        let mut body = ApiResponse::error(message);
        body.payment_requirements = requirements;

        let mut response = (status, Json(body)).into_response();
        if let Some(seconds) = retry_after {
            if let Ok(value) = HeaderValue::from_str(&seconds.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}
