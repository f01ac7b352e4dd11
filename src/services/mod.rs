//! Service layer for orchestration logic
//!
//! Services drive the multi-step workflows across node selection, the
//! artifact registry, node RPC, the object store, and the analytics sink.
//! Each high-level operation is a deterministic sequence with explicit
//! compensation on failure; partial-write reconciliation beyond the FAILED
//! lifecycle event is delegated to the external retention sweeper.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod clip_service;
pub mod dvr_service;
pub mod node_report_service;
pub mod tenant_service;
pub mod viewer_service;
pub mod vod_service;

pub use clip_service::ClipService;
pub use dvr_service::DvrService;
pub use node_report_service::NodeReportService;
pub use tenant_service::TenantService;
pub use viewer_service::ViewerService;
pub use vod_service::VodService;

/// Outcome of an idempotent delete
///
/// A repeated delete is a no-op, not an error: `success` is false and the
/// message says why.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DeleteOutcome {
    pub success: bool,
    pub message: String,
}

impl DeleteOutcome {
    pub fn deleted(what: &str) -> Self {
        Self {
            success: true,
            message: format!("{what} deleted"),
        }
    }

    pub fn already_deleted(what: &str) -> Self {
        Self {
            success: false,
            message: format!("{what} is already deleted"),
        }
    }
}
