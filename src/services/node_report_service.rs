//! Asynchronous node progress reports
//!
//! Node agents report artifact progress back after commands are dispatched:
//! a clip moves through processing to ready, a DVR session through recording
//! to ready, and failures land here too. Reports apply guarded transitions,
//! so duplicates and stale reports are no-ops rather than backward moves.

use std::str::FromStr;

use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, warn};
use utoipa::ToSchema;

use crate::analytics::AnalyticsSink;
use crate::database::repositories::{ArtifactNodeRepository, ArtifactRepository};
use crate::errors::{AppError, AppResult};
use crate::models::{
    Artifact, ArtifactEvent, ArtifactNodePlacement, ArtifactStatus, ArtifactType,
    ClipLifecycleData, ClipLifecycleStage, DvrLifecycleData, DvrLifecycleStatus, MistTrigger,
    TriggerPayload,
};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ArtifactProgressReport {
    pub artifact_hash: String,
    pub node_id: String,
    /// Target lifecycle status, e.g. "processing", "recording", "ready",
    /// "failed"
    pub status: String,
    pub base_url: Option<String>,
    pub file_path: Option<String>,
    pub size_bytes: Option<i64>,
    pub error_message: Option<String>,
    /// Set when the node probed the file and found it missing
    #[serde(default)]
    pub file_missing: bool,
}

#[derive(Clone)]
pub struct NodeReportService {
    artifacts: ArtifactRepository,
    placements: ArtifactNodeRepository,
    analytics: AnalyticsSink,
}

impl NodeReportService {
    pub fn new(
        artifacts: ArtifactRepository,
        placements: ArtifactNodeRepository,
        analytics: AnalyticsSink,
    ) -> Self {
        Self {
            artifacts,
            placements,
            analytics,
        }
    }

    /// Apply one progress report. Returns whether the artifact moved.
    pub async fn apply_report(&self, report: ArtifactProgressReport) -> AppResult<bool> {
        let artifact = self
            .artifacts
            .find_by_hash(&report.artifact_hash)
            .await?
            .ok_or_else(|| AppError::not_found("artifact", &report.artifact_hash))?;

        if report.file_missing {
            self.placements
                .mark_orphaned(&report.artifact_hash, &report.node_id)
                .await?;
        } else if let Some(base_url) = &report.base_url {
            let now = Utc::now();
            let placement = ArtifactNodePlacement {
                artifact_hash: report.artifact_hash.clone(),
                node_id: report.node_id.clone(),
                file_path: report.file_path.clone(),
                base_url: base_url.clone(),
                cached_at: now,
                last_seen_at: now,
                is_orphaned: false,
            };
            if let Err(e) = self.placements.upsert(&placement).await {
                warn!(artifact_hash = %report.artifact_hash, error = %e, "placement update failed");
            }
        }

        let moved = if report.status.eq_ignore_ascii_case("failed") {
            let message = report
                .error_message
                .clone()
                .unwrap_or_else(|| "node reported failure".to_string());
            self.artifacts
                .mark_failed(&report.artifact_hash, &message)
                .await?
        } else {
            let target = ArtifactStatus::from_str(&report.status)
                .map_err(|_| AppError::invalid_input(format!("unknown status '{}'", report.status)))?;
            let predecessors = ArtifactStatus::predecessors(artifact.artifact_type, target);
            if predecessors.is_empty() {
                return Err(AppError::invalid_input(format!(
                    "status '{}' is unreachable for {} artifacts",
                    report.status, artifact.artifact_type
                )));
            }
            self.artifacts
                .transition_status(&report.artifact_hash, &predecessors, target)
                .await?
        };

        if moved {
            if target_completes_session(&report.status) {
                self.artifacts
                    .set_session_times(&report.artifact_hash, artifact.started_at, Some(Utc::now()))
                    .await?;
            }
            self.emit_report_event(&artifact, &report);
        } else {
            debug!(
                artifact_hash = %report.artifact_hash,
                from = %artifact.status,
                to = %report.status,
                "stale or duplicate report ignored"
            );
        }
        Ok(moved)
    }

    fn emit_report_event(&self, artifact: &Artifact, report: &ArtifactProgressReport) {
        let tenant_id = artifact.tenant_id.clone().unwrap_or_default();
        match artifact.artifact_type {
            ArtifactType::Clip => {
                let stage = match report.status.to_ascii_lowercase().as_str() {
                    "processing" => ClipLifecycleStage::Progress,
                    "ready" => ClipLifecycleStage::Done,
                    "failed" => ClipLifecycleStage::Failed,
                    _ => ClipLifecycleStage::Progress,
                };
                self.analytics.emit_trigger(MistTrigger {
                    trigger_type: "clip_lifecycle".to_string(),
                    stream_id: artifact.stream_id.clone(),
                    tenant_id,
                    payload: TriggerPayload::ClipLifecycle(ClipLifecycleData {
                        clip_hash: artifact.artifact_hash.clone(),
                        stage,
                        internal_name: artifact.internal_name.clone(),
                        request_id: artifact.request_id.clone(),
                        size_bytes: report.size_bytes.or(artifact.size_bytes),
                        retention_until: artifact.retention_until,
                        error_message: report.error_message.clone(),
                    }),
                });
            }
            ArtifactType::Dvr => {
                let status = match report.status.to_ascii_lowercase().as_str() {
                    "recording" => DvrLifecycleStatus::Recording,
                    "ready" => DvrLifecycleStatus::Stopped,
                    "failed" => DvrLifecycleStatus::Failed,
                    _ => DvrLifecycleStatus::Recording,
                };
                self.analytics.emit_trigger(MistTrigger {
                    trigger_type: "dvr_lifecycle".to_string(),
                    stream_id: artifact.stream_id.clone(),
                    tenant_id,
                    payload: TriggerPayload::DvrLifecycle(DvrLifecycleData {
                        dvr_hash: artifact.artifact_hash.clone(),
                        status,
                        internal_name: artifact.internal_name.clone(),
                        request_id: artifact.request_id.clone(),
                        size_bytes: report.size_bytes.or(artifact.size_bytes),
                        retention_until: artifact.retention_until,
                        error_message: report.error_message.clone(),
                    }),
                });
            }
            ArtifactType::Vod => {}
        }
        self.analytics.emit_artifact_event(ArtifactEvent {
            artifact_type: artifact.artifact_type,
            artifact_id: artifact.artifact_hash.clone(),
            status: report.status.to_ascii_lowercase(),
            started_at: artifact.started_at,
            completed_at: None,
            expires_at: artifact.retention_until,
        });
    }
}

fn target_completes_session(status: &str) -> bool {
    status.eq_ignore_ascii_case("ready")
}
