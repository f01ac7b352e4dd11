//! DVR orchestration
//!
//! StartDVR is idempotent per stream: an active session is returned
//! unchanged instead of starting a second recording. Stop and delete follow
//! the shared pattern of registry-first writes with best-effort node
//! commands and immediate event emission.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::analytics::AnalyticsSink;
use crate::balancer::{LoadBalancer, SelectionRequest};
use crate::clients::business_registry::RegisterDvrRequest;
use crate::clients::{
    BusinessRegistryClient, DvrConfig, DvrDeleteRequest, DvrStartRequest, DvrStopRequest,
    NodeAgentClient,
};
use crate::database::repositories::{ArtifactNodeRepository, ArtifactPage, ArtifactRepository, ListCursor};
use crate::directory::NodeDirectory;
use crate::errors::{AppError, AppResult};
use crate::models::artifact::is_artifact_hash;
use crate::models::{
    Artifact, ArtifactEvent, ArtifactNodePlacement, ArtifactStatus, ArtifactType,
    DvrLifecycleData, DvrLifecycleStatus, MistTrigger, NodeCapability, StorageLocation,
    TriggerPayload,
};
use crate::utils::hash::synthesize_artifact_hash;

const DEFAULT_DVR_FORMAT: &str = "hls";
const DEFAULT_SEGMENT_DURATION: u32 = 6;
const DEFAULT_RETENTION_DAYS: u32 = 30;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct StartDvrRequest {
    pub internal_name: String,
    pub tenant_id: String,
    pub user_id: Option<String>,
    pub stream_id: Option<String>,
    /// Registry-minted hash; the registry is asked to mint one when absent
    pub dvr_hash: Option<String>,
    pub format: Option<String>,
    pub retention_days: Option<u32>,
    pub segment_duration: Option<u32>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StartDvrResponse {
    pub status: String,
    pub dvr_hash: String,
    pub playback_id: Option<String>,
    pub storage_host: Option<String>,
    pub request_id: String,
}

#[derive(Clone)]
pub struct DvrService {
    balancer: LoadBalancer,
    directory: NodeDirectory,
    artifacts: ArtifactRepository,
    placements: ArtifactNodeRepository,
    node_agent: Arc<dyn NodeAgentClient>,
    registry: Option<Arc<dyn BusinessRegistryClient>>,
    analytics: AnalyticsSink,
}

impl DvrService {
    pub fn new(
        balancer: LoadBalancer,
        directory: NodeDirectory,
        artifacts: ArtifactRepository,
        placements: ArtifactNodeRepository,
        node_agent: Arc<dyn NodeAgentClient>,
        registry: Option<Arc<dyn BusinessRegistryClient>>,
        analytics: AnalyticsSink,
    ) -> Self {
        Self {
            balancer,
            directory,
            artifacts,
            placements,
            node_agent,
            registry,
            analytics,
        }
    }

    pub async fn start_dvr(&self, request: StartDvrRequest) -> AppResult<StartDvrResponse> {
        if request.internal_name.trim().is_empty() {
            return Err(AppError::invalid_input("internal_name is required"));
        }
        if request.tenant_id.trim().is_empty() {
            return Err(AppError::invalid_input("tenant_id is required"));
        }
        if let Some(hash) = &request.dvr_hash {
            if !is_artifact_hash(hash) {
                return Err(AppError::invalid_input("dvr_hash must be 32 hex characters"));
            }
        }

        // idempotent start: an active session wins over a new one
        if let Some(active) = self.artifacts.find_active_dvr(&request.internal_name).await? {
            return Ok(StartDvrResponse {
                status: "already_started".to_string(),
                playback_id: Some(active.artifact_hash.clone()),
                dvr_hash: active.artifact_hash,
                storage_host: None,
                request_id: active.request_id,
            });
        }

        let ingest = self
            .balancer
            .get_best_node(
                &SelectionRequest::new(NodeCapability::Ingest, request.internal_name.clone())
                    .with_source_selection(),
            )
            .await
            .map_err(|_| AppError::unavailable("no ingest node available"))?;

        let storage = self
            .balancer
            .get_best_node(&SelectionRequest::new(
                NodeCapability::Storage,
                request.internal_name.clone(),
            ))
            .await
            .map_err(|_| AppError::unavailable("no storage node available"))?;

        let retention_days = request.retention_days.unwrap_or(DEFAULT_RETENTION_DAYS);

        // the registry mints the hash when the caller did not supply one
        let (dvr_hash, playback_id) = match (&request.dvr_hash, &self.registry) {
            (Some(hash), _) => (hash.clone(), None),
            (None, Some(registry)) => {
                let registered = registry
                    .register_dvr(&RegisterDvrRequest {
                        internal_name: request.internal_name.clone(),
                        tenant_id: request.tenant_id.clone(),
                        user_id: request.user_id.clone(),
                        retention_days,
                    })
                    .await?;
                (registered.dvr_hash, registered.playback_id)
            }
            (None, None) => (
                synthesize_artifact_hash(&[&request.internal_name, "dvr"]),
                None,
            ),
        };
        if !is_artifact_hash(&dvr_hash) {
            return Err(AppError::internal("registry returned a malformed dvr hash"));
        }

        let request_id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let artifact = Artifact {
            artifact_hash: dvr_hash.clone(),
            artifact_type: ArtifactType::Dvr,
            internal_name: request.internal_name.clone(),
            artifact_internal_name: format!("dvr+{}", request.internal_name),
            stream_id: request.stream_id.clone(),
            tenant_id: Some(request.tenant_id.clone()),
            user_id: request.user_id.clone(),
            status: ArtifactStatus::Requested,
            request_id: request_id.clone(),
            format: Some(
                request
                    .format
                    .clone()
                    .unwrap_or_else(|| DEFAULT_DVR_FORMAT.to_string()),
            ),
            storage_location: StorageLocation::Pending,
            s3_url: None,
            size_bytes: None,
            manifest_path: None,
            error_message: None,
            started_at: Some(now),
            ended_at: None,
            duration_seconds: None,
            retention_until: Some(now + Duration::days(i64::from(retention_days))),
            frozen_at: None,
            created_at: now,
            updated_at: now,
        };
        let artifact = self.artifacts.insert(&artifact).await?;

        let placement = ArtifactNodePlacement {
            artifact_hash: dvr_hash.clone(),
            node_id: storage.node.node_id.clone(),
            file_path: None,
            base_url: storage.node.base_url.clone(),
            cached_at: now,
            last_seen_at: now,
            is_orphaned: false,
        };
        if let Err(e) = self.placements.upsert(&placement).await {
            warn!(dvr_hash = %dvr_hash, error = %e, "placement write failed, continuing");
        }

        let start = DvrStartRequest {
            dvr_hash: dvr_hash.clone(),
            internal_name: request.internal_name.clone(),
            source_base_url: ingest.node.base_url.clone(),
            request_id: request_id.clone(),
            config: DvrConfig {
                enabled: true,
                retention_days,
                format: artifact.format.clone().unwrap_or_default(),
                segment_duration: request.segment_duration.unwrap_or(DEFAULT_SEGMENT_DURATION),
            },
            stream_id: request.stream_id.clone(),
        };

        if let Err(e) = self.node_agent.dvr_start(&storage.node, &start).await {
            warn!(dvr_hash = %dvr_hash, node_id = %storage.node.node_id, error = %e, "dvr start dispatch failed");
            self.artifacts.mark_failed(&dvr_hash, &e.to_string()).await?;
            let mut failed = artifact;
            failed.status = ArtifactStatus::Failed;
            self.emit_lifecycle(&failed, DvrLifecycleStatus::Failed, Some(e.to_string()));
            return Err(AppError::unavailable("dvr start dispatch failed"));
        }

        // the row stays `requested` until the node reports starting
        self.emit_lifecycle(&artifact, DvrLifecycleStatus::Started, None);

        info!(dvr_hash = %dvr_hash, storage = %storage.node.node_id, "dvr session started");
        Ok(StartDvrResponse {
            status: "started".to_string(),
            playback_id: playback_id.or_else(|| Some(dvr_hash.clone())),
            dvr_hash,
            storage_host: Some(storage.node.host.clone()),
            request_id,
        })
    }

    /// Move an active session into `stopping`; the node's flush report takes
    /// it to `ready`
    pub async fn stop_dvr(&self, dvr_hash: &str) -> AppResult<StartDvrResponse> {
        let artifact = self
            .artifacts
            .find_by_hash(dvr_hash)
            .await?
            .filter(|a| a.artifact_type == ArtifactType::Dvr)
            .ok_or_else(|| AppError::not_found("dvr", dvr_hash))?;

        let moved = self
            .artifacts
            .transition_status(
                dvr_hash,
                &[
                    ArtifactStatus::Requested,
                    ArtifactStatus::Starting,
                    ArtifactStatus::Recording,
                ],
                ArtifactStatus::Stopping,
            )
            .await?;
        if !moved {
            return Err(AppError::conflict(format!(
                "dvr is not active (status {})",
                artifact.status
            )));
        }

        let now = Utc::now();
        self.artifacts
            .set_session_times(dvr_hash, artifact.started_at, Some(now))
            .await?;

        let stop = DvrStopRequest {
            dvr_hash: dvr_hash.to_string(),
            internal_name: artifact.internal_name.clone(),
            request_id: Uuid::new_v4().to_string(),
        };
        for placement in self.placements.placements_for(dvr_hash).await? {
            if let Some(node) = self.directory.lookup(&placement.node_id).await {
                if let Err(e) = self.node_agent.dvr_stop(&node, &stop).await {
                    warn!(dvr_hash, node_id = %node.node_id, error = %e, "dvr stop dispatch failed");
                }
            }
        }

        // event goes out immediately, not on node confirmation
        let mut stopped = artifact;
        stopped.ended_at = Some(now);
        self.emit_lifecycle(&stopped, DvrLifecycleStatus::Stopped, None);

        Ok(StartDvrResponse {
            status: "stopping".to_string(),
            playback_id: Some(dvr_hash.to_string()),
            dvr_hash: dvr_hash.to_string(),
            storage_host: None,
            request_id: stopped.request_id.clone(),
        })
    }

    /// Idempotent soft delete with best-effort node cleanup
    pub async fn delete_dvr(&self, dvr_hash: &str) -> AppResult<super::DeleteOutcome> {
        let artifact = self
            .artifacts
            .find_by_hash(dvr_hash)
            .await?
            .filter(|a| a.artifact_type == ArtifactType::Dvr)
            .ok_or_else(|| AppError::not_found("dvr", dvr_hash))?;

        if !self.artifacts.soft_delete(dvr_hash).await? {
            return Ok(super::DeleteOutcome::already_deleted("dvr recording"));
        }

        let delete = DvrDeleteRequest {
            dvr_hash: dvr_hash.to_string(),
            request_id: Uuid::new_v4().to_string(),
        };
        for placement in self.placements.placements_for(dvr_hash).await? {
            if let Some(node) = self.directory.lookup(&placement.node_id).await {
                if let Err(e) = self.node_agent.dvr_delete(&node, &delete).await {
                    warn!(dvr_hash, node_id = %node.node_id, error = %e, "dvr delete dispatch failed");
                }
            }
        }

        let enriched = self.enrich_tenant(artifact).await;
        self.emit_lifecycle(&enriched, DvrLifecycleStatus::Deleted, None);
        Ok(super::DeleteOutcome::deleted("dvr recording"))
    }

    pub async fn list_dvr(
        &self,
        internal_name: &str,
        cursor: Option<&str>,
        limit: u64,
        backward: bool,
    ) -> AppResult<ArtifactPage> {
        let decoded = cursor.map(ListCursor::decode).transpose()?;
        let page = self
            .artifacts
            .list_by_internal_name(
                ArtifactType::Dvr,
                internal_name,
                decoded.as_ref(),
                limit.clamp(1, 100),
                backward,
                false,
            )
            .await?;
        Ok(page)
    }

    async fn enrich_tenant(&self, mut artifact: Artifact) -> Artifact {
        if artifact.tenant_id.is_none() {
            if let Some(registry) = &self.registry {
                if let Ok(Some(resolved)) = registry.resolve_dvr_hash(&artifact.artifact_hash).await
                {
                    artifact.tenant_id = Some(resolved.tenant_id);
                }
            }
        }
        artifact
    }

    fn emit_lifecycle(&self, artifact: &Artifact, status: DvrLifecycleStatus, error: Option<String>) {
        self.analytics.emit_trigger(MistTrigger {
            trigger_type: "dvr_lifecycle".to_string(),
            stream_id: artifact.stream_id.clone(),
            tenant_id: artifact.tenant_id.clone().unwrap_or_default(),
            payload: TriggerPayload::DvrLifecycle(DvrLifecycleData {
                dvr_hash: artifact.artifact_hash.clone(),
                status,
                internal_name: artifact.internal_name.clone(),
                request_id: artifact.request_id.clone(),
                size_bytes: artifact.size_bytes,
                retention_until: artifact.retention_until,
                error_message: error,
            }),
        });
        self.analytics.emit_artifact_event(ArtifactEvent {
            artifact_type: ArtifactType::Dvr,
            artifact_id: artifact.artifact_hash.clone(),
            status: status.to_string().to_lowercase(),
            started_at: artifact.started_at,
            completed_at: artifact.ended_at,
            expires_at: artifact.retention_until,
        });
    }
}
