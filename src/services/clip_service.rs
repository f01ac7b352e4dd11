//! Clip orchestration
//!
//! CreateClip picks an ingest node (preferring the one already carrying the
//! stream) and a storage node, registers the artifact, and dispatches the
//! pull command to the storage node. The registry insert happening while a
//! later step fails is accepted: the external retention sweeper reconciles,
//! this service only emits the FAILED lifecycle event.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::analytics::AnalyticsSink;
use crate::balancer::{LoadBalancer, SelectionRequest};
use crate::clients::{BusinessRegistryClient, ClipDeleteRequest, ClipPullRequest, NodeAgentClient};
use crate::database::repositories::{ArtifactNodeRepository, ArtifactPage, ArtifactRepository, ListCursor};
use crate::directory::NodeDirectory;
use crate::errors::{AppError, AppResult};
use crate::models::artifact::is_artifact_hash;
use crate::models::{
    Artifact, ArtifactEvent, ArtifactNodePlacement, ArtifactStatus, ArtifactType,
    ClipLifecycleData, ClipLifecycleStage, MistTrigger, NodeCapability, StorageLocation,
    TriggerPayload,
};
use crate::utils::hash::synthesize_artifact_hash;

const DEFAULT_CLIP_FORMAT: &str = "mp4";
const DEFAULT_RETENTION_DAYS: i64 = 30;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateClipRequest {
    pub internal_name: String,
    pub tenant_id: String,
    /// Stream name of the derived clip output
    pub artifact_internal_name: String,
    pub user_id: Option<String>,
    pub stream_id: Option<String>,
    /// Registry-minted hash; synthesized locally when absent
    pub clip_hash: Option<String>,
    pub format: Option<String>,
    pub start_unix: Option<i64>,
    pub stop_unix: Option<i64>,
    pub start_ms: Option<i64>,
    pub stop_ms: Option<i64>,
    pub duration_sec: Option<i64>,
    pub retention_days: Option<u32>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CreateClipResponse {
    pub status: String,
    pub clip_hash: String,
    pub storage_host: String,
    pub ingest_host: String,
    pub request_id: String,
}

#[derive(Clone)]
pub struct ClipService {
    balancer: LoadBalancer,
    directory: NodeDirectory,
    artifacts: ArtifactRepository,
    placements: ArtifactNodeRepository,
    node_agent: Arc<dyn NodeAgentClient>,
    registry: Option<Arc<dyn BusinessRegistryClient>>,
    analytics: AnalyticsSink,
}

impl ClipService {
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

    pub async fn create_clip(&self, request: CreateClipRequest) -> AppResult<CreateClipResponse> {
        if request.internal_name.trim().is_empty() {
            return Err(AppError::invalid_input("internal_name is required"));
        }
        if request.tenant_id.trim().is_empty() {
            return Err(AppError::invalid_input("tenant_id is required"));
        }
        if request.artifact_internal_name.trim().is_empty() {
            return Err(AppError::invalid_input("artifact_internal_name is required"));
        }
        if let Some(hash) = &request.clip_hash {
            if !is_artifact_hash(hash) {
                return Err(AppError::invalid_input("clip_hash must be 32 hex characters"));
            }
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

        let clip_hash = request
            .clip_hash
            .clone()
            .unwrap_or_else(|| {
                synthesize_artifact_hash(&[
                    &request.internal_name,
                    &request.start_ms.unwrap_or_default().to_string(),
                    &request
                        .duration_sec
                        .map(|s| s * 1000)
                        .unwrap_or_default()
                        .to_string(),
                ])
            });
        let request_id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let retention_days = request
            .retention_days
            .map(i64::from)
            .unwrap_or(DEFAULT_RETENTION_DAYS);

        let artifact = Artifact {
            artifact_hash: clip_hash.clone(),
            artifact_type: ArtifactType::Clip,
            internal_name: request.internal_name.clone(),
            artifact_internal_name: request.artifact_internal_name.clone(),
            stream_id: request.stream_id.clone(),
            tenant_id: Some(request.tenant_id.clone()),
            user_id: request.user_id.clone(),
            status: ArtifactStatus::Requested,
            request_id: request_id.clone(),
            format: Some(
                request
                    .format
                    .clone()
                    .unwrap_or_else(|| DEFAULT_CLIP_FORMAT.to_string()),
            ),
            storage_location: StorageLocation::Pending,
            s3_url: None,
            size_bytes: None,
            manifest_path: None,
            error_message: None,
            started_at: None,
            ended_at: None,
            duration_seconds: request.duration_sec,
            retention_until: Some(now + Duration::days(retention_days)),
            frozen_at: None,
            created_at: now,
            updated_at: now,
        };
        let artifact = self.artifacts.insert(&artifact).await?;
        self.emit_lifecycle(&artifact, ClipLifecycleStage::Requested, None);

        // placement is best-effort: a failed write is logged, the clip
        // request continues and the sweeper reconciles
        let placement = ArtifactNodePlacement {
            artifact_hash: clip_hash.clone(),
            node_id: storage.node.node_id.clone(),
            file_path: None,
            base_url: storage.node.base_url.clone(),
            cached_at: now,
            last_seen_at: now,
            is_orphaned: false,
        };
        if let Err(e) = self.placements.upsert(&placement).await {
            warn!(clip_hash = %clip_hash, error = %e, "placement write failed, continuing");
        }

        let pull = ClipPullRequest {
            clip_hash: clip_hash.clone(),
            stream_name: request.internal_name.clone(),
            format: artifact.format.clone().unwrap_or_default(),
            output_name: request.artifact_internal_name.clone(),
            source_base_url: ingest.node.base_url.clone(),
            request_id: request_id.clone(),
            start_unix: request.start_unix,
            stop_unix: request.stop_unix,
            start_ms: request.start_ms,
            stop_ms: request.stop_ms,
            duration_sec: request.duration_sec,
        };

        if let Err(e) = self.node_agent.clip_pull(&storage.node, &pull).await {
            warn!(clip_hash = %clip_hash, node_id = %storage.node.node_id, error = %e, "clip pull dispatch failed");
            self.artifacts
                .mark_failed(&clip_hash, &e.to_string())
                .await?;
            let mut failed = artifact;
            failed.status = ArtifactStatus::Failed;
            self.emit_lifecycle(&failed, ClipLifecycleStage::Failed, Some(e.to_string()));
            return Err(AppError::unavailable("clip pull dispatch failed"));
        }

        // the row stays `requested` until the node reports; only the event
        // plane learns the command was accepted
        self.emit_lifecycle(&artifact, ClipLifecycleStage::Queued, None);

        info!(
            clip_hash = %clip_hash,
            ingest = %ingest.node.node_id,
            storage = %storage.node.node_id,
            "clip queued"
        );
        Ok(CreateClipResponse {
            status: "queued".to_string(),
            clip_hash,
            storage_host: storage.node.host.clone(),
            ingest_host: ingest.node.host.clone(),
            request_id,
        })
    }

    /// Idempotent soft delete; the node-side delete and the lifecycle event
    /// are fired immediately without waiting for confirmation
    pub async fn delete_clip(&self, clip_hash: &str) -> AppResult<super::DeleteOutcome> {
        let artifact = self
            .artifacts
            .find_by_hash(clip_hash)
            .await?
            .filter(|a| a.artifact_type == ArtifactType::Clip)
            .ok_or_else(|| AppError::not_found("clip", clip_hash))?;

        if !self.artifacts.soft_delete(clip_hash).await? {
            return Ok(super::DeleteOutcome::already_deleted("clip"));
        }

        let delete = ClipDeleteRequest {
            clip_hash: clip_hash.to_string(),
            request_id: Uuid::new_v4().to_string(),
        };
        for placement in self.placements.placements_for(clip_hash).await? {
            if let Some(node) = self.directory.lookup(&placement.node_id).await {
                if let Err(e) = self.node_agent.clip_delete(&node, &delete).await {
                    warn!(clip_hash, node_id = %node.node_id, error = %e, "clip delete dispatch failed");
                }
            }
        }

        let enriched = self.enrich_tenant(artifact).await;
        self.emit_lifecycle(&enriched, ClipLifecycleStage::Deleted, None);
        Ok(super::DeleteOutcome::deleted("clip"))
    }

    /// Keyset listing of a stream's clips, deleted rows hidden
    pub async fn list_clips(
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
                ArtifactType::Clip,
                internal_name,
                decoded.as_ref(),
                limit.clamp(1, 100),
                backward,
                false,
            )
            .await?;
        Ok(page)
    }

    /// Fill the denormalized tenant from the registry when the row lacks it
    async fn enrich_tenant(&self, mut artifact: Artifact) -> Artifact {
        if artifact.tenant_id.is_none() {
            if let Some(registry) = &self.registry {
                if let Ok(Some(resolved)) = registry.resolve_clip_hash(&artifact.artifact_hash).await
                {
                    artifact.tenant_id = Some(resolved.tenant_id);
                }
            }
        }
        artifact
    }

    fn emit_lifecycle(&self, artifact: &Artifact, stage: ClipLifecycleStage, error: Option<String>) {
        self.analytics.emit_trigger(MistTrigger {
            trigger_type: "clip_lifecycle".to_string(),
            stream_id: artifact.stream_id.clone(),
            tenant_id: artifact.tenant_id.clone().unwrap_or_default(),
            payload: TriggerPayload::ClipLifecycle(ClipLifecycleData {
                clip_hash: artifact.artifact_hash.clone(),
                stage,
                internal_name: artifact.internal_name.clone(),
                request_id: artifact.request_id.clone(),
                size_bytes: artifact.size_bytes,
                retention_until: artifact.retention_until,
                error_message: error,
            }),
        });
        self.analytics.emit_artifact_event(ArtifactEvent {
            artifact_type: ArtifactType::Clip,
            artifact_id: artifact.artifact_hash.clone(),
            status: stage.to_string().to_lowercase(),
            started_at: artifact.started_at,
            completed_at: artifact.ended_at,
            expires_at: artifact.retention_until,
        });
    }
}
