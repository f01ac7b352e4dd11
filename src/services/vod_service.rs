//! VOD upload orchestration
//!
//! Uploads are a three-call flow: create reserves the artifact and hands out
//! presigned part URLs, complete seals the multipart upload and flips the
//! artifact to ready with its canonical S3 location, abort tears everything
//! down. Abort is the only hard delete in the system: no bytes exist in the
//! canonical state yet, so there is nothing for the sweeper to reconcile.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::analytics::AnalyticsSink;
use crate::clients::{NodeAgentClient, VodDeleteRequest};
use crate::database::repositories::{
    ArtifactNodeRepository, ArtifactRepository, VodUpload, VodUploadRepository,
};
use crate::directory::NodeDirectory;
use crate::errors::{AppError, AppResult};
use crate::models::artifact::is_artifact_hash;
use crate::models::{
    Artifact, ArtifactEvent, ArtifactStatus, ArtifactType, MistTrigger, StorageLocation,
    TriggerPayload, VodLifecycleData, VodLifecycleStatus,
};
use crate::storage::{ObjectStore, build_vod_key, plan_parts};
use crate::utils::hash::synthesize_artifact_hash;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateVodUploadRequest {
    pub tenant_id: String,
    pub filename: String,
    pub size_bytes: u64,
    pub user_id: Option<String>,
    /// Registry-minted hash; synthesized locally when absent
    pub artifact_hash: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CreateVodUploadResponse {
    pub artifact_hash: String,
    pub upload_id: String,
    pub part_size: u64,
    pub part_count: u64,
    pub part_urls: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CompleteVodUploadRequest {
    /// Part ETags in part order, as reported by the storage backend
    pub etags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CompleteVodUploadResponse {
    pub artifact_hash: String,
    pub status: String,
    pub s3_url: String,
}

#[derive(Clone)]
pub struct VodService {
    artifacts: ArtifactRepository,
    placements: ArtifactNodeRepository,
    uploads: VodUploadRepository,
    object_store: Arc<dyn ObjectStore>,
    directory: NodeDirectory,
    node_agent: Arc<dyn NodeAgentClient>,
    analytics: AnalyticsSink,
}

impl VodService {
    pub fn new(
        artifacts: ArtifactRepository,
        placements: ArtifactNodeRepository,
        uploads: VodUploadRepository,
        object_store: Arc<dyn ObjectStore>,
        directory: NodeDirectory,
        node_agent: Arc<dyn NodeAgentClient>,
        analytics: AnalyticsSink,
    ) -> Self {
        Self {
            artifacts,
            placements,
            uploads,
            object_store,
            directory,
            node_agent,
            analytics,
        }
    }

    pub async fn create_upload(
        &self,
        request: CreateVodUploadRequest,
    ) -> AppResult<CreateVodUploadResponse> {
        if request.tenant_id.trim().is_empty() {
            return Err(AppError::invalid_input("tenant_id is required"));
        }
        if request.filename.trim().is_empty() {
            return Err(AppError::invalid_input("filename is required"));
        }
        if request.size_bytes == 0 {
            return Err(AppError::invalid_input("size_bytes must be positive"));
        }
        if let Some(hash) = &request.artifact_hash {
            if !is_artifact_hash(hash) {
                return Err(AppError::invalid_input(
                    "artifact_hash must be 32 hex characters",
                ));
            }
        }

        let artifact_hash = request.artifact_hash.clone().unwrap_or_else(|| {
            synthesize_artifact_hash(&[
                &request.tenant_id,
                &request.filename,
                &request.size_bytes.to_string(),
            ])
        });

        let key = build_vod_key(&request.tenant_id, &artifact_hash, &request.filename);
        let plan = plan_parts(request.size_bytes);

        let upload_id = self.object_store.create_multipart_upload(&key).await?;
        let part_urls = self
            .object_store
            .presigned_upload_parts(&key, &upload_id, plan.part_count)
            .await?;

        let now = Utc::now();
        let request_id = Uuid::new_v4().to_string();
        let artifact = Artifact {
            artifact_hash: artifact_hash.clone(),
            artifact_type: ArtifactType::Vod,
            internal_name: format!("vod+{artifact_hash}"),
            artifact_internal_name: format!("vod+{artifact_hash}"),
            stream_id: None,
            tenant_id: Some(request.tenant_id.clone()),
            user_id: request.user_id.clone(),
            status: ArtifactStatus::Uploading,
            request_id,
            format: Some(
                request
                    .filename
                    .rsplit_once('.')
                    .map(|(_, ext)| ext.to_string())
                    .unwrap_or_else(|| "mp4".to_string()),
            ),
            storage_location: StorageLocation::Pending,
            s3_url: None,
            size_bytes: Some(request.size_bytes as i64),
            manifest_path: None,
            error_message: None,
            started_at: Some(now),
            ended_at: None,
            duration_seconds: None,
            retention_until: None,
            frozen_at: None,
            created_at: now,
            updated_at: now,
        };
        let artifact = self.artifacts.insert(&artifact).await?;

        self.uploads
            .insert(&VodUpload {
                artifact_hash: artifact_hash.clone(),
                upload_id: upload_id.clone(),
                object_key: key,
                filename: request.filename.clone(),
                size_bytes: request.size_bytes as i64,
                part_size: plan.part_size as i64,
                part_count: plan.part_count as i64,
                created_at: now,
            })
            .await?;

        self.emit_lifecycle(&artifact, VodLifecycleStatus::Requested, None);
        info!(artifact_hash = %artifact_hash, parts = plan.part_count, "vod upload created");

        Ok(CreateVodUploadResponse {
            artifact_hash,
            upload_id,
            part_size: plan.part_size,
            part_count: plan.part_count,
            part_urls,
        })
    }

    pub async fn complete_upload(
        &self,
        artifact_hash: &str,
        request: CompleteVodUploadRequest,
    ) -> AppResult<CompleteVodUploadResponse> {
        let artifact = self.find_vod(artifact_hash).await?;
        if artifact.status != ArtifactStatus::Uploading {
            return Err(AppError::conflict(format!(
                "upload is not in progress (status {})",
                artifact.status
            )));
        }
        let upload = self
            .uploads
            .find_by_hash(artifact_hash)
            .await?
            .ok_or_else(|| AppError::not_found("vod upload", artifact_hash))?;
        if request.etags.is_empty() {
            return Err(AppError::invalid_input("etags must not be empty"));
        }

        if let Err(e) = self
            .object_store
            .complete_multipart_upload(&upload.object_key, &upload.upload_id, &request.etags)
            .await
        {
            // compensation: fail the artifact and release the multipart state
            warn!(artifact_hash, error = %e, "multipart completion failed");
            self.artifacts.mark_failed(artifact_hash, &e.to_string()).await?;
            if let Err(abort_err) = self
                .object_store
                .abort_multipart_upload(&upload.object_key, &upload.upload_id)
                .await
            {
                warn!(artifact_hash, error = %abort_err, "multipart abort after failure also failed");
            }
            let mut failed = artifact;
            failed.status = ArtifactStatus::Failed;
            self.emit_lifecycle(&failed, VodLifecycleStatus::Failed, Some(e.to_string()));
            return Err(e);
        }

        let s3_url = self.object_store.build_s3_url(&upload.object_key);
        self.artifacts
            .complete_vod(artifact_hash, &s3_url, Some(upload.size_bytes))
            .await?;
        self.uploads.delete(artifact_hash).await?;

        let mut completed = artifact;
        completed.status = ArtifactStatus::Ready;
        completed.s3_url = Some(s3_url.clone());
        completed.ended_at = Some(Utc::now());
        self.emit_lifecycle(&completed, VodLifecycleStatus::Completed, None);

        info!(artifact_hash, "vod upload completed");
        Ok(CompleteVodUploadResponse {
            artifact_hash: artifact_hash.to_string(),
            status: "ready".to_string(),
            s3_url,
        })
    }

    /// Abort an in-flight upload. The artifact row is hard-deleted: the
    /// canonical state never held bytes for it.
    pub async fn abort_upload(&self, artifact_hash: &str) -> AppResult<super::DeleteOutcome> {
        let artifact = self.find_vod(artifact_hash).await?;
        if artifact.status != ArtifactStatus::Uploading {
            return Err(AppError::conflict(format!(
                "upload is not in progress (status {})",
                artifact.status
            )));
        }

        if let Some(upload) = self.uploads.find_by_hash(artifact_hash).await? {
            if let Err(e) = self
                .object_store
                .abort_multipart_upload(&upload.object_key, &upload.upload_id)
                .await
            {
                warn!(artifact_hash, error = %e, "multipart abort failed, continuing teardown");
            }
            self.uploads.delete(artifact_hash).await?;
        }

        self.placements.delete_for_artifact(artifact_hash).await?;
        self.artifacts.hard_delete(artifact_hash).await?;

        self.emit_lifecycle(&artifact, VodLifecycleStatus::Deleted, None);
        info!(artifact_hash, "vod upload aborted");
        Ok(super::DeleteOutcome::deleted("vod upload"))
    }

    /// Idempotent soft delete of a stored VOD asset
    pub async fn delete_asset(&self, artifact_hash: &str) -> AppResult<super::DeleteOutcome> {
        let artifact = self.find_vod(artifact_hash).await?;

        if !self.artifacts.soft_delete(artifact_hash).await? {
            return Ok(super::DeleteOutcome::already_deleted("vod asset"));
        }

        // best-effort cleanup on every node that cached the asset
        let delete = VodDeleteRequest {
            artifact_hash: artifact_hash.to_string(),
            request_id: Uuid::new_v4().to_string(),
        };
        for placement in self.placements.placements_for(artifact_hash).await? {
            if let Some(node) = self.directory.lookup(&placement.node_id).await {
                if let Err(e) = self.node_agent.vod_delete(&node, &delete).await {
                    warn!(artifact_hash, node_id = %node.node_id, error = %e, "vod delete dispatch failed");
                }
            }
        }
        if artifact.storage_location == StorageLocation::S3 {
            if let Some(tenant_id) = artifact.tenant_id.as_deref() {
                let ext = artifact.format.as_deref().unwrap_or("mp4");
                let key = format!("vod/{tenant_id}/{artifact_hash}/{artifact_hash}.{ext}");
                if let Err(e) = self.object_store.delete(&key).await {
                    warn!(artifact_hash, error = %e, "s3 delete failed, sweeper will retry");
                }
            }
        }

        self.emit_lifecycle(&artifact, VodLifecycleStatus::Deleted, None);
        Ok(super::DeleteOutcome::deleted("vod asset"))
    }

    async fn find_vod(&self, artifact_hash: &str) -> AppResult<Artifact> {
        self.artifacts
            .find_by_hash(artifact_hash)
            .await?
            .filter(|a| a.artifact_type == ArtifactType::Vod)
            .ok_or_else(|| AppError::not_found("vod", artifact_hash))
    }

    fn emit_lifecycle(&self, artifact: &Artifact, status: VodLifecycleStatus, error: Option<String>) {
        self.analytics.emit_trigger(MistTrigger {
            trigger_type: "vod_lifecycle".to_string(),
            stream_id: None,
            tenant_id: artifact.tenant_id.clone().unwrap_or_default(),
            payload: TriggerPayload::VodLifecycle(VodLifecycleData {
                artifact_hash: artifact.artifact_hash.clone(),
                status,
                size_bytes: artifact.size_bytes,
                s3_url: artifact.s3_url.clone(),
                error_message: error,
            }),
        });
        self.analytics.emit_artifact_event(ArtifactEvent {
            artifact_type: ArtifactType::Vod,
            artifact_id: artifact.artifact_hash.clone(),
            status: status.to_string().to_lowercase(),
            started_at: artifact.started_at,
            completed_at: artifact.ended_at,
            expires_at: artifact.retention_until,
        });
    }
}
