//! Repository for in-flight VOD multipart uploads
//!
//! Rows live only while an upload is in progress: inserted by the create
//! call, removed on completion or abort.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};

use crate::entities::{prelude::VodUploads, vod_uploads};
use crate::errors::RepositoryResult;

/// Multipart bookkeeping for one VOD artifact
#[derive(Debug, Clone)]
pub struct VodUpload {
    pub artifact_hash: String,
    pub upload_id: String,
    pub object_key: String,
    pub filename: String,
    pub size_bytes: i64,
    pub part_size: i64,
    pub part_count: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct VodUploadRepository {
    connection: Arc<DatabaseConnection>,
}

impl VodUploadRepository {
    pub fn new(connection: Arc<DatabaseConnection>) -> Self {
        Self { connection }
    }

    pub async fn insert(&self, upload: &VodUpload) -> RepositoryResult<()> {
        let active_model = vod_uploads::ActiveModel {
            artifact_hash: Set(upload.artifact_hash.clone()),
            upload_id: Set(upload.upload_id.clone()),
            object_key: Set(upload.object_key.clone()),
            filename: Set(upload.filename.clone()),
            size_bytes: Set(upload.size_bytes),
            part_size: Set(upload.part_size),
            part_count: Set(upload.part_count),
            created_at: Set(upload.created_at),
        };
        active_model.insert(self.connection.as_ref()).await?;
        Ok(())
    }

    pub async fn find_by_hash(&self, artifact_hash: &str) -> RepositoryResult<Option<VodUpload>> {
        let model = VodUploads::find_by_id(artifact_hash)
            .one(self.connection.as_ref())
            .await?;
        Ok(model.map(|m| VodUpload {
            artifact_hash: m.artifact_hash,
            upload_id: m.upload_id,
            object_key: m.object_key,
            filename: m.filename,
            size_bytes: m.size_bytes,
            part_size: m.part_size,
            part_count: m.part_count,
            created_at: m.created_at,
        }))
    }

    pub async fn delete(&self, artifact_hash: &str) -> RepositoryResult<bool> {
        let result = VodUploads::delete_by_id(artifact_hash)
            .exec(self.connection.as_ref())
            .await?;
        Ok(result.rows_affected > 0)
    }
}
