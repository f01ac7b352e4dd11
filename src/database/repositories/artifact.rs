//! SeaORM-based artifact registry repository
//!
//! The single source of truth for "where are the bytes and what state".
//! Status transitions are guarded writes: `UPDATE ... WHERE artifact_hash = ?
//! AND status IN (allowed predecessors)`, so a stale or duplicate report can
//! never move a row backward through its lifecycle DAG.

use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};

use crate::entities::{artifacts, prelude::Artifacts};
use crate::errors::{RepositoryError, RepositoryResult};
use crate::models::{Artifact, ArtifactStatus, ArtifactType, StorageLocation};

/// Keyset cursor over `(created_at, artifact_hash)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListCursor {
    pub created_at: DateTime<Utc>,
    pub artifact_hash: String,
}

impl ListCursor {
    pub fn encode(&self) -> String {
        format!("{}|{}", self.created_at.timestamp_micros(), self.artifact_hash)
    }

    pub fn decode(raw: &str) -> RepositoryResult<Self> {
        let (ts, hash) = raw.split_once('|').ok_or_else(|| RepositoryError::InvalidCursor {
            cursor: raw.to_string(),
        })?;
        let micros: i64 = ts.parse().map_err(|_| RepositoryError::InvalidCursor {
            cursor: raw.to_string(),
        })?;
        let created_at =
            DateTime::from_timestamp_micros(micros).ok_or_else(|| RepositoryError::InvalidCursor {
                cursor: raw.to_string(),
            })?;
        Ok(Self {
            created_at,
            artifact_hash: hash.to_string(),
        })
    }

    fn for_artifact(artifact: &Artifact) -> Self {
        Self {
            created_at: artifact.created_at,
            artifact_hash: artifact.artifact_hash.clone(),
        }
    }
}

/// One page of a bidirectional keyset listing
#[derive(Debug, Clone)]
pub struct ArtifactPage {
    pub items: Vec<Artifact>,
    pub has_next_page: bool,
    pub has_previous_page: bool,
    pub start_cursor: Option<String>,
    pub end_cursor: Option<String>,
}

/// SeaORM-based repository for artifact lifecycle state
#[derive(Clone)]
pub struct ArtifactRepository {
    connection: Arc<DatabaseConnection>,
}

impl ArtifactRepository {
    pub fn new(connection: Arc<DatabaseConnection>) -> Self {
        Self { connection }
    }

    /// Insert a new artifact row
    pub async fn insert(&self, artifact: &Artifact) -> RepositoryResult<Artifact> {
        let active_model = artifacts::ActiveModel {
            artifact_hash: Set(artifact.artifact_hash.clone()),
            artifact_type: Set(artifact.artifact_type.to_string()),
            internal_name: Set(artifact.internal_name.clone()),
            artifact_internal_name: Set(artifact.artifact_internal_name.clone()),
            stream_id: Set(artifact.stream_id.clone()),
            tenant_id: Set(artifact.tenant_id.clone()),
            user_id: Set(artifact.user_id.clone()),
            status: Set(artifact.status.to_string()),
            request_id: Set(artifact.request_id.clone()),
            format: Set(artifact.format.clone()),
            storage_location: Set(artifact.storage_location.to_string()),
            s3_url: Set(artifact.s3_url.clone()),
            size_bytes: Set(artifact.size_bytes),
            manifest_path: Set(artifact.manifest_path.clone()),
            error_message: Set(artifact.error_message.clone()),
            started_at: Set(artifact.started_at),
            ended_at: Set(artifact.ended_at),
            duration_seconds: Set(artifact.duration_seconds),
            retention_until: Set(artifact.retention_until),
            frozen_at: Set(artifact.frozen_at),
            created_at: Set(artifact.created_at),
            updated_at: Set(artifact.updated_at),
        };

        let model = active_model.insert(self.connection.as_ref()).await?;
        Self::model_to_domain(model)
    }

    /// Find an artifact by its hash
    pub async fn find_by_hash(&self, artifact_hash: &str) -> RepositoryResult<Option<Artifact>> {
        let model = Artifacts::find_by_id(artifact_hash)
            .one(self.connection.as_ref())
            .await?;
        model.map(Self::model_to_domain).transpose()
    }

    /// Find the newest artifact of `artifact_type` for `internal_name` whose
    /// status is in `statuses`
    pub async fn find_by_internal_name_in_statuses(
        &self,
        artifact_type: ArtifactType,
        internal_name: &str,
        statuses: &[ArtifactStatus],
    ) -> RepositoryResult<Option<Artifact>> {
        let status_strings: Vec<String> = statuses.iter().map(|s| s.to_string()).collect();
        let model = Artifacts::find()
            .filter(artifacts::Column::ArtifactType.eq(artifact_type.to_string()))
            .filter(artifacts::Column::InternalName.eq(internal_name))
            .filter(artifacts::Column::Status.is_in(status_strings))
            .order_by_desc(artifacts::Column::CreatedAt)
            .one(self.connection.as_ref())
            .await?;
        model.map(Self::model_to_domain).transpose()
    }

    /// Active DVR session for idempotent start, if any
    pub async fn find_active_dvr(&self, internal_name: &str) -> RepositoryResult<Option<Artifact>> {
        self.find_by_internal_name_in_statuses(
            ArtifactType::Dvr,
            internal_name,
            &[
                ArtifactStatus::Requested,
                ArtifactStatus::Starting,
                ArtifactStatus::Recording,
            ],
        )
        .await
    }

    /// Bidirectional keyset listing over `(created_at, artifact_hash)`
    ///
    /// Forward traversal walks the list in descending creation time from the
    /// cursor; backward traversal returns the rows immediately preceding the
    /// cursor, in the same descending presentation order. `limit + 1` rows
    /// are fetched to detect `has_more`; deleted rows are hidden unless
    /// `include_deleted` is set.
    pub async fn list_by_internal_name(
        &self,
        artifact_type: ArtifactType,
        internal_name: &str,
        cursor: Option<&ListCursor>,
        limit: u64,
        backward: bool,
        include_deleted: bool,
    ) -> RepositoryResult<ArtifactPage> {
        let mut query = Artifacts::find()
            .filter(artifacts::Column::ArtifactType.eq(artifact_type.to_string()))
            .filter(artifacts::Column::InternalName.eq(internal_name));

        if !include_deleted {
            query = query.filter(
                artifacts::Column::Status.ne(ArtifactStatus::Deleted.to_string()),
            );
        }

        if let Some(c) = cursor {
            let condition = if backward {
                // rows strictly before the cursor in the descending listing
                Condition::any()
                    .add(artifacts::Column::CreatedAt.gt(c.created_at))
                    .add(
                        Condition::all()
                            .add(artifacts::Column::CreatedAt.eq(c.created_at))
                            .add(artifacts::Column::ArtifactHash.gt(c.artifact_hash.clone())),
                    )
            } else {
                // rows strictly after the cursor in the descending listing
                Condition::any()
                    .add(artifacts::Column::CreatedAt.lt(c.created_at))
                    .add(
                        Condition::all()
                            .add(artifacts::Column::CreatedAt.eq(c.created_at))
                            .add(artifacts::Column::ArtifactHash.lt(c.artifact_hash.clone())),
                    )
            };
            query = query.filter(condition);
        }

        let query = if backward {
            query
                .order_by_asc(artifacts::Column::CreatedAt)
                .order_by_asc(artifacts::Column::ArtifactHash)
        } else {
            query
                .order_by_desc(artifacts::Column::CreatedAt)
                .order_by_desc(artifacts::Column::ArtifactHash)
        };

        let mut models = query
            .limit(limit + 1)
            .all(self.connection.as_ref())
            .await?;

        let has_more = models.len() as u64 > limit;
        if has_more {
            models.truncate(limit as usize);
        }
        if backward {
            models.reverse();
        }

        let items: Vec<Artifact> = models
            .into_iter()
            .map(Self::model_to_domain)
            .collect::<RepositoryResult<_>>()?;

        let (has_next_page, has_previous_page) = if backward {
            (cursor.is_some(), has_more)
        } else {
            (has_more, cursor.is_some())
        };

        Ok(ArtifactPage {
            start_cursor: items.first().map(|a| ListCursor::for_artifact(a).encode()),
            end_cursor: items.last().map(|a| ListCursor::for_artifact(a).encode()),
            has_next_page,
            has_previous_page,
            items,
        })
    }

    /// Guarded status transition; returns whether a row actually moved
    pub async fn transition_status(
        &self,
        artifact_hash: &str,
        from: &[ArtifactStatus],
        to: ArtifactStatus,
    ) -> RepositoryResult<bool> {
        let from_strings: Vec<String> = from.iter().map(|s| s.to_string()).collect();
        let result = Artifacts::update_many()
            .col_expr(artifacts::Column::Status, Expr::value(to.to_string()))
            .col_expr(artifacts::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(artifacts::Column::ArtifactHash.eq(artifact_hash))
            .filter(artifacts::Column::Status.is_in(from_strings))
            .exec(self.connection.as_ref())
            .await?;
        Ok(result.rows_affected > 0)
    }

    /// Transition into `failed` from any non-terminal state, recording the
    /// cause for the lifecycle event
    pub async fn mark_failed(
        &self,
        artifact_hash: &str,
        error_message: &str,
    ) -> RepositoryResult<bool> {
        let terminal = [
            ArtifactStatus::Failed.to_string(),
            ArtifactStatus::Deleted.to_string(),
        ];
        let result = Artifacts::update_many()
            .col_expr(
                artifacts::Column::Status,
                Expr::value(ArtifactStatus::Failed.to_string()),
            )
            .col_expr(artifacts::Column::ErrorMessage, Expr::value(error_message))
            .col_expr(artifacts::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(artifacts::Column::ArtifactHash.eq(artifact_hash))
            .filter(artifacts::Column::Status.is_not_in(terminal))
            .exec(self.connection.as_ref())
            .await?;
        Ok(result.rows_affected > 0)
    }

    /// Soft delete; idempotent. Returns false when the row was already
    /// deleted (or absent), so double-deletes surface as a no-op.
    pub async fn soft_delete(&self, artifact_hash: &str) -> RepositoryResult<bool> {
        let result = Artifacts::update_many()
            .col_expr(
                artifacts::Column::Status,
                Expr::value(ArtifactStatus::Deleted.to_string()),
            )
            .col_expr(artifacts::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(artifacts::Column::ArtifactHash.eq(artifact_hash))
            .filter(artifacts::Column::Status.ne(ArtifactStatus::Deleted.to_string()))
            .exec(self.connection.as_ref())
            .await?;
        Ok(result.rows_affected > 0)
    }

    /// Guarded completion for a VOD upload: moves `uploading` to `ready` and
    /// stamps the canonical object-store location in one write
    pub async fn complete_vod(
        &self,
        artifact_hash: &str,
        s3_url: &str,
        size_bytes: Option<i64>,
    ) -> RepositoryResult<bool> {
        let result = Artifacts::update_many()
            .col_expr(
                artifacts::Column::Status,
                Expr::value(ArtifactStatus::Ready.to_string()),
            )
            .col_expr(
                artifacts::Column::StorageLocation,
                Expr::value(StorageLocation::S3.to_string()),
            )
            .col_expr(artifacts::Column::S3Url, Expr::value(s3_url))
            .col_expr(artifacts::Column::SizeBytes, Expr::value(size_bytes))
            .col_expr(artifacts::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(artifacts::Column::ArtifactHash.eq(artifact_hash))
            .filter(artifacts::Column::Status.eq(ArtifactStatus::Uploading.to_string()))
            .exec(self.connection.as_ref())
            .await?;
        Ok(result.rows_affected > 0)
    }

    /// Record session boundaries on a DVR artifact
    pub async fn set_session_times(
        &self,
        artifact_hash: &str,
        started_at: Option<DateTime<Utc>>,
        ended_at: Option<DateTime<Utc>>,
    ) -> RepositoryResult<bool> {
        let duration = match (started_at, ended_at) {
            (Some(s), Some(e)) => Some((e - s).num_seconds()),
            _ => None,
        };
        let mut update = Artifacts::update_many()
            .col_expr(artifacts::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(artifacts::Column::ArtifactHash.eq(artifact_hash));
        if let Some(s) = started_at {
            update = update.col_expr(artifacts::Column::StartedAt, Expr::value(s));
        }
        if let Some(e) = ended_at {
            update = update.col_expr(artifacts::Column::EndedAt, Expr::value(e));
        }
        if let Some(d) = duration {
            update = update.col_expr(artifacts::Column::DurationSeconds, Expr::value(d));
        }
        let result = update.exec(self.connection.as_ref()).await?;
        Ok(result.rows_affected > 0)
    }

    /// Hard delete, used only by VOD upload abort where no bytes exist yet
    pub async fn hard_delete(&self, artifact_hash: &str) -> RepositoryResult<bool> {
        let result = Artifacts::delete_by_id(artifact_hash)
            .exec(self.connection.as_ref())
            .await?;
        Ok(result.rows_affected > 0)
    }

    fn model_to_domain(model: artifacts::Model) -> RepositoryResult<Artifact> {
        let parse = |field: &str, value: &str| RepositoryError::ConstraintViolation {
            constraint: field.to_string(),
            message: format!("unrecognized value '{value}'"),
        };
        Ok(Artifact {
            artifact_type: ArtifactType::from_str(&model.artifact_type)
                .map_err(|_| parse("artifact_type", &model.artifact_type))?,
            status: ArtifactStatus::from_str(&model.status)
                .map_err(|_| parse("status", &model.status))?,
            storage_location: StorageLocation::from_str(&model.storage_location)
                .map_err(|_| parse("storage_location", &model.storage_location))?,
            artifact_hash: model.artifact_hash,
            internal_name: model.internal_name,
            artifact_internal_name: model.artifact_internal_name,
            stream_id: model.stream_id,
            tenant_id: model.tenant_id,
            user_id: model.user_id,
            request_id: model.request_id,
            format: model.format,
            s3_url: model.s3_url,
            size_bytes: model.size_bytes,
            manifest_path: model.manifest_path,
            error_message: model.error_message,
            started_at: model.started_at,
            ended_at: model.ended_at,
            duration_seconds: model.duration_seconds,
            retention_until: model.retention_until,
            frozen_at: model.frozen_at,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_round_trips() {
        let cursor = ListCursor {
            created_at: DateTime::from_timestamp_micros(1_700_000_000_123_456).unwrap(),
            artifact_hash: "0123456789abcdef0123456789abcdef".to_string(),
        };
        let decoded = ListCursor::decode(&cursor.encode()).unwrap();
        assert_eq!(decoded, cursor);
    }

    #[test]
    fn bad_cursors_are_rejected() {
        assert!(ListCursor::decode("not-a-cursor").is_err());
        assert!(ListCursor::decode("abc|def").is_err());
        assert!(ListCursor::decode("").is_err());
    }
}
