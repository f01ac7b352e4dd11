//! SeaORM-based repository for artifact placements
//!
//! Tracks which node(s) hold an artifact's bytes. Placements are upserted on
//! `(artifact_hash, node_id)`; the orphan bit is flipped when a node reports
//! the file missing or a cache probe fails.

use std::sync::Arc;

use chrono::Utc;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};

use crate::entities::{artifact_nodes, prelude::ArtifactNodes};
use crate::errors::RepositoryResult;
use crate::models::ArtifactNodePlacement;

#[derive(Clone)]
pub struct ArtifactNodeRepository {
    connection: Arc<DatabaseConnection>,
}

impl ArtifactNodeRepository {
    pub fn new(connection: Arc<DatabaseConnection>) -> Self {
        Self { connection }
    }

    /// Upsert one placement row
    pub async fn upsert(&self, placement: &ArtifactNodePlacement) -> RepositoryResult<()> {
        let active_model = artifact_nodes::ActiveModel {
            artifact_hash: Set(placement.artifact_hash.clone()),
            node_id: Set(placement.node_id.clone()),
            file_path: Set(placement.file_path.clone()),
            base_url: Set(placement.base_url.clone()),
            cached_at: Set(placement.cached_at),
            last_seen_at: Set(placement.last_seen_at),
            is_orphaned: Set(placement.is_orphaned),
        };

        ArtifactNodes::insert(active_model)
            .on_conflict(
                OnConflict::columns([
                    artifact_nodes::Column::ArtifactHash,
                    artifact_nodes::Column::NodeId,
                ])
                .update_columns([
                    artifact_nodes::Column::FilePath,
                    artifact_nodes::Column::BaseUrl,
                    artifact_nodes::Column::LastSeenAt,
                    artifact_nodes::Column::IsOrphaned,
                ])
                .to_owned(),
            )
            .exec(self.connection.as_ref())
            .await?;
        Ok(())
    }

    /// All placements for an artifact, orphaned ones last
    pub async fn placements_for(
        &self,
        artifact_hash: &str,
    ) -> RepositoryResult<Vec<ArtifactNodePlacement>> {
        let models = ArtifactNodes::find()
            .filter(artifact_nodes::Column::ArtifactHash.eq(artifact_hash))
            .all(self.connection.as_ref())
            .await?;

        let mut placements: Vec<ArtifactNodePlacement> =
            models.into_iter().map(Self::model_to_domain).collect();
        placements.sort_by_key(|p| p.is_orphaned);
        Ok(placements)
    }

    /// Flip the orphan bit for one placement
    pub async fn mark_orphaned(&self, artifact_hash: &str, node_id: &str) -> RepositoryResult<bool> {
        let result = ArtifactNodes::update_many()
            .col_expr(artifact_nodes::Column::IsOrphaned, Expr::value(true))
            .col_expr(artifact_nodes::Column::LastSeenAt, Expr::value(Utc::now()))
            .filter(artifact_nodes::Column::ArtifactHash.eq(artifact_hash))
            .filter(artifact_nodes::Column::NodeId.eq(node_id))
            .exec(self.connection.as_ref())
            .await?;
        Ok(result.rows_affected > 0)
    }

    /// Remove all placements for an artifact (VOD abort hard-delete path)
    pub async fn delete_for_artifact(&self, artifact_hash: &str) -> RepositoryResult<u64> {
        let result = ArtifactNodes::delete_many()
            .filter(artifact_nodes::Column::ArtifactHash.eq(artifact_hash))
            .exec(self.connection.as_ref())
            .await?;
        Ok(result.rows_affected)
    }

    fn model_to_domain(model: artifact_nodes::Model) -> ArtifactNodePlacement {
        ArtifactNodePlacement {
            artifact_hash: model.artifact_hash,
            node_id: model.node_id,
            file_path: model.file_path,
            base_url: model.base_url,
            cached_at: model.cached_at,
            last_seen_at: model.last_seen_at,
            is_orphaned: model.is_orphaned,
        }
    }
}
