use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "artifacts")]
pub struct Model {
    /// Opaque 32-hex identifier, globally unique across artifact types
    #[sea_orm(primary_key, auto_increment = false)]
    pub artifact_hash: String,
    pub artifact_type: String,
    pub internal_name: String,
    pub artifact_internal_name: String,
    pub stream_id: Option<String>,
    pub tenant_id: Option<String>,
    pub user_id: Option<String>,
    pub status: String,
    pub request_id: String,
    pub format: Option<String>,
    pub storage_location: String,
    pub s3_url: Option<String>,
    pub size_bytes: Option<i64>,
    pub manifest_path: Option<String>,
    pub error_message: Option<String>,
    pub started_at: Option<DateTimeUtc>,
    pub ended_at: Option<DateTimeUtc>,
    pub duration_seconds: Option<i64>,
    pub retention_until: Option<DateTimeUtc>,
    pub frozen_at: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::artifact_nodes::Entity")]
    ArtifactNodes,
}

impl Related<super::artifact_nodes::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ArtifactNodes.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
