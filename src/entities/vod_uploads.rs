use sea_orm::entity::prelude::*;

/// Multipart-upload bookkeeping for a VOD artifact; removed once the upload
/// completes or aborts
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "vod_uploads")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub artifact_hash: String,
    pub upload_id: String,
    pub object_key: String,
    pub filename: String,
    pub size_bytes: i64,
    pub part_size: i64,
    pub part_count: i64,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::artifacts::Entity",
        from = "Column::ArtifactHash",
        to = "super::artifacts::Column::ArtifactHash"
    )]
    Artifact,
}

impl Related<super::artifacts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Artifact.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
