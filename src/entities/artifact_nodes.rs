use sea_orm::entity::prelude::*;

/// One placement of an artifact's bytes on a node; many-to-many between
/// artifacts and the fleet
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "artifact_nodes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub artifact_hash: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub node_id: String,
    pub file_path: Option<String>,
    pub base_url: String,
    pub cached_at: DateTimeUtc,
    pub last_seen_at: DateTimeUtc,
    pub is_orphaned: bool,
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
