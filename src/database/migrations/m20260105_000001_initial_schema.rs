use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        self.create_artifacts_table(manager).await?;
        self.create_artifact_nodes_table(manager).await?;
        self.create_vod_uploads_table(manager).await?;
        self.create_indexes(manager).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(VodUploads::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ArtifactNodes::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Artifacts::Table).to_owned())
            .await?;
        Ok(())
    }
}

impl Migration {
    fn timestamp_column(&self, manager: &SchemaManager, column: impl IntoIden) -> ColumnDef {
        let mut col = ColumnDef::new(column);
        match manager.get_database_backend() {
            sea_orm::DatabaseBackend::Postgres => col.timestamp_with_time_zone().not_null(),
            _ => col.timestamp().not_null(),
        };
        col
    }

    fn nullable_timestamp_column(
        &self,
        manager: &SchemaManager,
        column: impl IntoIden,
    ) -> ColumnDef {
        let mut col = ColumnDef::new(column);
        match manager.get_database_backend() {
            sea_orm::DatabaseBackend::Postgres => col.timestamp_with_time_zone(),
            _ => col.timestamp(),
        };
        col
    }

    async fn create_artifacts_table(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Artifacts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Artifacts::ArtifactHash)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Artifacts::ArtifactType).string().not_null())
                    .col(ColumnDef::new(Artifacts::InternalName).string().not_null())
                    .col(
                        ColumnDef::new(Artifacts::ArtifactInternalName)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Artifacts::StreamId).string())
                    .col(ColumnDef::new(Artifacts::TenantId).string())
                    .col(ColumnDef::new(Artifacts::UserId).string())
                    .col(ColumnDef::new(Artifacts::Status).string().not_null())
                    .col(ColumnDef::new(Artifacts::RequestId).string().not_null())
                    .col(ColumnDef::new(Artifacts::Format).string())
                    .col(
                        ColumnDef::new(Artifacts::StorageLocation)
                            .string()
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(Artifacts::S3Url).string())
                    .col(ColumnDef::new(Artifacts::SizeBytes).big_integer())
                    .col(ColumnDef::new(Artifacts::ManifestPath).string())
                    .col(ColumnDef::new(Artifacts::ErrorMessage).text())
                    .col(self.nullable_timestamp_column(manager, Artifacts::StartedAt))
                    .col(self.nullable_timestamp_column(manager, Artifacts::EndedAt))
                    .col(ColumnDef::new(Artifacts::DurationSeconds).big_integer())
                    .col(self.nullable_timestamp_column(manager, Artifacts::RetentionUntil))
                    .col(self.nullable_timestamp_column(manager, Artifacts::FrozenAt))
                    .col(self.timestamp_column(manager, Artifacts::CreatedAt))
                    .col(self.timestamp_column(manager, Artifacts::UpdatedAt))
                    .to_owned(),
            )
            .await
    }

    async fn create_artifact_nodes_table(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ArtifactNodes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ArtifactNodes::ArtifactHash)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(ArtifactNodes::NodeId).string().not_null())
                    .col(ColumnDef::new(ArtifactNodes::FilePath).string())
                    .col(ColumnDef::new(ArtifactNodes::BaseUrl).string().not_null())
                    .col(self.timestamp_column(manager, ArtifactNodes::CachedAt))
                    .col(self.timestamp_column(manager, ArtifactNodes::LastSeenAt))
                    .col(
                        ColumnDef::new(ArtifactNodes::IsOrphaned)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .primary_key(
                        Index::create()
                            .col(ArtifactNodes::ArtifactHash)
                            .col(ArtifactNodes::NodeId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_artifact_nodes_artifact_hash")
                            .from(ArtifactNodes::Table, ArtifactNodes::ArtifactHash)
                            .to(Artifacts::Table, Artifacts::ArtifactHash)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::NoAction),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn create_vod_uploads_table(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(VodUploads::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(VodUploads::ArtifactHash)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(VodUploads::UploadId).string().not_null())
                    .col(ColumnDef::new(VodUploads::ObjectKey).string().not_null())
                    .col(ColumnDef::new(VodUploads::Filename).string().not_null())
                    .col(ColumnDef::new(VodUploads::SizeBytes).big_integer().not_null())
                    .col(ColumnDef::new(VodUploads::PartSize).big_integer().not_null())
                    .col(ColumnDef::new(VodUploads::PartCount).big_integer().not_null())
                    .col(self.timestamp_column(manager, VodUploads::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_vod_uploads_artifact_hash")
                            .from(VodUploads::Table, VodUploads::ArtifactHash)
                            .to(Artifacts::Table, Artifacts::ArtifactHash)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::NoAction),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn create_indexes(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        // Listing and active-lookup paths filter on (internal_name, type, status)
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_artifacts_internal_name_type")
                    .table(Artifacts::Table)
                    .col(Artifacts::InternalName)
                    .col(Artifacts::ArtifactType)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_artifacts_status")
                    .table(Artifacts::Table)
                    .col(Artifacts::Status)
                    .to_owned(),
            )
            .await?;
        // Keyset pagination orders on (created_at, artifact_hash)
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_artifacts_created_at_hash")
                    .table(Artifacts::Table)
                    .col(Artifacts::CreatedAt)
                    .col(Artifacts::ArtifactHash)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_artifact_nodes_node_id")
                    .table(ArtifactNodes::Table)
                    .col(ArtifactNodes::NodeId)
                    .to_owned(),
            )
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Artifacts {
    Table,
    ArtifactHash,
    ArtifactType,
    InternalName,
    ArtifactInternalName,
    StreamId,
    TenantId,
    UserId,
    Status,
    RequestId,
    Format,
    StorageLocation,
    S3Url,
    SizeBytes,
    ManifestPath,
    ErrorMessage,
    StartedAt,
    EndedAt,
    DurationSeconds,
    RetentionUntil,
    FrozenAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum ArtifactNodes {
    Table,
    ArtifactHash,
    NodeId,
    FilePath,
    BaseUrl,
    CachedAt,
    LastSeenAt,
    IsOrphaned,
}

#[derive(DeriveIden)]
enum VodUploads {
    Table,
    ArtifactHash,
    UploadId,
    ObjectKey,
    Filename,
    SizeBytes,
    PartSize,
    PartCount,
    CreatedAt,
}
