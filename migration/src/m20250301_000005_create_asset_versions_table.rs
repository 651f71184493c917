use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AssetVersions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AssetVersions::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(AssetVersions::AssetId).uuid().not_null())
                    .col(ColumnDef::new(AssetVersions::VersionNumber).integer().not_null())
                    .col(ColumnDef::new(AssetVersions::FileKey).string().not_null())
                    .col(ColumnDef::new(AssetVersions::FileSize).big_integer().not_null().default(0))
                    .col(ColumnDef::new(AssetVersions::Changes).text())
                    .col(ColumnDef::new(AssetVersions::CreatedBy).integer().not_null())
                    .col(ColumnDef::new(AssetVersions::CreatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_asset_versions_asset_id")
                            .from(AssetVersions::Table, AssetVersions::AssetId)
                            .to(Assets::Table, Assets::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_asset_versions_created_by")
                            .from(AssetVersions::Table, AssetVersions::CreatedBy)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_asset_versions_asset_version_number")
                    .table(AssetVersions::Table)
                    .col(AssetVersions::AssetId)
                    .col(AssetVersions::VersionNumber)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AssetVersions::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum AssetVersions {
    Table,
    Id,
    AssetId,
    VersionNumber,
    FileKey,
    FileSize,
    Changes,
    CreatedBy,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Assets {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
}
