use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Metadata::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Metadata::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Metadata::AssetId).uuid().not_null())
                    .col(ColumnDef::new(Metadata::FieldName).string_len(100).not_null())
                    .col(ColumnDef::new(Metadata::FieldValue).text().not_null())
                    .col(ColumnDef::new(Metadata::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Metadata::UpdatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_metadata_asset_id")
                            .from(Metadata::Table, Metadata::AssetId)
                            .to(Assets::Table, Assets::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_metadata_asset_field_name")
                    .table(Metadata::Table)
                    .col(Metadata::AssetId)
                    .col(Metadata::FieldName)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Metadata::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Metadata {
    Table,
    Id,
    AssetId,
    FieldName,
    FieldValue,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Assets {
    Table,
    Id,
}
