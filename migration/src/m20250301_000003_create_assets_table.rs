use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Assets::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Assets::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Assets::OwnerId).integer().not_null())
                    .col(ColumnDef::new(Assets::FileKey).string().not_null())
                    .col(ColumnDef::new(Assets::OriginalFilename).string().not_null())
                    .col(ColumnDef::new(Assets::FileType).string_len(10).not_null())
                    .col(ColumnDef::new(Assets::Title).string_len(255).not_null())
                    .col(ColumnDef::new(Assets::Description).text())
                    .col(ColumnDef::new(Assets::Tags).json().not_null())
                    .col(ColumnDef::new(Assets::Version).integer().not_null().default(1))
                    .col(ColumnDef::new(Assets::FileSize).big_integer().not_null().default(0))
                    .col(ColumnDef::new(Assets::MimeType).string_len(100))
                    .col(ColumnDef::new(Assets::IsActive).boolean().not_null().default(true))
                    .col(ColumnDef::new(Assets::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Assets::UpdatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_assets_owner_id")
                            .from(Assets::Table, Assets::OwnerId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_assets_file_type")
                    .table(Assets::Table)
                    .col(Assets::FileType)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_assets_created_at")
                    .table(Assets::Table)
                    .col(Assets::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_assets_owner_file_type")
                    .table(Assets::Table)
                    .col(Assets::OwnerId)
                    .col(Assets::FileType)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Assets::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Assets {
    Table,
    Id,
    OwnerId,
    FileKey,
    OriginalFilename,
    FileType,
    Title,
    Description,
    Tags,
    Version,
    FileSize,
    MimeType,
    IsActive,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
}
