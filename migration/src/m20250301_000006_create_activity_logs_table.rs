use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ActivityLogs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ActivityLogs::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ActivityLogs::AssetId).uuid().not_null())
                    .col(ColumnDef::new(ActivityLogs::UserId).integer().not_null())
                    .col(ColumnDef::new(ActivityLogs::Action).string_len(10).not_null())
                    .col(ColumnDef::new(ActivityLogs::Details).json().not_null())
                    .col(ColumnDef::new(ActivityLogs::IpAddress).string_len(45))
                    .col(ColumnDef::new(ActivityLogs::UserAgent).text())
                    .col(ColumnDef::new(ActivityLogs::Timestamp).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_activity_logs_asset_id")
                            .from(ActivityLogs::Table, ActivityLogs::AssetId)
                            .to(Assets::Table, Assets::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_activity_logs_user_id")
                            .from(ActivityLogs::Table, ActivityLogs::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_activity_logs_asset_action")
                    .table(ActivityLogs::Table)
                    .col(ActivityLogs::AssetId)
                    .col(ActivityLogs::Action)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_activity_logs_user_timestamp")
                    .table(ActivityLogs::Table)
                    .col(ActivityLogs::UserId)
                    .col(ActivityLogs::Timestamp)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_activity_logs_timestamp")
                    .table(ActivityLogs::Table)
                    .col(ActivityLogs::Timestamp)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ActivityLogs::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ActivityLogs {
    Table,
    Id,
    AssetId,
    UserId,
    Action,
    Details,
    IpAddress,
    UserAgent,
    Timestamp,
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
