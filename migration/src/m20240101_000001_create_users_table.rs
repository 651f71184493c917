use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(User::Users)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(User::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(User::Username).string_len(150).not_null().unique_key())
                    .col(ColumnDef::new(User::Email).string_len(254).not_null().unique_key())
                    .col(ColumnDef::new(User::Password).string().not_null())
                    .col(
                        ColumnDef::new(User::Role)
                            .string_len(10)
                            .not_null()
                            .default("viewer"),
                    )
                    .col(ColumnDef::new(User::FirstName).string_len(150).not_null().default(""))
                    .col(ColumnDef::new(User::LastName).string_len(150).not_null().default(""))
                    .col(ColumnDef::new(User::ProfileInfo).text())
                    .col(ColumnDef::new(User::DateJoined).timestamp().not_null())
                    .col(ColumnDef::new(User::LastLogin).timestamp())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(User::Users).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum User {
    Users,
    Id,
    Username,
    Email,
    Password,
    Role,
    FirstName,
    LastName,
    ProfileInfo,
    DateJoined,
    LastLogin,
}
