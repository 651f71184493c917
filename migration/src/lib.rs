pub use sea_orm_migration::prelude::*;

mod m20240101_000001_create_users_table;
mod m20240101_000002_create_refresh_tokens_table;
mod m20250301_000003_create_assets_table;
mod m20250301_000004_create_metadata_table;
mod m20250301_000005_create_asset_versions_table;
mod m20250301_000006_create_activity_logs_table;
mod m20250301_000007_create_comments_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_users_table::Migration),
            Box::new(m20240101_000002_create_refresh_tokens_table::Migration),
            Box::new(m20250301_000003_create_assets_table::Migration),
            Box::new(m20250301_000004_create_metadata_table::Migration),
            Box::new(m20250301_000005_create_asset_versions_table::Migration),
            Box::new(m20250301_000006_create_activity_logs_table::Migration),
            Box::new(m20250301_000007_create_comments_table::Migration),
        ]
    }
}
