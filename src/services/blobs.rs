use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QuerySelect};
use std::collections::BTreeSet;
use uuid::Uuid;

use crate::entities::{asset, asset_version};
use crate::storage::ObjectStore;

/// Every distinct blob key referenced by the given assets, current files
/// and version snapshots alike.
pub async fn keys_for_assets<C: ConnectionTrait>(
    conn: &C,
    asset_ids: &[Uuid],
) -> Result<BTreeSet<String>, DbErr> {
    if asset_ids.is_empty() {
        return Ok(BTreeSet::new());
    }

    let current: Vec<String> = asset::Entity::find()
        .select_only()
        .column(asset::Column::FileKey)
        .filter(asset::Column::Id.is_in(asset_ids.iter().copied()))
        .into_tuple()
        .all(conn)
        .await?;

    let snapshots: Vec<String> = asset_version::Entity::find()
        .select_only()
        .column(asset_version::Column::FileKey)
        .filter(asset_version::Column::AssetId.is_in(asset_ids.iter().copied()))
        .into_tuple()
        .all(conn)
        .await?;

    Ok(current.into_iter().chain(snapshots).collect())
}

/// Remove blobs after their rows are gone. Failures are logged and skipped.
pub async fn purge(store: &dyn ObjectStore, keys: impl IntoIterator<Item = String>) {
    for key in keys {
        if let Err(e) = store.delete(&key).await {
            tracing::warn!(key = %key, error = %e, "failed to delete blob");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::LocalStore;
    use bytes::Bytes;

    #[tokio::test]
    async fn purge_skips_missing_blobs() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path()).unwrap();
        store.put("assets/1/a.txt", Bytes::from_static(b"a")).await.unwrap();

        purge(
            &store,
            ["assets/1/a.txt".to_string(), "assets/1/gone.txt".to_string()],
        )
        .await;

        assert!(!store.exists("assets/1/a.txt").await.unwrap());
    }
}
