//! File replacement for assets.
//!
//! Replacing a file snapshots the *current* file as an [`asset_version`]
//! row numbered with the current version, then bumps the live asset's
//! version by one. Field-only edits never reach this module.

use sea_orm::{ActiveModelTrait, ActiveValue, ConnectionTrait, DbErr, Set};
use uuid::Uuid;

use crate::entities::{asset, asset_version};

pub const DEFAULT_CHANGE_NOTE: &str = "File updated";

/// A blob already written to the object store that should become the
/// asset's current file.
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub key: String,
    pub size: i64,
    pub mime_type: Option<String>,
    pub original_filename: String,
}

/// Insert the snapshot of `current` and stage the new file plus the
/// incremented version on `pending`. The caller saves `pending`, ideally in
/// the same transaction. `file_type` is left untouched.
pub async fn supersede<C: ConnectionTrait>(
    conn: &C,
    current: &asset::Model,
    pending: &mut asset::ActiveModel,
    next: StoredFile,
    created_by: i32,
    changes: Option<String>,
) -> Result<asset_version::Model, DbErr> {
    let snapshot = snapshot_of(current, created_by, changes)
        .insert(conn)
        .await?;

    pending.version = Set(current.version + 1);
    pending.file_key = Set(next.key);
    pending.file_size = Set(next.size);
    pending.mime_type = Set(next.mime_type);
    pending.original_filename = Set(next.original_filename);

    tracing::info!(
        asset_id = %current.id,
        superseded_version = snapshot.version_number,
        new_version = current.version + 1,
        "asset file replaced"
    );

    Ok(snapshot)
}

fn snapshot_of(
    current: &asset::Model,
    created_by: i32,
    changes: Option<String>,
) -> asset_version::ActiveModel {
    let changes = changes
        .map(|note| note.trim().to_string())
        .filter(|note| !note.is_empty())
        .unwrap_or_else(|| DEFAULT_CHANGE_NOTE.to_string());

    asset_version::ActiveModel {
        id: Set(Uuid::new_v4()),
        asset_id: Set(current.id),
        version_number: Set(current.version),
        file_key: Set(current.file_key.clone()),
        file_size: Set(current.file_size),
        changes: Set(Some(changes)),
        created_by: Set(created_by),
        created_at: Set(chrono::Utc::now().naive_utc()),
    }
}

/// True when `pending` carries a staged file replacement.
pub fn replaces_file(pending: &asset::ActiveModel) -> bool {
    matches!(pending.file_key, ActiveValue::Set(_))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::IntoActiveModel;

    fn current() -> asset::Model {
        let now = chrono::Utc::now().naive_utc();
        asset::Model {
            id: Uuid::new_v4(),
            owner_id: 3,
            file_key: "assets/3/old.png".to_string(),
            original_filename: "old.png".to_string(),
            file_type: asset::FileType::Image,
            title: "Logo".to_string(),
            description: None,
            tags: serde_json::json!([]),
            version: 4,
            file_size: 100,
            mime_type: Some("image/png".to_string()),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn snapshot_captures_previous_file_and_number() {
        let asset = current();
        let snapshot = snapshot_of(&asset, 9, None);
        assert_eq!(snapshot.version_number, Set(4));
        assert_eq!(snapshot.file_key, Set("assets/3/old.png".to_string()));
        assert_eq!(snapshot.file_size, Set(100));
        assert_eq!(snapshot.created_by, Set(9));
        assert_eq!(snapshot.changes, Set(Some(DEFAULT_CHANGE_NOTE.to_string())));
    }

    #[test]
    fn blank_change_note_falls_back_to_default() {
        let snapshot = snapshot_of(&current(), 1, Some("   ".to_string()));
        assert_eq!(snapshot.changes, Set(Some(DEFAULT_CHANGE_NOTE.to_string())));
        let snapshot = snapshot_of(&current(), 1, Some(" new crop ".to_string()));
        assert_eq!(snapshot.changes, Set(Some("new crop".to_string())));
    }

    #[test]
    fn untouched_active_model_does_not_replace_file() {
        let pending = current().into_active_model();
        assert!(!replaces_file(&pending));
    }
}
