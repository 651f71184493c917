mod local;

pub use local::LocalStore;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Object not found: {0}")]
    NotFound(String),
    #[error("Invalid object key: {0}")]
    InvalidKey(String),
}

/// Blob storage for asset files. Keys are relative, `/`-separated paths.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, key: &str, data: Bytes) -> Result<(), ObjectStoreError>;
    async fn get(&self, key: &str) -> Result<Bytes, ObjectStoreError>;
    async fn delete(&self, key: &str) -> Result<(), ObjectStoreError>;
    async fn exists(&self, key: &str) -> Result<bool, ObjectStoreError>;
}

/// `assets/{owner_id}/{uuid}.{ext}`; the extension is kept as uploaded.
pub fn asset_key(owner_id: i32, filename: &str) -> String {
    let id = Uuid::new_v4();
    match filename.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()) => {
            format!("assets/{}/{}.{}", owner_id, id, ext)
        }
        _ => format!("assets/{}/{}", owner_id, id),
    }
}

/// Rejects keys that could escape the store root.
pub fn validate_key(key: &str) -> Result<(), ObjectStoreError> {
    let bad = key.is_empty()
        || key.starts_with('/')
        || key.contains('\\')
        || key
            .split('/')
            .any(|segment| segment.is_empty() || segment == "." || segment == "..");
    if bad {
        return Err(ObjectStoreError::InvalidKey(key.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asset_key_keeps_extension_case() {
        let key = asset_key(7, "photo.PNG");
        assert!(key.starts_with("assets/7/"));
        assert!(key.ends_with(".PNG"));
        assert!(validate_key(&key).is_ok());
    }

    #[test]
    fn asset_key_without_extension() {
        let key = asset_key(1, "README");
        assert!(!key.contains('.'));
        let key = asset_key(1, "weird.ex/t");
        assert_eq!(key.matches('/').count(), 2);
    }

    #[test]
    fn traversal_keys_are_rejected() {
        for key in ["", "/etc/passwd", "../secret", "assets/../../x", "a//b", "a\\b", "./a"] {
            assert!(validate_key(key).is_err(), "{key} should be rejected");
        }
    }
}
