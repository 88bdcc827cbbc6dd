//! Local filesystem content store.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;
use tracing::debug;
use uuid::Uuid;

use filedepot_core::error::{AppError, ErrorKind};
use filedepot_core::result::AppResult;
use filedepot_core::traits::ContentStore;

/// Content store backed by the local filesystem.
///
/// Blobs live at `<root>/<namespace>/<uuid>`; the relative portion is the
/// content key. Writes go through a unique temp name followed by a rename,
/// so a crashed write never leaves a readable partial blob behind.
#[derive(Debug, Clone)]
pub struct LocalContentStore {
    /// Root directory for all stored content.
    root: PathBuf,
}

impl LocalContentStore {
    /// Create a content store rooted at the given path, creating it if needed.
    pub async fn new(root_path: &str) -> AppResult<Self> {
        let root = PathBuf::from(root_path);
        fs::create_dir_all(&root).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to create storage root: {}", root.display()),
                e,
            )
        })?;
        Ok(Self { root })
    }

    /// Resolve a content key or namespace to an absolute path under the root.
    ///
    /// Keys are minted by [`LocalContentStore::put`] and never contain path
    /// traversal, but a key arriving from a corrupted record must not
    /// escape the root either.
    fn resolve(&self, key: &str) -> AppResult<PathBuf> {
        let clean = key.trim_start_matches('/');
        if clean.is_empty()
            || Path::new(clean)
                .components()
                .any(|c| !matches!(c, std::path::Component::Normal(_)))
        {
            return Err(AppError::storage(format!("Invalid content key: '{key}'")));
        }
        Ok(self.root.join(clean))
    }
}

#[async_trait]
impl ContentStore for LocalContentStore {
    async fn put(&self, namespace: &str, data: Bytes) -> AppResult<String> {
        let key = format!("{}/{}", namespace, Uuid::new_v4().simple());
        let full_path = self.resolve(&key)?;

        // The namespace directory is provisioned with the user, but an
        // interrupted setup should not fail every subsequent upload.
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to create namespace directory: {}", parent.display()),
                    e,
                )
            })?;
        }

        // Temp-then-rename keeps a crashed write invisible under the
        // final key.
        let tmp_path = full_path.with_extension("tmp");
        fs::write(&tmp_path, &data).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to write blob: {key}"),
                e,
            )
        })?;
        if let Err(e) = fs::rename(&tmp_path, &full_path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to commit blob: {key}"),
                e,
            ));
        }

        debug!(key, bytes = data.len(), "Stored blob");
        Ok(key)
    }

    async fn get(&self, key: &str) -> AppResult<Bytes> {
        let full_path = self.resolve(key)?;
        let data = fs::read(&full_path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AppError::not_found(format!("Blob not found: {key}"))
            } else {
                AppError::with_source(ErrorKind::Storage, format!("Failed to read blob: {key}"), e)
            }
        })?;
        Ok(Bytes::from(data))
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        let full_path = self.resolve(key)?;
        fs::remove_file(&full_path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AppError::not_found(format!("Blob not found: {key}"))
            } else {
                AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to delete blob: {key}"),
                    e,
                )
            }
        })?;
        debug!(key, "Deleted blob");
        Ok(())
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        let full_path = self.resolve(key)?;
        Ok(full_path.exists())
    }

    async fn create_namespace(&self, namespace: &str) -> AppResult<()> {
        let full_path = self.resolve(namespace)?;
        fs::create_dir_all(&full_path).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to create namespace: {namespace}"),
                e,
            )
        })?;
        debug!(namespace, "Created namespace");
        Ok(())
    }

    async fn remove_namespace(&self, namespace: &str) -> AppResult<()> {
        let full_path = self.resolve(namespace)?;
        if full_path.exists() {
            fs::remove_dir_all(&full_path).await.map_err(|e| {
                AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to remove namespace: {namespace}"),
                    e,
                )
            })?;
        }
        debug!(namespace, "Removed namespace");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use filedepot_core::error::ErrorKind;

    async fn store() -> (tempfile::TempDir, LocalContentStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalContentStore::new(dir.path().to_str().unwrap())
            .await
            .unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_put_get_delete() {
        let (_dir, store) = store().await;
        store.create_namespace("u-1").await.unwrap();

        let data = Bytes::from("hello world");
        let key = store.put("u-1", data.clone()).await.unwrap();
        assert!(key.starts_with("u-1/"));
        assert!(store.exists(&key).await.unwrap());

        let read_back = store.get(&key).await.unwrap();
        assert_eq!(read_back, data);

        store.delete(&key).await.unwrap();
        assert!(!store.exists(&key).await.unwrap());
    }

    #[tokio::test]
    async fn test_put_mints_fresh_keys_for_identical_bytes() {
        let (_dir, store) = store().await;
        store.create_namespace("u-1").await.unwrap();

        let a = store.put("u-1", Bytes::from("same")).await.unwrap();
        let b = store.put("u-1", Bytes::from("same")).await.unwrap();
        assert_ne!(a, b);
        assert_eq!(store.get(&a).await.unwrap(), store.get(&b).await.unwrap());
    }

    #[tokio::test]
    async fn test_get_and_delete_absent_key_report_not_found() {
        let (_dir, store) = store().await;

        let err = store.get("u-1/missing").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);

        let err = store.delete("u-1/missing").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_remove_namespace_deletes_residual_blobs() {
        let (_dir, store) = store().await;
        store.create_namespace("u-2").await.unwrap();
        let key = store.put("u-2", Bytes::from("residual")).await.unwrap();

        store.remove_namespace("u-2").await.unwrap();
        assert!(!store.exists(&key).await.unwrap());

        // Removing an already-absent namespace is fine.
        store.remove_namespace("u-2").await.unwrap();
    }

    #[tokio::test]
    async fn test_traversal_keys_are_rejected() {
        let (_dir, store) = store().await;
        assert!(store.get("../outside").await.is_err());
        assert!(store.delete("u-1/../../etc/passwd").await.is_err());
    }
}
