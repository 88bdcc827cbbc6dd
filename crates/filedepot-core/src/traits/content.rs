//! Content store trait for pluggable blob storage backends.

use async_trait::async_trait;
use bytes::Bytes;

use crate::result::AppResult;

/// Trait for content storage backends.
///
/// A content store holds opaque blobs addressed by keys it mints itself.
/// Callers never choose or parse keys; the only way to obtain one is from
/// [`ContentStore::put`], and the only use for one is to hand it back. The
/// [`ContentStore`] trait is defined here in `filedepot-core` and
/// implemented in `filedepot-storage`.
#[async_trait]
pub trait ContentStore: Send + Sync + std::fmt::Debug + 'static {
    /// Store a blob under the given namespace and return its key.
    ///
    /// Every call returns a fresh key, even for identical bytes.
    async fn put(&self, namespace: &str, data: Bytes) -> AppResult<String>;

    /// Read the blob stored under the given key.
    async fn get(&self, key: &str) -> AppResult<Bytes>;

    /// Delete the blob stored under the given key.
    ///
    /// Deleting a key that does not resolve is an error.
    async fn delete(&self, key: &str) -> AppResult<()>;

    /// Check whether a blob exists under the given key.
    async fn exists(&self, key: &str) -> AppResult<bool>;

    /// Create an isolated namespace for a new owner.
    async fn create_namespace(&self, namespace: &str) -> AppResult<()>;

    /// Remove a namespace and any blobs remaining in it.
    async fn remove_namespace(&self, namespace: &str) -> AppResult<()>;
}
