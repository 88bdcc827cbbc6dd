//! File entity model.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A file record in the catalog.
///
/// The record carries the metadata; the bytes live in the content store
/// under `content_key`. `recipients` is hydrated from the share table by
/// the repository and is empty on a freshly constructed record.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct File {
    /// Unique file identifier.
    pub id: Uuid,
    /// The file owner.
    pub owner_id: Uuid,
    /// Name given at upload time. Unique per owner, never changes.
    pub original_name: String,
    /// Current display name. Starts equal to `original_name`.
    pub display_name: String,
    /// Opaque content-store key for the bytes.
    pub content_key: String,
    /// Size in bytes, recorded at upload.
    pub size: i64,
    /// Free-text comment (may be empty).
    pub comment: String,
    /// When the file was uploaded.
    pub uploaded_at: DateTime<Utc>,
    /// When the file was last downloaded, if ever.
    pub last_download_at: Option<DateTime<Utc>>,
    /// Active public link token, if one has been minted.
    pub special_link_token: Option<String>,
    /// Set when the content store failed to produce the bytes.
    pub quarantined: bool,
    /// Users this file is shared with.
    #[sqlx(skip)]
    #[serde(default)]
    pub recipients: Vec<Uuid>,
}

impl File {
    /// Check whether the file has been shared with the given user.
    pub fn is_shared_with(&self, user_id: Uuid) -> bool {
        self.recipients.contains(&user_id)
    }
}

/// A downloaded file: its catalog identity plus the bytes.
///
/// Downloads always carry the original name, regardless of renames.
#[derive(Debug, Clone)]
pub struct Download {
    /// The file that was downloaded.
    pub file_id: Uuid,
    /// Name the file was uploaded under.
    pub original_name: String,
    /// The file content.
    pub bytes: Bytes,
}
