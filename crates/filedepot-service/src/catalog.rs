//! File catalog — authoritative metadata store and content orchestration.

use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use filedepot_core::error::{AppError, ErrorKind};
use filedepot_core::result::AppResult;
use filedepot_core::traits::ContentStore;
use filedepot_core::types::{FileFilter, FileSort};
use filedepot_database::repositories::{FileRepository, UserRepository};
use filedepot_entity::file::{Download, File};

use crate::link::LinkService;

/// Maximum length of file names (original and display).
const MAX_NAME_LEN: usize = 255;
/// Maximum length of the free-text comment.
const MAX_COMMENT_LEN: usize = 200;
/// Attempts at minting a unique link token before giving up.
const MINT_ATTEMPTS: u32 = 3;

/// Orchestrates file metadata, stored bytes, and link tokens.
///
/// The catalog enforces every file-level invariant: per-owner stored-name
/// uniqueness, no orphaned content, token uniqueness, and quarantine of
/// records whose bytes have gone missing. Access control lives above it in
/// the engine; the catalog trusts its callers.
#[derive(Clone)]
pub struct CatalogService {
    /// File repository.
    file_repo: Arc<FileRepository>,
    /// User repository, for owner existence checks.
    user_repo: Arc<UserRepository>,
    /// Content store for the bytes.
    store: Arc<dyn ContentStore>,
    /// Link token generator.
    links: LinkService,
}

impl std::fmt::Debug for CatalogService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogService").finish()
    }
}

impl CatalogService {
    /// Creates a new catalog service.
    pub fn new(
        file_repo: Arc<FileRepository>,
        user_repo: Arc<UserRepository>,
        store: Arc<dyn ContentStore>,
        links: LinkService,
    ) -> Self {
        Self {
            file_repo,
            user_repo,
            store,
            links,
        }
    }

    /// Store a new file: bytes first, then the metadata row.
    ///
    /// If the metadata insert fails after the bytes were persisted, the
    /// bytes are rolled back — the store never holds content no record
    /// points at.
    pub async fn create_file(
        &self,
        owner_id: Uuid,
        original_name: &str,
        bytes: Bytes,
        comment: &str,
    ) -> AppResult<File> {
        validate_name(original_name)?;
        validate_comment(comment)?;

        let owner = self
            .user_repo
            .find_by_id(owner_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("User {owner_id} not found")))?;

        // Pre-check for a friendlier error; the UNIQUE(owner_id,
        // original_name) constraint is the real arbiter under concurrency.
        if self
            .file_repo
            .find_by_owner_and_name(owner_id, original_name)
            .await?
            .is_some()
        {
            return Err(AppError::duplicate(format!(
                "A file named '{original_name}' already exists for this owner"
            )));
        }

        let size = bytes.len() as i64;
        let content_key = self.store.put(&owner.storage_namespace, bytes).await?;

        // display_name is assigned here, per call, from this upload's name.
        let file = File {
            id: Uuid::new_v4(),
            owner_id,
            original_name: original_name.to_string(),
            display_name: original_name.to_string(),
            content_key,
            size,
            comment: comment.to_string(),
            uploaded_at: Utc::now(),
            last_download_at: None,
            special_link_token: None,
            quarantined: false,
            recipients: Vec::new(),
        };

        let created = match self.file_repo.create(&file).await {
            Ok(created) => created,
            Err(e) => {
                if let Err(cleanup) = self.store.delete(&file.content_key).await {
                    warn!(
                        content_key = %file.content_key,
                        error = %cleanup,
                        "Failed to roll back bytes after aborted file creation"
                    );
                }
                return Err(e);
            }
        };

        info!(
            file_id = %created.id,
            owner_id = %owner_id,
            name = %created.original_name,
            size = created.size,
            "File uploaded"
        );
        Ok(created)
    }

    /// Fetch a file's metadata, recipients hydrated.
    pub async fn get_file(&self, file_id: Uuid) -> AppResult<File> {
        self.file_repo
            .find_by_id(file_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("File {file_id} not found")))
    }

    /// Change a file's display name. The original name never changes.
    pub async fn rename(&self, file_id: Uuid, new_name: &str) -> AppResult<File> {
        validate_name(new_name)?;
        let file = self.file_repo.rename(file_id, new_name).await?;
        info!(file_id = %file_id, name = %new_name, "File renamed");
        Ok(file)
    }

    /// Replace a file's comment.
    pub async fn update_comment(&self, file_id: Uuid, comment: &str) -> AppResult<File> {
        validate_comment(comment)?;
        let file = self.file_repo.update_comment(file_id, comment).await?;
        info!(file_id = %file_id, "File comment updated");
        Ok(file)
    }

    /// Share a file with another user.
    ///
    /// Sharing with the owner is rejected; re-sharing with an existing
    /// recipient is an idempotent no-op.
    pub async fn share(&self, file_id: Uuid, recipient_id: Uuid) -> AppResult<()> {
        let file = self.get_file(file_id).await?;
        if file.owner_id == recipient_id {
            return Err(AppError::invalid_input(
                "Cannot share a file with its owner",
            ));
        }

        let added = self.file_repo.add_recipient(file_id, recipient_id).await?;
        if added {
            info!(file_id = %file_id, recipient_id = %recipient_id, "File shared");
        } else {
            debug!(file_id = %file_id, recipient_id = %recipient_id, "Already shared");
        }
        Ok(())
    }

    /// Mint a fresh public link token for a file.
    ///
    /// Any previous token is replaced and becomes permanently invalid. The
    /// UNIQUE index arbitrates concurrent mints; a collision gets a fresh
    /// token and another attempt.
    pub async fn mint_special_link(&self, file_id: Uuid) -> AppResult<String> {
        // Surface NotFound before spending mint attempts.
        self.get_file(file_id).await?;

        let mut last_err = None;
        for attempt in 0..MINT_ATTEMPTS {
            let token = self.links.generate_token();
            match self.file_repo.set_special_link(file_id, &token).await {
                Ok(()) => {
                    info!(file_id = %file_id, "Special link minted");
                    return Ok(token);
                }
                Err(e) if e.kind == ErrorKind::Duplicate => {
                    warn!(file_id = %file_id, attempt, "Link token collision, retrying");
                    last_err = Some(e);
                }
                Err(e) => return Err(e),
            }
        }
        Err(last_err
            .unwrap_or_else(|| AppError::duplicate("Could not mint a unique link token")))
    }

    /// Record that a file was downloaded now.
    pub async fn record_download(&self, file_id: Uuid) -> AppResult<()> {
        self.get_file(file_id).await?;
        self.file_repo.set_last_download(file_id, Utc::now()).await
    }

    /// Fetch a file's content by id.
    ///
    /// A quarantined record, or bytes found missing now, yield
    /// [`ErrorKind::ContentMissing`] — never empty content. A fresh miss
    /// flags the record quarantined.
    pub async fn get_content(&self, file_id: Uuid) -> AppResult<Download> {
        let file = self.get_file(file_id).await?;
        self.fetch_bytes(file).await
    }

    /// Fetch a file's content by public link token.
    ///
    /// The returned [`Download`] carries the bound file id so adapters can
    /// validate any id embedded in the link URL.
    pub async fn get_content_by_token(&self, token: &str) -> AppResult<Download> {
        let file = self
            .file_repo
            .find_by_token(token)
            .await?
            .ok_or_else(|| AppError::not_found("Invalid link token"))?;
        self.fetch_bytes(file).await
    }

    /// Delete a file's metadata and bytes.
    ///
    /// Missing bytes are tolerated: the anomaly is logged and the metadata
    /// still goes, so a half-broken record cannot become undeletable.
    pub async fn delete_file(&self, file_id: Uuid) -> AppResult<()> {
        let file = self.get_file(file_id).await?;

        match self.store.delete(&file.content_key).await {
            Ok(()) => {}
            Err(e) if e.kind == ErrorKind::NotFound => {
                warn!(
                    file_id = %file_id,
                    content_key = %file.content_key,
                    "Content already missing during delete"
                );
            }
            Err(e) => return Err(e),
        }

        if !self.file_repo.delete(file_id).await? {
            return Err(AppError::not_found(format!("File {file_id} not found")));
        }

        info!(file_id = %file_id, name = %file.original_name, "File deleted");
        Ok(())
    }

    /// List a user's own files, newest first. Metadata only.
    pub async fn list_by_owner(&self, owner_id: Uuid) -> AppResult<Vec<File>> {
        self.file_repo.find_by_owner(owner_id).await
    }

    /// List files across all owners with the given sort and filter.
    pub async fn list_all(&self, sort: &FileSort, filter: &FileFilter) -> AppResult<Vec<File>> {
        debug!(?sort, ?filter, "Listing all files");
        self.file_repo.find_all(sort, filter).await
    }

    /// Read the bytes for a record, quarantining on a miss.
    async fn fetch_bytes(&self, file: File) -> AppResult<Download> {
        if file.quarantined {
            return Err(AppError::content_missing(format!(
                "File {} is quarantined: content unavailable",
                file.id
            )));
        }

        match self.store.get(&file.content_key).await {
            Ok(bytes) => Ok(Download {
                file_id: file.id,
                original_name: file.original_name,
                bytes,
            }),
            Err(e) if e.kind == ErrorKind::NotFound => {
                warn!(
                    file_id = %file.id,
                    content_key = %file.content_key,
                    "Bytes missing for catalog record, quarantining"
                );
                self.file_repo.mark_quarantined(file.id).await?;
                Err(AppError::content_missing(format!(
                    "File {} has no stored content",
                    file.id
                )))
            }
            Err(e) => Err(e),
        }
    }
}

/// Validate a file name: non-empty, at most 255 characters.
fn validate_name(name: &str) -> AppResult<()> {
    if name.is_empty() {
        return Err(AppError::invalid_input("File name must not be empty"));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(AppError::invalid_input(format!(
            "File name must be at most {MAX_NAME_LEN} characters"
        )));
    }
    Ok(())
}

/// Validate a comment: at most 200 characters.
fn validate_comment(comment: &str) -> AppResult<()> {
    if comment.chars().count() > MAX_COMMENT_LEN {
        return Err(AppError::invalid_input(format!(
            "Comment must be at most {MAX_COMMENT_LEN} characters"
        )));
    }
    Ok(())
}
