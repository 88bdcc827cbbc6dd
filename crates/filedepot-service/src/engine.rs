//! Storage engine facade — the operation set external adapters call.

use bytes::Bytes;
use tracing::{debug, info, warn};
use uuid::Uuid;

use filedepot_auth::access::{self, AdminAction, Caller, FileAction};
use filedepot_core::error::{AppError, ErrorKind};
use filedepot_core::result::AppResult;
use filedepot_core::types::{FileFilter, FileSort};
use filedepot_entity::file::{Download, File};
use filedepot_entity::user::{CreateUserRequest, User, UserRole};

use crate::catalog::CatalogService;
use crate::identity::IdentityService;

/// Sweeps attempted when user deletion races an in-flight upload.
const CASCADE_SWEEP_ATTEMPTS: u32 = 3;

/// The public operation set of FileDepot.
///
/// Every operation wraps the access-control decision around the catalog or
/// identity call. Per-file operations report NotFound for both "file
/// absent" and "access denied", so a non-owner cannot probe for file
/// existence; admin operations report Denied.
#[derive(Debug, Clone)]
pub struct StorageEngine {
    /// Identity store.
    identity: IdentityService,
    /// File catalog.
    catalog: CatalogService,
}

impl StorageEngine {
    /// Creates a new storage engine.
    pub fn new(identity: IdentityService, catalog: CatalogService) -> Self {
        Self { identity, catalog }
    }

    /// The identity service, for adapters that need direct user lookups.
    pub fn identity(&self) -> &IdentityService {
        &self.identity
    }

    // ── Accounts ─────────────────────────────────────────────────

    /// Self-service signup. Role flags in the request are ignored; the
    /// created account is always a regular member.
    pub async fn register(&self, mut req: CreateUserRequest) -> AppResult<User> {
        req.role = UserRole::Member;
        self.identity.create_user(req).await
    }

    /// Verify a username/password pair and return the account.
    pub async fn authenticate(&self, username: &str, password: &str) -> AppResult<User> {
        self.identity.verify_credentials(username, password).await
    }

    // ── Files ────────────────────────────────────────────────────

    /// Upload a file into the caller's own storage.
    pub async fn upload(
        &self,
        caller: &Caller,
        original_name: &str,
        bytes: Bytes,
        comment: &str,
    ) -> AppResult<File> {
        self.catalog
            .create_file(caller.id, original_name, bytes, comment)
            .await
    }

    /// List files. `None` lists the caller's own; listing another user's
    /// files requires admin.
    pub async fn list_files(&self, caller: &Caller, owner: Option<Uuid>) -> AppResult<Vec<File>> {
        let owner_id = owner.unwrap_or(caller.id);
        if owner_id != caller.id {
            access::require_admin(caller, AdminAction::ListFiles)?;
        }
        self.catalog.list_by_owner(owner_id).await
    }

    /// Fetch a file's metadata.
    pub async fn get_file(&self, caller: &Caller, file_id: Uuid) -> AppResult<File> {
        self.fetch_checked(caller, file_id, FileAction::Read).await
    }

    /// Change a file's display name.
    pub async fn rename_file(
        &self,
        caller: &Caller,
        file_id: Uuid,
        new_name: &str,
    ) -> AppResult<File> {
        self.fetch_checked(caller, file_id, FileAction::Rename)
            .await?;
        self.catalog.rename(file_id, new_name).await
    }

    /// Replace a file's comment.
    pub async fn update_comment(
        &self,
        caller: &Caller,
        file_id: Uuid,
        comment: &str,
    ) -> AppResult<File> {
        self.fetch_checked(caller, file_id, FileAction::Comment)
            .await?;
        self.catalog.update_comment(file_id, comment).await
    }

    /// Share a file with another user. The recipient must exist.
    pub async fn share_file(
        &self,
        caller: &Caller,
        file_id: Uuid,
        recipient_id: Uuid,
    ) -> AppResult<()> {
        self.fetch_checked(caller, file_id, FileAction::Share)
            .await?;
        self.identity.get_user(recipient_id).await?;
        self.catalog.share(file_id, recipient_id).await
    }

    /// Mint a public link token for a file. Minting is a form of sharing.
    pub async fn mint_link(&self, caller: &Caller, file_id: Uuid) -> AppResult<String> {
        self.fetch_checked(caller, file_id, FileAction::Share)
            .await?;
        self.catalog.mint_special_link(file_id).await
    }

    /// Download a file's content, recording the download.
    pub async fn download(&self, caller: &Caller, file_id: Uuid) -> AppResult<Download> {
        self.fetch_checked(caller, file_id, FileAction::Download)
            .await?;
        let download = self.catalog.get_content(file_id).await?;
        self.catalog.record_download(file_id).await?;
        info!(file_id = %file_id, caller_id = %caller.id, "Download served");
        Ok(download)
    }

    /// Anonymous download by public link token.
    ///
    /// Possession of the token is the sole credential; no caller identity
    /// is involved. The download is still recorded like any other.
    pub async fn download_by_token(&self, token: &str) -> AppResult<Download> {
        let download = self.catalog.get_content_by_token(token).await?;
        self.catalog.record_download(download.file_id).await?;
        info!(file_id = %download.file_id, "Download served via public link");
        Ok(download)
    }

    /// Delete a file, removing content and metadata.
    pub async fn delete_file(&self, caller: &Caller, file_id: Uuid) -> AppResult<()> {
        self.fetch_checked(caller, file_id, FileAction::Delete)
            .await?;
        self.catalog.delete_file(file_id).await
    }

    // ── Administration ───────────────────────────────────────────

    /// List all user accounts.
    pub async fn admin_list_users(&self, caller: &Caller) -> AppResult<Vec<User>> {
        access::require_admin(caller, AdminAction::ListUsers)?;
        self.identity.list_users().await
    }

    /// List files across all owners with the given sort and filter.
    pub async fn admin_list_files(
        &self,
        caller: &Caller,
        sort: &FileSort,
        filter: &FileFilter,
    ) -> AppResult<Vec<File>> {
        access::require_admin(caller, AdminAction::ListFiles)?;
        self.catalog.list_all(sort, filter).await
    }

    /// Create a user account with explicit role flags.
    pub async fn admin_create_user(
        &self,
        caller: &Caller,
        req: CreateUserRequest,
    ) -> AppResult<User> {
        access::require_admin(
            caller,
            AdminAction::CreateUser {
                superuser: req.role.is_superuser(),
            },
        )?;
        self.identity.create_user(req).await
    }

    /// Change a user's role flags.
    pub async fn admin_set_role(
        &self,
        caller: &Caller,
        user_id: Uuid,
        is_admin: bool,
        is_superuser: bool,
    ) -> AppResult<User> {
        // Coarse gate before the target lookup; the full decision needs the
        // target's current flags.
        if !caller.has_admin() {
            return Err(AppError::denied("Admin privileges required"));
        }
        let target = self.identity.get_user(user_id).await?;
        access::require_admin(
            caller,
            AdminAction::SetRole {
                target_is_superuser: target.is_superuser,
                grants_superuser: is_superuser,
            },
        )?;
        self.identity
            .set_admin_flag(user_id, is_admin, is_superuser)
            .await
    }

    /// Delete a user account, cascading to every file it owns.
    ///
    /// The cascade is orchestrated: enumerate owned files, delete each via
    /// the catalog (content + metadata), then delete the user row. The FK
    /// RESTRICT on files makes the row deletion fail if an upload slipped
    /// in between, in which case the sweep re-runs (bounded).
    pub async fn admin_delete_user(&self, caller: &Caller, user_id: Uuid) -> AppResult<()> {
        if !caller.has_admin() {
            return Err(AppError::denied("Admin privileges required"));
        }
        let target = self.identity.get_user(user_id).await?;
        access::require_admin(
            caller,
            AdminAction::DeleteUser {
                target_is_superuser: target.is_superuser,
            },
        )?;

        let mut last_err = None;
        for attempt in 0..CASCADE_SWEEP_ATTEMPTS {
            for file in self.catalog.list_by_owner(user_id).await? {
                match self.catalog.delete_file(file.id).await {
                    Ok(()) => {}
                    // Deleted concurrently; the goal is achieved.
                    Err(e) if e.kind == ErrorKind::NotFound => {
                        debug!(file_id = %file.id, "File vanished during cascade");
                    }
                    Err(e) => return Err(e),
                }
            }

            match self.identity.delete_user(user_id).await {
                Ok(()) => {
                    info!(
                        admin_id = %caller.id,
                        user_id = %user_id,
                        "User deleted with cascade"
                    );
                    return Ok(());
                }
                Err(e) if e.kind == ErrorKind::Duplicate => {
                    warn!(
                        user_id = %user_id,
                        attempt,
                        "Upload raced user deletion, re-sweeping"
                    );
                    last_err = Some(e);
                }
                Err(e) => return Err(e),
            }
        }
        Err(last_err
            .unwrap_or_else(|| AppError::internal("User deletion did not converge")))
    }

    /// Fetch a file and check the caller may act on it.
    ///
    /// A deny is reported as NotFound, shaped identically to a genuinely
    /// absent file.
    async fn fetch_checked(
        &self,
        caller: &Caller,
        file_id: Uuid,
        action: FileAction,
    ) -> AppResult<File> {
        let file = self.catalog.get_file(file_id).await?;
        if access::decide(caller, &file, action).is_allowed() {
            Ok(file)
        } else {
            debug!(
                caller_id = %caller.id,
                file_id = %file_id,
                ?action,
                "Access denied, reporting as not found"
            );
            Err(AppError::not_found(format!("File {file_id} not found")))
        }
    }
}
