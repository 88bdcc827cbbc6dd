//! Identity store — user lifecycle and credential verification.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use filedepot_auth::password::PasswordHasher;
use filedepot_core::error::AppError;
use filedepot_core::result::AppResult;
use filedepot_core::traits::ContentStore;
use filedepot_database::repositories::UserRepository;
use filedepot_entity::user::{CreateUserRequest, User};

/// Manages user records, role flags, and per-user storage namespaces.
#[derive(Clone)]
pub struct IdentityService {
    /// User repository.
    user_repo: Arc<UserRepository>,
    /// Password hasher.
    hasher: Arc<PasswordHasher>,
    /// Content store, for namespace provisioning.
    store: Arc<dyn ContentStore>,
}

impl std::fmt::Debug for IdentityService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityService").finish()
    }
}

impl IdentityService {
    /// Creates a new identity service.
    pub fn new(
        user_repo: Arc<UserRepository>,
        hasher: Arc<PasswordHasher>,
        store: Arc<dyn ContentStore>,
    ) -> Self {
        Self {
            user_repo,
            hasher,
            store,
        }
    }

    /// Create a user account together with its storage namespace.
    ///
    /// The namespace is provisioned before the row is inserted; if the
    /// insert fails the namespace is torn down again, so the account and
    /// its storage exist all-or-nothing.
    pub async fn create_user(&self, req: CreateUserRequest) -> AppResult<User> {
        req.validate()
            .map_err(|e| AppError::invalid_input(e.to_string()))?;

        if self
            .user_repo
            .find_by_username(&req.username)
            .await?
            .is_some()
        {
            return Err(AppError::duplicate(format!(
                "Username '{}' is already taken",
                req.username
            )));
        }
        if self.user_repo.find_by_email(&req.email).await?.is_some() {
            return Err(AppError::duplicate(format!(
                "Email '{}' is already in use",
                req.email
            )));
        }

        let password_hash = self.hasher.hash_password(&req.password)?;
        let id = Uuid::new_v4();
        let storage_namespace = format!("u-{}", id.simple());

        self.store.create_namespace(&storage_namespace).await?;

        let user = User {
            id,
            username: req.username,
            email: req.email,
            full_name: req.full_name,
            password_hash,
            // Superuser implies admin; the flags are stored independently
            // but never inconsistently.
            is_admin: req.role.is_admin(),
            is_superuser: req.role.is_superuser(),
            storage_namespace,
            created_at: Utc::now(),
        };

        let created = match self.user_repo.create(&user).await {
            Ok(created) => created,
            Err(e) => {
                if let Err(cleanup) = self.store.remove_namespace(&user.storage_namespace).await {
                    warn!(
                        namespace = %user.storage_namespace,
                        error = %cleanup,
                        "Failed to remove namespace after aborted user creation"
                    );
                }
                return Err(e);
            }
        };

        info!(
            user_id = %created.id,
            username = %created.username,
            role = %created.role(),
            "User created"
        );
        Ok(created)
    }

    /// Verify a username/password pair.
    ///
    /// An unknown username and a wrong password are indistinguishable to
    /// the caller.
    pub async fn verify_credentials(&self, username: &str, password: &str) -> AppResult<User> {
        let user = self
            .user_repo
            .find_by_username(username)
            .await?
            .ok_or_else(|| AppError::credential_invalid("Invalid username or password"))?;

        if self.hasher.verify_password(password, &user.password_hash)? {
            Ok(user)
        } else {
            Err(AppError::credential_invalid("Invalid username or password"))
        }
    }

    /// Fetch a user by id.
    pub async fn get_user(&self, id: Uuid) -> AppResult<User> {
        self.user_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("User {id} not found")))
    }

    /// List all users, ordered by username.
    pub async fn list_users(&self) -> AppResult<Vec<User>> {
        self.user_repo.find_all().await
    }

    /// Update a user's role flags. Granting superuser also grants admin.
    pub async fn set_admin_flag(
        &self,
        id: Uuid,
        is_admin: bool,
        is_superuser: bool,
    ) -> AppResult<User> {
        let is_admin = is_admin || is_superuser;
        let user = self.user_repo.update_flags(id, is_admin, is_superuser).await?;
        info!(
            user_id = %id,
            is_admin,
            is_superuser,
            "User role flags updated"
        );
        Ok(user)
    }

    /// Delete a user row and its storage namespace.
    ///
    /// Fails with a Duplicate-kind conflict while the user still owns
    /// files; the engine sweeps the catalog first and uses that conflict to
    /// detect a racing upload. Namespace removal failures are tolerated —
    /// the account is already gone and a residual empty directory is
    /// harmless.
    pub async fn delete_user(&self, id: Uuid) -> AppResult<()> {
        let user = self.get_user(id).await?;

        if !self.user_repo.delete(id).await? {
            return Err(AppError::not_found(format!("User {id} not found")));
        }

        if let Err(e) = self.store.remove_namespace(&user.storage_namespace).await {
            warn!(
                user_id = %id,
                namespace = %user.storage_namespace,
                error = %e,
                "Failed to remove namespace of deleted user"
            );
        }

        info!(user_id = %id, username = %user.username, "User deleted");
        Ok(())
    }
}
