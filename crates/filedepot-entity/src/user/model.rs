//! User entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use super::role::UserRole;

/// A registered user in the FileDepot system.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    /// Unique user identifier.
    pub id: Uuid,
    /// Unique login name. Matched case-sensitively.
    pub username: String,
    /// Unique email address.
    pub email: String,
    /// Human-readable full name (may be empty).
    pub full_name: String,
    /// Argon2 password hash.
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Whether the user has admin privileges.
    pub is_admin: bool,
    /// Whether the user is a superuser. Implies admin.
    pub is_superuser: bool,
    /// Content-store namespace owned by this user.
    pub storage_namespace: String,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Derive the role from the privilege flags.
    pub fn role(&self) -> UserRole {
        if self.is_superuser {
            UserRole::Superuser
        } else if self.is_admin {
            UserRole::Admin
        } else {
            UserRole::Member
        }
    }
}

/// Data required to create a new user account.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateUserRequest {
    /// Desired username.
    #[validate(length(min = 1, max = 50, message = "username must be 1-50 characters"))]
    pub username: String,
    /// Email address.
    #[validate(email(message = "email address is not valid"))]
    pub email: String,
    /// Plaintext password, hashed before storage.
    #[validate(length(min = 1, message = "password must not be empty"))]
    pub password: String,
    /// Full name (optional).
    #[validate(length(max = 100, message = "full name must be at most 100 characters"))]
    #[serde(default)]
    pub full_name: String,
    /// Assigned role. Self-registration always receives [`UserRole::Member`].
    #[serde(default)]
    pub role: UserRole,
}
