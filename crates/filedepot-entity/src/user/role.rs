//! User role enumeration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Roles available in the system.
///
/// Roles are ordered by privilege level: Superuser > Admin > Member. The
/// role is not stored as a column; it is derived from the `is_admin` and
/// `is_superuser` flags on the user row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Regular user, operates on their own files and files shared with them.
    Member,
    /// Can list and manage all files and all non-superuser accounts.
    Admin,
    /// Admin who can additionally manage other superusers.
    Superuser,
}

impl UserRole {
    /// Check if this role carries admin privileges.
    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Admin | Self::Superuser)
    }

    /// Check if this role is a superuser.
    pub fn is_superuser(&self) -> bool {
        matches!(self, Self::Superuser)
    }

    /// Return the role as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Member => "member",
            Self::Admin => "admin",
            Self::Superuser => "superuser",
        }
    }
}

impl Default for UserRole {
    fn default() -> Self {
        Self::Member
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = filedepot_core::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "member" => Ok(Self::Member),
            "admin" => Ok(Self::Admin),
            "superuser" => Ok(Self::Superuser),
            _ => Err(filedepot_core::AppError::invalid_input(format!(
                "Invalid user role: '{s}'. Expected one of: member, admin, superuser"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_privileges() {
        assert!(UserRole::Superuser.is_admin());
        assert!(UserRole::Admin.is_admin());
        assert!(!UserRole::Member.is_admin());
        assert!(UserRole::Superuser.is_superuser());
        assert!(!UserRole::Admin.is_superuser());
    }

    #[test]
    fn test_from_str() {
        assert_eq!("admin".parse::<UserRole>().unwrap(), UserRole::Admin);
        assert_eq!("MEMBER".parse::<UserRole>().unwrap(), UserRole::Member);
        assert!("invalid".parse::<UserRole>().is_err());
    }
}
