//! Pure allow/deny decisions for file and admin actions.
//!
//! Nothing in this module touches the database: the caller's identity and
//! the file record (with its recipients hydrated) are the entire input.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use filedepot_core::error::AppError;
use filedepot_entity::file::File;
use filedepot_entity::user::User;

/// The authenticated identity acting on the engine.
///
/// Adapters build this from whatever session mechanism they use; the
/// engine only needs the id and the privilege flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    /// The acting user's id.
    pub id: Uuid,
    /// Whether the caller has admin privileges.
    pub is_admin: bool,
    /// Whether the caller is a superuser.
    pub is_superuser: bool,
}

impl Caller {
    /// Build a caller from a user record.
    pub fn from_user(user: &User) -> Self {
        Self {
            id: user.id,
            is_admin: user.is_admin,
            is_superuser: user.is_superuser,
        }
    }

    /// Whether the caller carries admin privileges. Superuser implies admin.
    pub fn has_admin(&self) -> bool {
        self.is_admin || self.is_superuser
    }
}

/// Actions a caller can request against a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileAction {
    /// View the file's metadata.
    Read,
    /// Retrieve the file's content.
    Download,
    /// Change the display name.
    Rename,
    /// Change the comment.
    Comment,
    /// Grant another user access, or mint a public link.
    Share,
    /// Remove the file.
    Delete,
}

/// Administrative actions against the system as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminAction {
    /// Enumerate all user accounts.
    ListUsers,
    /// Enumerate files across all owners.
    ListFiles,
    /// Create an account. `superuser` is true when the new account would be
    /// a superuser; only a superuser caller can mint one.
    CreateUser {
        /// Whether the account being created is a superuser.
        superuser: bool,
    },
    /// Change a user's role flags. Touching a superuser account, or
    /// granting superuser, requires a superuser caller.
    SetRole {
        /// Whether the target account is currently a superuser.
        target_is_superuser: bool,
        /// Whether the change grants the superuser flag.
        grants_superuser: bool,
    },
    /// Delete a user account (and cascade its files).
    DeleteUser {
        /// Whether the target account is a superuser.
        target_is_superuser: bool,
    },
}

/// The outcome of a policy check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The action may proceed.
    Allow,
    /// The action is refused.
    Deny,
}

impl Decision {
    /// Whether the decision allows the action.
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }
}

/// Decide whether `caller` may perform `action` on `file`.
///
/// Owners may do anything to their own files; recipients may read and
/// download; admins and superusers bypass; everyone else is denied.
pub fn decide(caller: &Caller, file: &File, action: FileAction) -> Decision {
    if caller.has_admin() {
        return Decision::Allow;
    }
    if file.owner_id == caller.id {
        return Decision::Allow;
    }
    if file.is_shared_with(caller.id) {
        return match action {
            FileAction::Read | FileAction::Download => Decision::Allow,
            _ => Decision::Deny,
        };
    }
    Decision::Deny
}

/// Decide whether `caller` may perform the given admin action.
pub fn decide_admin(caller: &Caller, action: AdminAction) -> Decision {
    if !caller.has_admin() {
        return Decision::Deny;
    }

    let needs_superuser = match action {
        AdminAction::ListUsers | AdminAction::ListFiles => false,
        AdminAction::CreateUser { superuser } => superuser,
        AdminAction::SetRole {
            target_is_superuser,
            grants_superuser,
        } => target_is_superuser || grants_superuser,
        AdminAction::DeleteUser {
            target_is_superuser,
        } => target_is_superuser,
    };

    if needs_superuser && !caller.is_superuser {
        Decision::Deny
    } else {
        Decision::Allow
    }
}

/// Check an admin action, mapping a deny to `AppError::denied`.
pub fn require_admin(caller: &Caller, action: AdminAction) -> Result<(), AppError> {
    if decide_admin(caller, action).is_allowed() {
        Ok(())
    } else {
        Err(AppError::denied(format!(
            "Caller {} may not perform {action:?}",
            caller.id
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Utc;

    fn member(id: Uuid) -> Caller {
        Caller {
            id,
            is_admin: false,
            is_superuser: false,
        }
    }

    fn file_owned_by(owner_id: Uuid) -> File {
        File {
            id: Uuid::new_v4(),
            owner_id,
            original_name: "report.pdf".to_string(),
            display_name: "report.pdf".to_string(),
            content_key: "ns/key".to_string(),
            size: 500,
            comment: String::new(),
            uploaded_at: Utc::now(),
            last_download_at: None,
            special_link_token: None,
            quarantined: false,
            recipients: Vec::new(),
        }
    }

    const ALL_ACTIONS: [FileAction; 6] = [
        FileAction::Read,
        FileAction::Download,
        FileAction::Rename,
        FileAction::Comment,
        FileAction::Share,
        FileAction::Delete,
    ];

    #[test]
    fn test_owner_may_do_everything() {
        let owner = member(Uuid::new_v4());
        let file = file_owned_by(owner.id);
        for action in ALL_ACTIONS {
            assert_eq!(decide(&owner, &file, action), Decision::Allow);
        }
    }

    #[test]
    fn test_recipient_may_only_read_and_download() {
        let recipient = member(Uuid::new_v4());
        let mut file = file_owned_by(Uuid::new_v4());
        file.recipients.push(recipient.id);

        assert_eq!(decide(&recipient, &file, FileAction::Read), Decision::Allow);
        assert_eq!(
            decide(&recipient, &file, FileAction::Download),
            Decision::Allow
        );
        for action in [
            FileAction::Rename,
            FileAction::Comment,
            FileAction::Share,
            FileAction::Delete,
        ] {
            assert_eq!(decide(&recipient, &file, action), Decision::Deny);
        }
    }

    #[test]
    fn test_stranger_is_denied_everything() {
        let stranger = member(Uuid::new_v4());
        let file = file_owned_by(Uuid::new_v4());
        for action in ALL_ACTIONS {
            assert_eq!(decide(&stranger, &file, action), Decision::Deny);
        }
    }

    #[test]
    fn test_admin_bypasses_on_any_file() {
        let admin = Caller {
            id: Uuid::new_v4(),
            is_admin: true,
            is_superuser: false,
        };
        let file = file_owned_by(Uuid::new_v4());
        for action in ALL_ACTIONS {
            assert_eq!(decide(&admin, &file, action), Decision::Allow);
        }
    }

    #[test]
    fn test_member_denied_admin_actions() {
        let caller = member(Uuid::new_v4());
        assert_eq!(decide_admin(&caller, AdminAction::ListUsers), Decision::Deny);
        assert!(require_admin(&caller, AdminAction::ListFiles).is_err());
    }

    #[test]
    fn test_admin_cannot_mint_or_touch_superusers() {
        let admin = Caller {
            id: Uuid::new_v4(),
            is_admin: true,
            is_superuser: false,
        };
        assert_eq!(
            decide_admin(&admin, AdminAction::CreateUser { superuser: false }),
            Decision::Allow
        );
        assert_eq!(
            decide_admin(&admin, AdminAction::CreateUser { superuser: true }),
            Decision::Deny
        );
        assert_eq!(
            decide_admin(
                &admin,
                AdminAction::DeleteUser {
                    target_is_superuser: true
                }
            ),
            Decision::Deny
        );
        assert_eq!(
            decide_admin(
                &admin,
                AdminAction::SetRole {
                    target_is_superuser: false,
                    grants_superuser: true
                }
            ),
            Decision::Deny
        );
    }

    #[test]
    fn test_superuser_may_manage_superusers() {
        let root = Caller {
            id: Uuid::new_v4(),
            is_admin: true,
            is_superuser: true,
        };
        assert_eq!(
            decide_admin(&root, AdminAction::CreateUser { superuser: true }),
            Decision::Allow
        );
        assert_eq!(
            decide_admin(
                &root,
                AdminAction::DeleteUser {
                    target_is_superuser: true
                }
            ),
            Decision::Allow
        );
    }

    #[test]
    fn test_superuser_flag_alone_implies_admin() {
        let caller = Caller {
            id: Uuid::new_v4(),
            is_admin: false,
            is_superuser: true,
        };
        assert!(caller.has_admin());
        assert_eq!(decide_admin(&caller, AdminAction::ListUsers), Decision::Allow);
    }
}
