//! # filedepot-auth
//!
//! Credential hashing and the access-control policy for FileDepot.
//!
//! ## Modules
//!
//! - `password` — Argon2id password hashing and verification
//! - `access` — pure allow/deny decisions for file and admin actions

pub mod access;
pub mod password;

pub use access::{AdminAction, Caller, Decision, FileAction};
pub use password::PasswordHasher;
