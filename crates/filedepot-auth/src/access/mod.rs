//! Access-control policy.

pub mod policy;

pub use policy::{AdminAction, Caller, Decision, FileAction, decide, decide_admin, require_admin};
