//! Core trait definitions implemented by other crates in the workspace.

pub mod content;

pub use content::ContentStore;
