//! # filedepot-storage
//!
//! Content-store provider implementations for FileDepot. The only provider
//! is the local filesystem store; it lives behind the
//! [`ContentStore`](filedepot_core::traits::ContentStore) trait so the
//! service layer never depends on a concrete backend.

pub mod local;

pub use local::LocalContentStore;
