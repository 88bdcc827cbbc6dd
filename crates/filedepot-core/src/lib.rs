//! # filedepot-core
//!
//! Core crate for FileDepot. Contains the content-store trait, configuration
//! schemas, shared query types (sorting and filtering), and the unified
//! error system.
//!
//! This crate has **no** internal dependencies on other FileDepot crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
