//! # filedepot-entity
//!
//! Domain entity models for FileDepot. Every struct in this crate
//! represents a database table row or a domain value object. All entities
//! derive `Debug` and `Clone`; database entities additionally derive
//! `sqlx::FromRow`.

pub mod file;
pub mod user;
