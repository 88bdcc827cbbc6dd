//! # filedepot-service
//!
//! Business logic service layer for FileDepot. Each service orchestrates
//! repositories, the content store, and the access-control policy to
//! implement application-level use cases.
//!
//! Services follow constructor injection — all dependencies are provided
//! at construction time via `Arc` references. External adapters call only
//! [`StorageEngine`]; the other services are its internals, exposed for
//! bootstrap wiring and tests.

pub mod catalog;
pub mod engine;
pub mod identity;
pub mod link;

pub use catalog::CatalogService;
pub use engine::StorageEngine;
pub use identity::IdentityService;
pub use link::LinkService;
