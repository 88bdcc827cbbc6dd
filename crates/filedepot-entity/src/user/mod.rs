//! User domain entities.

pub mod model;
pub mod role;

pub use model::{CreateUserRequest, User};
pub use role::UserRole;
