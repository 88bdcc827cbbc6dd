//! Repository implementations for all FileDepot entities.

pub mod file;
pub mod user;

pub use file::FileRepository;
pub use user::UserRepository;
