//! Core type definitions used across the FileDepot workspace.

pub mod filter;
pub mod sorting;

pub use filter::FileFilter;
pub use sorting::{FileSort, FileSortKey, SortDirection};
