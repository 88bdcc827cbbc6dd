//! Content storage configuration.

use serde::{Deserialize, Serialize};

/// Content store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory for stored file content. Each user gets a namespace
    /// directory beneath this root.
    #[serde(default = "default_root")]
    pub root: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
        }
    }
}

fn default_root() -> String {
    "data/storage".to_string()
}
