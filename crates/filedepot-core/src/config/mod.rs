//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section.

pub mod logging;
pub mod storage;

use serde::{Deserialize, Serialize};

use self::logging::LoggingConfig;
use self::storage::StorageConfig;

use crate::error::AppError;

/// Root application configuration.
///
/// This struct is the top-level deserialization target for the merged
/// TOML configuration files (default.toml + environment overlay).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Database connection settings.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Content storage settings.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Bootstrap administrator seeding.
    #[serde(default)]
    pub bootstrap: BootstrapConfig,
}

/// Database connection pool configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite connection URL.
    #[serde(default = "default_database_url")]
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Connection timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
            connect_timeout_seconds: default_connect_timeout(),
        }
    }
}

/// Bootstrap administrator account seeded at setup time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapConfig {
    /// Whether to seed the bootstrap administrator.
    #[serde(default)]
    pub enabled: bool,
    /// Username for the seeded administrator.
    #[serde(default = "default_admin_username")]
    pub admin_username: String,
    /// Email for the seeded administrator.
    #[serde(default = "default_admin_email")]
    pub admin_email: String,
    /// Initial password. Must be set explicitly when seeding is enabled.
    #[serde(default)]
    pub admin_password: String,
    /// Full name for the seeded administrator.
    #[serde(default = "default_admin_full_name")]
    pub admin_full_name: String,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            admin_username: default_admin_username(),
            admin_email: default_admin_email(),
            admin_password: String::new(),
            admin_full_name: default_admin_full_name(),
        }
    }
}

impl AppConfig {
    /// Load configuration from TOML files.
    ///
    /// Merges the default configuration with an environment-specific overlay
    /// and environment variables prefixed with `FILEDEPOT_`.
    pub fn load(env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("FILEDEPOT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))
    }
}

fn default_database_url() -> String {
    "sqlite://data/filedepot.db".to_string()
}

fn default_max_connections() -> u32 {
    10
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_admin_username() -> String {
    "admin".to_string()
}

fn default_admin_email() -> String {
    "admin@example.com".to_string()
}

fn default_admin_full_name() -> String {
    "Administrator".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_no_files_present() {
        let config = AppConfig::load("nonexistent-environment").unwrap();
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.logging.level, "info");
        assert!(!config.bootstrap.enabled);
    }
}
