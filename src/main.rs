//! FileDepot setup binary.
//!
//! Loads configuration, initializes logging, applies database migrations,
//! provisions the storage root, and seeds the bootstrap administrator if
//! configured. Wire-protocol adapters embed the library crates directly;
//! this binary only prepares the ground they run on.

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use filedepot_auth::password::PasswordHasher;
use filedepot_core::config::AppConfig;
use filedepot_core::error::AppError;
use filedepot_core::traits::ContentStore;
use filedepot_database::repositories::UserRepository;
use filedepot_database::{DatabasePool, migration};
use filedepot_entity::user::{CreateUserRequest, UserRole};
use filedepot_service::IdentityService;
use filedepot_storage::LocalContentStore;

#[tokio::main]
async fn main() {
    let env = std::env::var("FILEDEPOT_ENV").unwrap_or_else(|_| "development".to_string());

    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Setup failed: {e}");
        std::process::exit(1);
    }
}

/// Initialize the tracing subscriber from the logging config.
fn init_logging(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone()));

    if config.logging.format == "json" {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("FileDepot setup starting");

    // Create the data directory for a file-backed SQLite URL before the
    // driver tries to open it.
    if let Some(path) = config.database.url.strip_prefix("sqlite://") {
        if let Some(parent) = std::path::Path::new(path).parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let db = DatabasePool::connect(&config.database).await?;
    if !db.health_check().await? {
        return Err(AppError::database("Database health check failed"));
    }
    migration::run_migrations(db.pool()).await?;

    let store: Arc<dyn ContentStore> = Arc::new(LocalContentStore::new(&config.storage.root).await?);
    tracing::info!(root = %config.storage.root, "Storage root ready");

    if config.bootstrap.enabled {
        seed_admin(&config, &db, store).await?;
    }

    db.close().await;
    tracing::info!("FileDepot setup complete");
    Ok(())
}

/// Seed the configured bootstrap administrator if it does not exist yet.
async fn seed_admin(
    config: &AppConfig,
    db: &DatabasePool,
    store: Arc<dyn ContentStore>,
) -> Result<(), AppError> {
    let bootstrap = &config.bootstrap;
    if bootstrap.admin_password.is_empty() {
        return Err(AppError::configuration(
            "bootstrap.admin_password must be set when bootstrap seeding is enabled",
        ));
    }

    let user_repo = Arc::new(UserRepository::new(db.pool().clone()));
    if user_repo
        .find_by_username(&bootstrap.admin_username)
        .await?
        .is_some()
    {
        tracing::info!(
            username = %bootstrap.admin_username,
            "Bootstrap administrator already exists, skipping seed"
        );
        return Ok(());
    }

    let identity = IdentityService::new(user_repo, Arc::new(PasswordHasher::new()), store);
    let admin = identity
        .create_user(CreateUserRequest {
            username: bootstrap.admin_username.clone(),
            email: bootstrap.admin_email.clone(),
            password: bootstrap.admin_password.clone(),
            full_name: bootstrap.admin_full_name.clone(),
            role: UserRole::Superuser,
        })
        .await?;

    tracing::info!(
        user_id = %admin.id,
        username = %admin.username,
        "Bootstrap administrator seeded"
    );
    Ok(())
}
