//! Identity store initialization

use std::{sync::Arc, time::Duration};

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{error, info, warn};

use super::admin::IdentityCollaborators;
use crate::{
    config::DatabaseConfig,
    repository::{MemoryIdentityStore, PgRoleRepository, PgUserRepository},
    Config,
};

/// Initialize database connection pool
pub async fn init_database(config: &DatabaseConfig) -> Result<PgPool> {
    // The URL may embed credentials, so it is not logged
    info!("Connecting to database...");

    let pool: PgPool = PgPoolOptions::new()
        .max_connections(config.connections)
        .acquire_timeout(Duration::from_secs(config.timeout))
        .connect(&config.url)
        .await
        .map_err(|e| {
            error!("Failed to connect to database: {}", e);
            anyhow::anyhow!("Database connection failed: {e}")
        })?;

    info!("Database connected successfully");

    Ok(pool)
}

/// Apply the identity schema migrations
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    info!("Running database migrations...");
    sqlx::migrate!("../migrations")
        .run(pool)
        .await
        .map_err(|e| {
            error!("Failed to run migrations: {}", e);
            anyhow::anyhow!("Migration failed: {e}")
        })?;
    info!("Migrations completed");
    Ok(())
}

/// Open the identity store selected by configuration
///
/// PostgreSQL when `database.url` is set (migrations applied), otherwise a
/// process-local store whose contents are lost on exit.
pub async fn init_identity_store(config: &Config) -> Result<IdentityCollaborators> {
    if config.has_database() {
        let pool = init_database(&config.database).await?;
        run_migrations(&pool).await?;
        return Ok(IdentityCollaborators::with_services(
            Arc::new(PgRoleRepository::new(pool.clone())),
            Arc::new(PgUserRepository::new(pool)),
        ));
    }

    warn!("No database configured (ELSA_DATABASE_URL); using the in-memory identity store");
    warn!("Seeded roles and users will not survive a restart");
    let store = Arc::new(MemoryIdentityStore::new());
    Ok(IdentityCollaborators::with_services(store.clone(), store))
}
