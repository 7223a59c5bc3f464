//! Database connection pool management

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::error::{StoreError, StoreResult};
use ctxpack_config::DatabaseConfig;

/// Embedded migrations shipped with the crate
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Create a database connection pool
///
/// # Errors
///
/// Returns `StoreError::Connection` if the server is unreachable, refuses
/// the credentials, or the pool options are invalid.
pub async fn create_pool(config: &DatabaseConfig) -> StoreResult<PgPool> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.timeout())
        .connect(&config.url())
        .await
        .map_err(|e| StoreError::Connection {
            message: format!("connecting to {}:{}", config.host, config.port),
            source: e,
        })
}

/// Initialize the database: create the pool and run embedded migrations
///
/// # Errors
///
/// Returns `StoreError::Connection` on pool failure and
/// `StoreError::Migration` when a migration cannot be applied.
pub async fn initialize_database(config: &DatabaseConfig) -> StoreResult<PgPool> {
    let pool = create_pool(config).await?;

    if config.auto_migrate {
        MIGRATOR
            .run(&pool)
            .await
            .map_err(|e| StoreError::Migration {
                message: "applying embedded migrations".to_string(),
                source: e,
            })?;
    }

    Ok(pool)
}
