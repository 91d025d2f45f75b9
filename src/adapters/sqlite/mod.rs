//! SQLite database adapters for siteprobe.

pub mod chat_repository;
pub mod connection;
pub mod history_repository;
pub mod migrations;
pub mod persona_repository;
pub mod trend_repository;

pub use chat_repository::SqliteChatRepository;
pub use connection::{create_pool, create_test_pool, ConnectionError, PoolConfig};
pub use history_repository::SqliteHistoryRepository;
pub use migrations::{all_embedded_migrations, Migration, MigrationError, Migrator};
pub use persona_repository::SqlitePersonaRepository;
pub use trend_repository::SqliteTrendRepository;

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::DatabaseConfig;
use crate::domain::ports::Repositories;

/// Parse a UUID string from a SQLite row field.
pub fn parse_uuid(s: &str) -> DomainResult<Uuid> {
    Uuid::parse_str(s).map_err(|e| DomainError::SerializationError(e.to_string()))
}

/// Parse an RFC3339 datetime string from a SQLite row field.
pub fn parse_datetime(s: &str) -> DomainResult<DateTime<Utc>> {
    chrono::DateTime::parse_from_rfc3339(s)
        .map_err(|e| DomainError::SerializationError(e.to_string()))
        .map(|dt| dt.with_timezone(&Utc))
}

/// Fixed-width RFC3339 so that text ordering matches time ordering.
pub fn timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),
    #[error("Migration error: {0}")]
    Migration(#[from] MigrationError),
    #[error("Seeding error: {0}")]
    Seed(#[from] DomainError),
}

pub async fn initialize_database(database_url: &str, config: Option<PoolConfig>) -> Result<SqlitePool, DatabaseError> {
    let pool = create_pool(database_url, config).await?;
    let migrator = Migrator::new(pool.clone());
    migrator.run_embedded_migrations(all_embedded_migrations()).await?;
    SqlitePersonaRepository::new(pool.clone()).seed_defaults().await?;
    Ok(pool)
}

/// Open the configured database and wire the stores over it.
pub async fn open_repositories(config: &DatabaseConfig) -> Result<Repositories, DatabaseError> {
    let pool_config = PoolConfig {
        max_connections: config.max_connections,
        ..PoolConfig::default()
    };
    let pool = initialize_database(&format!("sqlite:{}", config.path), Some(pool_config)).await?;
    Ok(repositories_over(pool))
}

pub fn repositories_over(pool: SqlitePool) -> Repositories {
    Repositories {
        personas: Arc::new(SqlitePersonaRepository::new(pool.clone())),
        history: Arc::new(SqliteHistoryRepository::new(pool.clone())),
        trends: Arc::new(SqliteTrendRepository::new(pool.clone())),
        chats: Arc::new(SqliteChatRepository::new(pool)),
    }
}

/// Create an in-memory test pool with all migrations applied.
pub async fn create_migrated_test_pool() -> Result<SqlitePool, DatabaseError> {
    let pool = create_test_pool().await?;
    let migrator = Migrator::new(pool.clone());
    migrator.run_embedded_migrations(all_embedded_migrations()).await?;
    Ok(pool)
}
