//! SeaORM-based database implementation
//!
//! This module provides database-agnostic access using SeaORM with support
//! for SQLite (development, single-node) and PostgreSQL (production). The
//! artifact registry is the single source of truth for artifact lifecycle
//! state; no in-process cache sits in front of it.

use anyhow::{Context, Result};
use sea_orm::{ConnectOptions, Database as SeaOrmDatabase, DatabaseBackend, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::DatabaseConfig;

pub mod migrations;
pub mod repositories;

use migrations::Migrator;

/// Database connection manager with multi-database support
#[derive(Clone)]
pub struct Database {
    pub connection: Arc<DatabaseConnection>,
    pub backend: DatabaseBackend,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseType {
    SQLite,
    PostgreSQL,
}

impl DatabaseType {
    fn as_str(&self) -> &'static str {
        match self {
            DatabaseType::SQLite => "SQLite",
            DatabaseType::PostgreSQL => "PostgreSQL",
        }
    }
}

impl Database {
    /// Create a new database connection with backend-appropriate options
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        let database_type = Self::detect_database_type(&config.url)?;
        let backend = match database_type {
            DatabaseType::SQLite => DatabaseBackend::Sqlite,
            DatabaseType::PostgreSQL => DatabaseBackend::Postgres,
        };

        info!("Connecting to {} database", database_type.as_str());

        let connection_url = match database_type {
            DatabaseType::SQLite => Self::ensure_sqlite_auto_creation(&config.url),
            _ => config.url.clone(),
        };

        let mut connect_options = ConnectOptions::new(&connection_url);
        connect_options
            .max_connections(config.max_connections.unwrap_or(10))
            .min_connections(1)
            .connect_timeout(Duration::from_secs(5))
            .acquire_timeout(Duration::from_secs(3))
            .idle_timeout(Duration::from_secs(600))
            .max_lifetime(Duration::from_secs(1800))
            .sqlx_logging(false);

        let connection = SeaOrmDatabase::connect(connect_options)
            .await
            .with_context(|| format!("Failed to connect to database at '{}'", config.url))?;

        debug!("Database connection established");

        Ok(Self {
            connection: Arc::new(connection),
            backend,
        })
    }

    /// In-memory SQLite database, used by tests and ephemeral dev runs
    pub async fn new_in_memory() -> Result<Self> {
        let connection = SeaOrmDatabase::connect("sqlite::memory:")
            .await
            .context("Failed to create in-memory database")?;
        Ok(Self {
            connection: Arc::new(connection),
            backend: DatabaseBackend::Sqlite,
        })
    }

    /// Run all pending migrations
    pub async fn migrate(&self) -> Result<()> {
        Migrator::up(self.connection.as_ref(), None)
            .await
            .context("Migration failed")?;
        Ok(())
    }

    /// Cheap connectivity probe for health reporting
    pub async fn ping(&self) -> Result<()> {
        self.connection
            .ping()
            .await
            .context("Database ping failed")?;
        Ok(())
    }

    fn detect_database_type(url: &str) -> Result<DatabaseType> {
        if url.starts_with("sqlite:") {
            Ok(DatabaseType::SQLite)
        } else if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            Ok(DatabaseType::PostgreSQL)
        } else {
            anyhow::bail!("Unsupported database URL scheme: {url}")
        }
    }

    fn ensure_sqlite_auto_creation(url: &str) -> String {
        if url.contains("mode=") || url.contains(":memory:") {
            url.to_string()
        } else if url.contains('?') {
            format!("{url}&mode=rwc")
        } else {
            format!("{url}?mode=rwc")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_backends_from_url() {
        assert_eq!(
            Database::detect_database_type("sqlite://./rao.db").unwrap(),
            DatabaseType::SQLite
        );
        assert_eq!(
            Database::detect_database_type("postgres://u:p@localhost/rao").unwrap(),
            DatabaseType::PostgreSQL
        );
        assert!(Database::detect_database_type("mysql://localhost/rao").is_err());
    }

    #[test]
    fn sqlite_urls_get_auto_create_mode() {
        assert_eq!(
            Database::ensure_sqlite_auto_creation("sqlite://./rao.db"),
            "sqlite://./rao.db?mode=rwc"
        );
        assert_eq!(
            Database::ensure_sqlite_auto_creation("sqlite::memory:"),
            "sqlite::memory:"
        );
    }
}
