//! Database layer for Labsite
//!
//! Provides:
//! - SeaORM entity models
//! - Repository pattern for data access
//! - Connection pool management
//! - Schema bootstrap from the entity definitions

pub mod models;
mod repository;

pub use repository::{PublicationFields, Repository, ResearchFields};

use crate::config::DatabaseConfig;
use crate::errors::{AppError, Result};
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema,
};
use std::time::Duration;
use tracing::info;

/// Database connection pool wrapper
#[derive(Clone)]
pub struct DbPool {
    /// Primary connection (for writes)
    pub primary: DatabaseConnection,

    /// Read replica connection (optional)
    pub replica: Option<DatabaseConnection>,
}

impl DbPool {
    /// Create a new database pool from configuration
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        info!("Connecting to primary database...");

        let primary = Database::connect(connect_options(&config.url, config))
            .await
            .map_err(|e| AppError::DatabaseConnection {
                message: format!("Failed to connect to primary: {}", e),
            })?;

        // Connect to replica if configured
        let replica = if let Some(ref read_url) = config.read_url {
            info!("Connecting to read replica...");

            let replica_conn = Database::connect(connect_options(read_url, config))
                .await
                .map_err(|e| AppError::DatabaseConnection {
                    message: format!("Failed to connect to replica: {}", e),
                })?;

            Some(replica_conn)
        } else {
            None
        };

        info!("Database connections established");

        Ok(Self { primary, replica })
    }

    /// Get the connection for reads (replica if available, otherwise primary)
    pub fn read(&self) -> &DatabaseConnection {
        self.replica.as_ref().unwrap_or(&self.primary)
    }

    /// Get the connection for writes (always primary)
    pub fn write(&self) -> &DatabaseConnection {
        &self.primary
    }

    /// Ping the database to check connectivity
    pub async fn ping(&self) -> Result<()> {
        self.primary
            .execute_unprepared("SELECT 1")
            .await
            .map_err(|e| AppError::DatabaseConnection {
                message: format!("Primary ping failed: {}", e),
            })?;

        if let Some(ref replica) = self.replica {
            replica
                .execute_unprepared("SELECT 1")
                .await
                .map_err(|e| AppError::DatabaseConnection {
                    message: format!("Replica ping failed: {}", e),
                })?;
        }

        Ok(())
    }
}

fn connect_options(url: &str, config: &DatabaseConfig) -> ConnectOptions {
    let mut opts = ConnectOptions::new(url);
    opts.max_connections(config.max_connections)
        .min_connections(config.min_connections.min(config.max_connections))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .sqlx_logging(true);
    opts
}

/// Create every table that does not exist yet. Parents come before children.
pub async fn ensure_schema(conn: &DatabaseConnection) -> Result<()> {
    use models::*;

    create_table(conn, ResearchEntity).await?;
    create_table(conn, ProgressEntity).await?;
    create_table(conn, TextBlockEntity).await?;
    create_table(conn, VideoBlockEntity).await?;
    create_table(conn, ImageBlockEntity).await?;
    create_table(conn, MapBlockEntity).await?;
    create_table(conn, LecturerMaterialEntity).await?;
    create_table(conn, PublicationEntity).await?;

    info!("Database schema ensured");
    Ok(())
}

async fn create_table<E: EntityTrait>(conn: &DatabaseConnection, entity: E) -> Result<()> {
    let backend = conn.get_database_backend();
    let mut statement = Schema::new(backend).create_table_from_entity(entity);
    statement.if_not_exists();
    conn.execute(backend.build(&statement)).await?;
    Ok(())
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Single-connection in-memory SQLite pool with the full schema
    pub async fn memory_pool() -> DbPool {
        let config = DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            read_url: None,
            max_connections: 1,
            min_connections: 1,
            connect_timeout_secs: 5,
            idle_timeout_secs: 600,
            auto_migrate: true,
        };
        let pool = DbPool::new(&config).await.expect("in-memory sqlite");
        ensure_schema(pool.write()).await.expect("schema");
        pool
    }
}
