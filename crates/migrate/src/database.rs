//! Database handle
//!
//! An explicitly constructed connection pool, owned by whoever runs
//! migrations and closed at process exit. PostgreSQL and SQLite are selected
//! by URL scheme through sqlx's `Any` driver.

use sqlx::any::AnyPoolOptions;
use sqlx::AnyPool;
use sqlx::pool::PoolConnection;
use sqlx::{Any, Transaction};

use crate::config::DatabaseConfig;
use crate::error::{MigrateError, MigrateResult};

/// Shared database access handle
#[derive(Debug, Clone)]
pub struct Database {
    pool: AnyPool,
}

impl Database {
    /// Build the pool and open the first connection
    pub async fn connect(config: &DatabaseConfig) -> MigrateResult<Self> {
        sqlx::any::install_default_drivers();

        let pool = AnyPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect(&config.url)
            .await
            .map_err(MigrateError::Connection)?;

        tracing::debug!(
            "Database pool ready (max connections: {})",
            config.max_connections
        );

        Ok(Self { pool })
    }

    /// Wrap an existing pool
    pub fn from_pool(pool: AnyPool) -> Self {
        Self { pool }
    }

    /// Get the underlying pool
    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    /// Check out a single connection; it returns to the pool when dropped
    pub async fn acquire(&self) -> MigrateResult<PoolConnection<Any>> {
        self.pool.acquire().await.map_err(|e| {
            tracing::error!("Failed to acquire database connection: {}", e);
            MigrateError::Connection(e)
        })
    }

    /// Begin a transaction on a freshly acquired connection
    pub async fn begin(&self) -> MigrateResult<Transaction<'static, Any>> {
        let tx = self.pool.begin().await.map_err(|e| {
            tracing::error!("Failed to begin database transaction: {}", e);
            MigrateError::Connection(e)
        })?;
        tracing::debug!("Database transaction started");
        Ok(tx)
    }

    /// Close every connection in the pool
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
