//! Database repository: owns the connection pool and runs the tracking
//! statements the dialect produces.
//!
//! `apply_script` is the system's atomicity contract: the user's script
//! and the tracker update run inside one transaction that either wholly
//! commits or wholly rolls back.

use std::time::Duration;

use sqlx::any::AnyPoolOptions;
use sqlx::{AnyPool, Row};

use drift_core::{ConnectionConfig, DatabaseDriver, DriftError, DriftResult};

use crate::dialect::{dialect_for, Dialect};
use crate::version::Direction;

/// Storage seam for the executor. `SqlRepository` is the production
/// implementation; tests drive the executor against an in-memory one.
pub trait MigrationStore {
    /// Opens the pool and verifies the server answers. Calling it on an
    /// already-connected store is a no-op.
    async fn connect(&mut self) -> DriftResult<()>;

    /// Releases the pool; safe to call when `connect` never succeeded
    async fn close(&mut self);

    /// Idempotent creation of `schema_migration` and its unique index
    async fn ensure_tracking_table(&self) -> DriftResult<()>;

    /// Greatest applied version, or the empty string
    async fn current_version(&self) -> DriftResult<String>;

    /// All applied versions in ascending order
    async fn applied_versions(&self) -> DriftResult<Vec<String>>;

    /// Runs the user script and the tracker update in one transaction
    async fn apply_script(
        &self,
        version: &str,
        sql: &str,
        direction: Direction,
    ) -> DriftResult<()>;

    /// Tracker-only mark for `force`: a single insert or delete, no script
    async fn force_mark(&self, version: &str, direction: Direction) -> DriftResult<()>;
}

/// sqlx-backed repository over the `Any` driver; one code path serves
/// PostgreSQL and MySQL
pub struct SqlRepository {
    dialect: Box<dyn Dialect>,
    connection: ConnectionConfig,
    pool: Option<AnyPool>,
}

impl SqlRepository {
    pub fn new(driver: DatabaseDriver, connection: ConnectionConfig) -> Self {
        Self {
            dialect: dialect_for(driver),
            connection,
            pool: None,
        }
    }

    fn pool(&self) -> DriftResult<&AnyPool> {
        self.pool
            .as_ref()
            .ok_or_else(|| DriftError::Database("repository - not connected".to_string()))
    }

    fn tracker_statement(&self, direction: Direction) -> &'static str {
        match direction {
            Direction::Up => self.dialect.insert_version_sql(),
            Direction::Down => self.dialect.delete_version_sql(),
        }
    }
}

impl MigrationStore for SqlRepository {
    async fn connect(&mut self) -> DriftResult<()> {
        if self.pool.is_some() {
            return Ok(());
        }

        sqlx::any::install_default_drivers();

        let url = self.dialect.connection_url(&self.connection);
        let pool = AnyPoolOptions::new()
            .max_connections(10)
            .idle_timeout(Duration::from_secs(5))
            .max_lifetime(Duration::from_secs(300))
            .connect(&url)
            .await
            .map_err(|e| DriftError::Database(format!("connect - {}", e)))?;

        // the pool connects lazily, so ping before reporting success
        sqlx::query("SELECT 1")
            .execute(&pool)
            .await
            .map_err(|e| DriftError::Database(format!("connect - ping - {}", e)))?;

        tracing::debug!(
            "connected to {} database at {}:{}",
            self.dialect.name(),
            self.connection.host,
            self.connection.port
        );

        self.pool = Some(pool);
        Ok(())
    }

    async fn close(&mut self) {
        if let Some(pool) = self.pool.take() {
            pool.close().await;
            tracing::debug!("database pool closed");
        }
    }

    async fn ensure_tracking_table(&self) -> DriftResult<()> {
        let pool = self.pool()?;
        for stmt in self.dialect.create_tracking_table_sql() {
            sqlx::query(stmt)
                .execute(pool)
                .await
                .map_err(|e| DriftError::Database(format!("setup tracking table - {}", e)))?;
        }
        Ok(())
    }

    async fn current_version(&self) -> DriftResult<String> {
        let row = sqlx::query(self.dialect.current_version_sql())
            .fetch_one(self.pool()?)
            .await
            .map_err(|e| DriftError::Database(format!("current version - {}", e)))?;

        row.try_get::<String, _>(0)
            .map_err(|e| DriftError::Database(format!("current version - {}", e)))
    }

    async fn applied_versions(&self) -> DriftResult<Vec<String>> {
        let rows = sqlx::query(self.dialect.applied_versions_sql())
            .fetch_all(self.pool()?)
            .await
            .map_err(|e| DriftError::Database(format!("applied versions - {}", e)))?;

        let mut versions = Vec::with_capacity(rows.len());
        for row in rows {
            let version: String = row
                .try_get(0)
                .map_err(|e| DriftError::Database(format!("applied versions - {}", e)))?;
            versions.push(version);
        }
        Ok(versions)
    }

    async fn apply_script(
        &self,
        version: &str,
        sql: &str,
        direction: Direction,
    ) -> DriftResult<()> {
        let mut tx = self.pool()?.begin().await.map_err(|e| {
            DriftError::Database(format!(
                "apply {} migration {} - begin - {}",
                direction, version, e
            ))
        })?;

        // dropping the transaction on the error paths rolls it back
        sqlx::raw_sql(sql).execute(&mut *tx).await.map_err(|e| {
            DriftError::Database(format!("apply {} migration {} - {}", direction, version, e))
        })?;

        sqlx::query(self.tracker_statement(direction))
            .bind(version)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                DriftError::Database(format!(
                    "apply {} migration {} - tracking update - {}",
                    direction, version, e
                ))
            })?;

        tx.commit().await.map_err(|e| {
            DriftError::Database(format!(
                "apply {} migration {} - commit - {}",
                direction, version, e
            ))
        })
    }

    async fn force_mark(&self, version: &str, direction: Direction) -> DriftResult<()> {
        sqlx::query(self.tracker_statement(direction))
            .bind(version)
            .execute(self.pool()?)
            .await
            .map_err(|e| DriftError::Database(format!("force mark {} - {}", version, e)))?;
        Ok(())
    }
}
