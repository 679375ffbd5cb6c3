//! # Database Pool Management
//!
//! Opens the SQLite pool the engine runs on and hands out write transactions.
//!
//! ## Two Levels of Exclusion
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  allocate_payment(A)        allocate_payment(B)        build_report    │
//! │        │                          │                         │          │
//! │  lock(A)  ClientLocks       lock(B)  ClientLocks            │          │
//! │        │                          │                         │          │
//! │  BEGIN IMMEDIATE  Conn1     BEGIN IMMEDIATE  Conn2     SELECT  Conn3   │
//! │        │                          │ waits (busy_timeout)    │          │
//! │      COMMIT ─────────────────────►│                         │          │
//! │                                 COMMIT                      │          │
//! │                                                                         │
//! │  ClientLocks orders work on ONE client (read-then-write must see       │
//! │  committed balances). BEGIN IMMEDIATE takes SQLite's write lock up     │
//! │  front, so writers of different clients queue on busy_timeout instead  │
//! │  of failing a deferred read→write upgrade with "database is locked".   │
//! │  WAL keeps plain reads off that queue.                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::locks::ClientLocks;
use crate::migrations;
use crate::repository::catalog::CatalogRepository;
use crate::repository::order::OrderRepository;
use crate::repository::subscription::SubscriptionRepository;
use crate::repository::voucher::VoucherRepository;

// =============================================================================
// Configuration
// =============================================================================

/// Pool settings. Build with [`DbConfig::new`] for a file or
/// [`DbConfig::in_memory`] for tests.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// SQLite file, created on first connect.
    pub database_path: PathBuf,

    /// Default 5.
    pub max_connections: u32,

    pub min_connections: u32,

    /// How long to wait for a pooled connection.
    pub acquire_timeout: Duration,

    pub idle_timeout: Duration,

    /// How long a writer waits for SQLite's write lock before giving up.
    /// Default 5 seconds.
    pub busy_timeout: Duration,

    pub run_migrations: bool,
}

impl DbConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            busy_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Private in-memory database. One connection: a second one would open
    /// a different, empty database.
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(":memory:"),
            max_connections: 1,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(60),
            busy_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }
}

// =============================================================================
// Database
// =============================================================================

/// Pool plus the per-client lock registry.
///
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Database (Clone)                                                       │
/// │  ├── SqlitePool   ← connections                                         │
/// │  └── ClientLocks  ← per-client critical sections                        │
/// │                                                                         │
/// │  Every service built from a clone of the same Database shares both,    │
/// │  so a credit order and a payment for one client never interleave.      │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
    locks: ClientLocks,
}

impl Database {
    /// Opens (creating if needed) the database and applies pending migrations.
    ///
    /// Connections use WAL, `synchronous = NORMAL`, foreign keys on and the
    /// configured busy timeout.
    ///
    /// ```rust,ignore
    /// let db = Database::new(EngineConfig::from_env()?.db_config()).await?;
    /// ```
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(
            path = %config.database_path.display(),
            "Opening engine database"
        );

        let connect_url = format!("sqlite://{}?mode=rwc", config.database_path.display());

        let connect_options = SqliteConnectOptions::from_str(&connect_url)
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(config.busy_timeout)
            .create_if_missing(true);

        debug!(busy_timeout = ?config.busy_timeout, "Connection options configured");

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout)
            .idle_timeout(Some(config.idle_timeout))
            .connect_with(connect_options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        info!(
            max_connections = config.max_connections,
            "Database pool created"
        );

        let db = Database {
            pool,
            locks: ClientLocks::new(),
        };

        if config.run_migrations {
            db.run_migrations().await?;
        }

        Ok(db)
    }

    /// Applies pending migrations. Already-applied ones are skipped.
    pub async fn run_migrations(&self) -> DbResult<()> {
        info!("Running database migrations");
        migrations::run_migrations(&self.pool).await?;
        info!("Migrations complete");
        Ok(())
    }

    /// Raw pool, for reads outside any transaction.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Returns the per-client lock registry.
    pub fn locks(&self) -> &ClientLocks {
        &self.locks
    }

    /// Starts a write transaction holding SQLite's write lock from the first
    /// statement. Dropping it without `commit` rolls back.
    pub async fn begin(&self) -> DbResult<Transaction<'static, Sqlite>> {
        self.pool
            .begin_with("BEGIN IMMEDIATE")
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))
    }

    /// Products, districts, clients and plans.
    pub fn catalog(&self) -> CatalogRepository {
        CatalogRepository::new(self.pool.clone())
    }

    pub fn orders(&self) -> OrderRepository {
        OrderRepository::new(self.pool.clone())
    }

    pub fn vouchers(&self) -> VoucherRepository {
        VoucherRepository::new(self.pool.clone())
    }

    pub fn subscriptions(&self) -> SubscriptionRepository {
        SubscriptionRepository::new(self.pool.clone())
    }

    /// Waits for open connections to finish and closes the pool.
    pub async fn close(&self) {
        info!("Closing database connection pool");
        self.pool.close().await;
    }

    /// `true` if the database answers a trivial query.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_database() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        assert!(db.health_check().await);
    }

    #[tokio::test]
    async fn test_migrations_applied_on_connect() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let (total, applied) = migrations::migration_status(db.pool()).await.unwrap();
        assert!(total > 0);
        assert_eq!(total, applied);
    }

    #[tokio::test]
    async fn test_clones_share_client_locks() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let clone = db.clone();

        let _guard = db.locks().lock("c-1").await;
        assert_eq!(clone.locks().len(), 1);
    }

    #[tokio::test]
    async fn test_begin_rolls_back_on_drop() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        {
            let mut tx = db.begin().await.unwrap();
            sqlx::query("INSERT INTO districts (id, name, base_delivery_fee_cents, created_at) VALUES ('d-x', 'X', 100, '2026-01-01T00:00:00Z')")
                .execute(&mut *tx)
                .await
                .unwrap();
        }

        assert!(db.catalog().get_district("d-x").await.unwrap().is_none());
    }

    #[test]
    fn test_config_builder() {
        let config = DbConfig::new("/tmp/test.db")
            .max_connections(10)
            .busy_timeout(Duration::from_secs(2));

        assert_eq!(config.max_connections, 10);
        assert_eq!(config.busy_timeout, Duration::from_secs(2));
        assert_eq!(config.min_connections, 1);
    }
}
