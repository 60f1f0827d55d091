//! # Database Pool Management
//!
//! Connection pool creation, configuration and first-start bootstrap.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Database Connection Pool                           │
//! │                                                                         │
//! │  App startup                                                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbConfig::new(path) ← Configure pool settings                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database::new(config).await ← Create pool + run migrations            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  db.bootstrap(admin_password) ← Administrator role + admin user        │
//! │       │                          (only when missing)                   │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────┐                           │
//! │  │            SqlitePool                    │                           │
//! │  │  ┌─────┐ ┌─────┐ ┌─────┐ ┌─────┐       │                           │
//! │  │  │Conn1│ │Conn2│ │Conn3│ │Conn4│ ...   │  (max_connections)        │
//! │  │  └─────┘ └─────┘ └─────┘ └─────┘       │                           │
//! │  └─────────────────────────────────────────┘                           │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## WAL Mode
//! SQLite WAL (Write-Ahead Logging) mode is enabled so readers (dashboard,
//! lists) never block a writer saving an invoice.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::password::hash_password;
use crate::repository::role::insert_role;
use crate::repository::user::insert_user;
use crate::repository::{
    ActivityRepository, AnalyticsRepository, AuditRepository, InvoiceRepository, ItemRepository,
    LedgerRepository, PartnerRepository, ReturnRepository, RoleRepository, UserRepository,
    WarehouseRepository,
};
use invpro_core::{PermissionSet, ADMIN_ROLE_NAME, ADMIN_USERNAME};

// =============================================================================
// Configuration
// =============================================================================

/// Database configuration.
///
/// ## Example
/// ```rust,ignore
/// let config = DbConfig::new("/path/to/inventory.db")
///     .max_connections(5)
///     .min_connections(1);
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Path to the SQLite database file.
    pub database_path: PathBuf,

    /// Maximum number of connections in the pool.
    /// Default: 5
    pub max_connections: u32,

    /// Minimum number of connections to keep alive.
    /// Default: 1
    pub min_connections: u32,

    /// Connection timeout duration.
    /// Default: 30 seconds
    pub connect_timeout: Duration,

    /// Idle timeout before closing a connection.
    /// Default: 10 minutes
    pub idle_timeout: Duration,

    /// Whether to run migrations on connect.
    /// Default: true
    pub run_migrations: bool,
}

impl DbConfig {
    /// Creates a new database configuration with the given path.
    ///
    /// The file is created if it doesn't exist.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            run_migrations: true,
        }
    }

    /// Sets the maximum number of connections.
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Sets the minimum number of connections.
    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    /// Sets the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets whether to run migrations on connect.
    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    /// Creates an in-memory database configuration (for testing).
    ///
    /// ## Usage
    /// ```rust,ignore
    /// let db = Database::new(DbConfig::in_memory()).await?;
    /// // isolated, migrated, empty
    /// ```
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(":memory:"),
            max_connections: 1, // In-memory requires single connection
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(600),
            run_migrations: true,
        }
    }

    /// Whether this configuration points at an in-memory database.
    pub fn is_in_memory(&self) -> bool {
        self.database_path == Path::new(":memory:")
    }
}

// =============================================================================
// Database
// =============================================================================

/// Main database handle providing repository access.
///
/// Cloning is cheap; every clone shares the same pool.
///
/// ## Usage
/// ```rust,ignore
/// let db = Database::new(DbConfig::new(path)).await?;
/// db.bootstrap("admin").await?;
///
/// let low = db.items().low_stock().await?;
/// ```
#[derive(Debug, Clone)]
pub struct Database {
    /// The SQLite connection pool.
    pool: SqlitePool,
}

impl Database {
    /// Creates a new database connection pool.
    ///
    /// ## What This Does
    /// 1. Creates the database file if it doesn't exist
    /// 2. Configures SQLite:
    ///    - WAL mode for concurrent reads
    ///    - NORMAL synchronous (balance of safety/speed)
    ///    - Foreign keys enabled
    /// 3. Creates the connection pool
    /// 4. Runs migrations (if enabled)
    ///
    /// ## Returns
    /// * `Ok(Database)` - Ready-to-use database handle
    /// * `Err(DbError)` - Connection or migration failed
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(
            path = %config.database_path.display(),
            "Initializing database connection"
        );

        // sqlite://path?mode=rwc creates the file if missing
        let connect_url = format!("sqlite://{}?mode=rwc", config.database_path.display());

        let connect_options = SqliteConnectOptions::from_str(&connect_url)
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            // SQLite has them disabled by default
            .foreign_keys(true)
            .create_if_missing(true);

        debug!("Connection options configured");

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(Some(config.idle_timeout))
            .connect_with(connect_options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        info!(max_connections = config.max_connections, "Database pool created");

        let db = Database { pool };

        if config.run_migrations {
            db.run_migrations().await?;
        }

        Ok(db)
    }

    /// Runs database migrations.
    ///
    /// Idempotent: applied migrations are tracked in `_sqlx_migrations`.
    pub async fn run_migrations(&self) -> DbResult<()> {
        info!("Running database migrations");
        migrations::run_migrations(&self.pool).await?;
        info!("Migrations complete");
        Ok(())
    }

    /// Creates the Administrator role and the `admin` account when missing.
    ///
    /// ## Rules
    /// - no role at all → role "Administrator" with every capability
    /// - no user at all → user `admin` in that role, hashed `admin_password`
    ///
    /// ## Returns
    /// `true` when the admin account was created by this call.
    pub async fn bootstrap(&self, admin_password: &str) -> DbResult<bool> {
        let mut tx = self.pool.begin().await?;

        let roles: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM roles")
            .fetch_one(&mut *tx)
            .await?;

        let role_id = if roles == 0 {
            let id = insert_role(&mut tx, ADMIN_ROLE_NAME, &PermissionSet::all()).await?;
            info!(role = ADMIN_ROLE_NAME, "Created administrator role");
            Some(id)
        } else {
            sqlx::query_scalar::<_, i64>("SELECT id FROM roles WHERE name = ?1")
                .bind(ADMIN_ROLE_NAME)
                .fetch_optional(&mut *tx)
                .await?
        };

        let users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&mut *tx)
            .await?;

        let created = match (users, role_id) {
            (0, Some(role_id)) => {
                let hash = hash_password(admin_password)?;
                insert_user(&mut tx, ADMIN_USERNAME, &hash, "Administrator", role_id).await?;
                info!(username = ADMIN_USERNAME, "Created administrator account");
                true
            }
            (0, None) => {
                warn!("No users and no administrator role; skipping account bootstrap");
                false
            }
            _ => false,
        };

        tx.commit().await?;
        Ok(created)
    }

    /// Writes a consistent copy of the live database to `path`.
    ///
    /// Uses `VACUUM INTO`, so it is safe while other connections read and
    /// write. The target file must not exist yet.
    pub async fn snapshot_to(&self, path: &Path) -> DbResult<()> {
        if path.exists() {
            return Err(DbError::Internal(format!(
                "Snapshot target already exists: {}",
                path.display()
            )));
        }

        debug!(path = %path.display(), "Writing database snapshot");

        sqlx::query("VACUUM INTO ?1")
            .bind(path.to_string_lossy().into_owned())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Returns a reference to the connection pool.
    ///
    /// For queries not covered by repositories.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Returns the activity log repository.
    pub fn activity(&self) -> ActivityRepository {
        ActivityRepository::new(self.pool.clone())
    }

    /// Returns the warehouse repository.
    pub fn warehouses(&self) -> WarehouseRepository {
        WarehouseRepository::new(self.pool.clone())
    }

    /// Returns the item repository.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let low = db.items().low_stock().await?;
    /// ```
    pub fn items(&self) -> ItemRepository {
        ItemRepository::new(self.pool.clone())
    }

    /// Returns the supplier/customer repository.
    pub fn partners(&self) -> PartnerRepository {
        PartnerRepository::new(self.pool.clone())
    }

    /// Returns the role repository.
    pub fn roles(&self) -> RoleRepository {
        RoleRepository::new(self.pool.clone())
    }

    /// Returns the user repository.
    pub fn users(&self) -> UserRepository {
        UserRepository::new(self.pool.clone())
    }

    /// Returns the stock ledger repository.
    pub fn ledger(&self) -> LedgerRepository {
        LedgerRepository::new(self.pool.clone())
    }

    /// Returns the invoice repository.
    pub fn invoices(&self) -> InvoiceRepository {
        InvoiceRepository::new(self.pool.clone())
    }

    /// Returns the return repository.
    pub fn returns(&self) -> ReturnRepository {
        ReturnRepository::new(self.pool.clone())
    }

    /// Returns the stock audit repository.
    pub fn audits(&self) -> AuditRepository {
        AuditRepository::new(self.pool.clone())
    }

    /// Returns the analytics repository.
    pub fn analytics(&self) -> AnalyticsRepository {
        AnalyticsRepository::new(self.pool.clone())
    }

    /// Closes the database connection pool.
    ///
    /// ## When To Call
    /// - On application shutdown
    /// - Before a restore overwrites the database file
    ///
    /// After calling close, all repository operations will fail.
    pub async fn close(&self) {
        info!("Closing database connection pool");
        self.pool.close().await;
    }

    /// Checks if the database can execute queries.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use invpro_core::{Capability, Section};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_in_memory_database() {
        let config = DbConfig::in_memory();
        assert!(config.is_in_memory());

        let db = Database::new(config).await.unwrap();
        assert!(db.health_check().await);
    }

    #[tokio::test]
    async fn test_config_builder() {
        let config = DbConfig::new("/tmp/test.db").max_connections(10).min_connections(2);

        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 2);
        assert!(!config.is_in_memory());
    }

    #[tokio::test]
    async fn test_bootstrap_is_idempotent() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        assert!(db.bootstrap("first").await.unwrap());
        assert!(!db.bootstrap("second").await.unwrap());

        assert_eq!(db.users().count().await.unwrap(), 1);
        assert_eq!(db.roles().count().await.unwrap(), 1);

        // the first password stays in force
        let admin = db.users().authenticate(ADMIN_USERNAME, "first").await.unwrap();
        assert_eq!(admin.role_name, ADMIN_ROLE_NAME);
        assert!(db.users().authenticate(ADMIN_USERNAME, "second").await.is_err());

        let role = db.roles().get(admin.role_id).await.unwrap();
        assert!(role.permissions.has(Section::Backup, Capability::Extra));
    }

    #[tokio::test]
    async fn test_snapshot_to_file() {
        let dir = TempDir::new().unwrap();
        let live = dir.path().join("live.db");
        let copy = dir.path().join("copy.db");

        let db = Database::new(DbConfig::new(&live)).await.unwrap();
        db.bootstrap("admin").await.unwrap();
        db.snapshot_to(&copy).await.unwrap();
        assert!(copy.exists());

        // a second snapshot to the same file is refused
        assert!(db.snapshot_to(&copy).await.is_err());
        db.close().await;

        let restored = Database::new(DbConfig::new(&copy)).await.unwrap();
        assert_eq!(restored.users().count().await.unwrap(), 1);
        restored.close().await;
    }
}
