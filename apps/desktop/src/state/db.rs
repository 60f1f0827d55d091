//! # Database State
//!
//! Wraps the `Database` connection for use in commands.
//!
//! ## Thread Safety
//! The `Database` struct from `invpro-db` contains a `SqlitePool` which
//! is inherently thread-safe. Multiple commands can execute queries
//! concurrently without explicit locking.
//!
//! ## Usage in Commands
//! ```rust,ignore
//! pub async fn low_stock_items(app: &App, session: &Session) -> AppResult<Vec<Item>> {
//!     app.authorize(session, Section::Items, Capability::View).await?;
//!     Ok(app.db.inner().items().low_stock().await?)
//! }
//! ```

use std::path::{Path, PathBuf};

use invpro_db::{Database, DbConfig, DbResult};
use tracing::info;

use super::AppConfig;

/// Wrapper around `Database` that also remembers where the file lives.
///
/// The path is what restore copies over.
#[derive(Debug)]
pub struct DbState {
    db: Database,
    path: Option<PathBuf>,
}

impl DbState {
    /// Creates a new DbState wrapping the database connection.
    pub fn new(db: Database, path: Option<PathBuf>) -> Self {
        DbState { db, path }
    }

    /// Opens the database described by the config.
    ///
    /// Parent directories are created for file databases.
    pub async fn open(config: &AppConfig) -> DbResult<Self> {
        if config.is_in_memory() {
            info!("Opening in-memory database");
            let db = Database::new(DbConfig::in_memory()).await?;
            return Ok(DbState::new(db, None));
        }

        let path = config.paths.database.clone();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| invpro_db::DbError::ConnectionFailed(e.to_string()))?;
        }

        info!(?path, "Opening database");
        let db = Database::new(
            DbConfig::new(&path).max_connections(config.database.max_connections),
        )
        .await?;

        Ok(DbState::new(db, Some(path)))
    }

    /// Returns a reference to the inner Database.
    pub fn inner(&self) -> &Database {
        &self.db
    }

    /// Database file on disk; `None` for in-memory databases.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_open_in_memory() {
        let dir = TempDir::new().unwrap();
        let state = DbState::open(&AppConfig::in_dir(dir.path())).await.unwrap();

        assert!(state.path().is_none());
        assert!(state.inner().health_check().await);
    }

    #[tokio::test]
    async fn test_open_file_creates_parent() {
        let dir = TempDir::new().unwrap();
        let mut config = AppConfig::in_dir(dir.path());
        config.paths.database = dir.path().join("data").join("inventory.db");

        let state = DbState::open(&config).await.unwrap();

        assert_eq!(state.path(), Some(config.paths.database.as_path()));
        assert!(config.paths.database.exists());
        state.inner().close().await;
    }
}
