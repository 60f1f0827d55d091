//! # Backup & Restore
//!
//! Manual backups, automatic snapshots and restore.
//!
//! ## On-Disk Layout
//! ```text
//! <backup_path>/
//! ├── backup_2026-10-19_14-03-27/      ◄─── manual backup (directory)
//! │   ├── database.db                   VACUUM INTO snapshot
//! │   ├── settings.json                 copy, if present
//! │   └── invoices/...                  recursive copy, if present
//! └── AutoBackups/
//!     └── backup_2026-10-19_14-00.db    ◄─── scheduler snapshot
//! ```
//!
//! ## Restore
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  restore(path)                                                         │
//! │    1. resolve database file (backup dir or bare .db)                   │
//! │    2. close the live pool                                              │
//! │    3. copy over the live file, drop stale -wal / -shm                  │
//! │    4. copy settings.json back (backup dir only)                        │
//! │    5. log the restore into the restored database                       │
//! │    6. report restart required                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod scheduler;

pub use scheduler::{BackupScheduler, BackupSchedulerHandle};

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, Utc};
use invpro_core::{LogAction, NewActivity, Section, AUTO_BACKUP_ACTOR};
use invpro_db::{Database, DbConfig};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult};
use crate::state::{AppEvent, EventBus};

/// Folder inside the backup path that holds scheduler snapshots.
pub const AUTO_BACKUP_DIR: &str = "AutoBackups";

/// Database file name inside a manual backup directory.
pub const BACKUP_DATABASE_FILE: &str = "database.db";

const BACKUP_PREFIX: &str = "backup_";
const SETTINGS_FILE: &str = "settings.json";
const INVOICES_DIR: &str = "invoices";
const SQLITE_HEADER: &[u8; 16] = b"SQLite format 3\0";

/// One backup found on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupInfo {
    pub path: PathBuf,
    pub automatic: bool,
    pub created_at: DateTime<Utc>,
    pub size_bytes: u64,
}

/// Result of a restore.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreOutcome {
    pub restored_from: PathBuf,
    pub settings_restored: bool,
    /// The live pool is closed; the application must be restarted.
    pub restart_required: bool,
}

/// Files a restore would copy, checked but not yet touched.
#[derive(Debug, Clone, PartialEq)]
pub struct RestoreSource {
    pub database: PathBuf,
    pub settings: Option<PathBuf>,
}

/// Creates, lists and restores backups.
#[derive(Debug, Clone)]
pub struct BackupManager {
    db: Database,
    db_path: Option<PathBuf>,
    settings_path: PathBuf,
    invoices_dir: PathBuf,
    events: EventBus,
}

impl BackupManager {
    pub fn new(
        db: Database,
        db_path: Option<PathBuf>,
        settings_path: impl Into<PathBuf>,
        invoices_dir: impl Into<PathBuf>,
        events: EventBus,
    ) -> Self {
        BackupManager {
            db,
            db_path,
            settings_path: settings_path.into(),
            invoices_dir: invoices_dir.into(),
            events,
        }
    }

    // =========================================================================
    // Create
    // =========================================================================

    /// Writes a manual backup directory under `dest_dir`.
    ///
    /// A partially written directory is removed again on failure.
    pub async fn create(&self, dest_dir: &Path, actor: &str) -> AppResult<BackupInfo> {
        fs::create_dir_all(dest_dir)?;

        let name = format!("{}{}", BACKUP_PREFIX, Local::now().format("%Y-%m-%d_%H-%M-%S"));
        let target = dest_dir.join(name);
        if target.exists() {
            return Err(AppError::backup(format!(
                "Backup already exists: {}",
                target.display()
            )));
        }

        debug!(target = ?target, "Creating backup");
        fs::create_dir(&target)?;

        if let Err(e) = self.fill_backup_dir(&target).await {
            if let Err(cleanup) = fs::remove_dir_all(&target) {
                warn!(error = %cleanup, target = ?target, "Failed to remove partial backup");
            }
            return Err(e);
        }

        self.db
            .activity()
            .log(&NewActivity::new(
                actor,
                LogAction::Backup,
                Section::Backup,
                format!("Created backup {}", target.display()),
            ))
            .await?;

        self.events.publish(AppEvent::BackupCompleted {
            path: target.clone(),
            automatic: false,
        });

        info!(target = ?target, "Backup created");
        describe(&target, false)
    }

    async fn fill_backup_dir(&self, target: &Path) -> AppResult<()> {
        self.db.snapshot_to(&target.join(BACKUP_DATABASE_FILE)).await?;

        if self.settings_path.is_file() {
            fs::copy(&self.settings_path, target.join(SETTINGS_FILE))?;
        }

        if self.invoices_dir.is_dir() {
            let copied = copy_dir(&self.invoices_dir, &target.join(INVOICES_DIR))?;
            debug!(files = copied, "Invoices copied");
        }

        Ok(())
    }

    /// Writes one scheduler snapshot into `<backup_dir>/AutoBackups`.
    ///
    /// Returns `None` when a snapshot for the current minute already exists.
    pub async fn auto_backup(&self, backup_dir: &Path) -> AppResult<Option<BackupInfo>> {
        let folder = backup_dir.join(AUTO_BACKUP_DIR);
        fs::create_dir_all(&folder)?;

        let target = folder.join(format!(
            "{}{}.db",
            BACKUP_PREFIX,
            Local::now().format("%Y-%m-%d_%H-%M")
        ));
        if target.exists() {
            debug!(target = ?target, "Auto-backup for this minute exists, skipping");
            return Ok(None);
        }

        self.db.snapshot_to(&target).await?;

        self.db
            .activity()
            .log(&NewActivity::new(
                AUTO_BACKUP_ACTOR,
                LogAction::Backup,
                Section::Backup,
                format!("Automatic backup {}", target.display()),
            ))
            .await?;

        self.events.publish(AppEvent::BackupCompleted {
            path: target.clone(),
            automatic: true,
        });

        info!(target = ?target, "Auto-backup written");
        describe(&target, true).map(Some)
    }

    // =========================================================================
    // List
    // =========================================================================

    /// Lists manual and automatic backups in `dir`, newest first.
    ///
    /// A missing directory has no backups.
    pub fn list(&self, dir: &Path) -> AppResult<Vec<BackupInfo>> {
        let mut backups = Vec::new();
        if !dir.is_dir() {
            return Ok(backups);
        }

        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if is_backup_name(&path) && path.join(BACKUP_DATABASE_FILE).is_file() {
                backups.push(describe(&path, false)?);
            }
        }

        let auto = dir.join(AUTO_BACKUP_DIR);
        if auto.is_dir() {
            for entry in fs::read_dir(&auto)? {
                let path = entry?.path();
                let is_db = path.extension().is_some_and(|ext| ext == "db");
                if is_backup_name(&path) && is_db && path.is_file() {
                    backups.push(describe(&path, true)?);
                }
            }
        }

        backups.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.path.cmp(&a.path))
        });
        Ok(backups)
    }

    // =========================================================================
    // Restore
    // =========================================================================

    /// Checks that `source` is a restorable backup without touching the live
    /// database. Accepts a backup directory or a bare `.db` file.
    pub fn inspect(&self, source: &Path) -> AppResult<RestoreSource> {
        self.live_path()?;

        let (database, settings) = if source.is_dir() {
            let settings = source.join(SETTINGS_FILE);
            (
                source.join(BACKUP_DATABASE_FILE),
                settings.is_file().then_some(settings),
            )
        } else {
            (source.to_path_buf(), None)
        };

        if !database.is_file() {
            return Err(AppError::backup(format!(
                "No database found in backup: {}",
                source.display()
            )));
        }
        if !has_sqlite_header(&database)? {
            return Err(AppError::backup(format!(
                "Not a SQLite database: {}",
                database.display()
            )));
        }

        Ok(RestoreSource { database, settings })
    }

    fn live_path(&self) -> AppResult<PathBuf> {
        self.db_path
            .clone()
            .ok_or_else(|| AppError::backup("An in-memory database cannot be restored"))
    }

    /// Replaces the live database with a backup.
    ///
    /// Accepts a manual backup directory or a bare `.db` snapshot. The
    /// shell's pool is closed afterwards, so the application has to be
    /// restarted.
    pub async fn restore(&self, source: &Path, actor: &str) -> AppResult<RestoreOutcome> {
        let live = self.live_path()?;
        let RestoreSource { database, settings } = self.inspect(source)?;

        info!(source = ?database, live = ?live, "Restoring database");
        self.db.close().await;

        fs::copy(&database, &live)?;
        for suffix in ["-wal", "-shm"] {
            let stale = sidecar(&live, suffix);
            if stale.exists() {
                fs::remove_file(&stale)?;
            }
        }

        let settings_restored = match settings {
            Some(path) => {
                fs::copy(&path, &self.settings_path)?;
                true
            }
            None => false,
        };

        let restored = Database::new(DbConfig::new(&live).max_connections(1)).await?;
        restored
            .activity()
            .log(&NewActivity::new(
                actor,
                LogAction::Restore,
                Section::Backup,
                format!("Restored backup {}", source.display()),
            ))
            .await?;
        restored.close().await;

        info!(source = ?source, "Restore complete, restart required");
        Ok(RestoreOutcome {
            restored_from: source.to_path_buf(),
            settings_restored,
            restart_required: true,
        })
    }
}

// =============================================================================
// Filesystem Helpers
// =============================================================================

fn is_backup_name(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with(BACKUP_PREFIX))
}

fn sidecar(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

fn has_sqlite_header(path: &Path) -> AppResult<bool> {
    let mut header = [0u8; 16];
    let mut file = fs::File::open(path)?;
    match file.read_exact(&mut header) {
        Ok(()) => Ok(&header == SQLITE_HEADER),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e.into()),
    }
}

fn describe(path: &Path, automatic: bool) -> AppResult<BackupInfo> {
    let metadata = fs::metadata(path)?;
    let size_bytes = if metadata.is_dir() {
        dir_size(path)?
    } else {
        metadata.len()
    };

    Ok(BackupInfo {
        path: path.to_path_buf(),
        automatic,
        created_at: metadata.modified()?.into(),
        size_bytes,
    })
}

/// Copies a directory tree; returns the number of files copied.
fn copy_dir(src: &Path, dst: &Path) -> std::io::Result<usize> {
    fs::create_dir_all(dst)?;
    let mut copied = 0;

    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let target = dst.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copied += copy_dir(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
            copied += 1;
        }
    }

    Ok(copied)
}

fn dir_size(path: &Path) -> std::io::Result<u64> {
    let mut total = 0;
    for entry in fs::read_dir(path)? {
        let entry = entry?;
        let metadata = entry.metadata()?;
        total += if metadata.is_dir() {
            dir_size(&entry.path())?
        } else {
            metadata.len()
        };
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use invpro_core::catalog::NewWarehouse;
    use invpro_core::ActivityFilter;
    use tempfile::TempDir;

    async fn memory_manager(dir: &TempDir) -> (BackupManager, Database, EventBus) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let events = EventBus::new();
        let manager = BackupManager::new(
            db.clone(),
            None,
            dir.path().join("settings.json"),
            dir.path().join("invoices"),
            events.clone(),
        );
        (manager, db, events)
    }

    #[tokio::test]
    async fn test_manual_backup_contents() {
        let dir = TempDir::new().unwrap();
        let (manager, db, events) = memory_manager(&dir).await;
        let mut sub = events.subscribe();

        fs::write(dir.path().join("settings.json"), "{}").unwrap();
        fs::create_dir_all(dir.path().join("invoices").join("2026")).unwrap();
        fs::write(dir.path().join("invoices").join("2026").join("S-1.pdf"), b"%PDF").unwrap();

        let dest = dir.path().join("backups");
        let info = manager.create(&dest, "admin").await.unwrap();

        assert!(!info.automatic);
        assert!(info.path.join("database.db").is_file());
        assert!(info.path.join("settings.json").is_file());
        assert!(info.path.join("invoices").join("2026").join("S-1.pdf").is_file());
        assert!(info.size_bytes > 0);

        let logged = db
            .activity()
            .list(&ActivityFilter {
                action: Some(LogAction::Backup),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(logged.len(), 1);
        assert_eq!(logged[0].user, "admin");

        assert_eq!(
            sub.try_recv(),
            Some(AppEvent::BackupCompleted {
                path: info.path.clone(),
                automatic: false
            })
        );
    }

    #[tokio::test]
    async fn test_auto_backup_skips_same_minute() {
        let dir = TempDir::new().unwrap();
        let (manager, db, _) = memory_manager(&dir).await;

        let first = manager.auto_backup(dir.path()).await.unwrap().unwrap();
        assert!(first.automatic);
        assert!(first.path.starts_with(dir.path().join(AUTO_BACKUP_DIR)));

        // Unless the clock crossed a minute boundary, the second run is a no-op
        let second = manager.auto_backup(dir.path()).await.unwrap();
        if let Some(second) = second {
            assert_ne!(second.path, first.path);
        }

        let entries = db
            .activity()
            .list(&ActivityFilter {
                user: Some(AUTO_BACKUP_ACTOR.to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(!entries.is_empty());
    }

    #[tokio::test]
    async fn test_list_finds_both_kinds() {
        let dir = TempDir::new().unwrap();
        let (manager, _, _) = memory_manager(&dir).await;

        assert!(manager.list(&dir.path().join("nowhere")).unwrap().is_empty());

        manager.create(dir.path(), "admin").await.unwrap();
        manager.auto_backup(dir.path()).await.unwrap();
        fs::create_dir(dir.path().join("unrelated")).unwrap();

        let backups = manager.list(dir.path()).unwrap();
        assert_eq!(backups.len(), 2);
        assert_eq!(backups.iter().filter(|b| b.automatic).count(), 1);
        assert!(backups[0].created_at >= backups[1].created_at);
    }

    #[tokio::test]
    async fn test_restore_refuses_in_memory() {
        let dir = TempDir::new().unwrap();
        let (manager, _, _) = memory_manager(&dir).await;
        let info = manager.create(dir.path(), "admin").await.unwrap();

        let err = manager.restore(&info.path, "admin").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::BackupError);
    }

    #[tokio::test]
    async fn test_restore_replaces_live_database() {
        let dir = TempDir::new().unwrap();
        let live = dir.path().join("inventory.db");
        let settings = dir.path().join("settings.json");
        fs::write(&settings, r#"{"company_name":"Before"}"#).unwrap();

        let db = Database::new(DbConfig::new(&live)).await.unwrap();
        db.warehouses()
            .create(&NewWarehouse::new("Main"), "admin")
            .await
            .unwrap();

        let manager = BackupManager::new(
            db.clone(),
            Some(live.clone()),
            &settings,
            dir.path().join("invoices"),
            EventBus::new(),
        );
        let info = manager.create(&dir.path().join("backups"), "admin").await.unwrap();

        // Diverge after the backup
        db.warehouses()
            .create(&NewWarehouse::new("Annex"), "admin")
            .await
            .unwrap();
        fs::write(&settings, r#"{"company_name":"After"}"#).unwrap();

        let outcome = manager.restore(&info.path, "admin").await.unwrap();
        assert!(outcome.restart_required);
        assert!(outcome.settings_restored);
        assert!(fs::read_to_string(&settings).unwrap().contains("Before"));

        let reopened = Database::new(DbConfig::new(&live)).await.unwrap();
        let names: Vec<String> = reopened
            .warehouses()
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|w| w.name)
            .collect();
        assert_eq!(names, vec!["Main".to_string()]);

        let restores = reopened
            .activity()
            .list(&ActivityFilter {
                action: Some(LogAction::Restore),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(restores.len(), 1);
        reopened.close().await;
    }

    #[tokio::test]
    async fn test_restore_rejects_non_database() {
        let dir = TempDir::new().unwrap();
        let live = dir.path().join("inventory.db");
        let db = Database::new(DbConfig::new(&live)).await.unwrap();
        let manager = BackupManager::new(
            db.clone(),
            Some(live),
            dir.path().join("settings.json"),
            dir.path().join("invoices"),
            EventBus::new(),
        );

        let bogus = dir.path().join("backup_fake.db");
        fs::write(&bogus, "definitely not sqlite").unwrap();

        let err = manager.restore(&bogus, "admin").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::BackupError);
        assert!(manager.inspect(dir.path().join("empty_dir").as_path()).is_err());

        let info = manager.create(&dir.path().join("backups"), "admin").await.unwrap();
        let checked = manager.inspect(&info.path).unwrap();
        assert_eq!(checked.database, info.path.join(BACKUP_DATABASE_FILE));

        // The live pool stays open when nothing was restored
        assert!(db.health_check().await);
        db.close().await;
    }
}
