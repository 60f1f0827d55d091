//! # Backup Commands
//!
//! Manual backups, listing and restore. Restoring needs the `extra`
//! capability and leaves the app needing a restart.

use std::path::Path;

use invpro_core::{Capability, Section};
use tracing::{debug, info, warn};

use crate::backup::{BackupInfo, RestoreOutcome};
use crate::error::{AppError, AppResult};
use crate::state::Session;
use crate::App;

/// Writes a backup directory under `dest_dir`.
pub async fn create_backup(app: &App, session: &Session, dest_dir: &Path) -> AppResult<BackupInfo> {
    debug!(dest = ?dest_dir, "create_backup command");
    let actor = app.authorize(session, Section::Backup, Capability::Add).await?;

    let info = app.backups.create(dest_dir, &actor.username).await?;

    info!(path = ?info.path, size_bytes = info.size_bytes, "Backup created");
    Ok(info)
}

/// Manual and automatic backups found in `dir`, newest first.
pub async fn list_backups(app: &App, session: &Session, dir: &Path) -> AppResult<Vec<BackupInfo>> {
    app.authorize(session, Section::Backup, Capability::View).await?;
    app.backups.list(dir)
}

/// Replaces the live database with a backup.
///
/// The source is checked first; a rejected backup leaves the scheduler and
/// the pool running. On success the scheduler is stopped and the pool
/// closed, and every later command fails until the application is restarted.
pub async fn restore_backup(app: &App, session: &Session, source: &Path) -> AppResult<RestoreOutcome> {
    debug!(source = ?source, "restore_backup command");
    let actor = app.authorize(session, Section::Backup, Capability::Extra).await?;

    if app.db.path().is_none() {
        return Err(AppError::backup("An in-memory database cannot be restored"));
    }
    if !source.exists() {
        return Err(AppError::not_found("Backup", &source.display().to_string()));
    }
    app.backups.inspect(source)?;

    app.stop_scheduler().await?;
    let outcome = app.backups.restore(source, &actor.username).await?;

    warn!(user = %actor.username, source = ?source, "Database restored; restart required");
    Ok(outcome)
}
