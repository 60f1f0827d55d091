//! # Business Settings
//!
//! The user-editable `settings.json` document: company details, logo and
//! backup options. Read on demand, written in full on every update.
//!
//! ```json
//! {
//!   "company_name": "Company Name",
//!   "company_address": "",
//!   "company_phone": "",
//!   "company_email": "",
//!   "logo_path": "",
//!   "backup_path": "",
//!   "auto_backup": false,
//!   "auto_backup_interval": 24
//! }
//! ```
//!
//! Keys missing from an older file are backfilled with their defaults on
//! load.

use std::path::{Path, PathBuf};

use invpro_core::ValidationError;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::events::{AppEvent, EventBus};
use crate::error::{AppError, AppResult};

/// Upper bound for the auto-backup interval (one week).
pub const MAX_AUTO_BACKUP_INTERVAL_HOURS: u32 = 168;

/// Business settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub company_name: String,
    pub company_address: String,
    pub company_phone: String,
    pub company_email: String,
    pub logo_path: String,
    /// Folder for manual and automatic backups; empty disables auto-backup.
    pub backup_path: String,
    pub auto_backup: bool,
    /// Hours between automatic backups.
    pub auto_backup_interval: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            company_name: "Company Name".to_string(),
            company_address: String::new(),
            company_phone: String::new(),
            company_email: String::new(),
            logo_path: String::new(),
            backup_path: String::new(),
            auto_backup: false,
            auto_backup_interval: 24,
        }
    }
}

impl Settings {
    /// Checks value ranges before the file is written.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(1..=MAX_AUTO_BACKUP_INTERVAL_HOURS).contains(&self.auto_backup_interval) {
            return Err(ValidationError::OutOfRange {
                field: "auto_backup_interval".to_string(),
                min: 1,
                max: MAX_AUTO_BACKUP_INTERVAL_HOURS as i64,
            });
        }

        if self.auto_backup && self.backup_path.trim().is_empty() {
            return Err(ValidationError::required("backup_path"));
        }

        Ok(())
    }

    /// Backup folder, when one is configured.
    pub fn backup_dir(&self) -> Option<PathBuf> {
        let path = self.backup_path.trim();
        (!path.is_empty()).then(|| PathBuf::from(path))
    }

    /// True when the scheduler should run.
    pub fn auto_backup_enabled(&self) -> bool {
        self.auto_backup && self.backup_dir().is_some()
    }
}

/// Reads and writes `settings.json`.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
    events: EventBus,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>, events: EventBus) -> Self {
        SettingsStore {
            path: path.into(),
            events,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the settings file, creating it with defaults if missing.
    pub fn load(&self) -> AppResult<Settings> {
        if !self.path.exists() {
            debug!(path = ?self.path, "Settings file missing, writing defaults");
            let settings = Settings::default();
            self.write(&settings)?;
            return Ok(settings);
        }

        let contents = std::fs::read_to_string(&self.path)?;
        let settings: Settings = serde_json::from_str(&contents)?;
        Ok(settings)
    }

    /// Loads, applies `change`, validates and writes the whole file.
    ///
    /// Publishes [`AppEvent::SettingsSaved`] after the write.
    pub fn update<F>(&self, change: F) -> AppResult<Settings>
    where
        F: FnOnce(&mut Settings),
    {
        let mut settings = self.load()?;
        change(&mut settings);
        self.save(settings)
    }

    /// Replaces the whole document.
    pub fn replace(&self, settings: Settings) -> AppResult<Settings> {
        self.save(settings)
    }

    fn save(&self, settings: Settings) -> AppResult<Settings> {
        settings
            .validate()
            .map_err(|e| AppError::validation(e.to_string()))?;

        self.write(&settings)?;
        info!(path = ?self.path, "Settings saved");

        self.events.publish(AppEvent::SettingsSaved);
        Ok(settings)
    }

    fn write(&self, settings: &Settings) -> AppResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(settings)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> (SettingsStore, EventBus) {
        let events = EventBus::new();
        (
            SettingsStore::new(dir.path().join("settings.json"), events.clone()),
            events,
        )
    }

    #[test]
    fn test_load_creates_default_file() {
        let dir = TempDir::new().unwrap();
        let (store, _) = store(&dir);

        let settings = store.load().unwrap();

        assert_eq!(settings, Settings::default());
        assert_eq!(settings.company_name, "Company Name");
        assert!(store.path().exists());
    }

    #[test]
    fn test_missing_keys_are_backfilled() {
        let dir = TempDir::new().unwrap();
        let (store, _) = store(&dir);
        std::fs::write(store.path(), r#"{"company_name": "Acme Trading"}"#).unwrap();

        let settings = store.load().unwrap();

        assert_eq!(settings.company_name, "Acme Trading");
        assert_eq!(settings.auto_backup_interval, 24);
        assert!(!settings.auto_backup);
    }

    #[test]
    fn test_update_writes_and_publishes() {
        let dir = TempDir::new().unwrap();
        let (store, events) = store(&dir);
        let mut sub = events.subscribe();

        store
            .update(|s| {
                s.backup_path = dir.path().display().to_string();
                s.auto_backup = true;
                s.auto_backup_interval = 6;
            })
            .unwrap();

        let reloaded = store.load().unwrap();
        assert!(reloaded.auto_backup_enabled());
        assert_eq!(reloaded.auto_backup_interval, 6);
        assert_eq!(sub.try_recv(), Some(AppEvent::SettingsSaved));
    }

    #[test]
    fn test_invalid_update_is_not_written() {
        let dir = TempDir::new().unwrap();
        let (store, events) = store(&dir);
        let mut sub = events.subscribe();
        store.load().unwrap();

        let err = store.update(|s| s.auto_backup_interval = 0).unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        // Auto-backup without a folder
        assert!(store.update(|s| s.auto_backup = true).is_err());

        assert_eq!(store.load().unwrap(), Settings::default());
        assert_eq!(sub.try_recv(), None);
    }

    #[test]
    fn test_corrupt_file_is_settings_error() {
        let dir = TempDir::new().unwrap();
        let (store, _) = store(&dir);
        std::fs::write(store.path(), "{not json").unwrap();

        assert_eq!(store.load().unwrap_err().code, ErrorCode::SettingsError);
    }
}
