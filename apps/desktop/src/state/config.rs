//! # Application Configuration
//!
//! Deployment configuration loaded once at startup.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     INVPRO_DB_PATH=/srv/inventory.db                                   │
//! │     INVPRO_TAX_RATE=14                                                 │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/inventory/config.toml (Linux)                            │
//! │     ~/Library/Application Support/com.invpro.inventory/config.toml    │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     platform data dir, 14% sales tax, no negative stock               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Business settings that users edit at runtime (company name, backup
//! folder) live in `settings.json`, see [`super::settings`].
//!
//! ## Configuration File Format
//! ```toml
//! [paths]
//! database = "/srv/invpro/inventory.db"
//! settings = "/srv/invpro/settings.json"
//! invoices = "/srv/invpro/invoices"
//!
//! [sales]
//! tax_rate_bps = 1400
//! allow_negative_stock = false
//!
//! [currency]
//! symbol = "EGP "
//! decimals = 2
//! ```
//!
//! ## Thread Safety
//! Configuration is read-only after startup, so no lock is needed.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use invpro_core::{Rate, DEFAULT_SALES_TAX_BPS};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Default bootstrap password for the `admin` account.
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin";

/// Path value that selects an in-memory database.
pub const IN_MEMORY_DATABASE: &str = ":memory:";

// =============================================================================
// Errors
// =============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("No config path available")]
    NoPath,
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Sections
// =============================================================================

/// File locations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathSettings {
    /// SQLite database file (`:memory:` for a throwaway database).
    #[serde(default = "default_database_path")]
    pub database: PathBuf,

    /// User-editable settings document.
    #[serde(default = "default_settings_path")]
    pub settings: PathBuf,

    /// Generated invoice documents; included in manual backups.
    #[serde(default = "default_invoices_dir")]
    pub invoices: PathBuf,
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "invpro", "inventory")
}

fn data_dir() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

fn default_database_path() -> PathBuf {
    data_dir().join("inventory.db")
}

fn default_settings_path() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.config_dir().join("settings.json"))
        .unwrap_or_else(|| PathBuf::from("settings.json"))
}

fn default_invoices_dir() -> PathBuf {
    data_dir().join("invoices")
}

impl Default for PathSettings {
    fn default() -> Self {
        PathSettings {
            database: default_database_path(),
            settings: default_settings_path(),
            invoices: default_invoices_dir(),
        }
    }
}

/// Sales rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesSettings {
    /// Sales tax in basis points (1400 = 14%).
    #[serde(default = "default_tax_rate_bps")]
    pub tax_rate_bps: u32,

    /// Lets issues, transfers, sales and purchase returns drive stock below zero.
    #[serde(default)]
    pub allow_negative_stock: bool,
}

fn default_tax_rate_bps() -> u32 {
    DEFAULT_SALES_TAX_BPS
}

impl Default for SalesSettings {
    fn default() -> Self {
        SalesSettings {
            tax_rate_bps: default_tax_rate_bps(),
            allow_negative_stock: false,
        }
    }
}

/// Currency display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrencySettings {
    #[serde(default)]
    pub symbol: String,

    #[serde(default = "default_decimals")]
    pub decimals: u8,
}

fn default_decimals() -> u8 {
    2
}

impl Default for CurrencySettings {
    fn default() -> Self {
        CurrencySettings {
            symbol: String::new(),
            decimals: default_decimals(),
        }
    }
}

/// First-start account creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BootstrapSettings {
    /// Password given to `admin` when the users table is empty.
    #[serde(default = "default_admin_password")]
    pub admin_password: String,
}

fn default_admin_password() -> String {
    DEFAULT_ADMIN_PASSWORD.to_string()
}

impl Default for BootstrapSettings {
    fn default() -> Self {
        BootstrapSettings {
            admin_password: default_admin_password(),
        }
    }
}

/// Connection pool sizing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            max_connections: default_max_connections(),
        }
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete deployment configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub paths: PathSettings,

    #[serde(default)]
    pub sales: SalesSettings,

    #[serde(default)]
    pub currency: CurrencySettings,

    #[serde(default)]
    pub bootstrap: BootstrapSettings,

    #[serde(default)]
    pub database: DatabaseSettings,
}

impl AppConfig {
    /// Config rooted in one directory, with an in-memory database.
    ///
    /// Used by tests and throwaway sessions.
    pub fn in_dir(dir: &Path) -> Self {
        AppConfig {
            paths: PathSettings {
                database: PathBuf::from(IN_MEMORY_DATABASE),
                settings: dir.join("settings.json"),
                invoices: dir.join("invoices"),
            },
            ..AppConfig::default()
        }
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (config.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns defaults if loading fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> ConfigResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or(ConfigError::NoPath)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.paths.database.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("paths.database must not be empty".into()));
        }

        if self.sales.tax_rate_bps > 10_000 {
            return Err(ConfigError::Invalid(format!(
                "sales.tax_rate_bps must be at most 10000, got {}",
                self.sales.tax_rate_bps
            )));
        }

        if self.currency.decimals > 4 {
            return Err(ConfigError::Invalid(
                "currency.decimals must be at most 4".into(),
            ));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        if self.bootstrap.admin_password.is_empty() {
            return Err(ConfigError::Invalid(
                "bootstrap.admin_password must not be empty".into(),
            ));
        }

        Ok(())
    }

    /// Applies `INVPRO_*` environment variable overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies overrides from any key lookup.
    ///
    /// ## Keys
    /// - `INVPRO_DB_PATH`
    /// - `INVPRO_SETTINGS_PATH`
    /// - `INVPRO_INVOICES_DIR`
    /// - `INVPRO_TAX_RATE`: percentage, e.g. `14` or `8.25`
    /// - `INVPRO_ALLOW_NEGATIVE_STOCK`: `true`/`false`/`1`/`0`
    /// - `INVPRO_ADMIN_PASSWORD`
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("INVPRO_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.paths.database = PathBuf::from(path);
        }

        if let Some(path) = lookup("INVPRO_SETTINGS_PATH") {
            self.paths.settings = PathBuf::from(path);
        }

        if let Some(path) = lookup("INVPRO_INVOICES_DIR") {
            self.paths.invoices = PathBuf::from(path);
        }

        if let Some(rate) = lookup("INVPRO_TAX_RATE") {
            match rate.trim().parse::<f64>() {
                Ok(pct) if (0.0..=100.0).contains(&pct) => {
                    self.sales.tax_rate_bps = Rate::from_percentage(pct).bps();
                }
                _ => warn!(rate = %rate, "Ignoring invalid tax rate in environment"),
            }
        }

        if let Some(flag) = lookup("INVPRO_ALLOW_NEGATIVE_STOCK") {
            match flag.trim().to_lowercase().as_str() {
                "1" | "true" | "yes" => self.sales.allow_negative_stock = true,
                "0" | "false" | "no" => self.sales.allow_negative_stock = false,
                _ => warn!(value = %flag, "Ignoring invalid negative stock flag in environment"),
            }
        }

        if let Some(password) = lookup("INVPRO_ADMIN_PASSWORD") {
            self.bootstrap.admin_password = password;
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join("config.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Sales tax rate.
    pub fn tax_rate(&self) -> Rate {
        Rate::from_bps(self.sales.tax_rate_bps)
    }

    /// True when the database lives in memory.
    pub fn is_in_memory(&self) -> bool {
        self.paths.database.as_os_str() == IN_MEMORY_DATABASE
    }

    /// True when the `admin` account would be created with the shipped password.
    pub fn uses_default_admin_password(&self) -> bool {
        self.bootstrap.admin_password == DEFAULT_ADMIN_PASSWORD
    }

    /// Formats a cent amount as a currency string.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let config = AppConfig::default();
    /// assert_eq!(config.format_currency(6656), "66.56");
    /// ```
    pub fn format_currency(&self, cents: i64) -> String {
        let decimals = self.currency.decimals;
        let divisor = 10_i64.pow(decimals as u32);
        let whole = cents / divisor;
        let frac = (cents % divisor).abs();

        format!(
            "{}{}{}",
            if cents < 0 { "-" } else { "" },
            self.currency.symbol,
            if decimals > 0 {
                format!("{}.{:0width$}", whole.abs(), frac, width = decimals as usize)
            } else {
                whole.abs().to_string()
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.sales.tax_rate_bps, 1400);
        assert!(!config.sales.allow_negative_stock);
        assert_eq!(config.database.max_connections, 5);
        assert!(config.uses_default_admin_password());
        assert!(config.paths.database.ends_with("inventory.db"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overrides() {
        let mut config = AppConfig::default();
        config.apply_overrides(lookup(&[
            ("INVPRO_DB_PATH", "/tmp/x.db"),
            ("INVPRO_TAX_RATE", "8.25"),
            ("INVPRO_ALLOW_NEGATIVE_STOCK", "true"),
            ("INVPRO_ADMIN_PASSWORD", "s3cret!"),
        ]));

        assert_eq!(config.paths.database, PathBuf::from("/tmp/x.db"));
        assert_eq!(config.sales.tax_rate_bps, 825);
        assert!(config.sales.allow_negative_stock);
        assert!(!config.uses_default_admin_password());
    }

    #[test]
    fn test_invalid_overrides_are_ignored() {
        let mut config = AppConfig::default();
        config.apply_overrides(lookup(&[
            ("INVPRO_TAX_RATE", "lots"),
            ("INVPRO_ALLOW_NEGATIVE_STOCK", "maybe"),
        ]));

        assert_eq!(config.sales.tax_rate_bps, 1400);
        assert!(!config.sales.allow_negative_stock);
    }

    #[test]
    fn test_validation() {
        let mut config = AppConfig::default();
        config.sales.tax_rate_bps = 10_001;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        config.sales.tax_rate_bps = 1400;
        config.database.max_connections = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = AppConfig::in_dir(dir.path());
        config.sales.tax_rate_bps = 1000;
        config.currency.symbol = "EGP ".to_string();
        config.save(Some(path.clone())).unwrap();

        let mut loaded: AppConfig = toml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        loaded.validate().unwrap();
        assert_eq!(loaded.sales.tax_rate_bps, 1000);
        assert_eq!(loaded.format_currency(6656), "EGP 66.56");
        assert!(loaded.is_in_memory());

        // Missing sections fall back to defaults
        std::fs::write(&path, "[sales]\nallow_negative_stock = true\n").unwrap();
        loaded = toml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded.sales.tax_rate_bps, 1400);
        assert!(loaded.sales.allow_negative_stock);
    }

    #[test]
    fn test_load_rejects_bad_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[sales\n").unwrap();

        assert!(matches!(AppConfig::load(Some(path.clone())), Err(ConfigError::Parse(_))));

        let fallback = AppConfig::load_or_default(Some(path));
        assert_eq!(fallback.sales.tax_rate_bps, 1400);
    }

    #[test]
    fn test_format_currency() {
        let config = AppConfig::default();
        assert_eq!(config.format_currency(6656), "66.56");
        assert_eq!(config.format_currency(1), "0.01");
        assert_eq!(config.format_currency(-1234), "-12.34");
        assert_eq!(config.tax_rate(), Rate::from_bps(1400));
    }
}
