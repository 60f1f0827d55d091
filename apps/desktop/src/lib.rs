//! # Inventory Pro Application Shell
//!
//! Everything between a presentation layer and the database: config,
//! settings, sessions, authorization-gated commands, change events and
//! backups.
//!
//! ## Module Organization
//! ```text
//! invpro_desktop_lib/
//! ├── lib.rs          ◄─── You are here (App startup & shutdown)
//! ├── state/
//! │   ├── config.rs   ◄─── config.toml + INVPRO_* overrides
//! │   ├── db.rs       ◄─── Database state wrapper
//! │   ├── events.rs   ◄─── Broadcast event bus
//! │   ├── session.rs  ◄─── Session registry + permission checks
//! │   └── settings.rs ◄─── settings.json store
//! ├── commands/       ◄─── One module per section, all session-gated
//! ├── backup/         ◄─── Manual/auto backups, restore, scheduler
//! └── error.rs        ◄─── AppError for commands
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! use invpro_desktop_lib::{commands, init_tracing, App, AppConfig};
//!
//! init_tracing();
//! let app = App::start(AppConfig::load_or_default(None)).await?;
//! let session = commands::auth::login(&app, "admin", "admin").await?;
//! let summary = commands::dashboard::dashboard_summary(&app, &session).await?;
//! app.shutdown().await?;
//! ```

pub mod backup;
pub mod commands;
pub mod error;
pub mod state;

use std::path::Path;
use std::sync::Mutex;

use invpro_core::{Capability, Section};
use invpro_db::DbError;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use backup::{BackupManager, BackupScheduler, BackupSchedulerHandle};
pub use error::{AppError, AppResult, ErrorCode};
pub use state::{
    Actor, AppConfig, AppEvent, ChangeKind, DbState, EventBus, Session, SessionRegistry, Settings,
    SettingsStore,
};

/// A running application.
///
/// ## Startup Sequence
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │                       Application Startup                               │
/// │                                                                         │
/// │  1. Validate config ──────────────────────────────────────────────────► │
/// │  2. Open database (WAL, foreign keys, migrations) ────────────────────► │
/// │  3. Bootstrap Administrator role + admin account ─────────────────────► │
/// │  4. Load settings.json (written with defaults if missing) ────────────► │
/// │  5. Start the auto-backup scheduler ──────────────────────────────────► │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub struct App {
    pub config: AppConfig,
    pub db: DbState,
    pub events: EventBus,
    pub settings: SettingsStore,
    pub backups: BackupManager,
    pub sessions: SessionRegistry,
    scheduler: Mutex<Option<BackupSchedulerHandle>>,
}

impl App {
    /// Starts the application from a loaded config.
    pub async fn start(config: AppConfig) -> AppResult<Self> {
        config
            .validate()
            .map_err(|e| AppError::settings(e.to_string()))?;

        info!("Starting Inventory Pro");

        let db = DbState::open(&config).await?;

        if db.inner().bootstrap(&config.bootstrap.admin_password).await? {
            if config.uses_default_admin_password() {
                warn!("Created 'admin' with the default password; change it after first login");
            } else {
                info!("Created 'admin' account");
            }
        }

        let events = EventBus::new();
        let settings = SettingsStore::new(&config.paths.settings, events.clone());
        settings.load()?;

        let backups = BackupManager::new(
            db.inner().clone(),
            db.path().map(Path::to_path_buf),
            &config.paths.settings,
            &config.paths.invoices,
            events.clone(),
        );

        let scheduler = BackupScheduler::start(backups.clone(), settings.clone(), events.subscribe());

        info!("Application ready");
        Ok(App {
            config,
            db,
            events,
            settings,
            backups,
            sessions: SessionRegistry::new(),
            scheduler: Mutex::new(Some(scheduler)),
        })
    }

    /// Resolves the session's user and role from the database.
    ///
    /// Fails with `SessionExpired` for a session this app did not issue, one
    /// that was signed out, or one whose user has been deleted.
    pub async fn actor(&self, session: &Session) -> AppResult<Actor> {
        if !self.sessions.is_live(session) {
            warn!(username = %session.username(), "Rejected session that is not live");
            return Err(AppError::session_expired());
        }

        let db = self.db.inner();
        let user = match db.users().get(session.user_id()).await {
            Ok(user) => user,
            Err(DbError::NotFound { .. }) => {
                self.sessions.remove_user(session.user_id());
                warn!(username = %session.username(), "Session user no longer exists");
                return Err(AppError::session_expired());
            }
            Err(e) => return Err(e.into()),
        };
        let role = db.roles().get(user.role_id).await?;

        Ok(Actor::new(&user, &role))
    }

    /// Resolves the session and checks one capability of its current role.
    pub async fn authorize(
        &self,
        session: &Session,
        section: Section,
        capability: Capability,
    ) -> AppResult<Actor> {
        let actor = self.actor(session).await?;
        actor.require(section, capability)?;
        Ok(actor)
    }

    /// True until the auto-backup scheduler has been stopped.
    pub fn scheduler_running(&self) -> bool {
        match self.scheduler.lock() {
            Ok(guard) => guard.is_some(),
            Err(poisoned) => poisoned.into_inner().is_some(),
        }
    }

    /// Stops the auto-backup scheduler. Later calls are no-ops.
    pub async fn stop_scheduler(&self) -> AppResult<()> {
        let handle = match self.scheduler.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };

        match handle {
            Some(handle) => handle.shutdown().await,
            None => Ok(()),
        }
    }

    /// Stops background work and closes the database.
    pub async fn shutdown(self) -> AppResult<()> {
        self.stop_scheduler().await?;
        self.db.inner().close().await;
        info!("Application stopped");
        Ok(())
    }
}

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=invpro=trace` - Show trace for invpro crates only
/// - Default: `info,invpro=debug,sqlx=warn`
///
/// Safe to call more than once; later calls keep the first subscriber.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,invpro=debug,sqlx=warn"));

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}


#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_start_bootstraps_and_writes_settings() {
        let (app, dir) = testing::app().await;

        assert!(dir.path().join("settings.json").is_file());
        assert_eq!(app.db.inner().users().count().await.unwrap(), 1);
        assert_eq!(app.settings.load().unwrap(), Settings::default());

        app.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_start_rejects_invalid_config() {
        let dir = TempDir::new().unwrap();
        let mut config = AppConfig::in_dir(dir.path());
        config.database.max_connections = 0;

        let err = App::start(config).await.err().unwrap();
        assert_eq!(err.code, ErrorCode::SettingsError);
    }

    #[tokio::test]
    async fn test_file_database_survives_restart() {
        let dir = TempDir::new().unwrap();
        let mut config = AppConfig::in_dir(dir.path());
        config.paths.database = dir.path().join("inventory.db");
        config.bootstrap.admin_password = "first-pass".to_string();

        let app = App::start(config.clone()).await.unwrap();
        app.shutdown().await.unwrap();

        // Bootstrap does not touch the existing account
        config.bootstrap.admin_password = "second-pass".to_string();
        let app = App::start(config).await.unwrap();
        assert!(commands::auth::login(&app, "admin", "first-pass").await.is_ok());
        assert!(commands::auth::login(&app, "admin", "second-pass").await.is_err());
        app.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_authorize_reads_current_role() {
        let (app, _dir) = testing::app().await;
        let admin = testing::admin(&app).await;
        let clerk = testing::user_with(
            &app,
            &admin,
            "clerk",
            invpro_core::PermissionSet::all(),
        )
        .await;
        let role_id = testing::actor(&app, &clerk).await.role_id;
        assert!(app.authorize(&clerk, Section::Users, Capability::Delete).await.is_ok());

        // Revoked rights apply to a session that is already signed in
        commands::roles::update_role_permissions(
            &app,
            &admin,
            role_id,
            &invpro_core::PermissionSet::none().with(Section::Items, Capability::View),
        )
        .await
        .unwrap();

        let err = app
            .authorize(&clerk, Section::Users, Capability::Delete)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::PermissionDenied);
        assert!(app.authorize(&clerk, Section::Items, Capability::View).await.is_ok());
    }

    #[tokio::test]
    async fn test_unissued_session_rejected() {
        let (app, _dir) = testing::app().await;
        let user = app.db.inner().users().authenticate("admin", "admin").await.unwrap();

        let minted = Session::start(&user);
        let err = app
            .authorize(&minted, Section::Dashboard, Capability::View)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::SessionExpired);
    }

    #[tokio::test]
    async fn test_scheduler_running_until_stopped() {
        let (app, _dir) = testing::app().await;
        assert!(app.scheduler_running());

        app.stop_scheduler().await.unwrap();
        assert!(!app.scheduler_running());
        app.stop_scheduler().await.unwrap();
    }

    #[test]
    fn test_init_tracing_twice() {
        init_tracing();
        init_tracing();
    }
}
