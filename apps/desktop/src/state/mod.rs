//! # State Module
//!
//! Application state owned by the shell.
//!
//! ## Multiple Focused State Types
//! Instead of one struct holding everything, each concern has its own type
//! and commands reach for exactly the one they need.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    State Architecture                                   │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                           App                                   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │          │              │               │               │               │
//! │          ▼              ▼               ▼               ▼               │
//! │  ┌────────────┐ ┌──────────────┐ ┌──────────────┐ ┌──────────────┐     │
//! │  │  DbState   │ │  AppConfig   │ │SettingsStore │ │  EventBus    │     │
//! │  │            │ │              │ │              │ │              │     │
//! │  │  Database  │ │  tax rate    │ │ settings.json│ │  broadcast   │     │
//! │  │  (pool)    │ │  paths       │ │ company info │ │  channel     │     │
//! │  └────────────┘ └──────────────┘ └──────────────┘ └──────────────┘     │
//! │                                                                         │
//! │  Session: per sign-in, checked against SessionRegistry per command     │
//! │                                                                         │
//! │  THREAD SAFETY:                                                        │
//! │  • DbState: Database has internal connection pool (thread-safe)        │
//! │  • AppConfig: Read-only after startup                                  │
//! │  • SettingsStore: whole-file read/write per call                       │
//! │  • EventBus: cloneable sender, one receiver per subscriber             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod db;
mod events;
mod session;
mod settings;

pub use config::{
    AppConfig, BootstrapSettings, ConfigError, ConfigResult, CurrencySettings, DatabaseSettings,
    PathSettings, SalesSettings, DEFAULT_ADMIN_PASSWORD, IN_MEMORY_DATABASE,
};
pub use db::DbState;
pub use events::{AppEvent, ChangeKind, Delivery, EventBus, Subscription, EVENT_BUS_CAPACITY};
pub use session::{Actor, Session, SessionRegistry};
pub use settings::{Settings, SettingsStore, MAX_AUTO_BACKUP_INTERVAL_HOURS};
