//! # invpro-db: Database Layer for Inventory Pro
//!
//! SQLite persistence for the inventory system, built on sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Inventory Pro Data Flow                            │
//! │                                                                         │
//! │  App command (create_sales_invoice)                                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     invpro-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ ItemRepo      │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ InvoiceRepo   │    │ 0001_initial │  │   │
//! │  │   │ bootstrap     │    │ LedgerRepo    │    │              │  │   │
//! │  │   │ snapshot_to   │    │ ...           │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (inventory.db)              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool, bootstrap, snapshots
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`password`] - argon2 password hashing
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use invpro_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/inventory.db")).await?;
//! db.bootstrap("admin").await?;
//!
//! let items = db.items().low_stock().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod password;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::{
    ActivityRepository, AnalyticsRepository, AuditRepository, DashboardSummary, InvoiceDetails,
    InvoiceRepository, ItemRepository, LedgerRepository, PartnerRepository, ReturnRepository,
    RoleRepository, UserRepository, WarehouseRepository,
};
