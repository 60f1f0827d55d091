//! # Repository Module
//!
//! Database repository implementations for Inventory Pro.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern Explained                         │
//! │                                                                         │
//! │  App command (already authorized)                                      │
//! │       │                                                                 │
//! │       │  db.invoices().create(&draft, tax, "clerk", false)             │
//! │       ▼                                                                 │
//! │  InvoiceRepository                                                     │
//! │  ├── BEGIN                                                             │
//! │  ├── shared helpers: fetch_item, adjust_stock, insert_activity         │
//! │  └── COMMIT                                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Helpers take `&mut SqliteConnection`, so the same code runs on a      │
//! │  pooled connection or inside any repository's transaction.             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ActivityRepository`] - Append-only activity log
//! - [`AnalyticsRepository`] - Dashboard counters and profit
//! - [`AuditRepository`] - Stock counts and corrections
//! - [`InvoiceRepository`] - Sales and purchase invoices
//! - [`ItemRepository`] - Items and the price list
//! - [`LedgerRepository`] - Issue / receive / transfer
//! - [`PartnerRepository`] - Suppliers and customers
//! - [`ReturnRepository`] - Sales and purchase returns
//! - [`RoleRepository`] - Roles and permission sets
//! - [`UserRepository`] - Accounts and authentication
//! - [`WarehouseRepository`] - Warehouses

pub mod activity;
pub mod analytics;
pub mod audit;
pub mod invoice;
pub mod item;
pub mod ledger;
pub mod partner;
pub mod returns;
pub mod role;
pub mod user;
pub mod warehouse;

pub use activity::ActivityRepository;
pub use analytics::{AnalyticsRepository, DashboardSummary};
pub use audit::AuditRepository;
pub use invoice::{InvoiceDetails, InvoiceRepository};
pub use item::ItemRepository;
pub use ledger::LedgerRepository;
pub use partner::PartnerRepository;
pub use returns::ReturnRepository;
pub use role::RoleRepository;
pub use user::UserRepository;
pub use warehouse::WarehouseRepository;
