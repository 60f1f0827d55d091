//! # invpro-core: Pure Business Logic for Inventory Pro
//!
//! This crate is the **heart** of Inventory Pro. It contains the stock,
//! invoice, return, audit and permission rules as pure functions with zero
//! I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Inventory Pro Architecture                         │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Presentation (pages, dialogs)                   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │            App Shell Commands (apps/desktop)                    │   │
//! │  │    session check ──► validate ──► db transaction ──► event      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ invpro-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌───────────┐ │   │
//! │  │  │  money  │ │ invoice │ │ returns │ │  audit  │ │permissions│ │   │
//! │  │  │  Money  │ │ Totals  │ │  Plan   │ │  Sheet  │ │  has()    │ │   │
//! │  │  └─────────┘ └─────────┘ └─────────┘ └─────────┘ └───────────┘ │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 invpro-db (Database Layer)                      │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain records (Item, Warehouse, Partner, Invoice, ...)
//! - [`money`] - Money and rate types with integer arithmetic
//! - [`invoice`] - Invoice drafts and total calculation
//! - [`returns`] - Return planning against original invoice lines
//! - [`audit`] - Stock-count sheets and adjustment diffs
//! - [`ledger`] - Stock movement rules for issue/receive/transfer
//! - [`catalog`] - Form inputs for items, warehouses, partners and users
//! - [`permissions`] - Sections, capabilities and role permission sets
//! - [`validation`] - Input validation rules
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use invpro_core::money::{Money, Rate};
//!
//! let subtotal = Money::from_cents(5400); // 54.00
//! let tax = subtotal.calculate_tax(Rate::from_bps(1400)); // 14%
//! assert_eq!(tax.cents(), 756);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod audit;
pub mod catalog;
pub mod error;
pub mod invoice;
pub mod ledger;
pub mod money;
pub mod permissions;
pub mod returns;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::{Money, Rate};
pub use permissions::{Capability, PermissionSet, Section};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Sales tax applied to every sales invoice unless configured otherwise (14%).
pub const DEFAULT_SALES_TAX_BPS: u32 = 1400;

/// Maximum quantity on a single invoice, return or transaction line.
///
/// ## Business Reason
/// Prevents typing 100000 instead of 10000 on a line.
pub const MAX_LINE_QUANTITY: i64 = 99_999;

/// Maximum number of lines on one invoice.
pub const MAX_INVOICE_LINES: usize = 500;

/// Largest price or amount accepted in cents (100 000 000.00).
///
/// A full invoice at this price, `MAX_LINE_QUANTITY` and `MAX_INVOICE_LINES`
/// with 100% tax totals about 1e18 cents, which stays inside `i64`.
pub const MAX_PRICE_CENTS: i64 = 10_000_000_000;

/// Name of the role created on first start.
pub const ADMIN_ROLE_NAME: &str = "Administrator";

/// Username of the account created on first start.
pub const ADMIN_USERNAME: &str = "admin";

/// Actor recorded in the activity log for scheduled backups.
pub const AUTO_BACKUP_ACTOR: &str = "Auto-Backup";
