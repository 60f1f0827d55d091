//! # Domain Types
//!
//! Core domain records used throughout Inventory Pro.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌───────────────┐   ┌───────────────┐   ┌───────────────────┐         │
//! │  │  Warehouse    │◄──│     Item      │◄──│ StockTransaction  │         │
//! │  │  name         │   │  sku, qty     │   │ issue / receive / │         │
//! │  │  location     │   │  min_quantity │   │ transfer          │         │
//! │  └───────────────┘   └───────┬───────┘   └───────────────────┘         │
//! │                              │                                          │
//! │  ┌───────────────┐   ┌───────┴───────┐   ┌───────────────────┐         │
//! │  │   Partner     │◄──│   Invoice     │◄──│   ReturnRecord    │         │
//! │  │ supplier /    │   │ sales /       │   │ capped per line   │         │
//! │  │ customer      │   │ purchase      │   │                   │         │
//! │  └───────────────┘   └───────────────┘   └───────────────────┘         │
//! │                                                                         │
//! │  Role ◄── User        ActivityEntry (append-only)    AuditAdjustment   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Ids are SQLite integer row ids. Monetary columns are integer cents.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::money::{Money, Rate};
use crate::permissions::{PermissionSet, Section};

// =============================================================================
// Warehouse
// =============================================================================

/// A storage location. Referenced by items and by transaction from/to fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Warehouse {
    pub id: i64,
    pub name: String,
    pub location: Option<String>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Item
// =============================================================================

/// A stocked item. The same SKU may exist once per warehouse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Item {
    pub id: i64,
    pub name: String,
    pub sku: String,
    /// Current stock.
    pub quantity: i64,
    /// Reorder threshold.
    pub min_quantity: i64,
    pub buy_price_cents: i64,
    pub sell_price_cents: i64,
    pub warehouse_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Item {
    /// Low stock holds iff quantity ≤ min_quantity (equal counts as low).
    #[inline]
    pub fn is_low_stock(&self) -> bool {
        is_low_stock(self.quantity, self.min_quantity)
    }

    #[inline]
    pub fn buy_price(&self) -> Money {
        Money::from_cents(self.buy_price_cents)
    }

    #[inline]
    pub fn sell_price(&self) -> Money {
        Money::from_cents(self.sell_price_cents)
    }
}

/// Low-stock predicate shared by the item list and the dashboard query.
#[inline]
pub const fn is_low_stock(quantity: i64, min_quantity: i64) -> bool {
    quantity <= min_quantity
}

// =============================================================================
// Partners
// =============================================================================

/// Supplier or customer. Both share one record shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartnerKind {
    Supplier,
    Customer,
}

impl PartnerKind {
    /// Backing table name.
    pub const fn table(&self) -> &'static str {
        match self {
            PartnerKind::Supplier => "suppliers",
            PartnerKind::Customer => "customers",
        }
    }

    /// Human-readable entity name for errors and logs.
    pub const fn label(&self) -> &'static str {
        match self {
            PartnerKind::Supplier => "Supplier",
            PartnerKind::Customer => "Customer",
        }
    }
}

/// A supplier or customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Partner {
    pub id: i64,
    pub name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Stock Transactions
// =============================================================================

/// Kind of stock movement outside the invoice flows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    /// Stock leaves the warehouse.
    Issue,
    /// Stock arrives in the warehouse.
    Receive,
    /// Stock moves between two warehouses.
    Transfer,
}

impl TransactionType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Issue => "issue",
            TransactionType::Receive => "receive",
            TransactionType::Transfer => "transfer",
        }
    }
}

/// One row of the append-only stock-movement log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StockTransaction {
    pub id: i64,
    pub kind: TransactionType,
    pub item_id: i64,
    /// Item name at read time (joined).
    pub item_name: String,
    pub quantity: i64,
    pub from_warehouse: Option<i64>,
    pub to_warehouse: Option<i64>,
    pub user: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Invoices
// =============================================================================

/// Sales or purchase. Drives table names, the counterparty kind and the
/// direction of the stock effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum InvoiceKind {
    Sales,
    Purchase,
}

impl InvoiceKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            InvoiceKind::Sales => "sales",
            InvoiceKind::Purchase => "purchase",
        }
    }

    pub const fn header_table(&self) -> &'static str {
        match self {
            InvoiceKind::Sales => "sales_invoices",
            InvoiceKind::Purchase => "purchase_invoices",
        }
    }

    pub const fn line_table(&self) -> &'static str {
        match self {
            InvoiceKind::Sales => "sales_items",
            InvoiceKind::Purchase => "purchase_items",
        }
    }

    pub const fn return_table(&self) -> &'static str {
        match self {
            InvoiceKind::Sales => "sales_returns",
            InvoiceKind::Purchase => "purchase_returns",
        }
    }

    pub const fn return_line_table(&self) -> &'static str {
        match self {
            InvoiceKind::Sales => "sales_return_items",
            InvoiceKind::Purchase => "purchase_return_items",
        }
    }

    pub const fn counterparty(&self) -> PartnerKind {
        match self {
            InvoiceKind::Sales => PartnerKind::Customer,
            InvoiceKind::Purchase => PartnerKind::Supplier,
        }
    }

    /// Permission section guarding invoice creation and viewing.
    pub const fn section(&self) -> Section {
        match self {
            InvoiceKind::Sales => Section::Sales,
            InvoiceKind::Purchase => Section::Purchases,
        }
    }

    /// Sign of the stock change per invoiced unit: sales remove, purchases add.
    pub const fn stock_sign(&self) -> i64 {
        match self {
            InvoiceKind::Sales => -1,
            InvoiceKind::Purchase => 1,
        }
    }

    pub const fn label(&self) -> &'static str {
        match self {
            InvoiceKind::Sales => "Sales invoice",
            InvoiceKind::Purchase => "Purchase invoice",
        }
    }
}

/// A saved invoice header. Terminal once written; amended only by returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Invoice {
    pub id: i64,
    pub counterparty_id: i64,
    /// Counterparty name at read time (joined).
    pub counterparty_name: String,
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub discount_cents: i64,
    pub shipping_cents: i64,
    pub total_cents: i64,
    pub user: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Invoice {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

/// A saved invoice line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct InvoiceLine {
    pub id: i64,
    pub invoice_id: i64,
    pub item_id: i64,
    pub item_name: String,
    pub sku: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub discount_bps: u32,
    pub line_total_cents: i64,
}

impl InvoiceLine {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    #[inline]
    pub fn discount(&self) -> Rate {
        Rate::from_bps(self.discount_bps)
    }
}

/// Header row for cross-kind listings (dashboard "recent operations").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct InvoiceSummary {
    pub kind: InvoiceKind,
    pub id: i64,
    pub counterparty_name: String,
    pub total_cents: i64,
    pub user: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Returns
// =============================================================================

/// A saved sales or purchase return.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ReturnRecord {
    pub id: i64,
    pub invoice_id: i64,
    pub total_cents: i64,
    pub user: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A saved return line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ReturnLine {
    pub id: i64,
    pub return_id: i64,
    pub invoice_line_id: i64,
    pub item_id: i64,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
}

// =============================================================================
// Users & Roles
// =============================================================================

/// A named permission set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Role {
    pub id: i64,
    pub name: String,
    pub permissions: PermissionSet,
    pub created_at: DateTime<Utc>,
}

/// A login account. The password hash never leaves the database layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct User {
    pub id: i64,
    pub username: String,
    pub full_name: String,
    pub role_id: i64,
    pub role_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Activity Log
// =============================================================================

/// What happened, for the activity log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum LogAction {
    Login,
    Logout,
    Create,
    Update,
    Delete,
    StockMovement,
    PriceChange,
    Return,
    AuditAdjustment,
    PasswordChange,
    PermissionChange,
    SettingsChange,
    Backup,
    Restore,
}

impl LogAction {
    pub const fn as_str(&self) -> &'static str {
        match self {
            LogAction::Login => "login",
            LogAction::Logout => "logout",
            LogAction::Create => "create",
            LogAction::Update => "update",
            LogAction::Delete => "delete",
            LogAction::StockMovement => "stock_movement",
            LogAction::PriceChange => "price_change",
            LogAction::Return => "return",
            LogAction::AuditAdjustment => "audit_adjustment",
            LogAction::PasswordChange => "password_change",
            LogAction::PermissionChange => "permission_change",
            LogAction::SettingsChange => "settings_change",
            LogAction::Backup => "backup",
            LogAction::Restore => "restore",
        }
    }
}

/// One append-only activity log row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ActivityEntry {
    pub id: i64,
    pub user: String,
    pub action: LogAction,
    pub section: Section,
    pub details: String,
    pub created_at: DateTime<Utc>,
}

/// An activity entry before it is written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewActivity {
    pub user: String,
    pub action: LogAction,
    pub section: Section,
    pub details: String,
}

impl NewActivity {
    pub fn new(
        user: impl Into<String>,
        action: LogAction,
        section: Section,
        details: impl Into<String>,
    ) -> Self {
        NewActivity {
            user: user.into(),
            action,
            section,
            details: details.into(),
        }
    }
}

/// One applied stock-count correction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct AuditAdjustment {
    pub id: i64,
    pub item_id: i64,
    pub item_name: String,
    pub old_quantity: i64,
    pub new_quantity: i64,
    pub delta: i64,
    pub user: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Profit
// =============================================================================

/// Net figures for a period.
///
/// `profit = (sales − sales returns) − (purchases − purchase returns)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProfitSummary {
    pub sales_cents: i64,
    pub sales_returns_cents: i64,
    pub purchases_cents: i64,
    pub purchase_returns_cents: i64,
    pub profit_cents: i64,
}

impl ProfitSummary {
    pub fn new(sales: i64, sales_returns: i64, purchases: i64, purchase_returns: i64) -> Self {
        ProfitSummary {
            sales_cents: sales,
            sales_returns_cents: sales_returns,
            purchases_cents: purchases,
            purchase_returns_cents: purchase_returns,
            profit_cents: (sales - sales_returns) - (purchases - purchase_returns),
        }
    }

    #[inline]
    pub fn profit(&self) -> Money {
        Money::from_cents(self.profit_cents)
    }
}

// =============================================================================
// Filters
// =============================================================================

/// Inclusive calendar-date range. Either end may be open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        DateRange { from, to }
    }

    /// Rejects ranges whose start is after their end.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let (Some(from), Some(to)) = (self.from, self.to) {
            if from > to {
                return Err(ValidationError::InvalidFormat {
                    field: "date range".to_string(),
                    reason: format!("{} is after {}", from, to),
                });
            }
        }
        Ok(())
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from.map_or(true, |f| date >= f) && self.to.map_or(true, |t| date <= t)
    }
}

/// Item list filter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemFilter {
    /// Matched against name and SKU (case-insensitive substring).
    pub search: Option<String>,
    pub warehouse_id: Option<i64>,
    pub low_stock_only: bool,
}

/// Stock-transaction list filter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransactionFilter {
    pub dates: DateRange,
    pub kind: Option<TransactionType>,
    /// Matched against item name, user and notes.
    pub search: Option<String>,
}

/// Activity log filter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivityFilter {
    pub user: Option<String>,
    pub section: Option<Section>,
    pub action: Option<LogAction>,
    pub dates: DateRange,
    /// Matched against details.
    pub search: Option<String>,
}

/// Invoice list filter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InvoiceFilter {
    pub dates: DateRange,
    pub counterparty_id: Option<i64>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_low_stock_boundary() {
        assert!(is_low_stock(5, 5));
        assert!(is_low_stock(4, 5));
        assert!(!is_low_stock(6, 5));
        assert!(is_low_stock(0, 0));
        assert!(is_low_stock(-1, 0));
    }

    #[test]
    fn test_low_stock_exhaustive_small_grid() {
        for qty in -3..=10 {
            for min in -3..=10 {
                assert_eq!(is_low_stock(qty, min), qty <= min, "qty={qty} min={min}");
            }
        }
    }

    #[test]
    fn test_invoice_kind_routing() {
        assert_eq!(InvoiceKind::Sales.counterparty(), PartnerKind::Customer);
        assert_eq!(InvoiceKind::Purchase.counterparty(), PartnerKind::Supplier);
        assert_eq!(InvoiceKind::Sales.stock_sign(), -1);
        assert_eq!(InvoiceKind::Purchase.stock_sign(), 1);
        assert_eq!(InvoiceKind::Purchase.line_table(), "purchase_items");
    }

    #[test]
    fn test_profit_nets_out_returns() {
        let summary = ProfitSummary::new(10_000, 1_000, 6_000, 500);
        assert_eq!(summary.profit_cents, 9_000 - 5_500);
        assert_eq!(summary.profit().to_string(), "35.00");
    }

    #[test]
    fn test_date_range() {
        let d = |s: &str| NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap();

        let range = DateRange::new(Some(d("2026-01-01")), Some(d("2026-01-31")));
        assert!(range.validate().is_ok());
        assert!(range.contains(d("2026-01-01")));
        assert!(range.contains(d("2026-01-31")));
        assert!(!range.contains(d("2026-02-01")));

        assert!(DateRange::default().contains(d("1999-12-31")));
        assert!(DateRange::new(Some(d("2026-02-01")), Some(d("2026-01-01")))
            .validate()
            .is_err());
    }
}
