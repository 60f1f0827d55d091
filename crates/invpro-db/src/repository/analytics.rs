//! # Analytics Repository
//!
//! Read-only figures for the dashboard and the profit view.

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use crate::repository::invoice::InvoiceRepository;
use crate::repository::returns::ReturnRepository;
use invpro_core::{DateRange, InvoiceKind, InvoiceSummary, ProfitSummary};

/// Number of invoices shown under "recent operations".
pub const RECENT_INVOICE_LIMIT: i64 = 10;

/// Dashboard counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub item_count: i64,
    pub low_stock_count: i64,
    pub warehouse_count: i64,
    pub supplier_count: i64,
    pub customer_count: i64,
    pub sales_invoice_count: i64,
    pub purchase_invoice_count: i64,
    pub recent: Vec<InvoiceSummary>,
}

#[derive(sqlx::FromRow)]
struct CountsRow {
    item_count: i64,
    low_stock_count: i64,
    warehouse_count: i64,
    supplier_count: i64,
    customer_count: i64,
    sales_invoice_count: i64,
    purchase_invoice_count: i64,
}

/// Repository for aggregate reads.
#[derive(Debug, Clone)]
pub struct AnalyticsRepository {
    pool: SqlitePool,
}

impl AnalyticsRepository {
    /// Creates a new AnalyticsRepository.
    pub fn new(pool: SqlitePool) -> Self {
        AnalyticsRepository { pool }
    }

    /// Dashboard counters and the latest invoices.
    pub async fn dashboard(&self) -> DbResult<DashboardSummary> {
        debug!("Loading dashboard summary");

        let counts = sqlx::query_as::<_, CountsRow>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM items) AS item_count,
                (SELECT COUNT(*) FROM items WHERE quantity <= min_quantity) AS low_stock_count,
                (SELECT COUNT(*) FROM warehouses) AS warehouse_count,
                (SELECT COUNT(*) FROM suppliers) AS supplier_count,
                (SELECT COUNT(*) FROM customers) AS customer_count,
                (SELECT COUNT(*) FROM sales_invoices) AS sales_invoice_count,
                (SELECT COUNT(*) FROM purchase_invoices) AS purchase_invoice_count
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        let recent = InvoiceRepository::new(self.pool.clone())
            .recent(RECENT_INVOICE_LIMIT)
            .await?;

        Ok(DashboardSummary {
            item_count: counts.item_count,
            low_stock_count: counts.low_stock_count,
            warehouse_count: counts.warehouse_count,
            supplier_count: counts.supplier_count,
            customer_count: counts.customer_count,
            sales_invoice_count: counts.sales_invoice_count,
            purchase_invoice_count: counts.purchase_invoice_count,
            recent,
        })
    }

    /// Net sales against net purchases for a period.
    pub async fn profit(&self, dates: DateRange) -> DbResult<ProfitSummary> {
        debug!(from = ?dates.from, to = ?dates.to, "Computing profit");

        let invoices = InvoiceRepository::new(self.pool.clone());
        let returns = ReturnRepository::new(self.pool.clone());

        let sales = invoices.total(InvoiceKind::Sales, dates).await?;
        let purchases = invoices.total(InvoiceKind::Purchase, dates).await?;
        let sales_returns = returns.total(InvoiceKind::Sales, dates).await?;
        let purchase_returns = returns.total(InvoiceKind::Purchase, dates).await?;

        Ok(ProfitSummary::new(
            sales.cents(),
            sales_returns.cents(),
            purchases.cents(),
            purchase_returns.cents(),
        ))
    }
}
