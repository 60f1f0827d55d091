//! # Invoice Repository
//!
//! Sales and purchase invoices. Both flows share one code path keyed by
//! [`InvoiceKind`]; the kind picks the tables, the counterparty and the
//! direction of the stock change.
//!
//! ## Creation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  InvoiceDraft ──► compute(tax) ──► totals     (rejects before any I/O)  │
//! │                                                                         │
//! │  BEGIN                                                                  │
//! │   ├── counterparty exists?                                              │
//! │   ├── per item: SELECT, check, UPDATE quantity ± Σqty                   │
//! │   ├── INSERT header, INSERT lines                                       │
//! │   └── INSERT activity_log                                               │
//! │  COMMIT                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Invoices are never edited or deleted once saved. Corrections go through
//! returns.

use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::activity::insert_activity;
use crate::repository::item::{adjust_stock, fetch_item};
use crate::repository::partner::fetch_partner;
use invpro_core::invoice::InvoiceDraft;
use invpro_core::validation::normalize_optional;
use invpro_core::{
    DateRange, Invoice, InvoiceFilter, InvoiceKind, InvoiceLine, InvoiceSummary, LogAction, Money,
    NewActivity, Rate,
};

/// An invoice header with its lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceDetails {
    pub kind: InvoiceKind,
    pub invoice: Invoice,
    pub lines: Vec<InvoiceLine>,
}

fn header_select(kind: InvoiceKind) -> String {
    format!(
        r#"
        SELECT h.id, h.counterparty_id, COALESCE(c.name, '') AS counterparty_name,
               h.subtotal_cents, h.tax_cents, h.discount_cents, h.shipping_cents,
               h.total_cents, h.user, h.notes, h.created_at
        FROM {} h
        LEFT JOIN {} c ON c.id = h.counterparty_id
        "#,
        kind.header_table(),
        kind.counterparty().table()
    )
}

pub(crate) async fn fetch_invoice(
    conn: &mut SqliteConnection,
    kind: InvoiceKind,
    id: i64,
) -> DbResult<Invoice> {
    sqlx::query_as::<_, Invoice>(&format!("{} WHERE h.id = ?1", header_select(kind)))
        .bind(id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| DbError::not_found(kind.label(), id))
}

async fn fetch_lines(
    conn: &mut SqliteConnection,
    kind: InvoiceKind,
    invoice_id: i64,
) -> DbResult<Vec<InvoiceLine>> {
    let lines = sqlx::query_as::<_, InvoiceLine>(&format!(
        r#"
        SELECT l.id, l.invoice_id, l.item_id,
               COALESCE(i.name, '') AS item_name, COALESCE(i.sku, '') AS sku,
               l.quantity, l.unit_price_cents, l.discount_bps, l.line_total_cents
        FROM {} l
        LEFT JOIN items i ON i.id = l.item_id
        WHERE l.invoice_id = ?1
        ORDER BY l.id
        "#,
        kind.line_table()
    ))
    .bind(invoice_id)
    .fetch_all(conn)
    .await?;

    Ok(lines)
}

/// Repository for sales and purchase invoices.
#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    pool: SqlitePool,
}

impl InvoiceRepository {
    /// Creates a new InvoiceRepository.
    pub fn new(pool: SqlitePool) -> Self {
        InvoiceRepository { pool }
    }

    /// Saves an invoice and applies its stock effect atomically.
    ///
    /// ## Arguments
    /// * `tax_rate` - applied to the subtotal; purchases are normally
    ///   saved with [`Rate::zero`]
    /// * `allow_negative` - let a sale take stock below zero
    ///
    /// ## Returns
    /// * `Err(DbError::Domain(CoreError::InsufficientStock))` - a sales line
    ///   asks for more than is on hand (summed per item across lines)
    /// * `Err(DbError::NotFound)` - unknown counterparty or item
    pub async fn create(
        &self,
        draft: &InvoiceDraft,
        tax_rate: Rate,
        actor: &str,
        allow_negative: bool,
    ) -> DbResult<InvoiceDetails> {
        let kind = draft.kind;
        let totals = draft.compute(tax_rate)?;
        let notes = normalize_optional("notes", draft.notes.as_deref(), 1000)?;

        debug!(
            kind = kind.as_str(),
            counterparty = %draft.counterparty_id,
            lines = draft.lines.len(),
            total = %totals.total,
            "Creating invoice"
        );

        let mut tx = self.pool.begin().await?;

        let counterparty = fetch_partner(&mut tx, kind.counterparty(), draft.counterparty_id).await?;

        for (item_id, quantity) in draft.quantity_by_item() {
            let item = fetch_item(&mut tx, item_id).await?;
            adjust_stock(&mut tx, &item, kind.stock_sign() * quantity, allow_negative).await?;
        }

        let id = sqlx::query(&format!(
            r#"
            INSERT INTO {} (
                counterparty_id, subtotal_cents, tax_cents, discount_cents,
                shipping_cents, total_cents, user, notes
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            kind.header_table()
        ))
        .bind(counterparty.id)
        .bind(totals.subtotal.cents())
        .bind(totals.tax.cents())
        .bind(totals.discount.cents())
        .bind(totals.shipping.cents())
        .bind(totals.total.cents())
        .bind(actor)
        .bind(&notes)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        let insert_line = format!(
            r#"
            INSERT INTO {} (
                invoice_id, item_id, quantity, unit_price_cents, discount_bps, line_total_cents
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            kind.line_table()
        );

        for line in &draft.lines {
            sqlx::query(&insert_line)
                .bind(id)
                .bind(line.item_id)
                .bind(line.quantity)
                .bind(line.unit_price_cents)
                .bind(line.discount_bps)
                .bind(line.line_total().cents())
                .execute(&mut *tx)
                .await?;
        }

        insert_activity(
            &mut tx,
            &NewActivity::new(
                actor,
                LogAction::Create,
                kind.section(),
                format!(
                    "{} #{} for '{}': {} line(s), total {}",
                    kind.label(),
                    id,
                    counterparty.name,
                    draft.lines.len(),
                    totals.total
                ),
            ),
        )
        .await?;

        let invoice = fetch_invoice(&mut tx, kind, id).await?;
        let lines = fetch_lines(&mut tx, kind, id).await?;
        tx.commit().await?;

        info!(kind = kind.as_str(), id = %id, total = %totals.total, "Invoice saved");

        Ok(InvoiceDetails { kind, invoice, lines })
    }

    /// Gets an invoice with its lines.
    pub async fn get(&self, kind: InvoiceKind, id: i64) -> DbResult<InvoiceDetails> {
        let mut conn = self.pool.acquire().await?;
        let invoice = fetch_invoice(&mut conn, kind, id).await?;
        let lines = fetch_lines(&mut conn, kind, id).await?;

        Ok(InvoiceDetails { kind, invoice, lines })
    }

    /// Lists invoice headers, newest first.
    pub async fn list(&self, kind: InvoiceKind, filter: &InvoiceFilter) -> DbResult<Vec<Invoice>> {
        filter.dates.validate()?;

        let invoices = sqlx::query_as::<_, Invoice>(&format!(
            r#"
            {}
            WHERE (?1 IS NULL OR date(h.created_at) >= ?1)
              AND (?2 IS NULL OR date(h.created_at) <= ?2)
              AND (?3 IS NULL OR h.counterparty_id = ?3)
            ORDER BY h.created_at DESC, h.id DESC
            "#,
            header_select(kind)
        ))
        .bind(filter.dates.from)
        .bind(filter.dates.to)
        .bind(filter.counterparty_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(invoices)
    }

    /// Latest invoices of both kinds, newest first.
    pub async fn recent(&self, limit: i64) -> DbResult<Vec<InvoiceSummary>> {
        let rows = sqlx::query_as::<_, InvoiceSummary>(
            r#"
            SELECT 'sales' AS kind, s.id, COALESCE(c.name, '') AS counterparty_name,
                   s.total_cents, s.user, s.created_at
            FROM sales_invoices s
            LEFT JOIN customers c ON c.id = s.counterparty_id
            UNION ALL
            SELECT 'purchase' AS kind, p.id, COALESCE(sp.name, '') AS counterparty_name,
                   p.total_cents, p.user, p.created_at
            FROM purchase_invoices p
            LEFT JOIN suppliers sp ON sp.id = p.counterparty_id
            ORDER BY created_at DESC, id DESC
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Counts invoices of one kind.
    pub async fn count(&self, kind: InvoiceKind) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", kind.header_table()))
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Sum of invoice totals within a date range.
    pub async fn total(&self, kind: InvoiceKind, dates: DateRange) -> DbResult<Money> {
        dates.validate()?;

        let cents: i64 = sqlx::query_scalar(&format!(
            r#"
            SELECT COALESCE(SUM(total_cents), 0) FROM {}
            WHERE (?1 IS NULL OR date(created_at) >= ?1)
              AND (?2 IS NULL OR date(created_at) <= ?2)
            "#,
            kind.header_table()
        ))
        .bind(dates.from)
        .bind(dates.to)
        .fetch_one(&self.pool)
        .await?;

        Ok(Money::from_cents(cents))
    }
}
