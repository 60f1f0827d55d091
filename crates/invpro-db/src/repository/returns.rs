//! # Return Repository
//!
//! Sales and purchase returns against saved invoices.
//!
//! ## Stock Direction
//! ```text
//! ┌───────────────────────────────┬──────────────────────────────────────┐
//! │  invoice                      │  return                              │
//! ├───────────────────────────────┼──────────────────────────────────────┤
//! │  sale      stock −= q         │  sales return     stock += q         │
//! │  purchase  stock += q         │  purchase return  stock −= q         │
//! └───────────────────────────────┴──────────────────────────────────────┘
//! ```
//!
//! Returned quantities are summed per invoice line over every earlier
//! return, so a line can be returned in several steps but never beyond
//! what was invoiced.

use std::collections::BTreeMap;

use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::activity::insert_activity;
use crate::repository::invoice::fetch_invoice;
use crate::repository::item::{adjust_stock, fetch_item};
use invpro_core::returns::{plan_return, ReturnRequest, ReturnableLine};
use invpro_core::{
    DateRange, InvoiceKind, LogAction, Money, NewActivity, ReturnLine, ReturnRecord, Section,
};

async fn load_returnable(
    conn: &mut SqliteConnection,
    kind: InvoiceKind,
    invoice_id: i64,
) -> DbResult<Vec<ReturnableLine>> {
    let lines = sqlx::query_as::<_, ReturnableLine>(&format!(
        r#"
        SELECT l.id AS line_id, l.item_id, COALESCE(i.name, '') AS item_name,
               l.quantity AS invoiced,
               COALESCE((SELECT SUM(r.quantity) FROM {returns} r
                         WHERE r.invoice_line_id = l.id), 0) AS already_returned,
               l.unit_price_cents
        FROM {lines} l
        LEFT JOIN items i ON i.id = l.item_id
        WHERE l.invoice_id = ?1
        ORDER BY l.id
        "#,
        returns = kind.return_line_table(),
        lines = kind.line_table()
    ))
    .bind(invoice_id)
    .fetch_all(conn)
    .await?;

    Ok(lines)
}

async fn fetch_return(conn: &mut SqliteConnection, kind: InvoiceKind, id: i64) -> DbResult<ReturnRecord> {
    sqlx::query_as::<_, ReturnRecord>(&format!(
        "SELECT id, invoice_id, total_cents, user, notes, created_at FROM {} WHERE id = ?1",
        kind.return_table()
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| DbError::not_found("Return", id))
}

/// Repository for sales and purchase returns.
#[derive(Debug, Clone)]
pub struct ReturnRepository {
    pool: SqlitePool,
}

impl ReturnRepository {
    /// Creates a new ReturnRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ReturnRepository { pool }
    }

    /// Lines of an invoice with the quantity still open for return.
    pub async fn returnable_lines(&self, kind: InvoiceKind, invoice_id: i64) -> DbResult<Vec<ReturnableLine>> {
        let mut conn = self.pool.acquire().await?;
        fetch_invoice(&mut conn, kind, invoice_id).await?;
        load_returnable(&mut conn, kind, invoice_id).await
    }

    /// Saves a return and reverses its stock effect.
    ///
    /// ## Returns
    /// * `Err(DbError::Domain(CoreError::ReturnExceedsInvoiced))` - a line
    ///   would be returned beyond its invoiced quantity
    /// * `Err(DbError::Domain(CoreError::UnknownInvoiceLine))` - a line id
    ///   belongs to another invoice
    /// * `Err(DbError::Domain(CoreError::InsufficientStock))` - a purchase
    ///   return would take stock below zero
    pub async fn create(
        &self,
        request: &ReturnRequest,
        actor: &str,
        allow_negative: bool,
    ) -> DbResult<ReturnRecord> {
        let kind = request.kind;
        debug!(
            kind = kind.as_str(),
            invoice_id = %request.invoice_id,
            lines = request.lines.len(),
            "Creating return"
        );

        let mut tx = self.pool.begin().await?;

        fetch_invoice(&mut tx, kind, request.invoice_id).await?;
        let returnable = load_returnable(&mut tx, kind, request.invoice_id).await?;
        let plan = plan_return(request, &returnable)?;

        let mut per_item: BTreeMap<i64, i64> = BTreeMap::new();
        for line in &plan.lines {
            *per_item.entry(line.item_id).or_insert(0) += line.quantity;
        }

        for (item_id, quantity) in per_item {
            let item = fetch_item(&mut tx, item_id).await?;
            adjust_stock(&mut tx, &item, -kind.stock_sign() * quantity, allow_negative).await?;
        }

        let id = sqlx::query(&format!(
            "INSERT INTO {} (invoice_id, total_cents, user, notes) VALUES (?1, ?2, ?3, ?4)",
            kind.return_table()
        ))
        .bind(request.invoice_id)
        .bind(plan.total.cents())
        .bind(actor)
        .bind(&plan.notes)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        let insert_line = format!(
            r#"
            INSERT INTO {} (
                return_id, invoice_line_id, item_id, quantity, unit_price_cents, line_total_cents
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            kind.return_line_table()
        );

        for line in &plan.lines {
            sqlx::query(&insert_line)
                .bind(id)
                .bind(line.invoice_line_id)
                .bind(line.item_id)
                .bind(line.quantity)
                .bind(line.unit_price_cents)
                .bind(line.line_total_cents)
                .execute(&mut *tx)
                .await?;
        }

        insert_activity(
            &mut tx,
            &NewActivity::new(
                actor,
                LogAction::Return,
                Section::Returns,
                format!(
                    "Return #{} against {} #{}: {} line(s), total {}",
                    id,
                    kind.label().to_lowercase(),
                    request.invoice_id,
                    plan.lines.len(),
                    plan.total
                ),
            ),
        )
        .await?;

        let record = fetch_return(&mut tx, kind, id).await?;
        tx.commit().await?;

        info!(kind = kind.as_str(), id = %id, total = %plan.total, "Return saved");
        Ok(record)
    }

    /// Lines of a saved return.
    pub async fn lines(&self, kind: InvoiceKind, return_id: i64) -> DbResult<Vec<ReturnLine>> {
        let lines = sqlx::query_as::<_, ReturnLine>(&format!(
            r#"
            SELECT id, return_id, invoice_line_id, item_id, quantity,
                   unit_price_cents, line_total_cents
            FROM {}
            WHERE return_id = ?1
            ORDER BY id
            "#,
            kind.return_line_table()
        ))
        .bind(return_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(lines)
    }

    /// Lists returns of one kind, newest first.
    pub async fn list(&self, kind: InvoiceKind) -> DbResult<Vec<ReturnRecord>> {
        let records = sqlx::query_as::<_, ReturnRecord>(&format!(
            r#"
            SELECT id, invoice_id, total_cents, user, notes, created_at
            FROM {}
            ORDER BY created_at DESC, id DESC
            "#,
            kind.return_table()
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// Sum of return totals within a date range.
    pub async fn total(&self, kind: InvoiceKind, dates: DateRange) -> DbResult<Money> {
        dates.validate()?;

        let cents: i64 = sqlx::query_scalar(&format!(
            r#"
            SELECT COALESCE(SUM(total_cents), 0) FROM {}
            WHERE (?1 IS NULL OR date(created_at) >= ?1)
              AND (?2 IS NULL OR date(created_at) <= ?2)
            "#,
            kind.return_table()
        ))
        .bind(dates.from)
        .bind(dates.to)
        .fetch_one(&self.pool)
        .await?;

        Ok(Money::from_cents(cents))
    }
}
