//! # Item Repository
//!
//! Database operations for stocked items and the price list.
//!
//! ## Stock Changes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Who Changes item.quantity?                           │
//! │                                                                         │
//! │  ledger (issue/receive/transfer) ──┐                                    │
//! │  invoices (sale −, purchase +)   ──┼──► adjust_stock(conn, item, Δ)    │
//! │  returns (sale +, purchase −)    ──┘        │                           │
//! │                                             ├── Δ < 0: check_removal    │
//! │                                             └── quantity = quantity + Δ │
//! │                                                                         │
//! │  audit ──► set_stock(conn, item, counted)   (absolute, logged apart)    │
//! │                                                                         │
//! │  All callers hold an open transaction; nothing here commits.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::activity::insert_activity;
use invpro_core::catalog::{ItemChanges, NewItem, PriceChange};
use invpro_core::ledger::check_removal;
use invpro_core::validation::validate_search_query;
use invpro_core::{Item, ItemFilter, LogAction, Money, NewActivity, Section};

const ITEM_COLUMNS: &str = "id, name, sku, quantity, min_quantity, buy_price_cents, \
    sell_price_cents, warehouse_id, created_at, updated_at";

// =============================================================================
// Shared Helpers (transaction-scoped)
// =============================================================================

pub(crate) async fn fetch_item(conn: &mut SqliteConnection, id: i64) -> DbResult<Item> {
    sqlx::query_as::<_, Item>(&format!("SELECT {} FROM items WHERE id = ?1", ITEM_COLUMNS))
        .bind(id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| DbError::not_found("Item", id))
}

pub(crate) async fn find_by_sku(
    conn: &mut SqliteConnection,
    sku: &str,
    warehouse_id: Option<i64>,
) -> DbResult<Option<Item>> {
    let item = sqlx::query_as::<_, Item>(&format!(
        "SELECT {} FROM items WHERE sku = ?1 AND warehouse_id IS ?2",
        ITEM_COLUMNS
    ))
    .bind(sku)
    .bind(warehouse_id)
    .fetch_optional(conn)
    .await?;

    Ok(item)
}

pub(crate) async fn insert_item(conn: &mut SqliteConnection, item: &NewItem) -> DbResult<i64> {
    let id = sqlx::query(
        r#"
        INSERT INTO items (
            name, sku, quantity, min_quantity,
            buy_price_cents, sell_price_cents, warehouse_id
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(&item.name)
    .bind(&item.sku)
    .bind(item.quantity)
    .bind(item.min_quantity)
    .bind(item.buy_price_cents)
    .bind(item.sell_price_cents)
    .bind(item.warehouse_id)
    .execute(conn)
    .await?
    .last_insert_rowid();

    Ok(id)
}

/// Applies a relative stock change.
///
/// Decrements are checked against the item's quantity as read by the caller
/// in the same transaction, unless `allow_negative` is set.
pub(crate) async fn adjust_stock(
    conn: &mut SqliteConnection,
    item: &Item,
    delta: i64,
    allow_negative: bool,
) -> DbResult<()> {
    debug!(id = %item.id, delta = %delta, "Adjusting stock");

    if delta < 0 {
        check_removal(&item.sku, item.quantity, -delta, allow_negative)?;
    }

    let result = sqlx::query(
        r#"
        UPDATE items
        SET quantity = quantity + ?2,
            updated_at = CURRENT_TIMESTAMP
        WHERE id = ?1
        "#,
    )
    .bind(item.id)
    .bind(delta)
    .execute(conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Item", item.id));
    }

    Ok(())
}

/// Sets stock to an absolute value (audit).
pub(crate) async fn set_stock(conn: &mut SqliteConnection, item_id: i64, quantity: i64) -> DbResult<()> {
    let result = sqlx::query(
        "UPDATE items SET quantity = ?2, updated_at = CURRENT_TIMESTAMP WHERE id = ?1",
    )
    .bind(item_id)
    .bind(quantity)
    .execute(conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Item", item_id));
    }

    Ok(())
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for item database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.items();
///
/// let low = repo.low_stock().await?;
/// let widget = repo.get(7).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ItemRepository {
    pool: SqlitePool,
}

impl ItemRepository {
    /// Creates a new ItemRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ItemRepository { pool }
    }

    /// Lists items by name.
    ///
    /// ## Filters
    /// - `search`: case-insensitive substring of name or SKU
    /// - `warehouse_id`: exact match
    /// - `low_stock_only`: quantity ≤ min_quantity
    pub async fn list(&self, filter: &ItemFilter) -> DbResult<Vec<Item>> {
        let search = validate_search_query(filter.search.as_deref())?;
        debug!(search = ?search, warehouse = ?filter.warehouse_id, "Listing items");

        let items = sqlx::query_as::<_, Item>(&format!(
            r#"
            SELECT {}
            FROM items
            WHERE (?1 IS NULL
                   OR LOWER(name) LIKE '%' || LOWER(?1) || '%'
                   OR LOWER(sku) LIKE '%' || LOWER(?1) || '%')
              AND (?2 IS NULL OR warehouse_id = ?2)
              AND (?3 = 0 OR quantity <= min_quantity)
            ORDER BY name, id
            "#,
            ITEM_COLUMNS
        ))
        .bind(search)
        .bind(filter.warehouse_id)
        .bind(filter.low_stock_only)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Items at or below their reorder threshold.
    pub async fn low_stock(&self) -> DbResult<Vec<Item>> {
        self.list(&ItemFilter {
            low_stock_only: true,
            ..Default::default()
        })
        .await
    }

    /// Gets an item by ID.
    pub async fn get(&self, id: i64) -> DbResult<Item> {
        let mut conn = self.pool.acquire().await?;
        fetch_item(&mut conn, id).await
    }

    /// Creates an item with its opening stock.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - SKU already exists in that warehouse
    pub async fn create(&self, input: &NewItem, actor: &str) -> DbResult<Item> {
        let input = input.normalized()?;
        debug!(sku = %input.sku, "Creating item");

        let mut tx = self.pool.begin().await?;

        let id = insert_item(&mut tx, &input).await?;

        insert_activity(
            &mut tx,
            &NewActivity::new(
                actor,
                LogAction::Create,
                Section::Items,
                format!(
                    "Created item '{}' (SKU {}, opening stock {})",
                    input.name, input.sku, input.quantity
                ),
            ),
        )
        .await?;

        let item = fetch_item(&mut tx, id).await?;
        tx.commit().await?;

        Ok(item)
    }

    /// Edits name, SKU, reorder threshold and warehouse.
    pub async fn update(&self, id: i64, changes: &ItemChanges, actor: &str) -> DbResult<Item> {
        let changes = changes.normalized()?;
        debug!(id = %id, "Updating item");

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE items SET
                name = ?2,
                sku = ?3,
                min_quantity = ?4,
                warehouse_id = ?5,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(&changes.name)
        .bind(&changes.sku)
        .bind(changes.min_quantity)
        .bind(changes.warehouse_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Item", id));
        }

        insert_activity(
            &mut tx,
            &NewActivity::new(
                actor,
                LogAction::Update,
                Section::Items,
                format!("Updated item #{} '{}' (SKU {})", id, changes.name, changes.sku),
            ),
        )
        .await?;

        let item = fetch_item(&mut tx, id).await?;
        tx.commit().await?;

        Ok(item)
    }

    /// Updates buy and/or sell price, logging old → new.
    pub async fn update_prices(&self, id: i64, change: &PriceChange, actor: &str) -> DbResult<Item> {
        change.validate()?;
        debug!(id = %id, "Updating prices");

        let mut tx = self.pool.begin().await?;
        let before = fetch_item(&mut tx, id).await?;

        let buy = change.buy_price_cents.unwrap_or(before.buy_price_cents);
        let sell = change.sell_price_cents.unwrap_or(before.sell_price_cents);

        sqlx::query(
            r#"
            UPDATE items SET
                buy_price_cents = ?2,
                sell_price_cents = ?3,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(buy)
        .bind(sell)
        .execute(&mut *tx)
        .await?;

        insert_activity(
            &mut tx,
            &NewActivity::new(
                actor,
                LogAction::PriceChange,
                Section::PriceList,
                format!(
                    "Prices of '{}' ({}): buy {} -> {}, sell {} -> {}",
                    before.name,
                    before.sku,
                    before.buy_price(),
                    Money::from_cents(buy),
                    before.sell_price(),
                    Money::from_cents(sell)
                ),
            ),
        )
        .await?;

        let item = fetch_item(&mut tx, id).await?;
        tx.commit().await?;

        Ok(item)
    }

    /// Counts items.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM items")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Counts items at or below their reorder threshold.
    pub async fn low_stock_count(&self) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM items WHERE quantity <= min_quantity")
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }
}
