//! # Stock Ledger Repository
//!
//! Manual stock movements: issue, receive and transfer.
//!
//! ## Atomic Movement
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                   SINGLE TRANSACTION                                    │
//! │                                                                         │
//! │  1. SELECT item                      (source of truth for the check)   │
//! │  2. transfer only: find or create the same SKU in the destination      │
//! │  3. UPDATE items SET quantity = quantity ± q   (source, then twin)     │
//! │  4. INSERT INTO transactions (...)                                     │
//! │  5. INSERT INTO activity_log (...)                                     │
//! │                                                                         │
//! │  COMMIT ← all five or none                                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::activity::insert_activity;
use crate::repository::item::{adjust_stock, fetch_item, find_by_sku, insert_item};
use crate::repository::warehouse::fetch_warehouse;
use invpro_core::catalog::NewItem;
use invpro_core::ledger::NewTransaction;
use invpro_core::validation::validate_search_query;
use invpro_core::{
    LogAction, NewActivity, Section, StockTransaction, TransactionFilter, TransactionType,
    ValidationError,
};

const TRANSACTION_SELECT: &str = r#"
    SELECT t.id, t.kind, t.item_id, COALESCE(i.name, '') AS item_name, t.quantity,
           t.from_warehouse, t.to_warehouse, t.user, t.notes, t.created_at
    FROM transactions t
    LEFT JOIN items i ON i.id = t.item_id
"#;

async fn fetch_transaction(conn: &mut SqliteConnection, id: i64) -> DbResult<StockTransaction> {
    sqlx::query_as::<_, StockTransaction>(&format!("{} WHERE t.id = ?1", TRANSACTION_SELECT))
        .bind(id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| DbError::not_found("Transaction", id))
}

/// Repository for the stock-movement log.
#[derive(Debug, Clone)]
pub struct LedgerRepository {
    pool: SqlitePool,
}

impl LedgerRepository {
    /// Creates a new LedgerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        LedgerRepository { pool }
    }

    /// Records a movement and applies its stock effect.
    ///
    /// ## Rules
    /// - `from_warehouse` defaults to the item's warehouse and must match it
    /// - `transfer` moves stock to the same SKU in `to_warehouse`, creating
    ///   that item (quantity 0, same name and prices) when it is missing
    /// - removals below zero fail with `InsufficientStock` unless
    ///   `allow_negative` is set
    pub async fn record(
        &self,
        input: &NewTransaction,
        actor: &str,
        allow_negative: bool,
    ) -> DbResult<StockTransaction> {
        let notes = input.validate()?;
        debug!(
            kind = input.kind.as_str(),
            item_id = %input.item_id,
            quantity = %input.quantity,
            "Recording stock movement"
        );

        let mut tx = self.pool.begin().await?;
        let item = fetch_item(&mut tx, input.item_id).await?;

        if let Some(from) = input.from_warehouse {
            if item.warehouse_id != Some(from) {
                return Err(ValidationError::InvalidFormat {
                    field: "source warehouse".to_string(),
                    reason: format!("item '{}' is not stored in warehouse #{}", item.sku, from),
                }
                .into());
            }
        }

        let (from_warehouse, to_warehouse) = match input.kind {
            TransactionType::Issue => (item.warehouse_id, None),
            TransactionType::Receive => (None, item.warehouse_id),
            TransactionType::Transfer => (item.warehouse_id, input.to_warehouse),
        };

        adjust_stock(&mut tx, &item, input.source_delta(), allow_negative).await?;

        if input.kind == TransactionType::Transfer {
            let to = to_warehouse.ok_or_else(|| ValidationError::required("destination warehouse"))?;
            if item.warehouse_id == Some(to) {
                return Err(ValidationError::InvalidFormat {
                    field: "destination warehouse".to_string(),
                    reason: "must differ from the source warehouse".to_string(),
                }
                .into());
            }
            fetch_warehouse(&mut tx, to).await?;

            let twin = match find_by_sku(&mut tx, &item.sku, Some(to)).await? {
                Some(existing) => existing,
                None => {
                    let id = insert_item(
                        &mut tx,
                        &NewItem {
                            name: item.name.clone(),
                            sku: item.sku.clone(),
                            quantity: 0,
                            min_quantity: item.min_quantity,
                            buy_price_cents: item.buy_price_cents,
                            sell_price_cents: item.sell_price_cents,
                            warehouse_id: Some(to),
                        },
                    )
                    .await?;
                    debug!(id = %id, sku = %item.sku, warehouse = %to, "Created item in destination");
                    fetch_item(&mut tx, id).await?
                }
            };

            adjust_stock(&mut tx, &twin, input.quantity, allow_negative).await?;
        }

        let id = sqlx::query(
            r#"
            INSERT INTO transactions (
                kind, item_id, quantity, from_warehouse, to_warehouse, user, notes
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(input.kind)
        .bind(item.id)
        .bind(input.quantity)
        .bind(from_warehouse)
        .bind(to_warehouse)
        .bind(actor)
        .bind(&notes)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        insert_activity(
            &mut tx,
            &NewActivity::new(
                actor,
                LogAction::StockMovement,
                Section::Transactions,
                format!(
                    "{} {} x '{}' ({})",
                    input.kind.as_str(),
                    input.quantity,
                    item.name,
                    item.sku
                ),
            ),
        )
        .await?;

        let recorded = fetch_transaction(&mut tx, id).await?;
        tx.commit().await?;

        info!(id = %id, kind = input.kind.as_str(), "Stock movement recorded");
        Ok(recorded)
    }

    /// Lists movements, newest first.
    ///
    /// ## Filters
    /// - `dates`: inclusive calendar dates
    /// - `kind`: issue / receive / transfer
    /// - `search`: item name, user or notes (case-insensitive)
    pub async fn list(&self, filter: &TransactionFilter) -> DbResult<Vec<StockTransaction>> {
        filter.dates.validate()?;
        let search = validate_search_query(filter.search.as_deref())?;

        let rows = sqlx::query_as::<_, StockTransaction>(&format!(
            r#"
            {}
            WHERE (?1 IS NULL OR date(t.created_at) >= ?1)
              AND (?2 IS NULL OR date(t.created_at) <= ?2)
              AND (?3 IS NULL OR t.kind = ?3)
              AND (?4 IS NULL
                   OR LOWER(COALESCE(i.name, '')) LIKE '%' || LOWER(?4) || '%'
                   OR LOWER(t.user) LIKE '%' || LOWER(?4) || '%'
                   OR LOWER(COALESCE(t.notes, '')) LIKE '%' || LOWER(?4) || '%')
            ORDER BY t.created_at DESC, t.id DESC
            "#,
            TRANSACTION_SELECT
        ))
        .bind(filter.dates.from)
        .bind(filter.dates.to)
        .bind(filter.kind)
        .bind(search)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use crate::{Database, DbConfig, DbError};
    use invpro_core::catalog::{NewItem, NewWarehouse};
    use invpro_core::ledger::NewTransaction;
    use invpro_core::{CoreError, ItemFilter, TransactionFilter, TransactionType};

    async fn setup() -> (Database, i64, i64, i64) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let a = db.warehouses().create(&NewWarehouse::new("A"), "admin").await.unwrap();
        let b = db.warehouses().create(&NewWarehouse::new("B"), "admin").await.unwrap();
        let item = db
            .items()
            .create(
                &NewItem {
                    quantity: 10,
                    min_quantity: 2,
                    buy_price_cents: 300,
                    warehouse_id: Some(a.id),
                    ..NewItem::new("Widget", "WID-01")
                },
                "admin",
            )
            .await
            .unwrap();
        (db, a.id, b.id, item.id)
    }

    #[tokio::test]
    async fn test_issue_and_receive() {
        let (db, a, _, item) = setup().await;

        let issued = db
            .ledger()
            .record(&NewTransaction::issue(item, 4).with_notes("damaged"), "clerk", false)
            .await
            .unwrap();
        assert_eq!(issued.from_warehouse, Some(a));
        assert_eq!(issued.item_name, "Widget");
        assert_eq!(db.items().get(item).await.unwrap().quantity, 6);

        db.ledger()
            .record(&NewTransaction::receive(item, 5), "clerk", false)
            .await
            .unwrap();
        assert_eq!(db.items().get(item).await.unwrap().quantity, 11);
    }

    #[tokio::test]
    async fn test_issue_beyond_stock_is_rejected_without_side_effects() {
        let (db, _, _, item) = setup().await;

        let result = db
            .ledger()
            .record(&NewTransaction::issue(item, 11), "clerk", false)
            .await;
        assert!(matches!(
            result,
            Err(DbError::Domain(CoreError::InsufficientStock { available: 10, requested: 11, .. }))
        ));
        assert_eq!(db.items().get(item).await.unwrap().quantity, 10);
        assert!(db.ledger().list(&TransactionFilter::default()).await.unwrap().is_empty());

        // allowed when configured
        db.ledger()
            .record(&NewTransaction::issue(item, 11), "clerk", true)
            .await
            .unwrap();
        assert_eq!(db.items().get(item).await.unwrap().quantity, -1);
    }

    #[tokio::test]
    async fn test_transfer_creates_destination_item() {
        let (db, _, b, item) = setup().await;

        let moved = db
            .ledger()
            .record(&NewTransaction::transfer(item, 3, b), "clerk", false)
            .await
            .unwrap();
        assert_eq!(moved.kind, TransactionType::Transfer);
        assert_eq!(moved.to_warehouse, Some(b));

        assert_eq!(db.items().get(item).await.unwrap().quantity, 7);

        let in_b = db
            .items()
            .list(&ItemFilter {
                warehouse_id: Some(b),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(in_b.len(), 1);
        assert_eq!(in_b[0].sku, "WID-01");
        assert_eq!(in_b[0].quantity, 3);
        assert_eq!(in_b[0].buy_price_cents, 300);

        // second transfer reuses the twin
        db.ledger()
            .record(&NewTransaction::transfer(item, 2, b), "clerk", false)
            .await
            .unwrap();
        let twin = db.items().get(in_b[0].id).await.unwrap();
        assert_eq!(twin.quantity, 5);
    }

    #[tokio::test]
    async fn test_transfer_rejections() {
        let (db, a, b, item) = setup().await;

        let same = db
            .ledger()
            .record(&NewTransaction::transfer(item, 1, a), "clerk", false)
            .await;
        assert!(same.is_err());

        let mut wrong_source = NewTransaction::transfer(item, 1, a);
        wrong_source.from_warehouse = Some(b);
        assert!(db.ledger().record(&wrong_source, "clerk", false).await.is_err());

        let missing = db
            .ledger()
            .record(&NewTransaction::transfer(item, 1, 999), "clerk", false)
            .await;
        assert!(matches!(missing, Err(DbError::NotFound { .. })));
        assert_eq!(db.items().get(item).await.unwrap().quantity, 10);
    }

    #[tokio::test]
    async fn test_list_filters() {
        let (db, _, b, item) = setup().await;
        db.ledger()
            .record(&NewTransaction::receive(item, 1).with_notes("supplier bonus"), "clerk", false)
            .await
            .unwrap();
        db.ledger()
            .record(&NewTransaction::transfer(item, 1, b), "boss", false)
            .await
            .unwrap();

        let transfers = db
            .ledger()
            .list(&TransactionFilter {
                kind: Some(TransactionType::Transfer),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(transfers.len(), 1);

        let by_notes = db
            .ledger()
            .list(&TransactionFilter {
                search: Some("BONUS".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_notes.len(), 1);

        let by_user = db
            .ledger()
            .list(&TransactionFilter {
                search: Some("boss".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_user[0].kind, TransactionType::Transfer);
    }
}
