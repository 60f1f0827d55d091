//! # Stock Audit Repository
//!
//! Physical count reconciliation. A sheet is built from current stock, the
//! counter fills in what is on the shelf, and `apply` overwrites the system
//! quantities for every row that differs, one history row per change.

use std::collections::BTreeMap;

use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::DbResult;
use crate::repository::activity::insert_activity;
use crate::repository::item::{fetch_item, set_stock, ItemRepository};
use invpro_core::audit::{plan_adjustments, AuditSheet, StockAdjustment};
use invpro_core::{AuditAdjustment, ItemFilter, LogAction, NewActivity, Section};

/// Repository for stock counts.
#[derive(Debug, Clone)]
pub struct AuditRepository {
    pool: SqlitePool,
}

impl AuditRepository {
    /// Creates a new AuditRepository.
    pub fn new(pool: SqlitePool) -> Self {
        AuditRepository { pool }
    }

    /// Builds a count sheet, optionally for one warehouse.
    pub async fn sheet(&self, warehouse_id: Option<i64>) -> DbResult<AuditSheet> {
        let items = ItemRepository::new(self.pool.clone())
            .list(&ItemFilter {
                warehouse_id,
                ..Default::default()
            })
            .await?;

        Ok(AuditSheet::from_items(&items))
    }

    /// Writes counted quantities.
    ///
    /// Quantities are re-read inside the transaction, so a sale saved
    /// between building the sheet and applying it is reflected in the
    /// recorded `old_quantity`. Counts equal to the current stock are
    /// skipped.
    pub async fn apply(&self, counted: &BTreeMap<i64, i64>, actor: &str) -> DbResult<Vec<StockAdjustment>> {
        debug!(items = counted.len(), "Applying stock count");

        let mut tx = self.pool.begin().await?;

        let mut current = Vec::with_capacity(counted.len());
        for &item_id in counted.keys() {
            let item = fetch_item(&mut tx, item_id).await?;
            current.push((item.id, item.quantity));
        }

        let adjustments = plan_adjustments(counted, &current)?;

        for adj in &adjustments {
            set_stock(&mut tx, adj.item_id, adj.new_quantity).await?;

            sqlx::query(
                r#"
                INSERT INTO audit_adjustments (item_id, old_quantity, new_quantity, delta, user)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )
            .bind(adj.item_id)
            .bind(adj.old_quantity)
            .bind(adj.new_quantity)
            .bind(adj.delta)
            .bind(actor)
            .execute(&mut *tx)
            .await?;
        }

        if !adjustments.is_empty() {
            let net: i64 = adjustments.iter().map(|a| a.delta).sum();
            insert_activity(
                &mut tx,
                &NewActivity::new(
                    actor,
                    LogAction::AuditAdjustment,
                    Section::Audit,
                    format!("Stock count applied: {} item(s) corrected, net {:+}", adjustments.len(), net),
                ),
            )
            .await?;
        }

        tx.commit().await?;

        info!(corrected = adjustments.len(), "Stock count applied");
        Ok(adjustments)
    }

    /// Correction history, newest first.
    pub async fn list(&self) -> DbResult<Vec<AuditAdjustment>> {
        let rows = sqlx::query_as::<_, AuditAdjustment>(
            r#"
            SELECT a.id, a.item_id, COALESCE(i.name, '') AS item_name,
                   a.old_quantity, a.new_quantity, a.delta, a.user, a.created_at
            FROM audit_adjustments a
            LEFT JOIN items i ON i.id = a.item_id
            ORDER BY a.created_at DESC, a.id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use crate::{Database, DbConfig, DbError};
    use invpro_core::audit::AuditStatus;
    use invpro_core::catalog::NewItem;
    use invpro_core::{ActivityFilter, CoreError, Section};

    async fn setup() -> (Database, i64, i64) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let b = db
            .items()
            .create(
                &NewItem {
                    quantity: 50,
                    ..NewItem::new("Item B", "B-1")
                },
                "admin",
            )
            .await
            .unwrap();
        let c = db
            .items()
            .create(
                &NewItem {
                    quantity: 7,
                    ..NewItem::new("Item C", "C-1")
                },
                "admin",
            )
            .await
            .unwrap();
        (db, b.id, c.id)
    }

    #[tokio::test]
    async fn test_count_shortage_is_written() {
        let (db, b, c) = setup().await;

        let mut sheet = db.audits().sheet(None).await.unwrap();
        sheet.set_count(b, 45).unwrap();
        assert_eq!(sheet.with_status(AuditStatus::Shortage).len(), 1);

        let applied = db.audits().apply(&sheet.counts(), "auditor").await.unwrap();
        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0].delta, -5);

        assert_eq!(db.items().get(b).await.unwrap().quantity, 45);
        assert_eq!(db.items().get(c).await.unwrap().quantity, 7);

        let history = db.audits().list().await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].item_name, "Item B");
        assert_eq!(history[0].old_quantity, 50);
        assert_eq!(history[0].new_quantity, 45);

        let logged = db
            .activity()
            .list(&ActivityFilter {
                section: Some(Section::Audit),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(logged.len(), 1);
    }

    #[tokio::test]
    async fn test_matching_counts_write_nothing() {
        let (db, b, _) = setup().await;

        let counted = BTreeMap::from([(b, 50)]);
        let applied = db.audits().apply(&counted, "auditor").await.unwrap();

        assert!(applied.is_empty());
        assert!(db.audits().list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_item_rolls_back_everything() {
        let (db, b, _) = setup().await;

        let counted = BTreeMap::from([(b, 40), (999, 1)]);
        let result = db.audits().apply(&counted, "auditor").await;

        assert!(matches!(result, Err(DbError::NotFound { .. })));
        assert_eq!(db.items().get(b).await.unwrap().quantity, 50);

        let negative = db.audits().apply(&BTreeMap::from([(b, -1)]), "auditor").await;
        assert!(matches!(negative, Err(DbError::Domain(CoreError::Validation(_)))));
    }
}
