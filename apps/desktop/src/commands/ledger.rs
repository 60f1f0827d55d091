//! # Stock Ledger Commands
//!
//! Issue, receive and transfer movements outside the invoice flows.

use invpro_core::ledger::NewTransaction;
use invpro_core::{Capability, Section, StockTransaction, TransactionFilter};
use tracing::{debug, info};

use crate::error::AppResult;
use crate::state::{AppEvent, ChangeKind, Session};
use crate::App;

/// Records a movement and applies its stock effect.
///
/// Removals below zero fail with `INSUFFICIENT_STOCK` unless
/// `sales.allow_negative_stock` is configured.
pub async fn record_transaction(
    app: &App,
    session: &Session,
    input: &NewTransaction,
) -> AppResult<StockTransaction> {
    debug!(
        kind = input.kind.as_str(),
        item_id = %input.item_id,
        quantity = %input.quantity,
        "record_transaction command"
    );
    let actor = app.authorize(session, Section::Transactions, Capability::Add).await?;

    let transaction = app
        .db
        .inner()
        .ledger()
        .record(input, &actor.username, app.config.sales.allow_negative_stock)
        .await?;

    app.events.publish(AppEvent::data_changed(
        Section::Transactions,
        ChangeKind::StockAdjusted,
    ));
    info!(
        transaction_id = %transaction.id,
        kind = transaction.kind.as_str(),
        item = %transaction.item_name,
        "Stock transaction recorded"
    );
    Ok(transaction)
}

pub async fn list_transactions(
    app: &App,
    session: &Session,
    filter: &TransactionFilter,
) -> AppResult<Vec<StockTransaction>> {
    app.authorize(session, Section::Transactions, Capability::View).await?;
    Ok(app.db.inner().ledger().list(filter).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::catalog::{create_item, create_warehouse, get_item, list_items};
    use crate::error::ErrorCode;
    use crate::testing;
    use invpro_core::catalog::{NewItem, NewWarehouse};
    use invpro_core::{ItemFilter, TransactionType};

    #[tokio::test]
    async fn test_issue_receive_and_filter() {
        let (app, _dir) = testing::app().await;
        let admin = testing::admin(&app).await;
        let item = create_item(
            &app,
            &admin,
            &NewItem {
                quantity: 10,
                ..NewItem::new("Widget", "W-1")
            },
        )
        .await
        .unwrap();

        let mut sub = app.events.subscribe();
        record_transaction(&app, &admin, &NewTransaction::issue(item.id, 4))
            .await
            .unwrap();
        assert_eq!(
            sub.try_recv(),
            Some(AppEvent::data_changed(Section::Transactions, ChangeKind::StockAdjusted))
        );

        record_transaction(
            &app,
            &admin,
            &NewTransaction::receive(item.id, 2).with_notes("restock"),
        )
        .await
        .unwrap();
        assert_eq!(get_item(&app, &admin, item.id).await.unwrap().quantity, 8);

        let receipts = list_transactions(
            &app,
            &admin,
            &TransactionFilter {
                kind: Some(TransactionType::Receive),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(receipts.len(), 1);
        assert_eq!(receipts[0].notes.as_deref(), Some("restock"));
    }

    #[tokio::test]
    async fn test_issue_beyond_stock_is_rejected() {
        let (app, _dir) = testing::app().await;
        let admin = testing::admin(&app).await;
        let item = create_item(
            &app,
            &admin,
            &NewItem {
                quantity: 2,
                ..NewItem::new("Widget", "W-1")
            },
        )
        .await
        .unwrap();

        let err = record_transaction(&app, &admin, &NewTransaction::issue(item.id, 3))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InsufficientStock);
        assert_eq!(get_item(&app, &admin, item.id).await.unwrap().quantity, 2);
        assert!(list_transactions(&app, &admin, &TransactionFilter::default())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_transfer_creates_target_item() {
        let (app, _dir) = testing::app().await;
        let admin = testing::admin(&app).await;
        let main = create_warehouse(&app, &admin, &NewWarehouse::new("Main")).await.unwrap();
        let annex = create_warehouse(&app, &admin, &NewWarehouse::new("Annex")).await.unwrap();
        let item = create_item(
            &app,
            &admin,
            &NewItem {
                quantity: 10,
                warehouse_id: Some(main.id),
                ..NewItem::new("Widget", "W-1")
            },
        )
        .await
        .unwrap();

        record_transaction(&app, &admin, &NewTransaction::transfer(item.id, 4, annex.id))
            .await
            .unwrap();

        let in_annex = list_items(
            &app,
            &admin,
            &ItemFilter {
                warehouse_id: Some(annex.id),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(in_annex.len(), 1);
        assert_eq!(in_annex[0].sku, "W-1");
        assert_eq!(in_annex[0].quantity, 4);
        assert_eq!(get_item(&app, &admin, item.id).await.unwrap().quantity, 6);
    }
}
