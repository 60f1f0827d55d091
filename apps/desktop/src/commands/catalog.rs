//! # Catalog Commands
//!
//! Warehouses, items and the price list.
//!
//! Price edits live under their own section so a role can maintain stock
//! records without touching prices.

use invpro_core::catalog::{ItemChanges, NewItem, NewWarehouse, PriceChange};
use invpro_core::{Capability, Item, ItemFilter, Section, Warehouse};
use tracing::{debug, info};

use crate::error::AppResult;
use crate::state::{AppEvent, ChangeKind, Session};
use crate::App;

// =============================================================================
// Warehouses
// =============================================================================

pub async fn list_warehouses(app: &App, session: &Session) -> AppResult<Vec<Warehouse>> {
    app.authorize(session, Section::Warehouses, Capability::View).await?;
    Ok(app.db.inner().warehouses().list().await?)
}

pub async fn create_warehouse(
    app: &App,
    session: &Session,
    input: &NewWarehouse,
) -> AppResult<Warehouse> {
    debug!(name = %input.name, "create_warehouse command");
    let actor = app.authorize(session, Section::Warehouses, Capability::Add).await?;

    let warehouse = app
        .db
        .inner()
        .warehouses()
        .create(input, &actor.username)
        .await?;

    app.events
        .publish(AppEvent::data_changed(Section::Warehouses, ChangeKind::Created));
    info!(warehouse_id = %warehouse.id, name = %warehouse.name, "Warehouse created");
    Ok(warehouse)
}

pub async fn update_warehouse(
    app: &App,
    session: &Session,
    warehouse_id: i64,
    input: &NewWarehouse,
) -> AppResult<Warehouse> {
    debug!(warehouse_id = %warehouse_id, "update_warehouse command");
    let actor = app.authorize(session, Section::Warehouses, Capability::Edit).await?;

    let warehouse = app
        .db
        .inner()
        .warehouses()
        .update(warehouse_id, input, &actor.username)
        .await?;

    app.events
        .publish(AppEvent::data_changed(Section::Warehouses, ChangeKind::Updated));
    Ok(warehouse)
}

// =============================================================================
// Items
// =============================================================================

/// Lists items, optionally filtered by search text, warehouse or low stock.
pub async fn list_items(app: &App, session: &Session, filter: &ItemFilter) -> AppResult<Vec<Item>> {
    app.authorize(session, Section::Items, Capability::View).await?;
    Ok(app.db.inner().items().list(filter).await?)
}

pub async fn get_item(app: &App, session: &Session, item_id: i64) -> AppResult<Item> {
    app.authorize(session, Section::Items, Capability::View).await?;
    Ok(app.db.inner().items().get(item_id).await?)
}

/// Items at or below their reorder threshold.
pub async fn low_stock_items(app: &App, session: &Session) -> AppResult<Vec<Item>> {
    app.authorize(session, Section::Items, Capability::View).await?;
    Ok(app.db.inner().items().low_stock().await?)
}

/// Creates an item with its opening stock and prices.
///
/// ## Errors
/// - `VALIDATION_ERROR` for a blank name, a malformed SKU or negative numbers
/// - `VALIDATION_ERROR` when the SKU already exists in the same warehouse
pub async fn create_item(app: &App, session: &Session, input: &NewItem) -> AppResult<Item> {
    debug!(sku = %input.sku, "create_item command");
    let actor = app.authorize(session, Section::Items, Capability::Add).await?;

    let item = app.db.inner().items().create(input, &actor.username).await?;

    app.events
        .publish(AppEvent::data_changed(Section::Items, ChangeKind::Created));
    info!(item_id = %item.id, sku = %item.sku, "Item created");
    Ok(item)
}

/// Edits name, SKU, threshold and warehouse. Stock and prices are untouched.
pub async fn update_item(
    app: &App,
    session: &Session,
    item_id: i64,
    changes: &ItemChanges,
) -> AppResult<Item> {
    debug!(item_id = %item_id, "update_item command");
    let actor = app.authorize(session, Section::Items, Capability::Edit).await?;

    let item = app
        .db
        .inner()
        .items()
        .update(item_id, changes, &actor.username)
        .await?;

    app.events
        .publish(AppEvent::data_changed(Section::Items, ChangeKind::Updated));
    Ok(item)
}

// =============================================================================
// Price List
// =============================================================================

pub async fn list_prices(app: &App, session: &Session, filter: &ItemFilter) -> AppResult<Vec<Item>> {
    app.authorize(session, Section::PriceList, Capability::View).await?;
    Ok(app.db.inner().items().list(filter).await?)
}

/// Changes buy and/or sell price. Existing invoices keep their line prices.
pub async fn update_prices(
    app: &App,
    session: &Session,
    item_id: i64,
    change: &PriceChange,
) -> AppResult<Item> {
    debug!(item_id = %item_id, "update_prices command");
    let actor = app.authorize(session, Section::PriceList, Capability::Edit).await?;

    let item = app
        .db
        .inner()
        .items()
        .update_prices(item_id, change, &actor.username)
        .await?;

    app.events
        .publish(AppEvent::data_changed(Section::PriceList, ChangeKind::Updated));
    info!(
        item_id = %item.id,
        buy = %item.buy_price(),
        sell = %item.sell_price(),
        "Prices updated"
    );
    Ok(item)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::testing;
    use invpro_core::PermissionSet;

    #[tokio::test]
    async fn test_item_flow() {
        let (app, _dir) = testing::app().await;
        let admin = testing::admin(&app).await;

        let main = create_warehouse(&app, &admin, &NewWarehouse::new("Main"))
            .await
            .unwrap();
        let item = create_item(
            &app,
            &admin,
            &NewItem {
                quantity: 3,
                min_quantity: 5,
                sell_price_cents: 2000,
                warehouse_id: Some(main.id),
                ..NewItem::new("Widget", "W-1")
            },
        )
        .await
        .unwrap();

        let low = low_stock_items(&app, &admin).await.unwrap();
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].id, item.id);

        let edited = update_item(
            &app,
            &admin,
            item.id,
            &ItemChanges {
                name: "Widget XL".to_string(),
                sku: "W-1".to_string(),
                min_quantity: 2,
                warehouse_id: Some(main.id),
            },
        )
        .await
        .unwrap();
        assert_eq!(edited.name, "Widget XL");
        assert_eq!(edited.quantity, 3);
        assert!(low_stock_items(&app, &admin).await.unwrap().is_empty());

        let search = ItemFilter {
            search: Some("xl".to_string()),
            ..Default::default()
        };
        assert_eq!(list_items(&app, &admin, &search).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_price_list_is_its_own_section() {
        let (app, _dir) = testing::app().await;
        let admin = testing::admin(&app).await;
        let item = create_item(&app, &admin, &NewItem::new("Widget", "W-1"))
            .await
            .unwrap();

        let stock_clerk = testing::user_with(
            &app,
            &admin,
            "stock",
            PermissionSet::none()
                .with(Section::Items, Capability::View)
                .with(Section::Items, Capability::Edit),
        )
        .await;

        let change = PriceChange {
            sell_price_cents: Some(2500),
            ..Default::default()
        };
        let err = update_prices(&app, &stock_clerk, item.id, &change)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::PermissionDenied);
        assert_eq!(get_item(&app, &stock_clerk, item.id).await.unwrap().sell_price_cents, 0);

        let mut sub = app.events.subscribe();
        let updated = update_prices(&app, &admin, item.id, &change).await.unwrap();
        assert_eq!(updated.sell_price_cents, 2500);
        assert_eq!(
            sub.try_recv(),
            Some(AppEvent::data_changed(Section::PriceList, ChangeKind::Updated))
        );
    }

    #[tokio::test]
    async fn test_denied_create_publishes_nothing() {
        let (app, _dir) = testing::app().await;
        let admin = testing::admin(&app).await;
        let viewer = testing::user_with(
            &app,
            &admin,
            "viewer",
            PermissionSet::none().with(Section::Warehouses, Capability::View),
        )
        .await;

        let mut sub = app.events.subscribe();
        let err = create_warehouse(&app, &viewer, &NewWarehouse::new("Annex"))
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::PermissionDenied);
        assert!(sub.try_recv().is_none());
        assert!(list_warehouses(&app, &viewer).await.unwrap().is_empty());
    }
}
