//! # Audit Commands
//!
//! Physical stock counts. Applying a count needs the `extra` capability
//! because it overwrites stock without a matching document.

use std::collections::BTreeMap;

use invpro_core::audit::{AuditSheet, StockAdjustment};
use invpro_core::{AuditAdjustment, Capability, Section};
use tracing::{debug, info};

use crate::error::AppResult;
use crate::state::{AppEvent, ChangeKind, Session};
use crate::App;

/// Every item (optionally one warehouse) with counted = system quantity.
pub async fn audit_sheet(app: &App, session: &Session, warehouse_id: Option<i64>) -> AppResult<AuditSheet> {
    app.authorize(session, Section::Audit, Capability::View).await?;
    Ok(app.db.inner().audits().sheet(warehouse_id).await?)
}

/// Writes counted quantities as one transaction.
///
/// `counted` maps item id to the counted quantity. Unchanged counts are
/// skipped; an unknown item or a negative count rejects the whole audit.
pub async fn apply_audit(
    app: &App,
    session: &Session,
    counted: &BTreeMap<i64, i64>,
) -> AppResult<Vec<StockAdjustment>> {
    debug!(items = counted.len(), "apply_audit command");
    let actor = app.authorize(session, Section::Audit, Capability::Extra).await?;

    let adjustments = app
        .db
        .inner()
        .audits()
        .apply(counted, &actor.username)
        .await?;

    if !adjustments.is_empty() {
        app.events
            .publish(AppEvent::data_changed(Section::Audit, ChangeKind::StockAdjusted));
    }
    info!(corrected = adjustments.len(), user = %actor.username, "Audit applied");
    Ok(adjustments)
}

pub async fn list_audit_adjustments(app: &App, session: &Session) -> AppResult<Vec<AuditAdjustment>> {
    app.authorize(session, Section::Audit, Capability::View).await?;
    Ok(app.db.inner().audits().list().await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::catalog::{create_item, get_item};
    use crate::error::ErrorCode;
    use crate::testing;
    use invpro_core::audit::AuditStatus;
    use invpro_core::catalog::NewItem;
    use invpro_core::PermissionSet;

    #[tokio::test]
    async fn test_count_shortage() {
        let (app, _dir) = testing::app().await;
        let admin = testing::admin(&app).await;
        let item = create_item(
            &app,
            &admin,
            &NewItem {
                quantity: 50,
                ..NewItem::new("Widget", "W-1")
            },
        )
        .await
        .unwrap();

        let mut sheet = audit_sheet(&app, &admin, None).await.unwrap();
        sheet.set_count(item.id, 45).unwrap();
        assert_eq!(sheet.with_status(AuditStatus::Shortage).len(), 1);

        let mut sub = app.events.subscribe();
        let applied = apply_audit(&app, &admin, &sheet.counts()).await.unwrap();

        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0].delta, -5);
        assert_eq!(get_item(&app, &admin, item.id).await.unwrap().quantity, 45);
        assert_eq!(
            sub.try_recv(),
            Some(AppEvent::data_changed(Section::Audit, ChangeKind::StockAdjusted))
        );

        let history = list_audit_adjustments(&app, &admin).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].old_quantity, 50);
        assert_eq!(history[0].user, "admin");
    }

    #[tokio::test]
    async fn test_unknown_item_rejects_everything() {
        let (app, _dir) = testing::app().await;
        let admin = testing::admin(&app).await;
        let item = create_item(
            &app,
            &admin,
            &NewItem {
                quantity: 50,
                ..NewItem::new("Widget", "W-1")
            },
        )
        .await
        .unwrap();

        let counted = BTreeMap::from([(item.id, 40), (999, 1)]);
        assert!(apply_audit(&app, &admin, &counted).await.is_err());
        assert_eq!(get_item(&app, &admin, item.id).await.unwrap().quantity, 50);
        assert!(list_audit_adjustments(&app, &admin).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_view_is_not_enough_to_apply() {
        let (app, _dir) = testing::app().await;
        let admin = testing::admin(&app).await;
        let counter = testing::user_with(
            &app,
            &admin,
            "counter",
            PermissionSet::none().with(Section::Audit, Capability::View),
        )
        .await;

        assert!(audit_sheet(&app, &counter, None).await.is_ok());
        let err = apply_audit(&app, &counter, &BTreeMap::new()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::PermissionDenied);
    }
}
