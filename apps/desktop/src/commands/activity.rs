//! # Activity Log Commands

use invpro_core::{ActivityEntry, ActivityFilter, Capability, Section};

use crate::error::AppResult;
use crate::state::Session;
use crate::App;

/// Activity entries matching the filter, newest first.
pub async fn list_activity(
    app: &App,
    session: &Session,
    filter: &ActivityFilter,
) -> AppResult<Vec<ActivityEntry>> {
    app.authorize(session, Section::Activity, Capability::View).await?;
    Ok(app.db.inner().activity().list(filter).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::catalog::create_warehouse;
    use crate::error::ErrorCode;
    use crate::testing;
    use invpro_core::catalog::NewWarehouse;
    use invpro_core::{LogAction, PermissionSet};

    #[tokio::test]
    async fn test_filter_by_section_and_text() {
        let (app, _dir) = testing::app().await;
        let admin = testing::admin(&app).await;
        create_warehouse(&app, &admin, &NewWarehouse::new("Main")).await.unwrap();
        create_warehouse(&app, &admin, &NewWarehouse::new("Annex")).await.unwrap();

        let warehouses = list_activity(
            &app,
            &admin,
            &ActivityFilter {
                section: Some(Section::Warehouses),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(warehouses.len(), 2);
        assert!(warehouses.iter().all(|e| e.action == LogAction::Create));

        let annex = list_activity(
            &app,
            &admin,
            &ActivityFilter {
                search: Some("annex".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(annex.len(), 1);
    }

    #[tokio::test]
    async fn test_requires_view() {
        let (app, _dir) = testing::app().await;
        let admin = testing::admin(&app).await;
        let nobody = testing::user_with(&app, &admin, "nobody", PermissionSet::none()).await;

        let err = list_activity(&app, &nobody, &ActivityFilter::default())
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::PermissionDenied);
    }
}
