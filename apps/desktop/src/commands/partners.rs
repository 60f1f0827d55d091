//! # Partner Commands
//!
//! Suppliers and customers share one record shape and one section.

use invpro_core::catalog::NewPartner;
use invpro_core::{Capability, Partner, PartnerKind, Section};
use tracing::{debug, info};

use crate::error::AppResult;
use crate::state::{AppEvent, ChangeKind, Session};
use crate::App;

pub async fn list_partners(app: &App, session: &Session, kind: PartnerKind) -> AppResult<Vec<Partner>> {
    app.authorize(session, Section::Partners, Capability::View).await?;
    Ok(app.db.inner().partners().list(kind).await?)
}

pub async fn list_suppliers(app: &App, session: &Session) -> AppResult<Vec<Partner>> {
    list_partners(app, session, PartnerKind::Supplier).await
}

pub async fn list_customers(app: &App, session: &Session) -> AppResult<Vec<Partner>> {
    list_partners(app, session, PartnerKind::Customer).await
}

pub async fn create_partner(
    app: &App,
    session: &Session,
    kind: PartnerKind,
    input: &NewPartner,
) -> AppResult<Partner> {
    debug!(kind = kind.label(), name = %input.name, "create_partner command");
    let actor = app.authorize(session, Section::Partners, Capability::Add).await?;

    let partner = app
        .db
        .inner()
        .partners()
        .create(kind, input, &actor.username)
        .await?;

    app.events
        .publish(AppEvent::data_changed(Section::Partners, ChangeKind::Created));
    info!(kind = kind.label(), partner_id = %partner.id, "Partner created");
    Ok(partner)
}

pub async fn update_partner(
    app: &App,
    session: &Session,
    kind: PartnerKind,
    partner_id: i64,
    input: &NewPartner,
) -> AppResult<Partner> {
    debug!(kind = kind.label(), partner_id = %partner_id, "update_partner command");
    let actor = app.authorize(session, Section::Partners, Capability::Edit).await?;

    let partner = app
        .db
        .inner()
        .partners()
        .update(kind, partner_id, input, &actor.username)
        .await?;

    app.events
        .publish(AppEvent::data_changed(Section::Partners, ChangeKind::Updated));
    Ok(partner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::testing;

    #[tokio::test]
    async fn test_suppliers_and_customers_are_separate() {
        let (app, _dir) = testing::app().await;
        let admin = testing::admin(&app).await;

        let acme = create_partner(&app, &admin, PartnerKind::Supplier, &NewPartner::new("Acme"))
            .await
            .unwrap();
        create_partner(&app, &admin, PartnerKind::Customer, &NewPartner::new("Jane"))
            .await
            .unwrap();

        assert_eq!(list_suppliers(&app, &admin).await.unwrap().len(), 1);
        assert_eq!(list_customers(&app, &admin).await.unwrap().len(), 1);

        let err = update_partner(&app, &admin, PartnerKind::Customer, 999, &NewPartner::new("X"))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);

        let renamed = update_partner(
            &app,
            &admin,
            PartnerKind::Supplier,
            acme.id,
            &NewPartner {
                phone: Some("+1 555 0100".to_string()),
                ..NewPartner::new("Acme Ltd")
            },
        )
        .await
        .unwrap();
        assert_eq!(renamed.name, "Acme Ltd");
        assert_eq!(renamed.phone.as_deref(), Some("+1 555 0100"));
    }

    #[tokio::test]
    async fn test_blank_name_rejected() {
        let (app, _dir) = testing::app().await;
        let admin = testing::admin(&app).await;

        let err = create_partner(&app, &admin, PartnerKind::Customer, &NewPartner::new("   "))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }
}
