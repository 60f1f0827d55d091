//! # Dashboard & Profit Commands

use invpro_core::{Capability, DateRange, ProfitSummary, Section};
use invpro_db::DashboardSummary;
use tracing::debug;

use crate::error::AppResult;
use crate::state::Session;
use crate::App;

/// Counters plus the most recent invoices across both kinds.
pub async fn dashboard_summary(app: &App, session: &Session) -> AppResult<DashboardSummary> {
    app.authorize(session, Section::Dashboard, Capability::View).await?;
    Ok(app.db.inner().analytics().dashboard().await?)
}

/// `profit = (sales − sales returns) − (purchases − purchase returns)`
/// over an inclusive date range. Open ends cover all history.
pub async fn profit_summary(app: &App, session: &Session, dates: DateRange) -> AppResult<ProfitSummary> {
    debug!(from = ?dates.from, to = ?dates.to, "profit_summary command");
    app.authorize(session, Section::Profit, Capability::View).await?;
    dates.validate().map_err(invpro_core::CoreError::from)?;

    Ok(app.db.inner().analytics().profit(dates).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::catalog::create_item;
    use crate::commands::invoices::{create_purchase_invoice, create_sales_invoice};
    use crate::commands::partners::create_partner;
    use crate::commands::returns::create_sales_return;
    use crate::error::ErrorCode;
    use crate::testing;
    use chrono::NaiveDate;
    use invpro_core::catalog::{NewItem, NewPartner};
    use invpro_core::invoice::{DraftLine, InvoiceDraft};
    use invpro_core::returns::ReturnRequest;
    use invpro_core::{InvoiceKind, PartnerKind};

    #[tokio::test]
    async fn test_dashboard_and_profit() {
        let (app, _dir) = testing::app().await;
        let admin = testing::admin(&app).await;
        let item = create_item(
            &app,
            &admin,
            &NewItem {
                min_quantity: 8,
                ..NewItem::new("Widget", "W-1")
            },
        )
        .await
        .unwrap();
        let acme = create_partner(&app, &admin, PartnerKind::Supplier, &NewPartner::new("Acme"))
            .await
            .unwrap();
        let jane = create_partner(&app, &admin, PartnerKind::Customer, &NewPartner::new("Jane"))
            .await
            .unwrap();

        create_purchase_invoice(
            &app,
            &admin,
            &InvoiceDraft::new(InvoiceKind::Purchase, acme.id).line(DraftLine::new(item.id, 10, 500)),
        )
        .await
        .unwrap();
        let sale = create_sales_invoice(
            &app,
            &admin,
            &InvoiceDraft::new(InvoiceKind::Sales, jane.id)
                .line(DraftLine::new(item.id, 3, 2000).with_discount_bps(1000))
                .shipping(500),
        )
        .await
        .unwrap();
        create_sales_return(
            &app,
            &admin,
            &ReturnRequest::new(InvoiceKind::Sales, sale.invoice.id).line(sale.lines[0].id, 1),
        )
        .await
        .unwrap();

        let summary = dashboard_summary(&app, &admin).await.unwrap();
        assert_eq!(summary.item_count, 1);
        assert_eq!(summary.low_stock_count, 1);
        assert_eq!(summary.supplier_count, 1);
        assert_eq!(summary.customer_count, 1);
        assert_eq!(summary.sales_invoice_count, 1);
        assert_eq!(summary.purchase_invoice_count, 1);
        assert_eq!(summary.recent.len(), 2);

        let profit = profit_summary(&app, &admin, DateRange::default()).await.unwrap();
        assert_eq!(profit.sales_cents, 6656);
        assert_eq!(profit.sales_returns_cents, 2000);
        assert_eq!(profit.purchases_cents, 5000);
        assert_eq!(profit.profit_cents, (6656 - 2000) - 5000);
    }

    #[tokio::test]
    async fn test_inverted_range_rejected() {
        let (app, _dir) = testing::app().await;
        let admin = testing::admin(&app).await;

        let dates = DateRange::new(NaiveDate::from_ymd_opt(2024, 2, 1), NaiveDate::from_ymd_opt(2024, 1, 1));
        let err = profit_summary(&app, &admin, dates).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }
}
