//! # Invoice Commands
//!
//! Sales and purchase invoices. The section checked is the invoice kind's
//! own (`sales` or `purchases`).
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create_sales_invoice                  create_purchase_invoice          │
//! │   tax = config.sales.tax_rate_bps       tax = 0                         │
//! │   stock −qty per line                   stock +qty per line             │
//! │            │                                   │                        │
//! │            └──────────────┬────────────────────┘                        │
//! │                           ▼                                             │
//! │          InvoiceRepository::create (one transaction)                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use invpro_core::invoice::InvoiceDraft;
use invpro_core::{Capability, Invoice, InvoiceFilter, InvoiceKind, Rate};
use invpro_db::InvoiceDetails;
use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::state::{AppEvent, ChangeKind, Session};
use crate::App;

/// Saves a sales invoice at the configured tax rate.
///
/// ## Errors
/// - `VALIDATION_ERROR` when the draft is not a sales draft or fails validation
/// - `INSUFFICIENT_STOCK` when a line asks for more than is on hand
/// - `NOT_FOUND` for an unknown customer or item
pub async fn create_sales_invoice(
    app: &App,
    session: &Session,
    draft: &InvoiceDraft,
) -> AppResult<InvoiceDetails> {
    expect_kind(draft, InvoiceKind::Sales)?;
    create_invoice(app, session, draft, app.config.tax_rate()).await
}

/// Saves a purchase invoice. Purchases carry no tax.
pub async fn create_purchase_invoice(
    app: &App,
    session: &Session,
    draft: &InvoiceDraft,
) -> AppResult<InvoiceDetails> {
    expect_kind(draft, InvoiceKind::Purchase)?;
    create_invoice(app, session, draft, Rate::zero()).await
}

async fn create_invoice(
    app: &App,
    session: &Session,
    draft: &InvoiceDraft,
    tax_rate: Rate,
) -> AppResult<InvoiceDetails> {
    let kind = draft.kind;
    debug!(
        kind = kind.as_str(),
        counterparty = %draft.counterparty_id,
        lines = draft.lines.len(),
        "create_invoice command"
    );
    let actor = app.authorize(session, kind.section(), Capability::Add).await?;

    let details = app
        .db
        .inner()
        .invoices()
        .create(
            draft,
            tax_rate,
            &actor.username,
            app.config.sales.allow_negative_stock,
        )
        .await?;

    app.events
        .publish(AppEvent::data_changed(kind.section(), ChangeKind::Created));
    info!(
        kind = kind.as_str(),
        invoice_id = %details.invoice.id,
        total = %details.invoice.total(),
        "Invoice created"
    );
    Ok(details)
}

fn expect_kind(draft: &InvoiceDraft, kind: InvoiceKind) -> AppResult<()> {
    if draft.kind != kind {
        return Err(AppError::validation(format!(
            "Expected a {} draft, got {}",
            kind.as_str(),
            draft.kind.as_str()
        )));
    }
    Ok(())
}

pub async fn list_invoices(
    app: &App,
    session: &Session,
    kind: InvoiceKind,
    filter: &InvoiceFilter,
) -> AppResult<Vec<Invoice>> {
    app.authorize(session, kind.section(), Capability::View).await?;
    Ok(app.db.inner().invoices().list(kind, filter).await?)
}

/// An invoice with its lines.
pub async fn get_invoice(
    app: &App,
    session: &Session,
    kind: InvoiceKind,
    invoice_id: i64,
) -> AppResult<InvoiceDetails> {
    app.authorize(session, kind.section(), Capability::View).await?;
    Ok(app.db.inner().invoices().get(kind, invoice_id).await?)
}
