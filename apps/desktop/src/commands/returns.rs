//! # Return Commands
//!
//! Sales returns put stock back; purchase returns take it out. The
//! cumulative quantity returned against an invoice line never exceeds what
//! was invoiced.

use invpro_core::returns::{ReturnRequest, ReturnableLine};
use invpro_core::{Capability, InvoiceKind, ReturnLine, ReturnRecord, Section};
use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::state::{AppEvent, ChangeKind, Session};
use crate::App;

pub async fn create_sales_return(
    app: &App,
    session: &Session,
    request: &ReturnRequest,
) -> AppResult<ReturnRecord> {
    expect_kind(request, InvoiceKind::Sales)?;
    create_return(app, session, request).await
}

pub async fn create_purchase_return(
    app: &App,
    session: &Session,
    request: &ReturnRequest,
) -> AppResult<ReturnRecord> {
    expect_kind(request, InvoiceKind::Purchase)?;
    create_return(app, session, request).await
}

async fn create_return(
    app: &App,
    session: &Session,
    request: &ReturnRequest,
) -> AppResult<ReturnRecord> {
    debug!(
        kind = request.kind.as_str(),
        invoice_id = %request.invoice_id,
        lines = request.lines.len(),
        "create_return command"
    );
    let actor = app.authorize(session, Section::Returns, Capability::Add).await?;

    let record = app
        .db
        .inner()
        .returns()
        .create(request, &actor.username, app.config.sales.allow_negative_stock)
        .await?;

    app.events
        .publish(AppEvent::data_changed(Section::Returns, ChangeKind::Created));
    info!(
        kind = request.kind.as_str(),
        return_id = %record.id,
        invoice_id = %record.invoice_id,
        total_cents = %record.total_cents,
        "Return created"
    );
    Ok(record)
}

fn expect_kind(request: &ReturnRequest, kind: InvoiceKind) -> AppResult<()> {
    if request.kind != kind {
        return Err(AppError::validation(format!(
            "Expected a {} return, got {}",
            kind.as_str(),
            request.kind.as_str()
        )));
    }
    Ok(())
}

pub async fn list_returns(app: &App, session: &Session, kind: InvoiceKind) -> AppResult<Vec<ReturnRecord>> {
    app.authorize(session, Section::Returns, Capability::View).await?;
    Ok(app.db.inner().returns().list(kind).await?)
}

/// Each line of an invoice with its already-returned and remaining quantity.
pub async fn returnable_lines(
    app: &App,
    session: &Session,
    kind: InvoiceKind,
    invoice_id: i64,
) -> AppResult<Vec<ReturnableLine>> {
    app.authorize(session, Section::Returns, Capability::View).await?;
    Ok(app
        .db
        .inner()
        .returns()
        .returnable_lines(kind, invoice_id)
        .await?)
}

pub async fn return_lines(
    app: &App,
    session: &Session,
    kind: InvoiceKind,
    return_id: i64,
) -> AppResult<Vec<ReturnLine>> {
    app.authorize(session, Section::Returns, Capability::View).await?;
    Ok(app.db.inner().returns().lines(kind, return_id).await?)
}
