//! # Returns
//!
//! Plans a sales or purchase return against the lines of its original invoice.
//!
//! ## Capping Rule
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  For every invoice line L:                                              │
//! │                                                                         │
//! │    Σ returned(L) over all returns  ≤  invoiced(L)                       │
//! │                                                                         │
//! │  invoiced 10 │ returned earlier 4 │ remaining 6                          │
//! │  request 6 → accepted        request 7 → ReturnExceedsInvoiced          │
//! │                                                                         │
//! │  Rejected, never clamped: the caller sees exactly what was refused.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The return total uses the original unit price: `Σ qty × unit_price`.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::InvoiceKind;
use crate::validation::{normalize_optional, validate_id, validate_quantity};

/// One requested return line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnLineRequest {
    pub invoice_line_id: i64,
    pub quantity: i64,
}

/// A return as submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnRequest {
    pub kind: InvoiceKind,
    pub invoice_id: i64,
    pub lines: Vec<ReturnLineRequest>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl ReturnRequest {
    pub fn new(kind: InvoiceKind, invoice_id: i64) -> Self {
        ReturnRequest {
            kind,
            invoice_id,
            lines: Vec::new(),
            notes: None,
        }
    }

    /// Builder-style line append.
    pub fn line(mut self, invoice_line_id: i64, quantity: i64) -> Self {
        self.lines.push(ReturnLineRequest {
            invoice_line_id,
            quantity,
        });
        self
    }
}

/// State of one original invoice line, as loaded from the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct ReturnableLine {
    pub line_id: i64,
    pub item_id: i64,
    pub item_name: String,
    pub invoiced: i64,
    pub already_returned: i64,
    pub unit_price_cents: i64,
}

impl ReturnableLine {
    /// Quantity still available for return.
    pub fn remaining(&self) -> i64 {
        (self.invoiced - self.already_returned).max(0)
    }
}

/// A validated return line, ready to write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedReturnLine {
    pub invoice_line_id: i64,
    pub item_id: i64,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
}

/// A validated return.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnPlan {
    pub lines: Vec<PlannedReturnLine>,
    pub total: Money,
    pub notes: Option<String>,
}

/// Checks a return request against the invoice's current line state.
///
/// ## Errors
/// - `Validation` for an empty request, zero/negative quantities, or the same
///   line listed twice
/// - `UnknownInvoiceLine` when a line does not belong to the invoice
/// - `ReturnExceedsInvoiced` when a line would be over-returned
pub fn plan_return(request: &ReturnRequest, lines: &[ReturnableLine]) -> CoreResult<ReturnPlan> {
    validate_id("invoice", request.invoice_id)?;

    if request.lines.is_empty() {
        return Err(ValidationError::required("return lines").into());
    }

    let notes = normalize_optional("notes", request.notes.as_deref(), 1000)?;

    let mut seen = HashSet::new();
    let mut planned = Vec::with_capacity(request.lines.len());

    for req in &request.lines {
        validate_quantity(req.quantity)?;

        if !seen.insert(req.invoice_line_id) {
            return Err(ValidationError::Duplicate {
                field: "invoice line".to_string(),
                value: req.invoice_line_id.to_string(),
            }
            .into());
        }

        let original = lines
            .iter()
            .find(|l| l.line_id == req.invoice_line_id)
            .ok_or(CoreError::UnknownInvoiceLine {
                invoice_id: request.invoice_id,
                line_id: req.invoice_line_id,
            })?;

        if req.quantity > original.remaining() {
            return Err(CoreError::ReturnExceedsInvoiced {
                line_id: original.line_id,
                invoiced: original.invoiced,
                already_returned: original.already_returned,
                requested: req.quantity,
            });
        }

        let line_total = Money::from_cents(original.unit_price_cents).multiply_quantity(req.quantity);
        planned.push(PlannedReturnLine {
            invoice_line_id: original.line_id,
            item_id: original.item_id,
            quantity: req.quantity,
            unit_price_cents: original.unit_price_cents,
            line_total_cents: line_total.cents(),
        });
    }

    let total = planned
        .iter()
        .map(|l| Money::from_cents(l.line_total_cents))
        .sum();

    Ok(ReturnPlan {
        lines: planned,
        total,
        notes,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn original(line_id: i64, invoiced: i64, already_returned: i64, price: i64) -> ReturnableLine {
        ReturnableLine {
            line_id,
            item_id: line_id * 10,
            item_name: format!("Item {}", line_id),
            invoiced,
            already_returned,
            unit_price_cents: price,
        }
    }

    #[test]
    fn test_plan_uses_original_unit_price() {
        let lines = vec![original(1, 10, 0, 500), original(2, 3, 0, 2000)];
        let request = ReturnRequest::new(InvoiceKind::Purchase, 9).line(1, 4).line(2, 1);

        let plan = plan_return(&request, &lines).unwrap();
        assert_eq!(plan.lines.len(), 2);
        assert_eq!(plan.lines[0].item_id, 10);
        assert_eq!(plan.lines[0].line_total_cents, 2000);
        assert_eq!(plan.total.cents(), 4000);
    }

    #[test]
    fn test_full_remaining_quantity_is_accepted() {
        let lines = vec![original(1, 10, 4, 500)];
        let request = ReturnRequest::new(InvoiceKind::Sales, 1).line(1, 6);
        assert!(plan_return(&request, &lines).is_ok());
    }

    #[test]
    fn test_over_return_is_rejected_counting_earlier_returns() {
        let lines = vec![original(1, 10, 4, 500)];
        let request = ReturnRequest::new(InvoiceKind::Sales, 1).line(1, 7);

        let err = plan_return(&request, &lines).unwrap_err();
        assert_eq!(
            err,
            CoreError::ReturnExceedsInvoiced {
                line_id: 1,
                invoiced: 10,
                already_returned: 4,
                requested: 7,
            }
        );
    }

    #[test]
    fn test_returned_never_exceeds_invoiced() {
        for invoiced in 1..=6 {
            for already in 0..=invoiced {
                for requested in 1..=8 {
                    let lines = vec![original(1, invoiced, already, 100)];
                    let request = ReturnRequest::new(InvoiceKind::Sales, 1).line(1, requested);
                    let accepted = plan_return(&request, &lines).is_ok();
                    assert_eq!(accepted, already + requested <= invoiced);
                }
            }
        }
    }

    #[test]
    fn test_rejects_unknown_line_duplicates_and_empty() {
        let lines = vec![original(1, 10, 0, 500)];

        let unknown = ReturnRequest::new(InvoiceKind::Sales, 3).line(99, 1);
        assert_eq!(
            plan_return(&unknown, &lines).unwrap_err(),
            CoreError::UnknownInvoiceLine {
                invoice_id: 3,
                line_id: 99
            }
        );

        let duplicate = ReturnRequest::new(InvoiceKind::Sales, 3).line(1, 1).line(1, 1);
        assert!(matches!(
            plan_return(&duplicate, &lines),
            Err(CoreError::Validation(ValidationError::Duplicate { .. }))
        ));

        let empty = ReturnRequest::new(InvoiceKind::Sales, 3);
        assert!(plan_return(&empty, &lines).is_err());

        let zero = ReturnRequest::new(InvoiceKind::Sales, 3).line(1, 0);
        assert!(plan_return(&zero, &lines).is_err());
    }
}
