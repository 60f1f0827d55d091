//! # Invoice Engine
//!
//! Draft validation and total calculation for sales and purchase invoices.
//!
//! ## Total Formula
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  line_total = qty × unit_price − (qty × unit_price × line_discount%)    │
//! │  subtotal   = Σ line_total                                              │
//! │  tax        = subtotal × tax_rate            (14% sales, 0% purchases)  │
//! │  total      = subtotal + tax − discount + shipping                      │
//! │                                                                         │
//! │  Example: 3 × 20.00, 10% off, shipping 5.00                             │
//! │    line_total = 60.00 − 6.00 = 54.00                                    │
//! │    tax        = 54.00 × 14%  =  7.56                                    │
//! │    total      = 54.00 + 7.56 − 0 + 5.00 = 66.56                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each step rounds once, half-up, to the cent.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{CoreResult, ValidationError};
use crate::money::{Money, Rate};
use crate::types::InvoiceKind;
use crate::validation::{
    normalize_optional, validate_id, validate_price_cents, validate_quantity, validate_rate_bps,
};
use crate::MAX_INVOICE_LINES;

// =============================================================================
// Draft
// =============================================================================

/// One line of an invoice being entered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftLine {
    pub item_id: i64,
    pub quantity: i64,
    pub unit_price_cents: i64,
    /// Line discount in basis points (1000 = 10%).
    #[serde(default)]
    pub discount_bps: u32,
}

impl DraftLine {
    pub fn new(item_id: i64, quantity: i64, unit_price_cents: i64) -> Self {
        DraftLine {
            item_id,
            quantity,
            unit_price_cents,
            discount_bps: 0,
        }
    }

    /// Builder-style line discount.
    pub fn with_discount_bps(mut self, bps: u32) -> Self {
        self.discount_bps = bps;
        self
    }

    /// `qty × unit_price` before the line discount.
    pub fn gross(&self) -> Money {
        Money::from_cents(self.unit_price_cents).multiply_quantity(self.quantity)
    }

    /// Line total after the line discount.
    pub fn line_total(&self) -> Money {
        self.gross().apply_discount(Rate::from_bps(self.discount_bps))
    }
}

/// An invoice as entered, before it is saved.
///
/// Lives only in memory; once saved it becomes a terminal [`crate::Invoice`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceDraft {
    pub kind: InvoiceKind,
    /// Customer for sales, supplier for purchases.
    pub counterparty_id: i64,
    pub lines: Vec<DraftLine>,
    /// Document-level discount, an absolute amount.
    #[serde(default)]
    pub discount_cents: i64,
    #[serde(default)]
    pub shipping_cents: i64,
    #[serde(default)]
    pub notes: Option<String>,
}

impl InvoiceDraft {
    pub fn new(kind: InvoiceKind, counterparty_id: i64) -> Self {
        InvoiceDraft {
            kind,
            counterparty_id,
            lines: Vec::new(),
            discount_cents: 0,
            shipping_cents: 0,
            notes: None,
        }
    }

    /// Builder-style line append.
    pub fn line(mut self, line: DraftLine) -> Self {
        self.lines.push(line);
        self
    }

    /// Builder-style shipping.
    pub fn shipping(mut self, cents: i64) -> Self {
        self.shipping_cents = cents;
        self
    }

    /// Builder-style document discount.
    pub fn discount(mut self, cents: i64) -> Self {
        self.discount_cents = cents;
        self
    }

    /// Validates the draft and computes its totals.
    ///
    /// ## Rejections (before any write)
    /// - missing counterparty
    /// - empty line list, or more than [`MAX_INVOICE_LINES`]
    /// - quantity outside 1..=99 999
    /// - zero price on a sales line, negative price anywhere
    /// - line discount over 100%
    /// - negative discount or shipping
    /// - document discount larger than subtotal + tax
    ///
    /// ## Returns
    /// Totals plus the trimmed notes.
    pub fn compute(&self, tax_rate: Rate) -> CoreResult<InvoiceTotals> {
        validate_id("counterparty", self.counterparty_id)?;

        if self.lines.is_empty() {
            return Err(ValidationError::required("invoice lines").into());
        }

        if self.lines.len() > MAX_INVOICE_LINES {
            return Err(ValidationError::OutOfRange {
                field: "invoice lines".to_string(),
                min: 1,
                max: MAX_INVOICE_LINES as i64,
            }
            .into());
        }

        for line in &self.lines {
            validate_id("item", line.item_id)?;
            validate_quantity(line.quantity)?;
            validate_price_cents("unit price", line.unit_price_cents)?;
            if self.kind == InvoiceKind::Sales && line.unit_price_cents == 0 {
                return Err(ValidationError::must_be_positive("unit price").into());
            }
            validate_rate_bps("line discount", line.discount_bps)?;
        }

        validate_price_cents("discount", self.discount_cents)?;
        validate_price_cents("shipping", self.shipping_cents)?;
        normalize_optional("notes", self.notes.as_deref(), 1000)?;

        let totals = compute_totals(
            &self.lines,
            tax_rate,
            Money::from_cents(self.discount_cents),
            Money::from_cents(self.shipping_cents),
        );

        if totals.discount > totals.subtotal + totals.tax {
            return Err(ValidationError::OutOfRange {
                field: "discount".to_string(),
                min: 0,
                max: (totals.subtotal + totals.tax).cents(),
            }
            .into());
        }

        Ok(totals)
    }

    /// Total quantity per item across all lines (same item may appear twice).
    pub fn quantity_by_item(&self) -> BTreeMap<i64, i64> {
        let mut demand = BTreeMap::new();
        for line in &self.lines {
            *demand.entry(line.item_id).or_insert(0) += line.quantity;
        }
        demand
    }
}

// =============================================================================
// Totals
// =============================================================================

/// Computed invoice totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceTotals {
    pub subtotal: Money,
    pub tax: Money,
    pub discount: Money,
    pub shipping: Money,
    pub total: Money,
}

/// Applies the invoice formula. No validation; see [`InvoiceDraft::compute`].
pub fn compute_totals(
    lines: &[DraftLine],
    tax_rate: Rate,
    discount: Money,
    shipping: Money,
) -> InvoiceTotals {
    let subtotal: Money = lines.iter().map(DraftLine::line_total).sum();
    let tax = subtotal.calculate_tax(tax_rate);
    let total = subtotal + tax - discount + shipping;

    InvoiceTotals {
        subtotal,
        tax,
        discount,
        shipping,
        total,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
