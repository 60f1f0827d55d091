//! # Stock Ledger Rules
//!
//! Validation for manual stock movements (issue, receive, transfer) and the
//! shared "may this removal happen?" check used by every stock-decrementing
//! flow.
//!
//! ## Movement Effects
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  issue     item.qty −= q                     (from = item's warehouse)  │
//! │  receive   item.qty += q                     (to   = item's warehouse)  │
//! │  transfer  item.qty −= q                                                │
//! │            twin.qty += q   twin = same SKU in `to` warehouse,           │
//! │                            created with qty 0 when missing              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::types::TransactionType;
use crate::validation::{normalize_optional, validate_id, validate_quantity};

/// A stock movement as entered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTransaction {
    pub kind: TransactionType,
    pub item_id: i64,
    pub quantity: i64,
    #[serde(default)]
    pub from_warehouse: Option<i64>,
    #[serde(default)]
    pub to_warehouse: Option<i64>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewTransaction {
    pub fn issue(item_id: i64, quantity: i64) -> Self {
        NewTransaction {
            kind: TransactionType::Issue,
            item_id,
            quantity,
            from_warehouse: None,
            to_warehouse: None,
            notes: None,
        }
    }

    pub fn receive(item_id: i64, quantity: i64) -> Self {
        NewTransaction {
            kind: TransactionType::Receive,
            ..NewTransaction::issue(item_id, quantity)
        }
    }

    pub fn transfer(item_id: i64, quantity: i64, to_warehouse: i64) -> Self {
        NewTransaction {
            kind: TransactionType::Transfer,
            to_warehouse: Some(to_warehouse),
            ..NewTransaction::issue(item_id, quantity)
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Checks the movement on its own, before any stock is consulted.
    ///
    /// Returns the trimmed notes.
    pub fn validate(&self) -> CoreResult<Option<String>> {
        validate_id("item", self.item_id)?;
        validate_quantity(self.quantity)?;

        if self.kind == TransactionType::Transfer {
            let to = self
                .to_warehouse
                .ok_or_else(|| ValidationError::required("destination warehouse"))?;
            validate_id("destination warehouse", to)?;

            if self.from_warehouse == Some(to) {
                return Err(ValidationError::InvalidFormat {
                    field: "destination warehouse".to_string(),
                    reason: "must differ from the source warehouse".to_string(),
                }
                .into());
            }
        }

        Ok(normalize_optional("notes", self.notes.as_deref(), 1000)?)
    }

    /// Stock change applied to the source item.
    pub fn source_delta(&self) -> i64 {
        match self.kind {
            TransactionType::Receive => self.quantity,
            TransactionType::Issue | TransactionType::Transfer => -self.quantity,
        }
    }
}

/// Rejects a removal that would take stock below zero.
///
/// A no-op when `allow_negative` is set.
///
/// ## Example
/// ```rust
/// use invpro_core::ledger::check_removal;
///
/// assert!(check_removal("WID-01", 5, 5, false).is_ok());
/// assert!(check_removal("WID-01", 5, 6, false).is_err());
/// assert!(check_removal("WID-01", 5, 6, true).is_ok());
/// ```
pub fn check_removal(sku: &str, available: i64, requested: i64, allow_negative: bool) -> CoreResult<()> {
    if !allow_negative && requested > available {
        return Err(CoreError::InsufficientStock {
            sku: sku.to_string(),
            available,
            requested,
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_delta_by_kind() {
        assert_eq!(NewTransaction::issue(1, 4).source_delta(), -4);
        assert_eq!(NewTransaction::receive(1, 4).source_delta(), 4);
        assert_eq!(NewTransaction::transfer(1, 4, 2).source_delta(), -4);
    }

    #[test]
    fn test_validate_trims_notes() {
        let tx = NewTransaction::receive(1, 10).with_notes("  restock  ");
        assert_eq!(tx.validate().unwrap(), Some("restock".to_string()));
    }

    #[test]
    fn test_transfer_needs_distinct_destination() {
        let mut tx = NewTransaction::transfer(1, 2, 3);
        assert!(tx.validate().is_ok());

        tx.from_warehouse = Some(3);
        assert!(tx.validate().is_err());

        tx.to_warehouse = None;
        assert!(tx.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_quantity() {
        assert!(NewTransaction::issue(1, 0).validate().is_err());
        assert!(NewTransaction::issue(1, -2).validate().is_err());
        assert!(NewTransaction::issue(0, 2).validate().is_err());
    }

    #[test]
    fn test_check_removal() {
        let err = check_removal("BOX", 3, 5, false).unwrap_err();
        assert_eq!(
            err,
            CoreError::InsufficientStock {
                sku: "BOX".to_string(),
                available: 3,
                requested: 5
            }
        );
        assert!(check_removal("BOX", -10, 5, true).is_ok());
    }
}
