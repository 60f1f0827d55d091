//! # Stock Audit
//!
//! Physical-count sheets and the adjustments derived from them.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  items ──► AuditSheet (system qty, counted = system)                    │
//! │                │                                                        │
//! │                ▼  set_count(item, 45)                                   │
//! │            row status: Match │ Shortage │ Surplus                       │
//! │                │                                                        │
//! │                ▼  plan_adjustments(counts, current)                     │
//! │            [ { item, old: 50, new: 45, delta: −5 } ]                    │
//! │                                                                         │
//! │  Rows whose count equals the system quantity produce nothing.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{CoreError, CoreResult};
use crate::types::Item;
use crate::validation::validate_non_negative_quantity;

/// Comparison of counted against system stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditStatus {
    Match,
    Shortage,
    Surplus,
}

/// One item on an audit sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRow {
    pub item_id: i64,
    pub name: String,
    pub sku: String,
    pub warehouse_id: Option<i64>,
    pub system_quantity: i64,
    pub counted_quantity: i64,
}

impl AuditRow {
    pub fn delta(&self) -> i64 {
        self.counted_quantity - self.system_quantity
    }

    pub fn status(&self) -> AuditStatus {
        match self.delta() {
            0 => AuditStatus::Match,
            d if d < 0 => AuditStatus::Shortage,
            _ => AuditStatus::Surplus,
        }
    }
}

/// A stock-count worksheet. Counted quantities start equal to system stock.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditSheet {
    pub rows: Vec<AuditRow>,
}

impl AuditSheet {
    pub fn from_items(items: &[Item]) -> Self {
        let rows = items
            .iter()
            .map(|item| AuditRow {
                item_id: item.id,
                name: item.name.clone(),
                sku: item.sku.clone(),
                warehouse_id: item.warehouse_id,
                system_quantity: item.quantity,
                counted_quantity: item.quantity,
            })
            .collect();
        AuditSheet { rows }
    }

    /// Records a count for one item.
    pub fn set_count(&mut self, item_id: i64, counted: i64) -> CoreResult<()> {
        validate_non_negative_quantity("counted quantity", counted)?;
        let row = self
            .rows
            .iter_mut()
            .find(|r| r.item_id == item_id)
            .ok_or(CoreError::ItemNotFound(item_id))?;
        row.counted_quantity = counted;
        Ok(())
    }

    /// Rows with the given status.
    pub fn with_status(&self, status: AuditStatus) -> Vec<&AuditRow> {
        self.rows.iter().filter(|r| r.status() == status).collect()
    }

    /// Counts that differ from the system quantity, keyed by item.
    pub fn counts(&self) -> BTreeMap<i64, i64> {
        self.rows
            .iter()
            .filter(|r| r.status() != AuditStatus::Match)
            .map(|r| (r.item_id, r.counted_quantity))
            .collect()
    }
}

/// One correction to write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockAdjustment {
    pub item_id: i64,
    pub old_quantity: i64,
    pub new_quantity: i64,
    pub delta: i64,
}

/// Diffs counted quantities against current stock.
///
/// `current` is `(item_id, quantity)` for every item that was counted, read
/// inside the same transaction that will apply the result.
///
/// ## Errors
/// - `Validation` when a count is negative
/// - `ItemNotFound` when a counted item is missing from `current`
pub fn plan_adjustments(
    counted: &BTreeMap<i64, i64>,
    current: &[(i64, i64)],
) -> CoreResult<Vec<StockAdjustment>> {
    let mut adjustments = Vec::new();

    for (&item_id, &new_quantity) in counted {
        validate_non_negative_quantity("counted quantity", new_quantity)?;

        let old_quantity = current
            .iter()
            .find(|(id, _)| *id == item_id)
            .map(|(_, qty)| *qty)
            .ok_or(CoreError::ItemNotFound(item_id))?;

        if new_quantity != old_quantity {
            adjustments.push(StockAdjustment {
                item_id,
                old_quantity,
                new_quantity,
                delta: new_quantity - old_quantity,
            });
        }
    }

    Ok(adjustments)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn item(id: i64, qty: i64) -> Item {
        Item {
            id,
            name: format!("Item {}", id),
            sku: format!("SKU-{}", id),
            quantity: qty,
            min_quantity: 0,
            buy_price_cents: 100,
            sell_price_cents: 150,
            warehouse_id: Some(1),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_single_shortage_produces_one_adjustment() {
        let mut sheet = AuditSheet::from_items(&[item(1, 50), item(2, 10)]);
        sheet.set_count(1, 45).unwrap();

        assert_eq!(sheet.with_status(AuditStatus::Shortage).len(), 1);
        assert_eq!(sheet.with_status(AuditStatus::Match).len(), 1);

        let plan = plan_adjustments(&sheet.counts(), &[(1, 50), (2, 10)]).unwrap();
        assert_eq!(
            plan,
            vec![StockAdjustment {
                item_id: 1,
                old_quantity: 50,
                new_quantity: 45,
                delta: -5
            }]
        );
    }

    #[test]
    fn test_surplus_status() {
        let mut sheet = AuditSheet::from_items(&[item(1, 3)]);
        sheet.set_count(1, 8).unwrap();
        assert_eq!(sheet.rows[0].status(), AuditStatus::Surplus);
        assert_eq!(sheet.rows[0].delta(), 5);
    }

    #[test]
    fn test_unchanged_counts_produce_nothing() {
        let counted = BTreeMap::from([(1, 50), (2, 10)]);
        let plan = plan_adjustments(&counted, &[(1, 50), (2, 10)]).unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn test_rejects_negative_and_unknown() {
        let mut sheet = AuditSheet::from_items(&[item(1, 5)]);
        assert!(sheet.set_count(1, -1).is_err());
        assert_eq!(sheet.set_count(9, 1), Err(CoreError::ItemNotFound(9)));

        let counted = BTreeMap::from([(9, 1)]);
        assert_eq!(
            plan_adjustments(&counted, &[(1, 5)]),
            Err(CoreError::ItemNotFound(9))
        );
    }

    #[test]
    fn test_plan_uses_current_not_sheet_quantity() {
        // Stock moved between opening the sheet and applying it
        let counted = BTreeMap::from([(1, 45)]);
        let plan = plan_adjustments(&counted, &[(1, 48)]).unwrap();
        assert_eq!(plan[0].old_quantity, 48);
        assert_eq!(plan[0].delta, -3);
    }
}
