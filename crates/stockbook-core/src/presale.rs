//! # Pre-Sale Manager
//!
//! Decides how an outbound request is fulfilled.
//!
//! ## Decision Table
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  request q, stock S                                                     │
//! │                                                                         │
//! │  q ≤ S                      → OUT −q                                    │
//! │  q > S, pre-sale disabled   → InsufficientStock (nothing written)       │
//! │  q > S, pre-sale enabled    → OUT −S (if S > 0)                         │
//! │                               RESERVATION −(q − S)  isPreSale: true     │
//! │                               current_stock = 0                         │
//! │                               reserved_stock += q − S                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::ledger::{ensure_active, LedgerEntry, StockMovement};
use crate::reference::LedgerReference;
use crate::types::{InventoryItem, TransactionType};
use crate::validation::validate_quantity;

/// How an outbound request was split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct OutboundSplit {
    /// Units taken from physical stock.
    pub regular_units: i64,
    /// Units promised for later delivery.
    pub pre_sale_units: i64,
}

impl OutboundSplit {
    /// Splits `quantity` against the item's stock, or rejects it.
    pub fn decide(item: &InventoryItem, quantity: i64) -> CoreResult<Self> {
        let stock = item.current_stock.max(0);

        if quantity <= stock {
            return Ok(OutboundSplit {
                regular_units: quantity,
                pre_sale_units: 0,
            });
        }

        if !item.allow_pre_sale {
            return Err(CoreError::InsufficientStock {
                sku: item.sku.clone(),
                available: stock,
                requested: quantity,
            });
        }

        Ok(OutboundSplit {
            regular_units: stock,
            pre_sale_units: quantity - stock,
        })
    }

    #[inline]
    pub fn is_split(&self) -> bool {
        self.pre_sale_units > 0
    }
}

/// Plans an outbound movement of `quantity` units.
pub fn plan_outbound(
    item: &InventoryItem,
    quantity: i64,
    reference: Option<LedgerReference>,
    notes: Option<String>,
) -> CoreResult<(StockMovement, OutboundSplit)> {
    validate_quantity(quantity)?;
    ensure_active(item)?;

    let split = OutboundSplit::decide(item, quantity)?;

    let mut entries = Vec::with_capacity(2);
    if split.regular_units > 0 {
        entries.push(LedgerEntry::new(
            TransactionType::Out,
            -split.regular_units,
            reference.clone(),
        ));
    }
    if split.is_split() {
        entries.push(LedgerEntry::new(
            TransactionType::Reservation,
            -split.pre_sale_units,
            Some(LedgerReference::presale_for(reference.as_ref())),
        ));
    }

    Ok((StockMovement::from_entries(&item.id, entries, notes), split))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::item;
    use crate::types::RecordStatus;

    #[test]
    fn test_regular_fulfillment() {
        let it = item("MUG-01", 10, 1000);
        let (movement, split) = plan_outbound(&it, 4, None, None).unwrap();

        assert!(!split.is_split());
        assert_eq!(movement.entries, vec![LedgerEntry::new(TransactionType::Out, -4, None)]);
        assert_eq!(movement.resulting_counters(&it).unwrap(), (6, 0));
    }

    #[test]
    fn test_rejects_without_presale() {
        let it = item("MUG-01", 10, 1000);
        let err = plan_outbound(&it, 15, None, None).unwrap_err();
        assert!(matches!(
            err,
            CoreError::InsufficientStock { available: 10, requested: 15, .. }
        ));
    }

    #[test]
    fn test_split_with_presale() {
        let mut it = item("MUG-01", 10, 1000);
        it.allow_pre_sale = true;

        let (movement, split) = plan_outbound(&it, 15, None, None).unwrap();
        assert_eq!(
            split,
            OutboundSplit {
                regular_units: 10,
                pre_sale_units: 5
            }
        );
        assert_eq!(movement.entries.len(), 2);
        assert_eq!(movement.entries[0].quantity, -10);
        assert_eq!(movement.entries[1].transaction_type, TransactionType::Reservation);
        assert_eq!(movement.entries[1].quantity, -5);
        assert!(matches!(
            movement.entries[1].reference,
            Some(LedgerReference::Presale { is_pre_sale: true, .. })
        ));
        assert_eq!(movement.resulting_counters(&it).unwrap(), (0, 5));
    }

    #[test]
    fn test_empty_stock_reserves_everything() {
        let mut it = item("MUG-01", 0, 1000);
        it.allow_pre_sale = true;

        let (movement, split) = plan_outbound(&it, 3, None, None).unwrap();
        assert_eq!(split.regular_units, 0);
        assert_eq!(movement.entries.len(), 1);
        assert_eq!(movement.entries[0].transaction_type, TransactionType::Reservation);
    }

    #[test]
    fn test_inactive_item_rejected() {
        let mut it = item("MUG-01", 10, 1000);
        it.status = RecordStatus::Inactive;
        assert!(matches!(
            plan_outbound(&it, 1, None, None),
            Err(CoreError::ItemInactive(_))
        ));
    }
}
