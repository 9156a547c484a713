//! # Stock Ledger Rules
//!
//! Pure planning of stock movements. Nothing here touches storage: each
//! planner looks at an item snapshot and returns a [`StockMovement`], the
//! exact set of counter deltas and ledger entries that the database layer
//! then writes in one unit of work.
//!
//! ## Counter Invariants
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  current_stock  = Σ quantity of IN, OUT, ADJUSTMENT, INITIAL,          │
//! │                   FULFILLMENT entries                                   │
//! │  reserved_stock = Σ −quantity of RESERVATION entries                   │
//! │                 − Σ −quantity of FULFILLMENT entries                   │
//! │                                                                         │
//! │  Both counters are ≥ 0 after every movement.                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::reference::LedgerReference;
use crate::types::{InventoryItem, TransactionType};
use crate::validation::validate_quantity;

// =============================================================================
// Movement
// =============================================================================

/// A ledger row waiting to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub transaction_type: TransactionType,
    pub quantity: i64,
    pub reference: Option<LedgerReference>,
}

impl LedgerEntry {
    pub fn new(
        transaction_type: TransactionType,
        quantity: i64,
        reference: Option<LedgerReference>,
    ) -> Self {
        LedgerEntry {
            transaction_type,
            quantity,
            reference,
        }
    }
}

/// Planned effect on one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockMovement {
    pub item_id: String,
    pub stock_delta: i64,
    pub reserved_delta: i64,
    /// New moving-average cost, when the movement re-prices the item.
    pub new_cost_cents: Option<i64>,
    pub entries: Vec<LedgerEntry>,
    pub notes: Option<String>,
}

impl StockMovement {
    /// Builds a movement whose counter deltas are derived from its entries.
    pub fn from_entries(item_id: &str, entries: Vec<LedgerEntry>, notes: Option<String>) -> Self {
        let totals = LedgerTotals::from_entries(
            entries.iter().map(|e| (e.transaction_type, e.quantity)),
        );

        StockMovement {
            item_id: item_id.to_string(),
            stock_delta: totals.physical,
            reserved_delta: totals.reserved,
            new_cost_cents: None,
            entries,
            notes,
        }
    }

    pub fn with_cost(mut self, cost_cents: i64) -> Self {
        self.new_cost_cents = Some(cost_cents);
        self
    }

    /// Counter values after applying this movement to `item`.
    ///
    /// Fails with `Consistency` if the result would be negative; planners
    /// never produce such a movement, so this only trips on a stale snapshot.
    pub fn resulting_counters(&self, item: &InventoryItem) -> CoreResult<(i64, i64)> {
        let stock = item.current_stock + self.stock_delta;
        let reserved = item.reserved_stock + self.reserved_delta;

        if stock < 0 {
            return Err(CoreError::Consistency {
                item_id: item.id.clone(),
                field: "current_stock".to_string(),
                cached: item.current_stock,
                ledger: stock,
            });
        }
        if reserved < 0 {
            return Err(CoreError::Consistency {
                item_id: item.id.clone(),
                field: "reserved_stock".to_string(),
                cached: item.reserved_stock,
                ledger: reserved,
            });
        }

        Ok((stock, reserved))
    }
}

// =============================================================================
// Totals & Reconciliation
// =============================================================================

/// Counter values implied by a set of ledger entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LedgerTotals {
    /// Implied `current_stock`.
    pub physical: i64,
    /// Implied `reserved_stock`.
    pub reserved: i64,
}

impl LedgerTotals {
    pub fn add(&mut self, transaction_type: TransactionType, quantity: i64) {
        match transaction_type {
            TransactionType::Reservation => self.reserved -= quantity,
            TransactionType::Fulfillment => {
                self.physical += quantity;
                self.reserved += quantity;
            }
            _ => self.physical += quantity,
        }
    }

    pub fn from_entries(entries: impl IntoIterator<Item = (TransactionType, i64)>) -> Self {
        let mut totals = LedgerTotals::default();
        for (transaction_type, quantity) in entries {
            totals.add(transaction_type, quantity);
        }
        totals
    }
}

/// Compares an item's cached counters with its ledger totals.
pub fn reconcile(item: &InventoryItem, totals: LedgerTotals) -> CoreResult<()> {
    if item.current_stock != totals.physical {
        return Err(CoreError::Consistency {
            item_id: item.id.clone(),
            field: "current_stock".to_string(),
            cached: item.current_stock,
            ledger: totals.physical,
        });
    }
    if item.reserved_stock != totals.reserved {
        return Err(CoreError::Consistency {
            item_id: item.id.clone(),
            field: "reserved_stock".to_string(),
            cached: item.reserved_stock,
            ledger: totals.reserved,
        });
    }
    Ok(())
}

// =============================================================================
// Planners
// =============================================================================

/// Inbound stock: `IN` for receipts, `INITIAL` for opening balances.
pub fn plan_stock_in(
    item: &InventoryItem,
    quantity: i64,
    transaction_type: TransactionType,
    reference: Option<LedgerReference>,
    notes: Option<String>,
) -> CoreResult<StockMovement> {
    validate_quantity(quantity)?;

    if !matches!(transaction_type, TransactionType::In | TransactionType::Initial) {
        return Err(ValidationError::InvalidFormat {
            field: "transaction_type".to_string(),
            reason: "stock in must be IN or INITIAL".to_string(),
        }
        .into());
    }

    let entries = vec![LedgerEntry::new(transaction_type, quantity, reference)];
    Ok(StockMovement::from_entries(&item.id, entries, notes))
}

/// Generic correction.
///
/// Positive deltas return units to stock. Negative deltas beyond the
/// available stock are only possible for pre-sale items: stock is clamped
/// at zero and the deficit is reserved.
pub fn plan_adjustment(
    item: &InventoryItem,
    delta: i64,
    reference: Option<LedgerReference>,
    notes: Option<String>,
) -> CoreResult<StockMovement> {
    if delta == 0 {
        return Err(ValidationError::InvalidFormat {
            field: "delta".to_string(),
            reason: "must not be zero".to_string(),
        }
        .into());
    }

    let requested = -delta;
    if delta > 0 || requested <= item.current_stock {
        let entries = vec![LedgerEntry::new(TransactionType::Adjustment, delta, reference)];
        return Ok(StockMovement::from_entries(&item.id, entries, notes));
    }

    if !item.allow_pre_sale {
        return Err(CoreError::InsufficientStock {
            sku: item.sku.clone(),
            available: item.current_stock,
            requested,
        });
    }

    let deficit = requested - item.current_stock;
    let mut entries = Vec::with_capacity(2);
    if item.current_stock > 0 {
        entries.push(LedgerEntry::new(
            TransactionType::Adjustment,
            -item.current_stock,
            reference.clone(),
        ));
    }
    entries.push(LedgerEntry::new(
        TransactionType::Reservation,
        -deficit,
        Some(LedgerReference::presale_for(reference.as_ref())),
    ));

    Ok(StockMovement::from_entries(&item.id, entries, notes))
}

/// Reserves units for a PRESALE sale without touching physical stock.
pub fn plan_reservation(
    item: &InventoryItem,
    quantity: i64,
    reference: Option<LedgerReference>,
    notes: Option<String>,
) -> CoreResult<StockMovement> {
    validate_quantity(quantity)?;
    ensure_active(item)?;

    let entries = vec![LedgerEntry::new(
        TransactionType::Reservation,
        -quantity,
        Some(LedgerReference::presale_for(reference.as_ref())),
    )];
    Ok(StockMovement::from_entries(&item.id, entries, notes))
}

/// Delivers previously reserved units out of physical stock.
pub fn plan_fulfillment(
    item: &InventoryItem,
    quantity: i64,
    reference: Option<LedgerReference>,
    notes: Option<String>,
) -> CoreResult<StockMovement> {
    validate_quantity(quantity)?;

    if quantity > item.reserved_stock {
        return Err(CoreError::ReservationExceeded {
            sku: item.sku.clone(),
            reserved: item.reserved_stock,
            requested: quantity,
        });
    }
    if quantity > item.current_stock {
        return Err(CoreError::InsufficientStock {
            sku: item.sku.clone(),
            available: item.current_stock,
            requested: quantity,
        });
    }

    let entries = vec![LedgerEntry::new(TransactionType::Fulfillment, -quantity, reference)];
    Ok(StockMovement::from_entries(&item.id, entries, notes))
}

pub(crate) fn ensure_active(item: &InventoryItem) -> CoreResult<()> {
    if item.is_active() {
        Ok(())
    } else {
        Err(CoreError::ItemInactive(item.sku.clone()))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::item;

    #[test]
    fn test_stock_in_rejects_non_positive() {
        let it = item("MUG-01", 0, 1000);
        assert!(plan_stock_in(&it, 0, TransactionType::In, None, None).is_err());
        assert!(plan_stock_in(&it, -3, TransactionType::In, None, None).is_err());
        assert!(plan_stock_in(&it, 3, TransactionType::Out, None, None).is_err());
    }

    #[test]
    fn test_stock_in_movement() {
        let it = item("MUG-01", 4, 1000);
        let movement = plan_stock_in(&it, 6, TransactionType::In, None, None).unwrap();
        assert_eq!(movement.stock_delta, 6);
        assert_eq!(movement.reserved_delta, 0);
        assert_eq!(movement.resulting_counters(&it).unwrap(), (10, 0));
    }

    #[test]
    fn test_adjustment_within_stock() {
        let it = item("MUG-01", 10, 1000);
        let movement = plan_adjustment(&it, -4, None, None).unwrap();
        assert_eq!(movement.entries.len(), 1);
        assert_eq!(movement.entries[0].transaction_type, TransactionType::Adjustment);
        assert_eq!(movement.resulting_counters(&it).unwrap(), (6, 0));
    }

    #[test]
    fn test_adjustment_beyond_stock_without_presale() {
        let it = item("MUG-01", 3, 1000);
        let err = plan_adjustment(&it, -5, None, None).unwrap_err();
        assert!(matches!(err, CoreError::InsufficientStock { available: 3, requested: 5, .. }));
    }

    #[test]
    fn test_adjustment_beyond_stock_with_presale_reserves_deficit() {
        let mut it = item("MUG-01", 3, 1000);
        it.allow_pre_sale = true;

        let movement = plan_adjustment(&it, -5, None, None).unwrap();
        let kinds: Vec<_> = movement
            .entries
            .iter()
            .map(|e| (e.transaction_type, e.quantity))
            .collect();
        assert_eq!(
            kinds,
            vec![(TransactionType::Adjustment, -3), (TransactionType::Reservation, -2)]
        );
        assert_eq!(movement.resulting_counters(&it).unwrap(), (0, 2));
    }

    #[test]
    fn test_zero_adjustment_rejected() {
        let it = item("MUG-01", 3, 1000);
        assert!(plan_adjustment(&it, 0, None, None).is_err());
    }

    #[test]
    fn test_fulfillment_limits() {
        let mut it = item("MUG-01", 2, 1000);
        it.reserved_stock = 5;

        assert!(matches!(
            plan_fulfillment(&it, 6, None, None),
            Err(CoreError::ReservationExceeded { .. })
        ));
        assert!(matches!(
            plan_fulfillment(&it, 3, None, None),
            Err(CoreError::InsufficientStock { .. })
        ));

        let movement = plan_fulfillment(&it, 2, None, None).unwrap();
        assert_eq!(movement.resulting_counters(&it).unwrap(), (0, 3));
    }

    #[test]
    fn test_reconcile() {
        let mut it = item("MUG-01", 0, 1000);
        it.reserved_stock = 5;

        let totals = LedgerTotals::from_entries([
            (TransactionType::In, 10),
            (TransactionType::Out, -10),
            (TransactionType::Reservation, -5),
        ]);
        assert_eq!(totals, LedgerTotals { physical: 0, reserved: 5 });
        assert!(reconcile(&it, totals).is_ok());

        it.current_stock = 1;
        assert!(matches!(reconcile(&it, totals), Err(CoreError::Consistency { .. })));
    }
}
