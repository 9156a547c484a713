//! # Cost Averager
//!
//! Moving-average cost, recomputed every time stock arrives on a purchase.
//!
//! ```text
//! new_cost = (S₀ × C₀ + q × u) / (S₀ + q)        S₀ + q == 0  →  u
//!
//!   S₀  stock before the receipt     C₀  current cost basis
//!   q   units received               u   unit cost on the invoice
//! ```

use crate::error::CoreResult;
use crate::ledger::{LedgerEntry, StockMovement};
use crate::money::{div_round, Money};
use crate::reference::LedgerReference;
use crate::types::{InventoryItem, TransactionType};
use crate::validation::{validate_price_cents, validate_quantity};

/// Stock-weighted average of the old and incoming unit costs.
///
/// ```rust
/// use stockbook_core::costing::moving_average_cost;
/// use stockbook_core::Money;
///
/// let cost = moving_average_cost(5, Money::from_cents(800), 5, Money::from_cents(1200));
/// assert_eq!(cost.cents(), 1000);
/// ```
pub fn moving_average_cost(
    current_stock: i64,
    current_cost: Money,
    quantity: i64,
    unit_cost: Money,
) -> Money {
    // Negative stock carries no weight.
    let stock = current_stock.max(0) as i128;
    let total_units = stock + quantity as i128;

    let weighted = stock * current_cost.cents() as i128 + quantity as i128 * unit_cost.cents() as i128;

    match div_round(weighted, total_units) {
        Some(cost) if total_units > 0 => Money::from_cents(cost as i64),
        _ => unit_cost,
    }
}

/// Plans the receipt of one purchase line: re-prices the item and appends
/// an `IN` entry carrying the cost trail.
pub fn plan_purchase_receipt(
    item: &InventoryItem,
    purchase_id: &str,
    quantity: i64,
    unit_cost: Money,
) -> CoreResult<StockMovement> {
    validate_quantity(quantity)?;
    validate_price_cents(unit_cost.cents())?;

    let previous_cost = item.cost_basis();
    let new_cost = moving_average_cost(item.current_stock, previous_cost, quantity, unit_cost);

    let reference = LedgerReference::Purchase {
        purchase_id: purchase_id.to_string(),
        unit_cost_cents: unit_cost.cents(),
        previous_cost_cents: previous_cost.cents(),
        new_cost_cents: new_cost.cents(),
    };

    let entries = vec![LedgerEntry::new(TransactionType::In, quantity, Some(reference))];
    Ok(StockMovement::from_entries(&item.id, entries, None).with_cost(new_cost.cents()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::item;

    #[test]
    fn test_empty_stock_takes_incoming_cost() {
        let cost = moving_average_cost(0, Money::from_cents(1000), 5, Money::from_cents(800));
        assert_eq!(cost.cents(), 800);
    }

    #[test]
    fn test_weighted_average() {
        let cost = moving_average_cost(5, Money::from_cents(800), 5, Money::from_cents(1200));
        assert_eq!(cost.cents(), 1000);

        // (3 × 1.00 + 1 × 2.00) / 4 = 1.25
        let cost = moving_average_cost(3, Money::from_cents(100), 1, Money::from_cents(200));
        assert_eq!(cost.cents(), 125);
    }

    #[test]
    fn test_rounds_to_nearest_cent() {
        // (2 × 1.00 + 1 × 1.01) / 3 = 1.00333…
        let cost = moving_average_cost(2, Money::from_cents(100), 1, Money::from_cents(101));
        assert_eq!(cost.cents(), 100);
    }

    #[test]
    fn test_zero_units_guard() {
        let cost = moving_average_cost(0, Money::from_cents(1000), 0, Money::from_cents(700));
        assert_eq!(cost.cents(), 700);
    }

    #[test]
    fn test_receipt_uses_base_price_when_never_costed() {
        let it = item("MUG-01", 5, 800);
        let movement = plan_purchase_receipt(&it, "p-1", 5, Money::from_cents(1200)).unwrap();

        assert_eq!(movement.new_cost_cents, Some(1000));
        assert_eq!(movement.stock_delta, 5);
        assert_eq!(
            movement.entries[0].reference,
            Some(LedgerReference::Purchase {
                purchase_id: "p-1".to_string(),
                unit_cost_cents: 1200,
                previous_cost_cents: 800,
                new_cost_cents: 1000,
            })
        );
    }

    #[test]
    fn test_receipt_rejects_negative_cost() {
        let it = item("MUG-01", 5, 800);
        assert!(plan_purchase_receipt(&it, "p-1", 5, Money::from_cents(-1)).is_err());
    }
}
