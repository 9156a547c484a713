//! # Purchases & Sales
//!
//! Totals and payment rules for supplier purchases, plus cart totals for
//! sales. Stock effects live in [`crate::costing`] and [`crate::presale`].
//!
//! ## Payment Status
//! ```text
//! paid == 0             → PENDING
//! 0 < paid < total      → PARTIAL
//! paid == total         → PAID
//!
//! a payment is accepted iff 0 < amount ≤ total − paid
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{Purchase, PurchaseStatus};
use crate::validation::{validate_name, validate_notes, validate_price_cents, validate_quantity};

// =============================================================================
// Purchase Lines
// =============================================================================

/// One line of a purchase as submitted by the operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseLineInput {
    pub item_id: String,
    pub quantity: i64,
    pub unit_cost_cents: i64,
}

impl PurchaseLineInput {
    #[inline]
    pub fn unit_cost(&self) -> Money {
        Money::from_cents(self.unit_cost_cents)
    }

    pub fn total_cost(&self) -> CoreResult<Money> {
        line_amount("total_cost", self.unit_cost(), self.quantity)
    }
}

/// `unit × quantity`, rejected when the product leaves the cents range.
pub(crate) fn line_amount(field: &str, unit: Money, quantity: i64) -> CoreResult<Money> {
    unit.checked_multiply_quantity(quantity).ok_or_else(|| amount_out_of_range(field))
}

/// Sums line amounts, rejected on overflow.
pub(crate) fn sum_amounts<I>(field: &str, amounts: I) -> CoreResult<Money>
where
    I: IntoIterator<Item = CoreResult<Money>>,
{
    amounts.into_iter().try_fold(Money::zero(), |acc, amount| {
        acc.checked_add(amount?).ok_or_else(|| amount_out_of_range(field))
    })
}

fn amount_out_of_range(field: &str) -> CoreError {
    ValidationError::OutOfRange {
        field: field.to_string(),
        min: 0,
        max: i64::MAX,
    }
    .into()
}

/// Validates a purchase before anything is written.
pub fn validate_purchase(
    supplier_name: &str,
    notes: Option<&str>,
    lines: &[PurchaseLineInput],
) -> CoreResult<()> {
    validate_name("supplier_name", supplier_name)?;
    validate_notes("notes", notes)?;

    if lines.is_empty() {
        return Err(ValidationError::required("items").into());
    }

    for line in lines {
        if line.item_id.trim().is_empty() {
            return Err(ValidationError::required("item_id").into());
        }
        validate_quantity(line.quantity)?;
        validate_price_cents(line.unit_cost_cents)?;
    }

    purchase_total(lines)?;
    Ok(())
}

/// `Σ quantity × unit_cost`.
pub fn purchase_total(lines: &[PurchaseLineInput]) -> CoreResult<Money> {
    sum_amounts("total_amount", lines.iter().map(PurchaseLineInput::total_cost))
}

// =============================================================================
// Payments
// =============================================================================

/// Status implied by the paid amount.
pub fn derive_status(total: Money, paid: Money) -> PurchaseStatus {
    if paid.is_positive() && paid >= total {
        PurchaseStatus::Paid
    } else if paid.is_positive() {
        PurchaseStatus::Partial
    } else if total.is_zero() {
        PurchaseStatus::Paid
    } else {
        PurchaseStatus::Pending
    }
}

/// Outcome of a payment that passed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentApplication {
    pub paid_amount: Money,
    pub status: PurchaseStatus,
}

/// Checks a payment against the open balance and returns the new
/// paid amount and status.
///
/// ```rust
/// # use stockbook_core::purchase::apply_payment;
/// # use stockbook_core::types::PurchaseStatus;
/// # use stockbook_core::Money;
/// let applied = apply_payment(Money::from_cents(10_000), Money::zero(), Money::from_cents(6_000)).unwrap();
/// assert_eq!(applied.status, PurchaseStatus::Partial);
/// ```
pub fn apply_payment(total: Money, paid: Money, amount: Money) -> CoreResult<PaymentApplication> {
    if !amount.is_positive() {
        return Err(CoreError::invalid_amount("payment must be greater than zero"));
    }

    let remaining = total - paid;
    if amount > remaining {
        return Err(CoreError::invalid_amount(format!(
            "payment of {} exceeds the remaining balance of {}",
            amount, remaining
        )));
    }

    let paid_amount = paid + amount;
    Ok(PaymentApplication {
        paid_amount,
        status: derive_status(total, paid_amount),
    })
}

impl Purchase {
    /// [`apply_payment`] against this purchase's current balance.
    pub fn accept_payment(&self, amount: Money) -> CoreResult<PaymentApplication> {
        apply_payment(self.total_amount(), self.paid_amount(), amount)
    }
}

// =============================================================================
// Sale Cart
// =============================================================================

/// One cart line of a sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CartLineInput {
    pub item_id: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub override_price_cents: Option<i64>,
}

impl CartLineInput {
    /// `(override ?? unit) × quantity`.
    pub fn line_total(&self) -> CoreResult<Money> {
        let unit = Money::from_cents(self.override_price_cents.unwrap_or(self.unit_price_cents));
        line_amount("line_total", unit, self.quantity)
    }
}

pub fn validate_cart(client_id: &str, lines: &[CartLineInput]) -> CoreResult<()> {
    if client_id.trim().is_empty() {
        return Err(ValidationError::required("client_id").into());
    }
    if lines.is_empty() {
        return Err(ValidationError::required("cart").into());
    }

    for line in lines {
        if line.item_id.trim().is_empty() {
            return Err(ValidationError::required("item_id").into());
        }
        validate_quantity(line.quantity)?;
        validate_price_cents(line.unit_price_cents)?;
        if let Some(price) = line.override_price_cents {
            validate_price_cents(price)?;
        }
    }

    cart_total(lines)?;
    Ok(())
}

pub fn cart_total(lines: &[CartLineInput]) -> CoreResult<Money> {
    sum_amounts("total_amount", lines.iter().map(CartLineInput::line_total))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn line(item_id: &str, quantity: i64, unit_cost_cents: i64) -> PurchaseLineInput {
        PurchaseLineInput {
            item_id: item_id.to_string(),
            quantity,
            unit_cost_cents,
        }
    }

    #[test]
    fn test_purchase_total() {
        let lines = [line("a", 5, 800), line("b", 2, 1250)];
        assert_eq!(purchase_total(&lines).unwrap().cents(), 6500);
    }

    #[test]
    fn test_validate_purchase() {
        assert!(validate_purchase("ACME", None, &[line("a", 1, 0)]).is_ok());
        assert!(validate_purchase("", None, &[line("a", 1, 0)]).is_err());
        assert!(validate_purchase("ACME", None, &[]).is_err());
        assert!(validate_purchase("ACME", None, &[line("a", 0, 100)]).is_err());
        assert!(validate_purchase("ACME", None, &[line("a", 1, -1)]).is_err());
    }

    #[test]
    fn test_derive_status() {
        let total = Money::from_cents(10_000);
        assert_eq!(derive_status(total, Money::zero()), PurchaseStatus::Pending);
        assert_eq!(derive_status(total, Money::from_cents(1)), PurchaseStatus::Partial);
        assert_eq!(derive_status(total, total), PurchaseStatus::Paid);
    }

    #[test]
    fn test_partial_then_overpay_then_settle() {
        let total = Money::from_cents(10_000);

        let first = apply_payment(total, Money::zero(), Money::from_cents(6_000)).unwrap();
        assert_eq!(first.status, PurchaseStatus::Partial);

        let over = apply_payment(total, first.paid_amount, Money::from_cents(4_100));
        assert!(matches!(over, Err(CoreError::InvalidAmount { .. })));

        let settled = apply_payment(total, first.paid_amount, Money::from_cents(4_000)).unwrap();
        assert_eq!(settled.status, PurchaseStatus::Paid);
        assert_eq!(settled.paid_amount, total);

        // Replaying the same payment is rejected once settled.
        let replay = apply_payment(total, settled.paid_amount, Money::from_cents(4_000));
        assert!(matches!(replay, Err(CoreError::InvalidAmount { .. })));
    }

    #[test]
    fn test_non_positive_payment_rejected() {
        let total = Money::from_cents(10_000);
        assert!(apply_payment(total, Money::zero(), Money::zero()).is_err());
        assert!(apply_payment(total, Money::zero(), Money::from_cents(-5)).is_err());
    }

    #[test]
    fn test_cart_total_prefers_override() {
        let lines = [
            CartLineInput {
                item_id: "a".to_string(),
                quantity: 2,
                unit_price_cents: 1000,
                override_price_cents: Some(900),
            },
            CartLineInput {
                item_id: "b".to_string(),
                quantity: 1,
                unit_price_cents: 500,
                override_price_cents: None,
            },
        ];
        assert_eq!(cart_total(&lines).unwrap().cents(), 2300);
        assert!(validate_cart("client-1", &lines).is_ok());
        assert!(validate_cart(" ", &lines).is_err());
    }

    #[test]
    fn test_oversized_unit_cost_rejected() {
        let err = validate_purchase("ACME", None, &[line("a", 3, i64::MAX / 2)]).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::OutOfRange { max: crate::MAX_PRICE_CENTS, .. })
        ));
    }

    #[test]
    fn test_totals_at_the_bounds_do_not_overflow() {
        let lines = [line("a", crate::MAX_LINE_QUANTITY, crate::MAX_PRICE_CENTS)];
        assert!(validate_purchase("ACME", None, &lines).is_ok());
        assert_eq!(
            purchase_total(&lines).unwrap().cents(),
            crate::MAX_LINE_QUANTITY * crate::MAX_PRICE_CENTS
        );

        let unbounded = [line("a", 3, i64::MAX / 2)];
        assert!(matches!(
            purchase_total(&unbounded),
            Err(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));
    }

    #[test]
    fn test_cart_rejects_oversized_prices() {
        let mut cart = CartLineInput {
            item_id: "a".to_string(),
            quantity: 3,
            unit_price_cents: i64::MAX / 2,
            override_price_cents: None,
        };
        assert!(matches!(
            validate_cart("client-1", std::slice::from_ref(&cart)),
            Err(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));
        assert!(cart.line_total().is_err());

        cart.unit_price_cents = 100;
        cart.override_price_cents = Some(i64::MAX / 2);
        assert!(validate_cart("client-1", std::slice::from_ref(&cart)).is_err());
    }
}
