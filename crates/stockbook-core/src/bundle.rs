//! # Bundle Engine
//!
//! Pricing, margin and edit-diffing for bundles (kits sold as one unit).
//!
//! ## Pricing
//! ```text
//! total_base_price     = Σ (override_i ?? base_price_i) × qty_i
//! total_estimated_cost = Σ estimated_unit_cost_i × qty_i
//! discounted_price     = list_price × (1 − discount)
//! savings              = list_price − discounted_price
//! profit               = discounted_price − estimated_cost
//! profit_percentage    = profit / discounted_price   (0 when price is 0)
//! ```
//!
//! ## Pricing Modes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Derived (creation flow)            Direct (edit flow)                 │
//! │  ───────────────────────────        ─────────────────────────────      │
//! │  list price = component total       list price = operator amount       │
//! │  computed in USD                    already in the bundle currency     │
//! │  BS bundles: × conversion rate      never converted                    │
//! │  cost = component estimate          cost = amount / (1 + margin)       │
//! │                                     or converted component estimate    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreResult, ValidationError};
use crate::money::{ExchangeRate, Money, Percentage, BPS_SCALE};
use crate::purchase::{line_amount, sum_amounts};
use crate::types::{CurrencyType, InventoryItem, PricingModeKind};
use crate::validation::{validate_price_cents, validate_quantity};

// =============================================================================
// Pricing Mode
// =============================================================================

/// How a bundle's list price is established.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "mode", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PricingMode {
    /// Computed from components in USD.
    Derived {
        currency: CurrencyType,
        #[serde(rename = "conversionRate")]
        conversion_rate: Option<ExchangeRate>,
    },

    /// Entered by the operator in the bundle's own currency.
    Direct {
        amount: Money,
        currency: CurrencyType,
        margin: Option<Percentage>,
        #[serde(rename = "conversionRate")]
        conversion_rate: Option<ExchangeRate>,
    },
}

impl PricingMode {
    pub fn kind(&self) -> PricingModeKind {
        match self {
            PricingMode::Derived { .. } => PricingModeKind::Derived,
            PricingMode::Direct { .. } => PricingModeKind::Direct,
        }
    }

    pub fn currency(&self) -> CurrencyType {
        match self {
            PricingMode::Derived { currency, .. } | PricingMode::Direct { currency, .. } => *currency,
        }
    }

    pub fn conversion_rate(&self) -> Option<ExchangeRate> {
        match self {
            PricingMode::Derived {
                conversion_rate, ..
            }
            | PricingMode::Direct {
                conversion_rate, ..
            } => *conversion_rate,
        }
    }

    pub fn margin(&self) -> Option<Percentage> {
        match self {
            PricingMode::Direct { margin, .. } => *margin,
            PricingMode::Derived { .. } => None,
        }
    }

    /// Checks the mode is internally coherent.
    ///
    /// Derived BS bundles need a rate; rates must be positive; direct
    /// amounts must not be negative.
    pub fn validate(&self) -> CoreResult<()> {
        if let Some(rate) = self.conversion_rate() {
            if !rate.is_positive() {
                return Err(ValidationError::must_be_positive("conversion_rate").into());
            }
        }

        match self {
            PricingMode::Derived {
                currency: CurrencyType::Bs,
                conversion_rate: None,
            } => Err(ValidationError::required("conversion_rate").into()),
            PricingMode::Direct { amount, .. } => {
                validate_price_cents(amount.cents())?;
                Ok(())
            }
            PricingMode::Derived { .. } => Ok(()),
        }
    }

    /// Expresses a USD amount in the bundle's display currency.
    ///
    /// USD bundles, and BS bundles without a rate, return the amount as is.
    pub fn display_amount(&self, usd: Money) -> Money {
        match (self.currency(), self.conversion_rate()) {
            (CurrencyType::Bs, Some(rate)) => usd.convert(rate),
            _ => usd,
        }
    }
}

// =============================================================================
// Components
// =============================================================================

/// One bundle line as requested by the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct BundleLineInput {
    pub item_id: String,
    pub quantity: i64,
    pub override_price_cents: Option<i64>,
}

/// Pricing inputs of one bundle line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BundleComponent {
    pub base_price: Money,
    pub estimated_unit_cost: Money,
    pub override_price: Option<Money>,
    pub quantity: i64,
}

impl BundleComponent {
    pub fn new(item: &InventoryItem, quantity: i64, override_price: Option<Money>) -> Self {
        BundleComponent {
            base_price: item.base_price(),
            estimated_unit_cost: item.estimated_unit_cost(),
            override_price,
            quantity,
        }
    }

    /// Unit price inside the bundle.
    #[inline]
    pub fn unit_price(&self) -> Money {
        self.override_price.unwrap_or(self.base_price)
    }

    pub fn line_total(&self) -> CoreResult<Money> {
        line_amount("line_total", self.unit_price(), self.quantity)
    }

    pub fn line_cost(&self) -> CoreResult<Money> {
        line_amount("line_cost", self.estimated_unit_cost, self.quantity)
    }
}

/// Validates the requested lines of a bundle.
pub fn validate_bundle_lines(lines: &[BundleLineInput]) -> CoreResult<()> {
    if lines.is_empty() {
        return Err(ValidationError::required("items").into());
    }

    let mut seen = HashSet::with_capacity(lines.len());
    for line in lines {
        if line.item_id.trim().is_empty() {
            return Err(ValidationError::required("item_id").into());
        }
        validate_quantity(line.quantity)?;
        if let Some(price) = line.override_price_cents {
            validate_price_cents(price)?;
        }
        if !seen.insert(line.item_id.as_str()) {
            return Err(ValidationError::Duplicate {
                field: "item_id".to_string(),
                value: line.item_id.clone(),
            }
            .into());
        }
    }

    Ok(())
}

/// Validates a discount percentage (0-100%).
pub fn validate_discount(discount: Percentage) -> CoreResult<()> {
    if !(0..=BPS_SCALE).contains(&discount.bps()) {
        return Err(ValidationError::OutOfRange {
            field: "discount_percentage".to_string(),
            min: 0,
            max: BPS_SCALE,
        }
        .into());
    }
    Ok(())
}

// =============================================================================
// Pricing
// =============================================================================

/// Read-time pricing of a bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct BundlePricing {
    /// Component list total in USD.
    pub total_base_price: Money,
    /// Component cost estimate in USD.
    pub total_estimated_cost: Money,

    /// Price before discount, in `currency` units for direct bundles and
    /// in USD for derived ones.
    pub list_price: Money,
    pub discounted_price: Money,
    pub savings: Money,
    pub estimated_cost: Money,
    pub profit: Money,
    pub profit_percentage: Percentage,

    pub currency: CurrencyType,
    /// Discounted price in the bundle currency.
    pub display_price: Money,
}

/// Prices a bundle from its components.
///
/// Fails with [`ValidationError::OutOfRange`] when a component total
/// does not fit in cents.
///
/// ```rust
/// use stockbook_core::bundle::{price_bundle, BundleComponent, PricingMode};
/// use stockbook_core::money::{Money, Percentage};
/// use stockbook_core::types::CurrencyType;
///
/// let components = [
///     BundleComponent { base_price: Money::from_cents(1000), estimated_unit_cost: Money::zero(), override_price: None, quantity: 1 },
///     BundleComponent { base_price: Money::from_cents(2000), estimated_unit_cost: Money::zero(), override_price: None, quantity: 1 },
/// ];
/// let mode = PricingMode::Derived { currency: CurrencyType::Usd, conversion_rate: None };
///
/// let pricing = price_bundle(&components, &mode, Percentage::from_bps(1000)).unwrap();
/// assert_eq!(pricing.total_base_price.cents(), 3000);
/// assert_eq!(pricing.discounted_price.cents(), 2700);
/// assert_eq!(pricing.savings.cents(), 300);
/// ```
pub fn price_bundle(
    components: &[BundleComponent],
    mode: &PricingMode,
    discount: Percentage,
) -> CoreResult<BundlePricing> {
    let total_base_price =
        sum_amounts("total_base_price", components.iter().map(BundleComponent::line_total))?;
    let total_estimated_cost =
        sum_amounts("total_estimated_cost", components.iter().map(BundleComponent::line_cost))?;

    let (list_price, estimated_cost, converts) = match mode {
        PricingMode::Derived { .. } => (total_base_price, total_estimated_cost, true),
        PricingMode::Direct { amount, margin, .. } => {
            let cost = match margin {
                Some(margin) => amount.remove_markup(*margin),
                None => mode.display_amount(total_estimated_cost),
            };
            (*amount, cost, false)
        }
    };

    let discounted_price = list_price.apply_discount(discount);
    let savings = list_price - discounted_price;
    let profit = discounted_price - estimated_cost;
    let profit_percentage = Percentage::ratio(profit, discounted_price);

    let display_price = if converts {
        mode.display_amount(discounted_price)
    } else {
        discounted_price
    };

    Ok(BundlePricing {
        total_base_price,
        total_estimated_cost,
        list_price,
        discounted_price,
        savings,
        estimated_cost,
        profit,
        profit_percentage,
        currency: mode.currency(),
        display_price,
    })
}

// =============================================================================
// Edit Diffing
// =============================================================================

/// Quantity change of one item between the stored and desired bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LineChange {
    pub item_id: String,
    pub previous: i64,
    pub desired: i64,
}

impl LineChange {
    /// Stock adjustment for this change: positive returns units to
    /// inventory, negative commits units to the bundle.
    #[inline]
    pub fn stock_delta(&self) -> i64 {
        self.previous - self.desired
    }
}

/// Diffs stored lines against desired lines, by item.
///
/// Unchanged lines are omitted. Output is ordered by item id so a given
/// edit always locks items in the same order.
pub fn diff_lines<'a>(
    previous: impl IntoIterator<Item = (&'a str, i64)>,
    desired: impl IntoIterator<Item = (&'a str, i64)>,
) -> Vec<LineChange> {
    let mut quantities: BTreeMap<&str, (i64, i64)> = BTreeMap::new();

    for (item_id, qty) in previous {
        quantities.entry(item_id).or_default().0 += qty;
    }
    for (item_id, qty) in desired {
        quantities.entry(item_id).or_default().1 += qty;
    }

    quantities
        .into_iter()
        .filter(|(_, (prev, want))| prev != want)
        .map(|(item_id, (previous, desired))| LineChange {
            item_id: item_id.to_string(),
            previous,
            desired,
        })
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;

    fn component(base: i64, cost: i64, qty: i64) -> BundleComponent {
        BundleComponent {
            base_price: Money::from_cents(base),
            estimated_unit_cost: Money::from_cents(cost),
            override_price: None,
            quantity: qty,
        }
    }

    fn usd() -> PricingMode {
        PricingMode::Derived {
            currency: CurrencyType::Usd,
            conversion_rate: None,
        }
    }

    #[test]
    fn test_two_item_bundle_with_savings() {
        let components = [component(1000, 0, 1), component(2000, 0, 1)];
        let pricing = price_bundle(&components, &usd(), Percentage::from_bps(1000)).unwrap();

        assert_eq!(pricing.total_base_price.cents(), 3000);
        assert_eq!(pricing.discounted_price.cents(), 2700);
        assert_eq!(pricing.savings.cents(), 300);
        assert_eq!(pricing.profit.cents(), 2700);
    }

    #[test]
    fn test_override_price_and_profit() {
        let mut first = component(1000, 600, 2);
        first.override_price = Some(Money::from_cents(900));
        let components = [first, component(2000, 1500, 1)];

        let pricing = price_bundle(&components, &usd(), Percentage::zero()).unwrap();
        assert_eq!(pricing.total_base_price.cents(), 3800);
        assert_eq!(pricing.total_estimated_cost.cents(), 2700);
        assert_eq!(pricing.profit.cents(), 1100);
        assert_eq!(pricing.profit_percentage.bps(), 2895);
    }

    #[test]
    fn test_free_bundle_has_zero_margin() {
        let components = [component(1000, 500, 1)];
        let pricing = price_bundle(&components, &usd(), Percentage::from_bps(BPS_SCALE)).unwrap();

        assert!(pricing.discounted_price.is_zero());
        assert_eq!(pricing.profit.cents(), -500);
        assert_eq!(pricing.profit_percentage, Percentage::zero());
    }

    #[test]
    fn test_derived_bs_converts_display_only() {
        let mode = PricingMode::Derived {
            currency: CurrencyType::Bs,
            conversion_rate: Some(ExchangeRate::from_scaled(400_000)),
        };
        let pricing = price_bundle(&[component(1000, 0, 1)], &mode, Percentage::zero()).unwrap();

        assert_eq!(pricing.discounted_price.cents(), 1000);
        assert_eq!(pricing.display_price.cents(), 40_000);
    }

    #[test]
    fn test_direct_bs_is_never_converted() {
        let mode = PricingMode::Direct {
            amount: Money::from_cents(50_000),
            currency: CurrencyType::Bs,
            margin: Some(Percentage::from_bps(2500)),
            conversion_rate: Some(ExchangeRate::from_scaled(400_000)),
        };
        let pricing = price_bundle(&[component(1000, 800, 1)], &mode, Percentage::zero()).unwrap();

        assert_eq!(pricing.list_price.cents(), 50_000);
        assert_eq!(pricing.display_price.cents(), 50_000);
        assert_eq!(pricing.estimated_cost.cents(), 40_000);
        assert_eq!(pricing.profit.cents(), 10_000);
    }

    #[test]
    fn test_direct_without_margin_converts_component_cost() {
        let mode = PricingMode::Direct {
            amount: Money::from_cents(50_000),
            currency: CurrencyType::Bs,
            margin: None,
            conversion_rate: Some(ExchangeRate::from_scaled(400_000)),
        };
        let pricing = price_bundle(&[component(1000, 800, 1)], &mode, Percentage::zero()).unwrap();
        assert_eq!(pricing.estimated_cost.cents(), 32_000);
    }

    #[test]
    fn test_mode_validation() {
        let missing_rate = PricingMode::Derived {
            currency: CurrencyType::Bs,
            conversion_rate: None,
        };
        assert!(missing_rate.validate().is_err());
        assert!(usd().validate().is_ok());

        let negative = PricingMode::Direct {
            amount: Money::from_cents(-1),
            currency: CurrencyType::Usd,
            margin: None,
            conversion_rate: None,
        };
        assert!(negative.validate().is_err());
    }

    #[test]
    fn test_validate_lines() {
        let line = |id: &str, qty| BundleLineInput {
            item_id: id.to_string(),
            quantity: qty,
            override_price_cents: None,
        };

        assert!(validate_bundle_lines(&[]).is_err());
        assert!(validate_bundle_lines(&[line("a", 1), line("a", 2)]).is_err());
        assert!(validate_bundle_lines(&[line("a", 0)]).is_err());
        assert!(validate_bundle_lines(&[line("a", 1), line("b", 2)]).is_ok());
    }

    #[test]
    fn test_diff_lines() {
        let previous = [("a", 2), ("b", 1), ("c", 4)];
        let desired = [("a", 5), ("c", 4), ("d", 1)];

        let changes = diff_lines(previous, desired);
        let deltas: Vec<_> = changes
            .iter()
            .map(|c| (c.item_id.as_str(), c.stock_delta()))
            .collect();

        // a grows by 3, b is removed, d is added, c is untouched.
        assert_eq!(deltas, vec![("a", -3), ("b", 1), ("d", -1)]);
    }

    #[test]
    fn test_oversized_override_rejected() {
        let lines = [BundleLineInput {
            item_id: "a".to_string(),
            quantity: 1,
            override_price_cents: Some(i64::MAX / 2),
        }];
        assert!(matches!(
            validate_bundle_lines(&lines),
            Err(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));
    }

    #[test]
    fn test_overflowing_components_fail_pricing() {
        let components = [component(i64::MAX / 2, 0, 3)];
        assert!(matches!(
            price_bundle(&components, &usd(), Percentage::zero()),
            Err(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));

        let half = i64::MAX / 2;
        let halves = [component(half, 0, 1), component(half, 0, 1), component(2, 0, 1)];
        assert!(price_bundle(&halves, &usd(), Percentage::zero()).is_err());
    }

    #[test]
    fn test_bounded_components_price_cleanly() {
        let (price, qty) = (crate::MAX_PRICE_CENTS, crate::MAX_LINE_QUANTITY);
        let components = [component(price, price, qty)];
        let pricing = price_bundle(&components, &usd(), Percentage::from_bps(BPS_SCALE)).unwrap();
        assert_eq!(pricing.total_base_price.cents(), price * qty);
        assert!(pricing.discounted_price.is_zero());
    }
}
