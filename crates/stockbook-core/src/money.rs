//! # Money Module
//!
//! Monetary amounts, percentages and exchange rates, all in integer
//! fixed-point so that costing and bundle pricing never touch floats.
//!
//! ## Units
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Type           Storage        Scale          Example                   │
//! │  ────────────   ────────────   ────────────   ───────────────────────   │
//! │  Money          i64            1/100          1099    = $10.99          │
//! │  Percentage     i64 (bps)      1/10000        1000    = 10%             │
//! │  ExchangeRate   i64            1/10000        365432  = 36.5432 Bs/USD  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every division rounds half away from zero, so a moving average of
//! $8.00 and $12.00 over equal quantities lands exactly on $10.00.
//!
//! ## Usage
//! ```rust
//! use stockbook_core::money::{Money, Percentage};
//!
//! let list = Money::from_cents(3000); // $30.00
//! let sale = list.apply_discount(Percentage::from_bps(1000)); // 10% off
//! assert_eq!(sale.cents(), 2700);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

/// Basis points in one whole (100%).
pub const BPS_SCALE: i64 = 10_000;

/// Fixed-point scale of [`ExchangeRate`] (4 decimal places).
pub const RATE_SCALE: i64 = 10_000;

/// Integer division rounding half away from zero.
///
/// Returns `None` when the denominator is zero.
pub fn div_round(numerator: i128, denominator: i128) -> Option<i128> {
    if denominator == 0 {
        return None;
    }

    let quotient = numerator / denominator;
    let remainder = numerator % denominator;

    if remainder.abs() * 2 >= denominator.abs() {
        let direction = if (numerator < 0) ^ (denominator < 0) { -1 } else { 1 };
        Some(quotient + direction)
    } else {
        Some(quotient)
    }
}

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (cents).
///
/// The same type carries USD and BS amounts; the currency is a property of
/// the owning record (see [`crate::types::CurrencyType`]), not of the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    ///
    /// ```rust
    /// use stockbook_core::money::Money;
    ///
    /// let price = Money::from_cents(1099); // $10.99
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the whole-unit portion.
    #[inline]
    pub const fn dollars(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the cents portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies a unit amount by a quantity, `None` on overflow.
    ///
    /// ```rust
    /// use stockbook_core::money::Money;
    ///
    /// let line = Money::from_cents(299).checked_multiply_quantity(3);
    /// assert_eq!(line, Some(Money::from_cents(897)));
    /// ```
    #[inline]
    pub const fn checked_multiply_quantity(&self, qty: i64) -> Option<Self> {
        match self.0.checked_mul(qty) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Adds two amounts, `None` on overflow.
    #[inline]
    pub const fn checked_add(self, other: Money) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Returns the given percentage of this amount.
    pub fn percentage_of(&self, pct: Percentage) -> Money {
        let part = div_round(self.0 as i128 * pct.bps() as i128, BPS_SCALE as i128).unwrap_or(0);
        Money(part as i64)
    }

    /// Applies a percentage discount and returns the discounted amount.
    ///
    /// ```rust
    /// use stockbook_core::money::{Money, Percentage};
    ///
    /// let subtotal = Money::from_cents(10000);
    /// let discounted = subtotal.apply_discount(Percentage::from_bps(1000));
    /// assert_eq!(discounted.cents(), 9000);
    /// ```
    pub fn apply_discount(&self, discount: Percentage) -> Money {
        *self - self.percentage_of(discount)
    }

    /// Strips a fractional markup from a sale price: `price / (1 + margin)`.
    ///
    /// A margin of 2500 bps (25%) turns $12.50 into $10.00. A margin at or
    /// below -100% has no meaningful cost and yields zero.
    ///
    /// ```rust
    /// use stockbook_core::money::{Money, Percentage};
    ///
    /// let cost = Money::from_cents(1250).remove_markup(Percentage::from_bps(2500));
    /// assert_eq!(cost.cents(), 1000);
    /// ```
    pub fn remove_markup(&self, margin: Percentage) -> Money {
        let denominator = BPS_SCALE as i128 + margin.bps() as i128;
        if denominator <= 0 {
            return Money::zero();
        }
        let cost = div_round(self.0 as i128 * BPS_SCALE as i128, denominator).unwrap_or(0);
        Money(cost as i64)
    }

    /// Converts a USD amount into the rate's target currency.
    ///
    /// ```rust
    /// use stockbook_core::money::{ExchangeRate, Money};
    ///
    /// let usd = Money::from_cents(1000); // $10.00
    /// let bs = usd.convert(ExchangeRate::from_scaled(365_000)); // 36.5 Bs/USD
    /// assert_eq!(bs.cents(), 36500);
    /// ```
    pub fn convert(&self, rate: ExchangeRate) -> Money {
        let converted =
            div_round(self.0 as i128 * rate.scaled() as i128, RATE_SCALE as i128).unwrap_or(0);
        Money(converted.clamp(i64::MIN as i128, i64::MAX as i128) as i64)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.dollars().abs(), self.cents_part())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Percentage
// =============================================================================

/// A signed percentage in basis points (1 bp = 0.01%).
///
/// Used for bundle discounts, item/bundle markups and derived profit
/// margins. Profit margins can be negative when a bundle sells below cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Percentage(i64);

impl Percentage {
    #[inline]
    pub const fn from_bps(bps: i64) -> Self {
        Percentage(bps)
    }

    #[inline]
    pub const fn bps(&self) -> i64 {
        self.0
    }

    #[inline]
    pub const fn zero() -> Self {
        Percentage(0)
    }

    /// `numerator / denominator * 100`, zero when the denominator is zero.
    ///
    /// ```rust
    /// use stockbook_core::money::{Money, Percentage};
    ///
    /// let margin = Percentage::ratio(Money::from_cents(700), Money::from_cents(2700));
    /// assert_eq!(margin.bps(), 2593); // 25.93%
    /// ```
    pub fn ratio(numerator: Money, denominator: Money) -> Self {
        let bps = div_round(
            numerator.cents() as i128 * BPS_SCALE as i128,
            denominator.cents() as i128,
        )
        .unwrap_or(0);
        Percentage(bps as i64)
    }
}

impl Default for Percentage {
    fn default() -> Self {
        Percentage::zero()
    }
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}%", sign, (self.0 / 100).abs(), (self.0 % 100).abs())
    }
}

// =============================================================================
// Exchange Rate
// =============================================================================

/// Units of local currency (BS) per USD, fixed-point with 4 decimals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ExchangeRate(i64);

impl ExchangeRate {
    #[inline]
    pub const fn from_scaled(scaled: i64) -> Self {
        ExchangeRate(scaled)
    }

    /// Creates a rate from a provider value; rejects non-finite or
    /// non-positive rates.
    ///
    /// ```rust
    /// use stockbook_core::money::ExchangeRate;
    ///
    /// assert_eq!(ExchangeRate::from_f64(36.5432).unwrap().scaled(), 365_432);
    /// assert!(ExchangeRate::from_f64(0.0).is_none());
    /// ```
    pub fn from_f64(rate: f64) -> Option<Self> {
        if !rate.is_finite() || rate <= 0.0 {
            return None;
        }
        let scaled = (rate * RATE_SCALE as f64).round() as i64;
        (scaled > 0).then_some(ExchangeRate(scaled))
    }

    #[inline]
    pub const fn scaled(&self) -> i64 {
        self.0
    }

    #[inline]
    pub fn as_f64(&self) -> f64 {
        self.0 as f64 / RATE_SCALE as f64
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }
}

impl fmt::Display for ExchangeRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:04}", self.0 / RATE_SCALE, (self.0 % RATE_SCALE).abs())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
