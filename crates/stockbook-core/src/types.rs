//! # Domain Types
//!
//! Core domain types used throughout Stockbook.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌──────────────────┐   ┌──────────────────────┐   ┌────────────────┐  │
//! │  │  InventoryItem   │◄──│ InventoryTransaction │   │    Purchase    │  │
//! │  │  ──────────────  │   │  ──────────────────  │   │  ────────────  │  │
//! │  │  sku (business)  │   │  quantity (signed)   │   │  total / paid  │  │
//! │  │  current_stock   │   │  type (IN, OUT, ...) │   │  status        │  │
//! │  │  reserved_stock  │   │  reference (typed)   │   │  items, pays   │  │
//! │  └──────────────────┘   └──────────────────────┘   └────────────────┘  │
//! │           ▲                                                             │
//! │           │             ┌──────────────────────┐   ┌────────────────┐  │
//! │           └─────────────│   Bundle / Items     │   │  Sale / Items  │  │
//! │                         │  pricing mode        │   │  DIRECT or     │  │
//! │                         │  discount, currency  │   │  PRESALE       │  │
//! │                         └──────────────────────┘   └────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has a UUID `id`; inventory items also carry an immutable
//! `sku` business key.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::bundle::PricingMode;
use crate::money::{ExchangeRate, Money, Percentage};
use crate::reference::LedgerReference;

// =============================================================================
// Enumerations
// =============================================================================

/// Kind of inventory item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemType {
    Physical,
    Digital,
    Service,
}

/// Soft-delete status shared by items, bundles and bundle categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordStatus {
    #[default]
    Active,
    Inactive,
}

/// Kind of ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    In,
    Out,
    Adjustment,
    /// Units promised to a pre-sale; does not move physical stock.
    Reservation,
    /// Reserved units leaving physical stock.
    Fulfillment,
    /// Opening balance recorded when an item is created with stock.
    Initial,
}

impl TransactionType {
    /// Whether entries of this type move `current_stock`.
    #[inline]
    pub const fn is_physical(&self) -> bool {
        !matches!(self, TransactionType::Reservation)
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            TransactionType::In => "IN",
            TransactionType::Out => "OUT",
            TransactionType::Adjustment => "ADJUSTMENT",
            TransactionType::Reservation => "RESERVATION",
            TransactionType::Fulfillment => "FULFILLMENT",
            TransactionType::Initial => "INITIAL",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PurchaseStatus {
    #[default]
    Pending,
    Partial,
    Paid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Cash,
    Transfer,
    Check,
    Other,
}

/// Currency a bundle is listed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CurrencyType {
    #[default]
    Usd,
    /// Venezuelan bolívar.
    Bs,
}

/// Stored discriminant of [`PricingMode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PricingModeKind {
    Derived,
    Direct,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SaleType {
    Direct,
    Presale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SaleStatus {
    Completed,
    Pending,
}

impl SaleType {
    /// Header status a new sale of this type starts in.
    pub const fn initial_status(&self) -> SaleStatus {
        match self {
            SaleType::Direct => SaleStatus::Completed,
            SaleType::Presale => SaleStatus::Pending,
        }
    }
}

// =============================================================================
// Inventory Item
// =============================================================================

/// A stocked, sellable item.
///
/// `current_stock` and `reserved_stock` are caches of the ledger; they are
/// only ever written together with the ledger rows that justify them.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    pub id: String,

    /// Stock Keeping Unit - unique, immutable business identifier.
    pub sku: String,

    pub name: String,
    pub description: Option<String>,
    pub item_type: ItemType,

    /// Sale price in cents.
    pub base_price_cents: i64,

    /// Moving-average acquisition cost in cents.
    pub cost_price_cents: Option<i64>,

    /// Fractional markup in bps, used to estimate cost when none is known.
    pub margin_bps: Option<i64>,

    pub current_stock: i64,
    pub reserved_stock: i64,

    /// Reorder threshold.
    pub minimum_stock: i64,

    pub allow_pre_sale: bool,
    pub status: RecordStatus,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl InventoryItem {
    #[inline]
    pub fn base_price(&self) -> Money {
        Money::from_cents(self.base_price_cents)
    }

    #[inline]
    pub fn cost_price(&self) -> Option<Money> {
        self.cost_price_cents.map(Money::from_cents)
    }

    #[inline]
    pub fn margin(&self) -> Option<Percentage> {
        self.margin_bps.map(Percentage::from_bps)
    }

    /// Unit cost the moving average starts from: the known cost, or the
    /// list price for items never purchased.
    pub fn cost_basis(&self) -> Money {
        self.cost_price().unwrap_or_else(|| self.base_price())
    }

    /// Unit cost used for bundle profit estimates.
    ///
    /// Known cost first, then list price stripped of its markup, else zero.
    pub fn estimated_unit_cost(&self) -> Money {
        if let Some(cost) = self.cost_price() {
            return cost;
        }
        match self.margin() {
            Some(margin) => self.base_price().remove_markup(margin),
            None => Money::zero(),
        }
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.status == RecordStatus::Active
    }

    /// At or below the reorder threshold.
    #[inline]
    pub fn is_low_stock(&self) -> bool {
        self.current_stock <= self.minimum_stock
    }
}

/// Low-stock warning for the operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct StockAlert {
    pub item_id: String,
    pub sku: String,
    pub current_stock: i64,
    pub minimum_stock: i64,
    pub message: String,
}

impl StockAlert {
    /// Alert for a low-stock item, `None` otherwise.
    pub fn for_item(item: &InventoryItem) -> Option<Self> {
        if !item.is_low_stock() {
            return None;
        }

        let message = if item.current_stock <= 0 {
            format!("{} ({}) is out of stock", item.name, item.sku)
        } else {
            format!(
                "{} ({}) has {} left, minimum is {}",
                item.name, item.sku, item.current_stock, item.minimum_stock
            )
        };

        Some(StockAlert {
            item_id: item.id.clone(),
            sku: item.sku.clone(),
            current_stock: item.current_stock,
            minimum_stock: item.minimum_stock,
            message,
        })
    }
}

// =============================================================================
// Inventory Transaction
// =============================================================================

/// One immutable ledger entry.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct InventoryTransaction {
    pub id: String,
    pub item_id: String,

    /// Positive for inbound, negative for outbound.
    pub quantity: i64,

    pub transaction_type: TransactionType,
    pub reference: Option<LedgerReference>,
    pub notes: Option<String>,

    /// Unit-of-work sequence that wrote this entry.
    pub sequence: i64,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Purchases
// =============================================================================

/// A supplier purchase. Immutable after creation except for payments.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Purchase {
    pub id: String,
    pub supplier_name: String,
    pub invoice_number: Option<String>,
    pub notes: Option<String>,

    /// Σ quantity × unit cost over all lines.
    pub total_amount_cents: i64,

    /// Running sum of payments.
    pub paid_amount_cents: i64,

    pub status: PurchaseStatus,

    #[ts(as = "String")]
    pub purchase_date: DateTime<Utc>,

    /// Credit terms, if any.
    #[ts(as = "Option<String>")]
    pub due_date: Option<NaiveDate>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Purchase {
    #[inline]
    pub fn total_amount(&self) -> Money {
        Money::from_cents(self.total_amount_cents)
    }

    #[inline]
    pub fn paid_amount(&self) -> Money {
        Money::from_cents(self.paid_amount_cents)
    }

    /// Amount still owed to the supplier.
    #[inline]
    pub fn remaining(&self) -> Money {
        self.total_amount() - self.paid_amount()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseItem {
    pub id: String,
    pub purchase_id: String,
    pub item_id: String,
    pub quantity: i64,
    pub unit_cost_cents: i64,
    /// quantity × unit cost.
    pub total_cost_cents: i64,
    pub position: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PurchasePayment {
    pub id: String,
    pub purchase_id: String,
    pub amount_cents: i64,
    pub payment_method: PaymentMethod,
    /// Bank reference, cheque number, ...
    pub reference: Option<String>,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub payment_date: DateTime<Utc>,
}

// =============================================================================
// Bundles
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct BundleCategory {
    pub id: String,
    pub name: String,
    pub status: RecordStatus,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A sellable composition of inventory items.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Bundle {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub category_id: String,

    pub pricing_mode: PricingModeKind,

    /// List price: USD component total (derived) or the operator's amount
    /// in `currency_type` (direct).
    pub base_price_cents: i64,

    pub discount_bps: i64,

    /// Operator markup, direct mode only.
    pub margin_bps: Option<i64>,

    pub currency_type: CurrencyType,

    /// BS per USD, 4 implied decimals.
    pub conversion_rate_scaled: Option<i64>,

    pub status: RecordStatus,

    pub total_sales: i64,
    pub total_revenue_cents: i64,
    #[ts(as = "Option<String>")]
    pub last_sale_date: Option<DateTime<Utc>>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Bundle {
    #[inline]
    pub fn base_price(&self) -> Money {
        Money::from_cents(self.base_price_cents)
    }

    #[inline]
    pub fn discount(&self) -> Percentage {
        Percentage::from_bps(self.discount_bps)
    }

    #[inline]
    pub fn conversion_rate(&self) -> Option<ExchangeRate> {
        self.conversion_rate_scaled.map(ExchangeRate::from_scaled)
    }

    /// `base_price × (1 − discount/100)`.
    pub fn bundle_price(&self) -> Money {
        self.base_price().apply_discount(self.discount())
    }

    /// Rebuilds the typed pricing mode from the stored columns.
    pub fn pricing_mode(&self) -> PricingMode {
        match self.pricing_mode {
            PricingModeKind::Derived => PricingMode::Derived {
                currency: self.currency_type,
                conversion_rate: self.conversion_rate(),
            },
            PricingModeKind::Direct => PricingMode::Direct {
                amount: self.base_price(),
                currency: self.currency_type,
                margin: self.margin_bps.map(Percentage::from_bps),
                conversion_rate: self.conversion_rate(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct BundleItem {
    pub id: String,
    pub bundle_id: String,
    pub item_id: String,
    pub quantity: i64,
    /// Supersedes the item's base price inside this bundle.
    pub override_price_cents: Option<i64>,
    pub position: i64,
}

// =============================================================================
// Sales
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    pub id: String,
    pub client_id: String,
    pub beneficiary_id: Option<String>,
    pub organization_id: Option<String>,
    pub bundle_id: Option<String>,
    pub sale_type: SaleType,
    pub status: SaleStatus,
    pub total_amount_cents: i64,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    pub item_id: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub override_price_cents: Option<i64>,
    pub line_total_cents: i64,
    pub position: i64,
}

// =============================================================================
// Unit Tests
// =============================================================================
