//! # stockbook-core: Pure Inventory, Costing and Pricing Logic
//!
//! Everything that decides *what* happens to stock, cost and price lives
//! here, as pure functions over domain snapshots. Nothing in this crate
//! performs I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Stockbook Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 apps/backoffice (commands)                      │   │
//! │  │    stockOut, registerPurchase, updateBundle, createSale, ...    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             stockbook-db (services + unit of work)              │   │
//! │  │    loads snapshots, applies planned movements atomically        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ stockbook-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌──────────┐          │   │
//! │  │   │  ledger  │ │ presale  │ │ costing  │ │  bundle  │          │   │
//! │  │   │ planners │ │  split   │ │ average  │ │ pricing  │          │   │
//! │  │   └──────────┘ └──────────┘ └──────────┘ └──────────┘          │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌──────────┐          │   │
//! │  │   │ purchase │ │  money   │ │  types   │ │validation│          │   │
//! │  │   └──────────┘ └──────────┘ └──────────┘ └──────────┘          │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain records (items, transactions, purchases, bundles, sales)
//! - [`money`] - Cents, basis points and fixed-point exchange rates
//! - [`ledger`] - Stock movement planning and reconciliation
//! - [`presale`] - Splitting outbound requests into stock and reservations
//! - [`costing`] - Moving-average cost on purchase receipt
//! - [`bundle`] - Pricing modes, bundle pricing and edit diffing
//! - [`purchase`] - Purchase totals, payment status, sale cart totals
//! - [`reference`] - Typed ledger references
//! - [`error`] / [`validation`] - Domain errors and input rules
//!
//! ## Example
//!
//! ```rust
//! use stockbook_core::costing::moving_average_cost;
//! use stockbook_core::Money;
//!
//! // 5 units at $8.00 on hand, 5 more arrive at $12.00.
//! let cost = moving_average_cost(5, Money::from_cents(800), 5, Money::from_cents(1200));
//! assert_eq!(cost.cents(), 1000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod bundle;
pub mod costing;
pub mod error;
pub mod ledger;
pub mod money;
pub mod presale;
pub mod purchase;
pub mod reference;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use bundle::{BundlePricing, PricingMode};
pub use error::{CoreError, CoreResult, ValidationError};
pub use ledger::{LedgerEntry, LedgerTotals, StockMovement};
pub use money::{ExchangeRate, Money, Percentage};
pub use presale::OutboundSplit;
pub use reference::LedgerReference;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Largest quantity accepted on a single line or movement.
///
/// Catches typos (an extra zero or two) before they reach the ledger.
pub const MAX_LINE_QUANTITY: i64 = 1_000_000;

/// Largest unit price or cost accepted, in cents (one billion currency units).
pub const MAX_PRICE_CENTS: i64 = 100_000_000_000;

pub const MAX_NAME_LENGTH: usize = 200;

pub const MAX_NOTES_LENGTH: usize = 2_000;

// =============================================================================
// Test Support
// =============================================================================

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::Utc;

    use crate::types::{InventoryItem, ItemType, RecordStatus};

    /// An active physical item with no cost history.
    pub fn item(sku: &str, stock: i64, base_price_cents: i64) -> InventoryItem {
        let now = Utc::now();
        InventoryItem {
            id: format!("id-{}", sku.to_lowercase()),
            sku: sku.to_string(),
            name: format!("Item {}", sku),
            description: None,
            item_type: ItemType::Physical,
            base_price_cents,
            cost_price_cents: None,
            margin_bps: None,
            current_stock: stock,
            reserved_stock: 0,
            minimum_stock: 0,
            allow_pre_sale: false,
            status: RecordStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }
}
