//! # Repository Module
//!
//! Database repository implementations for Stockbook.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Reads                                 Writes                          │
//! │  ─────                                 ──────                          │
//! │  db.items().get_by_id(id)              ItemRepository::insert(&mut *tx)│
//! │  db.ledger().list_for_item(id, 50)     LedgerRepository::append(...)   │
//! │       │                                     │                           │
//! │       │  pool-backed methods                │  executor-generic fns    │
//! │       ▼                                     ▼                           │
//! │  SqlitePool                            Transaction (unit of work)      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every write takes an explicit executor so a service can run several of
//! them inside the same transaction.
//!
//! ## Available Repositories
//!
//! - [`ItemRepository`] - Inventory items
//! - [`LedgerRepository`] - Append-only stock ledger
//! - [`PurchaseRepository`] - Purchases, lines and payments
//! - [`BundleRepository`] - Bundle categories, bundles and lines
//! - [`SaleRepository`] - Sales and sale lines

pub mod bundle;
pub mod item;
pub mod ledger;
pub mod purchase;
pub mod sale;

pub use bundle::BundleRepository;
pub use item::ItemRepository;
pub use ledger::LedgerRepository;
pub use purchase::PurchaseRepository;
pub use sale::SaleRepository;
