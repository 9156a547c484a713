//! # Services
//!
//! One service per component; each public method is one operation and runs
//! in at most one transaction.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  service method                                                        │
//! │    1. validate input              (stockbook-core, nothing written)    │
//! │    2. UnitOfWork::begin           (write lock)                         │
//! │    3. load snapshots, plan        (stockbook-core planners)            │
//! │    4. uow.apply / repository writes                                    │
//! │    5. uow.commit                  (all or nothing)                     │
//! │    6. info! with the outcome                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod bundle;
pub mod item;
pub mod purchase;
pub mod sale;
pub mod stock;

pub use bundle::BundleService;
pub use item::ItemService;
pub use purchase::PurchaseService;
pub use sale::SaleService;
pub use stock::StockService;

/// Default page size for history listings.
pub const DEFAULT_LIST_LIMIT: u32 = 100;
