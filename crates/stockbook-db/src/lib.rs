//! # stockbook-db: Persistence and Services for Stockbook
//!
//! SQLite storage for the stock ledger, purchases, bundles and sales, plus
//! the services that run each operation as one atomic unit of work.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Stockbook Data Flow                              │
//! │                                                                         │
//! │  Backoffice command (stockOut)                                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   stockbook-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Services    │───►│  UnitOfWork   │───►│ Repositories │  │   │
//! │  │   │               │    │               │    │              │  │   │
//! │  │   │ StockService  │    │ write lock    │    │ ItemRepo     │  │   │
//! │  │   │ PurchaseSvc   │    │ counters +    │    │ LedgerRepo   │  │   │
//! │  │   │ BundleSvc ... │    │ ledger rows   │    │ ...          │  │   │
//! │  │   └───────┬───────┘    └───────────────┘    └──────────────┘  │   │
//! │  │           │ plans movements with                                │   │
//! │  │           ▼                                                     │   │
//! │  │     stockbook-core                                              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite (WAL)                                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Row-level access per table group
//! - [`unit_of_work`] - The single write path for stock
//! - [`services`] - One service per component
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stockbook_db::{Database, DbConfig};
//! use stockbook_db::services::stock::StockOutRequest;
//!
//! let db = Database::new(DbConfig::new("stockbook.db")).await?;
//!
//! let result = db.stock().stock_out(StockOutRequest {
//!     item_id,
//!     quantity: 3,
//!     notes: None,
//!     reference: None,
//! }).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod services;
pub mod unit_of_work;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use unit_of_work::UnitOfWork;

pub use services::{BundleService, ItemService, PurchaseService, SaleService, StockService};
