//! # Error Types
//!
//! Domain-specific error types for stockbook-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  stockbook-core errors (this file)                                     │
//! │  ├── CoreError        - Ledger, costing and pricing rule violations    │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  stockbook-db errors (separate crate)                                  │
//! │  └── DbError          - Database failures (wraps CoreError)            │
//! │                                                                         │
//! │  backoffice errors (app)                                               │
//! │  └── ApiError         - What the UI sees (code + message)              │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → envelope     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations raised by the ledger, costing and pricing logic.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Item not found: {0}")]
    ItemNotFound(String),

    #[error("Purchase not found: {0}")]
    PurchaseNotFound(String),

    #[error("Bundle not found: {0}")]
    BundleNotFound(String),

    #[error("Bundle category not found: {0}")]
    CategoryNotFound(String),

    #[error("Sale not found: {0}")]
    SaleNotFound(String),

    /// Outbound quantity exceeds stock and the item does not allow pre-sale.
    ///
    /// ## User Workflow
    /// ```text
    /// stock_out(qty: 15)
    ///      │
    ///      ▼
    /// current_stock = 10, allow_pre_sale = false
    ///      │
    ///      ▼
    /// InsufficientStock { sku: "MUG-01", available: 10, requested: 15 }
    /// ```
    #[error("Insufficient stock for {sku}: available {available}, requested {requested}")]
    InsufficientStock {
        sku: String,
        available: i64,
        requested: i64,
    },

    /// Fulfillment asked for more units than are currently reserved.
    #[error("Only {reserved} units of {sku} are reserved, cannot fulfill {requested}")]
    ReservationExceeded {
        sku: String,
        reserved: i64,
        requested: i64,
    },

    /// Stock movements against a deactivated item.
    #[error("Item {0} is inactive")]
    ItemInactive(String),

    /// Payment amount is zero, negative, or exceeds the open balance.
    #[error("Invalid amount: {reason}")]
    InvalidAmount { reason: String },

    /// The cached stock counters no longer match the ledger.
    #[error("Ledger mismatch for {item_id}: {field} is {cached}, ledger says {ledger}")]
    Consistency {
        item_id: String,
        field: String,
        cached: i64,
        ledger: i64,
    },

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates an InvalidAmount error.
    pub fn invalid_amount(reason: impl Into<String>) -> Self {
        CoreError::InvalidAmount {
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors, raised before any store mutation.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, bad SKU characters).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Duplicate value (e.g., the same item twice in one bundle).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

impl ValidationError {
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }

    pub fn must_be_positive(field: impl Into<String>) -> Self {
        ValidationError::MustBePositive {
            field: field.into(),
        }
    }
}

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            sku: "MUG-01".to_string(),
            available: 10,
            requested: 15,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for MUG-01: available 10, requested 15"
        );

        let err = CoreError::invalid_amount("exceeds remaining balance 40.00");
        assert_eq!(err.to_string(), "Invalid amount: exceeds remaining balance 40.00");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::required("sku").into();
        assert!(matches!(core_err, CoreError::Validation(_)));
        assert_eq!(core_err.to_string(), "Validation error: sku is required");
    }
}
