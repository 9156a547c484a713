//! # Database Error Types
//!
//! Error types for database operations and the services built on them.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  sqlx::Error            CoreError (rule violations)                    │
//! │       │                      │                                          │
//! │       ▼                      ▼                                          │
//! │  DbError (this module) ← categorized, domain errors kept intact        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ApiError (backoffice) ← code + message for the envelope               │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Any error returned from inside a unit of work drops its transaction,
//! which rolls every write of the operation back.

use stockbook_core::{CoreError, ValidationError};
use thiserror::Error;

/// Database and service errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// A business rule rejected the operation (insufficient stock,
    /// invalid amount, validation, ...). Nothing was written.
    #[error(transparent)]
    Domain(#[from] CoreError),

    /// Entity not found in database.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation (duplicate SKU, category name, ...).
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// The unit of work could not complete (lost write lock, stale row).
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// A stored JSON column could not be encoded or decoded.
    #[error("Serialization failed: {0}")]
    Serialization(String),

    #[error("Connection pool exhausted")]
    PoolExhausted,

    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Whether the error is a rejected request rather than a store failure.
    pub fn is_domain(&self) -> bool {
        matches!(
            self,
            DbError::Domain(_) | DbError::NotFound { .. } | DbError::UniqueViolation { .. }
        )
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → Analyze message for constraint type
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                // "UNIQUE constraint failed: inventory_items.sku"
                if msg.contains("UNIQUE constraint failed") {
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::UniqueViolation {
                        field,
                        value: "unknown".to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else if msg.contains("database is locked") {
                    DbError::TransactionFailed(msg.to_string())
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<ValidationError> for DbError {
    fn from(err: ValidationError) -> Self {
        DbError::Domain(CoreError::Validation(err))
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

impl From<serde_json::Error> for DbError {
    fn from(err: serde_json::Error) -> Self {
        DbError::Serialization(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_errors_pass_through() {
        let err: DbError = CoreError::ItemInactive("MUG-01".to_string()).into();
        assert!(err.is_domain());
        assert_eq!(err.to_string(), "Item MUG-01 is inactive");
    }

    #[test]
    fn test_validation_errors_become_domain() {
        let err: DbError = ValidationError::required("sku").into();
        assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));
        assert!(err.is_domain());
    }

    #[test]
    fn test_store_errors_are_not_domain() {
        assert!(!DbError::PoolExhausted.is_domain());
        assert!(!DbError::Internal("boom".to_string()).is_domain());
    }
}
