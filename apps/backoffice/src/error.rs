//! # API Error Type
//!
//! Unified error type for back-office commands, and the envelope every
//! command result is wrapped in.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Stockbook                              │
//! │                                                                         │
//! │  {"command":"stockOut", ...}                                            │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  Command Function                                                │  │
//! │  │  Result<T, ApiError>                                             │  │
//! │  │         │                                                        │  │
//! │  │  Rule violated? ── DbError::Domain(CoreError) ──┐               │  │
//! │  │         │                                        ▼               │  │
//! │  │  Store failed?  ── DbError::QueryFailed ─── logged, generic ──► │  │
//! │  │         │                                   ApiError            │  │
//! │  │  Success ──────────────────────────────────────────────────────►│  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  { "success": false, "error": "...", "code": "INSUFFICIENT_STOCK" }    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use stockbook_core::CoreError;
use stockbook_db::DbError;

/// API error returned from commands.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for API responses.
///
/// ## Usage in the UI
/// ```typescript
/// const result = await send({ command: 'stockOut', args });
/// if (!result.success) {
///   switch (result.code) {
///     case 'INSUFFICIENT_STOCK': offerPreSale(); break;
///     case 'VALIDATION_ERROR':   showForm(result.error); break;
///     default:                   showError(result.error);
///   }
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NotFound,

    /// Input validation failed
    ValidationError,

    InsufficientStock,

    /// Payment or amount outside the allowed range
    InvalidAmount,

    /// Cached counters disagree with the ledger
    ConsistencyError,

    /// The store failed; details are in the log
    DatabaseError,

    /// Unknown command or undecodable arguments
    BadRequest,

    Internal,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::BadRequest, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }
}

/// Converts database errors to API errors.
///
/// Store failures are logged here and surfaced with a generic message.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Domain(e) => ApiError::from(e),
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::UniqueViolation { field, value } => ApiError::new(
                ErrorCode::ValidationError,
                format!("{} '{}' already exists", field, value),
            ),
            DbError::ForeignKeyViolation { message } => {
                tracing::error!("Foreign key violation: {}", message);
                ApiError::new(ErrorCode::ValidationError, "Invalid reference")
            }
            DbError::ConnectionFailed(e) => {
                tracing::error!("Database connection failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database connection failed")
            }
            DbError::MigrationFailed(e) => {
                tracing::error!("Database migration failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database migration failed")
            }
            DbError::QueryFailed(e) => {
                tracing::error!("Database query failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::TransactionFailed(e) => {
                tracing::error!("Transaction failed: {}", e);
                ApiError::new(
                    ErrorCode::DatabaseError,
                    "The operation could not be completed, please retry",
                )
            }
            DbError::Serialization(e) => {
                tracing::error!("Stored data could not be decoded: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::PoolExhausted => {
                tracing::error!("Database pool exhausted");
                ApiError::new(ErrorCode::DatabaseError, "Database is busy")
            }
            DbError::Internal(e) => {
                tracing::error!("Internal database error: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

/// Converts core errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let message = err.to_string();
        match err {
            CoreError::ItemNotFound(id) => ApiError::not_found("Item", &id),
            CoreError::PurchaseNotFound(id) => ApiError::not_found("Purchase", &id),
            CoreError::BundleNotFound(id) => ApiError::not_found("Bundle", &id),
            CoreError::CategoryNotFound(id) => ApiError::not_found("Bundle category", &id),
            CoreError::SaleNotFound(id) => ApiError::not_found("Sale", &id),
            CoreError::InsufficientStock { .. } | CoreError::ReservationExceeded { .. } => {
                ApiError::new(ErrorCode::InsufficientStock, message)
            }
            CoreError::ItemInactive(_) => ApiError::validation(message),
            CoreError::InvalidAmount { .. } => ApiError::new(ErrorCode::InvalidAmount, message),
            CoreError::Consistency { .. } => {
                tracing::warn!("{}", message);
                ApiError::new(ErrorCode::ConsistencyError, message)
            }
            CoreError::Validation(e) => ApiError::validation(e.to_string()),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

// =============================================================================
// Result Envelope
// =============================================================================

/// The uniform command result.
///
/// ```json
/// { "success": true, "data": { ... } }
/// { "success": false, "error": "Item not found: ...", "code": "NOT_FOUND" }
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ActionResult {
    Ok {
        success: bool,
        data: serde_json::Value,
    },
    Err {
        success: bool,
        error: String,
        code: ErrorCode,
    },
}

impl ActionResult {
    pub fn ok(data: serde_json::Value) -> Self {
        ActionResult::Ok {
            success: true,
            data,
        }
    }

    pub fn err(error: ApiError) -> Self {
        ActionResult::Err {
            success: false,
            error: error.message,
            code: error.code,
        }
    }

    /// Serializes a command outcome into the envelope.
    pub fn from_result<T: Serialize>(result: Result<T, ApiError>) -> Self {
        match result.and_then(|data| {
            serde_json::to_value(data).map_err(|e| ApiError::internal(e.to_string()))
        }) {
            Ok(data) => ActionResult::ok(data),
            Err(error) => ActionResult::err(error),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ActionResult::Ok { .. })
    }
}
