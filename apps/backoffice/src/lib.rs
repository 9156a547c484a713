//! # Stockbook Back Office
//!
//! Command boundary over the stock ledger: loads configuration, opens the
//! database, and answers named commands with `{success, data}` envelopes.
//!
//! ## Module Organization
//! ```text
//! stockbook_backoffice/
//! ├── lib.rs      ◄─── You are here (startup)
//! ├── config.rs   ◄─── Environment configuration
//! ├── state.rs    ◄─── AppState (database + rates)
//! ├── rates.rs    ◄─── Exchange-rate provider and fallback
//! ├── commands/   ◄─── One function per operation, plus dispatch
//! └── error.rs    ◄─── ApiError and the ActionResult envelope
//! ```
//!
//! ## Startup Sequence
//! 1. Initialize tracing (`RUST_LOG` overrides the default filter)
//! 2. Load [`BackofficeConfig`] from the environment
//! 3. Connect to the database and run migrations
//! 4. Build [`AppState`]

pub mod commands;
pub mod config;
pub mod error;
pub mod rates;
pub mod state;

use thiserror::Error;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use config::{BackofficeConfig, ConfigError};
use rates::{BcvRateService, StaticRateProvider};
use state::AppState;
use stockbook_db::{Database, DbError};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DbError),
}

/// Initializes the tracing subscriber. Logs go to stderr; stdout carries
/// command replies.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=stockbook_db=trace` - Trace the database crate only
/// - Default: INFO, DEBUG for stockbook crates
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,stockbook=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Opens the database named by `config` and assembles the state.
pub async fn bootstrap(config: &BackofficeConfig) -> Result<AppState, StartupError> {
    info!(db_path = ?config.database_path, "Opening database");
    let db = Database::new(config.db_config()).await?;
    if !db.health_check().await {
        warn!("Database opened but failed its health check");
    }

    let rates = BcvRateService::new(StaticRateProvider::new(config.bcv_rate), config.fallback_rate);
    if config.bcv_rate.is_none() {
        info!(fallback = %config.fallback_rate, "No exchange rate configured, serving fallback");
    }

    Ok(AppState::new(db, rates))
}
