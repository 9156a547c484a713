//! # Exchange Rates
//!
//! BS-per-USD rate used to price BS bundles.
//!
//! The provider is opaque: anything implementing [`RateProvider`]. The
//! [`BcvRateService`] wrapper never fails; when the provider does, it
//! serves the configured fallback rate flagged with `isError`, and callers
//! treat that as stale data.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::Serialize;
use stockbook_core::ExchangeRate;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum RateError {
    #[error("Exchange rate provider unavailable: {0}")]
    Unavailable(String),

    #[error("Exchange rate provider returned an invalid rate: {0}")]
    InvalidRate(f64),
}

/// Source of the current exchange rate.
pub trait RateProvider: Send + Sync {
    fn fetch_rate(&self) -> impl Future<Output = Result<f64, RateError>> + Send;
}

/// Serves a fixed rate, or nothing.
#[derive(Debug, Clone, Default)]
pub struct StaticRateProvider {
    rate: Option<ExchangeRate>,
}

impl StaticRateProvider {
    pub fn new(rate: Option<ExchangeRate>) -> Self {
        StaticRateProvider { rate }
    }
}

impl RateProvider for StaticRateProvider {
    async fn fetch_rate(&self) -> Result<f64, RateError> {
        self.rate
            .map(|rate| rate.as_f64())
            .ok_or_else(|| RateError::Unavailable("no rate configured".to_string()))
    }
}

/// Rate handed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateQuote {
    pub rate: ExchangeRate,
    /// The rate is the fallback, not a provider value.
    pub is_error: bool,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct BcvRateService<P> {
    provider: P,
    fallback: ExchangeRate,
}

impl<P: RateProvider> BcvRateService<P> {
    pub fn new(provider: P, fallback: ExchangeRate) -> Self {
        BcvRateService { provider, fallback }
    }

    pub async fn current_rate(&self) -> RateQuote {
        let fetched = self.provider.fetch_rate().await.and_then(|value| {
            ExchangeRate::from_f64(value).ok_or(RateError::InvalidRate(value))
        });

        match fetched {
            Ok(rate) => {
                debug!(rate = %rate, "Exchange rate fetched");
                RateQuote {
                    rate,
                    is_error: false,
                    fetched_at: Utc::now(),
                }
            }
            Err(err) => {
                warn!(error = %err, fallback = %self.fallback, "Using fallback exchange rate");
                RateQuote {
                    rate: self.fallback,
                    is_error: true,
                    fetched_at: Utc::now(),
                }
            }
        }
    }
}
