//! # Exchange Rate Command

use crate::rates::RateQuote;
use crate::state::AppState;

/// Never fails; a provider outage yields the fallback with `isError` set.
pub async fn get_exchange_rate(state: &AppState) -> RateQuote {
    state.rates().current_rate().await
}
