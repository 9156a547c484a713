//! # Bundle Commands
//!
//! BS bundles created without a conversion rate take the current rate from
//! the exchange-rate service.

use tracing::{debug, warn};

use crate::error::ApiError;
use crate::state::AppState;
use stockbook_core::{Bundle, BundleCategory, CurrencyType};
use stockbook_db::services::bundle::{
    BundleUpdateResult, BundleView, CreateBundleRequest, UpdateBundleRequest,
};

pub async fn create_bundle_category(
    state: &AppState,
    name: &str,
) -> Result<BundleCategory, ApiError> {
    debug!(name = %name, "create_bundle_category command");
    Ok(state.db().bundling().create_category(name).await?)
}

pub async fn list_bundle_categories(
    state: &AppState,
    include_inactive: bool,
) -> Result<Vec<BundleCategory>, ApiError> {
    Ok(state.db().bundling().list_categories(include_inactive).await?)
}

pub async fn deactivate_bundle_category(
    state: &AppState,
    id: &str,
) -> Result<BundleCategory, ApiError> {
    debug!(category_id = %id, "deactivate_bundle_category command");
    Ok(state.db().bundling().deactivate_category(id).await?)
}

pub async fn create_bundle(
    state: &AppState,
    mut args: CreateBundleRequest,
) -> Result<BundleView, ApiError> {
    debug!(name = %args.name, lines = args.items.len(), "create_bundle command");

    if args.currency_type == CurrencyType::Bs && args.conversion_rate.is_none() {
        let quote = state.rates().current_rate().await;
        if quote.is_error {
            warn!(rate = %quote.rate, "Pricing BS bundle with fallback rate");
        }
        args.conversion_rate = Some(quote.rate);
    }

    Ok(state.db().bundling().create_bundle(args).await?)
}

/// Edits a bundle; line changes are booked against stock.
pub async fn update_bundle(
    state: &AppState,
    args: UpdateBundleRequest,
) -> Result<BundleUpdateResult, ApiError> {
    debug!(bundle_id = %args.bundle_id, lines = args.items.len(), "update_bundle command");
    Ok(state.db().bundling().update_bundle(args).await?)
}

pub async fn get_bundles(
    state: &AppState,
    category_id: Option<&str>,
) -> Result<Vec<BundleView>, ApiError> {
    Ok(state.db().bundling().get_bundles(category_id).await?)
}

pub async fn get_bundle(state: &AppState, id: &str) -> Result<BundleView, ApiError> {
    Ok(state.db().bundling().get_bundle(id).await?)
}

pub async fn deactivate_bundle(state: &AppState, id: &str) -> Result<Bundle, ApiError> {
    debug!(bundle_id = %id, "deactivate_bundle command");
    Ok(state.db().bundling().deactivate_bundle(id).await?)
}
