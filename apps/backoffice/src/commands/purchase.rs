//! # Purchase Commands

use tracing::debug;

use crate::error::ApiError;
use crate::state::AppState;
use stockbook_core::Purchase;
use stockbook_db::services::purchase::{
    PurchaseDetail, PurchaseReceipt, RegisterPaymentRequest, RegisterPurchaseRequest,
};
use stockbook_db::services::DEFAULT_LIST_LIMIT;

/// Records a purchase; every line is received into stock at once.
pub async fn register_purchase(
    state: &AppState,
    args: RegisterPurchaseRequest,
) -> Result<PurchaseReceipt, ApiError> {
    debug!(
        supplier = %args.supplier_name,
        lines = args.items.len(),
        "register_purchase command"
    );
    Ok(state.db().purchasing().register_purchase(args).await?)
}

pub async fn register_purchase_payment(
    state: &AppState,
    args: RegisterPaymentRequest,
) -> Result<Purchase, ApiError> {
    debug!(
        purchase_id = %args.purchase_id,
        amount_cents = args.amount_cents,
        "register_purchase_payment command"
    );
    Ok(state.db().purchasing().register_payment(args).await?)
}

pub async fn get_purchase(state: &AppState, id: &str) -> Result<PurchaseDetail, ApiError> {
    debug!(purchase_id = %id, "get_purchase command");
    Ok(state.db().purchasing().get_purchase(id).await?)
}

pub async fn list_purchases(state: &AppState, limit: Option<u32>) -> Result<Vec<Purchase>, ApiError> {
    let limit = limit.unwrap_or(DEFAULT_LIST_LIMIT).min(1000);
    Ok(state.db().purchasing().list_purchases(limit).await?)
}

pub async fn list_outstanding_purchases(state: &AppState) -> Result<Vec<Purchase>, ApiError> {
    Ok(state.db().purchasing().list_outstanding().await?)
}
