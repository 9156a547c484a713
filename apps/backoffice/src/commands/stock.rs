//! # Stock Commands
//!
//! Manual stock movements, ledger history and reconciliation.

use serde::Deserialize;
use tracing::debug;

use crate::error::ApiError;
use crate::state::AppState;
use stockbook_core::InventoryTransaction;
use stockbook_db::services::stock::{
    AdjustStockRequest, FulfillReservationRequest, ReconciliationReport, StockChange,
    StockInRequest, StockOutRequest, StockOutResult,
};
use stockbook_db::services::DEFAULT_LIST_LIMIT;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListTransactionsArgs {
    pub item_id: String,
    pub limit: Option<u32>,
}

pub async fn stock_in(state: &AppState, args: StockInRequest) -> Result<StockChange, ApiError> {
    debug!(item_id = %args.item_id, quantity = args.quantity, "stock_in command");
    Ok(state.db().stock().stock_in(args).await?)
}

/// Removes stock; pre-sale items split any shortfall into a reservation.
pub async fn stock_out(state: &AppState, args: StockOutRequest) -> Result<StockOutResult, ApiError> {
    debug!(item_id = %args.item_id, quantity = args.quantity, "stock_out command");
    Ok(state.db().stock().stock_out(args).await?)
}

pub async fn adjust_stock(
    state: &AppState,
    args: AdjustStockRequest,
) -> Result<StockChange, ApiError> {
    debug!(item_id = %args.item_id, delta = args.delta, "adjust_stock command");
    Ok(state.db().stock().adjust_stock(args).await?)
}

pub async fn fulfill_reservation(
    state: &AppState,
    args: FulfillReservationRequest,
) -> Result<StockChange, ApiError> {
    debug!(item_id = %args.item_id, quantity = args.quantity, "fulfill_reservation command");
    Ok(state.db().stock().fulfill_reservation(args).await?)
}

/// Ledger history, newest first. Limit defaults to 100, capped at 1000.
pub async fn list_transactions(
    state: &AppState,
    args: ListTransactionsArgs,
) -> Result<Vec<InventoryTransaction>, ApiError> {
    let limit = args.limit.unwrap_or(DEFAULT_LIST_LIMIT).min(1000);
    debug!(item_id = %args.item_id, limit, "list_transactions command");
    Ok(state.db().stock().list_transactions(&args.item_id, limit).await?)
}

pub async fn reconcile_item(state: &AppState, id: &str) -> Result<ReconciliationReport, ApiError> {
    debug!(item_id = %id, "reconcile_item command");
    Ok(state.db().stock().reconcile_item(id).await?)
}

pub async fn reconcile_all(state: &AppState) -> Result<Vec<ReconciliationReport>, ApiError> {
    debug!("reconcile_all command");
    Ok(state.db().stock().reconcile_all().await?)
}
