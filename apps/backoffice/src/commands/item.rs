//! # Item Commands
//!
//! Catalogue maintenance and stock alerts.

use tracing::debug;

use crate::error::ApiError;
use crate::state::AppState;
use stockbook_core::{InventoryItem, StockAlert};
use stockbook_db::services::item::{CreateItemRequest, DeleteOutcome, UpdateItemRequest};

pub async fn create_item(state: &AppState, args: CreateItemRequest) -> Result<InventoryItem, ApiError> {
    debug!(sku = %args.sku, "create_item command");
    Ok(state.db().catalog().create_item(args).await?)
}

pub async fn update_item(state: &AppState, args: UpdateItemRequest) -> Result<InventoryItem, ApiError> {
    debug!(item_id = %args.id, "update_item command");
    Ok(state.db().catalog().update_item(args).await?)
}

/// Deletes an item, or deactivates it when history references it.
pub async fn delete_item(state: &AppState, id: &str) -> Result<DeleteOutcome, ApiError> {
    debug!(item_id = %id, "delete_item command");
    Ok(state.db().catalog().delete_item(id).await?)
}

pub async fn get_item(state: &AppState, id: &str) -> Result<InventoryItem, ApiError> {
    Ok(state.db().catalog().get_item(id).await?)
}

pub async fn get_item_by_sku(state: &AppState, sku: &str) -> Result<InventoryItem, ApiError> {
    Ok(state.db().catalog().get_item_by_sku(sku).await?)
}

pub async fn list_items(
    state: &AppState,
    include_inactive: bool,
) -> Result<Vec<InventoryItem>, ApiError> {
    Ok(state.db().catalog().list_items(include_inactive).await?)
}

/// SKU or name search. Limit defaults to 20, capped at 100.
pub async fn search_items(
    state: &AppState,
    query: &str,
    limit: Option<u32>,
) -> Result<Vec<InventoryItem>, ApiError> {
    let limit = limit.unwrap_or(20).min(100);
    debug!(query = %query, limit, "search_items command");
    Ok(state.db().catalog().search_items(query, limit).await?)
}

pub async fn check_stock_alerts(state: &AppState) -> Result<Vec<StockAlert>, ApiError> {
    Ok(state.db().catalog().check_stock_alerts().await?)
}
