//! # Sale Commands

use tracing::debug;

use crate::error::ApiError;
use crate::state::AppState;
use stockbook_db::services::sale::{CreateSaleRequest, SaleDetail, SaleReceipt};

/// Records a sale. DIRECT sales take stock now, PRESALE sales reserve it.
pub async fn create_sale(state: &AppState, args: CreateSaleRequest) -> Result<SaleReceipt, ApiError> {
    debug!(
        client_id = %args.client_id,
        sale_type = ?args.sale_type,
        lines = args.cart.len(),
        "create_sale command"
    );
    Ok(state.db().selling().create_sale(args).await?)
}

pub async fn get_sale(state: &AppState, id: &str) -> Result<SaleDetail, ApiError> {
    debug!(sale_id = %id, "get_sale command");
    Ok(state.db().selling().get_sale(id).await?)
}
