//! # Back-office Commands
//!
//! Every operation the back office exposes, addressed by name.
//!
//! ## Wire Format
//! One JSON object per request; the reply is always an [`ActionResult`]:
//! ```text
//! → {"command": "stockOut", "args": {"itemId": "...", "quantity": 3}}
//! ← {"success": true, "data": {"item": {...}, "split": {...}, ...}}
//!
//! → {"command": "getItem", "args": {"id": "missing"}}
//! ← {"success": false, "error": "Item not found: missing", "code": "NOT_FOUND"}
//! ```
//!
//! ## Command Organization
//! ```text
//! commands/
//! ├── mod.rs       ◄─── Command enum + dispatch
//! ├── item.rs      ◄─── Catalogue CRUD, search, alerts
//! ├── stock.rs     ◄─── Movements, history, reconciliation
//! ├── purchase.rs  ◄─── Purchases and supplier payments
//! ├── bundle.rs    ◄─── Categories and bundles
//! ├── sale.rs      ◄─── Direct and pre-sale sales
//! └── rate.rs      ◄─── Exchange rate
//! ```

pub mod bundle;
pub mod item;
pub mod purchase;
pub mod rate;
pub mod sale;
pub mod stock;

use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::error::{ActionResult, ApiError};
use crate::state::AppState;
use stockbook_db::services::bundle::{CreateBundleRequest, UpdateBundleRequest};
use stockbook_db::services::item::{CreateItemRequest, UpdateItemRequest};
use stockbook_db::services::purchase::{RegisterPaymentRequest, RegisterPurchaseRequest};
use stockbook_db::services::sale::CreateSaleRequest;
use stockbook_db::services::stock::{
    AdjustStockRequest, FulfillReservationRequest, StockInRequest, StockOutRequest,
};

use self::stock::ListTransactionsArgs;

#[derive(Debug, Clone, Deserialize)]
pub struct IdArgs {
    pub id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ListArgs {
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct IncludeInactiveArgs {
    pub include_inactive: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GetBundlesArgs {
    pub category_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CategoryArgs {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SkuArgs {
    pub sku: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchArgs {
    pub query: String,
    #[serde(default)]
    pub limit: Option<u32>,
}

/// A named operation with its arguments.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "command", content = "args", rename_all = "camelCase")]
pub enum Command {
    // Items
    CreateItem(CreateItemRequest),
    UpdateItem(UpdateItemRequest),
    DeleteItem(IdArgs),
    GetItem(IdArgs),
    GetItemBySku(SkuArgs),
    ListItems(IncludeInactiveArgs),
    SearchItems(SearchArgs),
    CheckStockAlerts,

    // Stock
    StockIn(StockInRequest),
    StockOut(StockOutRequest),
    AdjustStock(AdjustStockRequest),
    FulfillReservation(FulfillReservationRequest),
    ListTransactions(ListTransactionsArgs),
    ReconcileItem(IdArgs),
    ReconcileAll,

    // Purchases
    RegisterPurchase(RegisterPurchaseRequest),
    RegisterPurchasePayment(RegisterPaymentRequest),
    GetPurchase(IdArgs),
    ListPurchases(ListArgs),
    ListOutstandingPurchases,

    // Bundles
    CreateBundleCategory(CategoryArgs),
    ListBundleCategories(IncludeInactiveArgs),
    DeactivateBundleCategory(IdArgs),
    CreateBundle(CreateBundleRequest),
    UpdateBundle(UpdateBundleRequest),
    GetBundles(GetBundlesArgs),
    GetBundle(IdArgs),
    DeactivateBundle(IdArgs),

    // Sales
    CreateSale(CreateSaleRequest),
    GetSale(IdArgs),

    GetExchangeRate,
}

impl Command {
    /// Wire name of the command.
    pub fn name(&self) -> &'static str {
        match self {
            Command::CreateItem(_) => "createItem",
            Command::UpdateItem(_) => "updateItem",
            Command::DeleteItem(_) => "deleteItem",
            Command::GetItem(_) => "getItem",
            Command::GetItemBySku(_) => "getItemBySku",
            Command::ListItems(_) => "listItems",
            Command::SearchItems(_) => "searchItems",
            Command::CheckStockAlerts => "checkStockAlerts",
            Command::StockIn(_) => "stockIn",
            Command::StockOut(_) => "stockOut",
            Command::AdjustStock(_) => "adjustStock",
            Command::FulfillReservation(_) => "fulfillReservation",
            Command::ListTransactions(_) => "listTransactions",
            Command::ReconcileItem(_) => "reconcileItem",
            Command::ReconcileAll => "reconcileAll",
            Command::RegisterPurchase(_) => "registerPurchase",
            Command::RegisterPurchasePayment(_) => "registerPurchasePayment",
            Command::GetPurchase(_) => "getPurchase",
            Command::ListPurchases(_) => "listPurchases",
            Command::ListOutstandingPurchases => "listOutstandingPurchases",
            Command::CreateBundleCategory(_) => "createBundleCategory",
            Command::ListBundleCategories(_) => "listBundleCategories",
            Command::DeactivateBundleCategory(_) => "deactivateBundleCategory",
            Command::CreateBundle(_) => "createBundle",
            Command::UpdateBundle(_) => "updateBundle",
            Command::GetBundles(_) => "getBundles",
            Command::GetBundle(_) => "getBundle",
            Command::DeactivateBundle(_) => "deactivateBundle",
            Command::CreateSale(_) => "createSale",
            Command::GetSale(_) => "getSale",
            Command::GetExchangeRate => "getExchangeRate",
        }
    }

    /// The single item a command targets, if any.
    pub fn item_id(&self) -> Option<&str> {
        match self {
            Command::UpdateItem(args) => Some(&args.id),
            Command::DeleteItem(args) | Command::GetItem(args) | Command::ReconcileItem(args) => {
                Some(&args.id)
            }
            Command::StockIn(args) => Some(&args.item_id),
            Command::StockOut(args) => Some(&args.item_id),
            Command::AdjustStock(args) => Some(&args.item_id),
            Command::FulfillReservation(args) => Some(&args.item_id),
            Command::ListTransactions(args) => Some(&args.item_id),
            _ => None,
        }
    }
}

/// Runs one command and wraps its outcome. Logs emitted while it runs
/// carry the command name and target item.
#[instrument(skip_all, fields(command = command.name(), item_id = command.item_id()))]
pub async fn dispatch(state: &AppState, command: Command) -> ActionResult {
    let reply = match command {
        Command::CreateItem(args) => ActionResult::from_result(item::create_item(state, args).await),
        Command::UpdateItem(args) => ActionResult::from_result(item::update_item(state, args).await),
        Command::DeleteItem(args) => ActionResult::from_result(item::delete_item(state, &args.id).await),
        Command::GetItem(args) => ActionResult::from_result(item::get_item(state, &args.id).await),
        Command::GetItemBySku(args) => {
            ActionResult::from_result(item::get_item_by_sku(state, &args.sku).await)
        }
        Command::ListItems(args) => {
            ActionResult::from_result(item::list_items(state, args.include_inactive).await)
        }
        Command::SearchItems(args) => {
            ActionResult::from_result(item::search_items(state, &args.query, args.limit).await)
        }
        Command::CheckStockAlerts => ActionResult::from_result(item::check_stock_alerts(state).await),

        Command::StockIn(args) => ActionResult::from_result(stock::stock_in(state, args).await),
        Command::StockOut(args) => ActionResult::from_result(stock::stock_out(state, args).await),
        Command::AdjustStock(args) => ActionResult::from_result(stock::adjust_stock(state, args).await),
        Command::FulfillReservation(args) => {
            ActionResult::from_result(stock::fulfill_reservation(state, args).await)
        }
        Command::ListTransactions(args) => {
            ActionResult::from_result(stock::list_transactions(state, args).await)
        }
        Command::ReconcileItem(args) => {
            ActionResult::from_result(stock::reconcile_item(state, &args.id).await)
        }
        Command::ReconcileAll => ActionResult::from_result(stock::reconcile_all(state).await),

        Command::RegisterPurchase(args) => {
            ActionResult::from_result(purchase::register_purchase(state, args).await)
        }
        Command::RegisterPurchasePayment(args) => {
            ActionResult::from_result(purchase::register_purchase_payment(state, args).await)
        }
        Command::GetPurchase(args) => {
            ActionResult::from_result(purchase::get_purchase(state, &args.id).await)
        }
        Command::ListPurchases(args) => {
            ActionResult::from_result(purchase::list_purchases(state, args.limit).await)
        }
        Command::ListOutstandingPurchases => {
            ActionResult::from_result(purchase::list_outstanding_purchases(state).await)
        }

        Command::CreateBundleCategory(args) => {
            ActionResult::from_result(bundle::create_bundle_category(state, &args.name).await)
        }
        Command::ListBundleCategories(args) => ActionResult::from_result(
            bundle::list_bundle_categories(state, args.include_inactive).await,
        ),
        Command::DeactivateBundleCategory(args) => {
            ActionResult::from_result(bundle::deactivate_bundle_category(state, &args.id).await)
        }
        Command::CreateBundle(args) => ActionResult::from_result(bundle::create_bundle(state, args).await),
        Command::UpdateBundle(args) => ActionResult::from_result(bundle::update_bundle(state, args).await),
        Command::GetBundles(args) => ActionResult::from_result(
            bundle::get_bundles(state, args.category_id.as_deref()).await,
        ),
        Command::GetBundle(args) => ActionResult::from_result(bundle::get_bundle(state, &args.id).await),
        Command::DeactivateBundle(args) => {
            ActionResult::from_result(bundle::deactivate_bundle(state, &args.id).await)
        }

        Command::CreateSale(args) => ActionResult::from_result(sale::create_sale(state, args).await),
        Command::GetSale(args) => ActionResult::from_result(sale::get_sale(state, &args.id).await),

        Command::GetExchangeRate => ActionResult::from_result(Ok(rate::get_exchange_rate(state).await)),
    };

    debug!(success = reply.is_success(), "Command finished");
    reply
}

/// Parses one request line and dispatches it. Malformed input is answered
/// with a `BAD_REQUEST` envelope.
pub async fn handle_line(state: &AppState, line: &str) -> ActionResult {
    let command: Command = match serde_json::from_str(line) {
        Ok(command) => command,
        Err(err) => {
            warn!(error = %err, "Rejected malformed command");
            return ActionResult::err(ApiError::bad_request(format!("Invalid command: {err}")));
        }
    };

    debug!(?command, "Dispatching command");
    dispatch(state, command).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Command {
        serde_json::from_str(line).unwrap()
    }

    #[test]
    fn test_stock_commands_name_their_item() {
        let command = parse(r#"{"command": "stockOut", "args": {"itemId": "item-7", "quantity": 2}}"#);
        assert_eq!(command.name(), "stockOut");
        assert_eq!(command.item_id(), Some("item-7"));

        let command = parse(r#"{"command": "reconcileItem", "args": {"id": "item-9"}}"#);
        assert_eq!(command.name(), "reconcileItem");
        assert_eq!(command.item_id(), Some("item-9"));
    }

    #[test]
    fn test_multi_item_commands_have_no_item() {
        let command = parse(r#"{"command": "getPurchase", "args": {"id": "purchase-1"}}"#);
        assert_eq!(command.name(), "getPurchase");
        assert_eq!(command.item_id(), None);

        let command = parse(r#"{"command": "checkStockAlerts"}"#);
        assert_eq!(command.name(), "checkStockAlerts");
        assert_eq!(command.item_id(), None);
    }
}
