//! Command-line protocol tests: JSON requests in, envelopes out.

use serde_json::{json, Value};

use stockbook_backoffice::commands::handle_line;
use stockbook_backoffice::rates::{BcvRateService, StaticRateProvider};
use stockbook_backoffice::state::AppState;
use stockbook_core::ExchangeRate;
use stockbook_db::{Database, DbConfig};

async fn state_with_rate(rate: Option<f64>) -> AppState {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    let provider = StaticRateProvider::new(rate.and_then(ExchangeRate::from_f64));
    AppState::new(db, BcvRateService::new(provider, ExchangeRate::from_scaled(360_000)))
}

async fn send(state: &AppState, request: Value) -> Value {
    let reply = handle_line(state, &request.to_string()).await;
    serde_json::to_value(reply).unwrap()
}

async fn create_item(state: &AppState, sku: &str, price: i64, stock: i64) -> String {
    let reply = send(
        state,
        json!({
            "command": "createItem",
            "args": {
                "sku": sku,
                "name": format!("Item {sku}"),
                "itemType": "PHYSICAL",
                "basePriceCents": price,
                "minimumStock": 3,
                "initialStock": stock
            }
        }),
    )
    .await;
    assert_eq!(reply["success"], true, "{reply}");
    reply["data"]["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn stock_out_reports_insufficient_stock() {
    let state = state_with_rate(None).await;
    let id = create_item(&state, "tuna-can", 350, 4).await;

    let reply = send(
        &state,
        json!({"command": "stockOut", "args": {"itemId": id, "quantity": 6}}),
    )
    .await;
    assert_eq!(reply["success"], false);
    assert_eq!(reply["code"], "INSUFFICIENT_STOCK");

    let item = send(&state, json!({"command": "getItemBySku", "args": {"sku": "TUNA-CAN"}})).await;
    assert_eq!(item["data"]["currentStock"], 4);
}

#[tokio::test]
async fn malformed_requests_are_rejected() {
    let state = state_with_rate(None).await;

    let reply = serde_json::to_value(handle_line(&state, "{not json").await).unwrap();
    assert_eq!(reply["code"], "BAD_REQUEST");

    let reply = send(&state, json!({"command": "launchRockets"})).await;
    assert_eq!(reply["success"], false);
    assert_eq!(reply["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn unknown_ids_map_to_not_found() {
    let state = state_with_rate(None).await;

    let reply = send(&state, json!({"command": "getPurchase", "args": {"id": "nope"}})).await;
    assert_eq!(reply["code"], "NOT_FOUND");

    let reply = send(&state, json!({"command": "reconcileItem", "args": {"id": "nope"}})).await;
    assert_eq!(reply["code"], "NOT_FOUND");
}

#[tokio::test]
async fn exchange_rate_falls_back_when_unavailable() {
    let state = state_with_rate(None).await;

    let reply = send(&state, json!({"command": "getExchangeRate"})).await;
    assert_eq!(reply["success"], true);
    assert_eq!(reply["data"]["isError"], true);
    assert_eq!(reply["data"]["rate"], 360_000);
}

#[tokio::test]
async fn bs_bundle_takes_the_current_rate() {
    let state = state_with_rate(Some(40.0)).await;
    let id = create_item(&state, "CORN-FLOUR", 1000, 0).await;

    let category = send(
        &state,
        json!({"command": "createBundleCategory", "args": {"name": "Staples"}}),
    )
    .await;
    let category_id = category["data"]["id"].as_str().unwrap();

    let reply = send(
        &state,
        json!({
            "command": "createBundle",
            "args": {
                "name": "Staples pack",
                "categoryId": category_id,
                "items": [{"itemId": id, "quantity": 1}],
                "currencyType": "BS"
            }
        }),
    )
    .await;
    assert_eq!(reply["success"], true, "{reply}");
    assert_eq!(reply["data"]["pricing"]["displayPrice"], 40_000);

    let bundles = send(
        &state,
        json!({"command": "getBundles", "args": {"categoryId": category_id}}),
    )
    .await;
    assert_eq!(bundles["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn purchase_payment_and_alerts_flow() {
    let state = state_with_rate(None).await;
    let id = create_item(&state, "LENTILS", 400, 1).await;

    let alerts = send(&state, json!({"command": "checkStockAlerts"})).await;
    assert_eq!(alerts["data"].as_array().unwrap().len(), 1);

    let purchase = send(
        &state,
        json!({
            "command": "registerPurchase",
            "args": {
                "supplierName": "Granos del Sur",
                "items": [{"itemId": id, "quantity": 10, "unitCostCents": 250}]
            }
        }),
    )
    .await;
    assert_eq!(purchase["success"], true, "{purchase}");
    let purchase_id = purchase["data"]["purchase"]["id"].as_str().unwrap();

    let paid = send(
        &state,
        json!({
            "command": "registerPurchasePayment",
            "args": {"purchaseId": purchase_id, "amountCents": 2500, "paymentMethod": "CASH"}
        }),
    )
    .await;
    assert_eq!(paid["data"]["status"], "PAID");

    let alerts = send(&state, json!({"command": "checkStockAlerts"})).await;
    assert!(alerts["data"].as_array().unwrap().is_empty());

    let reports = send(&state, json!({"command": "reconcileAll"})).await;
    assert_eq!(reports["data"][0]["consistent"], true);
}
