//! End-to-end ledger scenarios against a real SQLite database.

use std::path::PathBuf;

use stockbook_core::bundle::BundleLineInput;
use stockbook_core::purchase::{CartLineInput, PurchaseLineInput};
use stockbook_core::{
    CoreError, InventoryItem, ItemType, LedgerReference, PaymentMethod, PurchaseStatus, SaleType,
    TransactionType,
};
use stockbook_db::services::bundle::CreateBundleRequest;
use stockbook_db::services::item::{CreateItemRequest, UpdateItemRequest};
use stockbook_db::services::purchase::{RegisterPaymentRequest, RegisterPurchaseRequest};
use stockbook_db::services::sale::CreateSaleRequest;
use stockbook_db::services::stock::{StockInRequest, StockOutRequest};
use stockbook_db::{Database, DbConfig, DbError};

async fn memory_db() -> Database {
    Database::new(DbConfig::in_memory()).await.unwrap()
}

async fn add_item(
    db: &Database,
    sku: &str,
    base_price_cents: i64,
    stock: i64,
    allow_pre_sale: bool,
) -> InventoryItem {
    db.catalog()
        .create_item(CreateItemRequest {
            sku: sku.to_string(),
            name: format!("Item {sku}"),
            description: None,
            item_type: ItemType::Physical,
            base_price_cents,
            cost_price_cents: None,
            margin_bps: None,
            minimum_stock: 0,
            allow_pre_sale,
            initial_stock: Some(stock),
            initial_unit_cost_cents: None,
        })
        .await
        .unwrap()
}

fn stock_out(item_id: &str, quantity: i64) -> StockOutRequest {
    StockOutRequest {
        item_id: item_id.to_string(),
        quantity,
        notes: None,
        reference: None,
    }
}

fn purchase_of(lines: Vec<PurchaseLineInput>) -> RegisterPurchaseRequest {
    RegisterPurchaseRequest {
        supplier_name: "Distribuidora Central".to_string(),
        invoice_number: Some("F-0042".to_string()),
        notes: None,
        due_date: None,
        items: lines,
    }
}

fn line(item_id: &str, quantity: i64, unit_cost_cents: i64) -> PurchaseLineInput {
    PurchaseLineInput {
        item_id: item_id.to_string(),
        quantity,
        unit_cost_cents,
    }
}

fn payment(purchase_id: &str, amount_cents: i64) -> RegisterPaymentRequest {
    RegisterPaymentRequest {
        purchase_id: purchase_id.to_string(),
        amount_cents,
        payment_method: PaymentMethod::Transfer,
        reference: None,
        notes: None,
    }
}

#[tokio::test]
async fn oversell_without_presale_is_rejected() {
    let db = memory_db().await;
    let item = add_item(&db, "RICE-1KG", 250, 10, false).await;

    let err = db.stock().stock_out(stock_out(&item.id, 15)).await.unwrap_err();
    assert!(matches!(
        err,
        DbError::Domain(CoreError::InsufficientStock { available: 10, requested: 15, .. })
    ));

    let stored = db.catalog().get_item(&item.id).await.unwrap();
    assert_eq!(stored.current_stock, 10);
    assert_eq!(stored.reserved_stock, 0);
}

#[tokio::test]
async fn oversell_with_presale_reserves_the_shortfall() {
    let db = memory_db().await;
    let item = add_item(&db, "RICE-1KG", 250, 10, true).await;

    let result = db.stock().stock_out(stock_out(&item.id, 15)).await.unwrap();
    assert_eq!(result.split.regular_units, 10);
    assert_eq!(result.split.pre_sale_units, 5);
    assert_eq!(result.item.current_stock, 0);
    assert_eq!(result.item.reserved_stock, 5);

    let history = db.stock().list_transactions(&item.id, 10).await.unwrap();
    let out: Vec<_> = history
        .iter()
        .filter(|t| t.transaction_type != TransactionType::Initial)
        .map(|t| (t.transaction_type, t.quantity))
        .collect();
    assert_eq!(out.len(), 2);
    assert!(out.contains(&(TransactionType::Out, -10)));
    assert!(out.contains(&(TransactionType::Reservation, -5)));
}

#[tokio::test]
async fn first_purchase_sets_the_unit_cost() {
    let db = memory_db().await;
    let item = add_item(&db, "OIL-1L", 1000, 0, false).await;

    let receipt = db
        .purchasing()
        .register_purchase(purchase_of(vec![line(&item.id, 5, 800)]))
        .await
        .unwrap();
    assert_eq!(receipt.purchase.total_amount_cents, 4000);
    assert_eq!(receipt.purchase.status, PurchaseStatus::Pending);

    let stored = db.catalog().get_item(&item.id).await.unwrap();
    assert_eq!(stored.current_stock, 5);
    assert_eq!(stored.cost_price_cents, Some(800));
}

#[tokio::test]
async fn purchase_averages_with_the_price_basis() {
    let db = memory_db().await;
    let item = add_item(&db, "OIL-1L", 800, 5, false).await;

    let receipt = db
        .purchasing()
        .register_purchase(purchase_of(vec![line(&item.id, 5, 1200)]))
        .await
        .unwrap();

    let stored = db.catalog().get_item(&item.id).await.unwrap();
    assert_eq!(stored.current_stock, 10);
    assert_eq!(stored.cost_price_cents, Some(1000));

    let entry = receipt
        .transactions
        .iter()
        .find(|t| t.transaction_type == TransactionType::In)
        .unwrap();
    assert_eq!(entry.quantity, 5);
    assert!(matches!(
        entry.reference,
        Some(LedgerReference::Purchase {
            unit_cost_cents: 1200,
            previous_cost_cents: 800,
            new_cost_cents: 1000,
            ..
        })
    ));
}

#[tokio::test]
async fn bundle_discount_pricing() {
    let db = memory_db().await;
    let a = add_item(&db, "PASTA-500", 1000, 0, false).await;
    let b = add_item(&db, "COFFEE-250", 2000, 0, false).await;
    let category = db.bundling().create_category("Breakfast").await.unwrap();

    let view = db
        .bundling()
        .create_bundle(CreateBundleRequest {
            name: "Breakfast box".to_string(),
            description: None,
            category_id: category.id,
            items: vec![
                BundleLineInput {
                    item_id: a.id.clone(),
                    quantity: 1,
                    override_price_cents: None,
                },
                BundleLineInput {
                    item_id: b.id.clone(),
                    quantity: 1,
                    override_price_cents: None,
                },
            ],
            discount_bps: 1000,
            currency_type: Default::default(),
            conversion_rate: None,
        })
        .await
        .unwrap();

    assert_eq!(view.pricing.total_base_price.cents(), 3000);
    assert_eq!(view.pricing.discounted_price.cents(), 2700);
    assert_eq!(view.pricing.savings.cents(), 300);
    assert_eq!(view.lines.len(), 2);
}

#[tokio::test]
async fn payments_move_a_purchase_to_paid() {
    let db = memory_db().await;
    let item = add_item(&db, "SUGAR-1KG", 150, 0, false).await;
    let purchase = db
        .purchasing()
        .register_purchase(purchase_of(vec![line(&item.id, 1, 10_000)]))
        .await
        .unwrap()
        .purchase;

    let partial = db
        .purchasing()
        .register_payment(payment(&purchase.id, 6000))
        .await
        .unwrap();
    assert_eq!(partial.status, PurchaseStatus::Partial);
    assert_eq!(partial.paid_amount_cents, 6000);

    let err = db
        .purchasing()
        .register_payment(payment(&purchase.id, 4100))
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Domain(CoreError::InvalidAmount { .. })));

    let paid = db
        .purchasing()
        .register_payment(payment(&purchase.id, 4000))
        .await
        .unwrap();
    assert_eq!(paid.status, PurchaseStatus::Paid);

    let detail = db.purchasing().get_purchase(&purchase.id).await.unwrap();
    assert_eq!(detail.payments.len(), 2);
    assert!(db.purchasing().list_outstanding().await.unwrap().is_empty());

    // Nothing is left to pay.
    let err = db
        .purchasing()
        .register_payment(payment(&purchase.id, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Domain(CoreError::InvalidAmount { .. })));
}

#[tokio::test]
async fn purchase_with_unknown_item_is_not_recorded() {
    let db = memory_db().await;
    let item = add_item(&db, "BEANS-1KG", 300, 2, false).await;

    let err = db
        .purchasing()
        .register_purchase(purchase_of(vec![
            line(&item.id, 10, 200),
            line("no-such-item", 1, 100),
        ]))
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Domain(CoreError::ItemNotFound(_))));

    let stored = db.catalog().get_item(&item.id).await.unwrap();
    assert_eq!(stored.current_stock, 2);
    assert_eq!(stored.cost_price_cents, None);
    assert!(db.purchasing().list_purchases(10).await.unwrap().is_empty());
    assert_eq!(db.stock().list_transactions(&item.id, 10).await.unwrap().len(), 1);
}

#[tokio::test]
async fn oversized_amounts_are_rejected_before_writing() {
    let db = memory_db().await;
    let item = add_item(&db, "SUGAR-1KG", 150, 8, false).await;
    let huge = i64::MAX / 2;

    let err = db
        .purchasing()
        .register_purchase(purchase_of(vec![line(&item.id, 3, huge)]))
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));
    assert!(db.purchasing().list_purchases(10).await.unwrap().is_empty());

    let err = db
        .selling()
        .create_sale(CreateSaleRequest {
            client_id: "client-1".to_string(),
            beneficiary_id: None,
            organization_id: None,
            bundle_id: None,
            sale_type: SaleType::Direct,
            cart: vec![CartLineInput {
                item_id: item.id.clone(),
                quantity: 3,
                unit_price_cents: huge,
                override_price_cents: None,
            }],
            notes: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));

    let category = db.bundling().create_category("Pantry").await.unwrap();
    let err = db
        .bundling()
        .create_bundle(CreateBundleRequest {
            name: "Sweet pack".to_string(),
            description: None,
            category_id: category.id,
            items: vec![BundleLineInput {
                item_id: item.id.clone(),
                quantity: 3,
                override_price_cents: Some(huge),
            }],
            discount_bps: 0,
            currency_type: Default::default(),
            conversion_rate: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));

    let stored = db.catalog().get_item(&item.id).await.unwrap();
    assert_eq!(stored.current_stock, 8);
    assert_eq!(db.stock().list_transactions(&item.id, 10).await.unwrap().len(), 1);
}

#[tokio::test]
async fn ledger_matches_counters_after_mixed_activity() {
    let db = memory_db().await;
    let flour = add_item(&db, "FLOUR-1KG", 180, 20, true).await;
    let salt = add_item(&db, "SALT-1KG", 90, 5, false).await;

    db.purchasing()
        .register_purchase(purchase_of(vec![line(&flour.id, 10, 120), line(&salt.id, 10, 60)]))
        .await
        .unwrap();

    db.selling()
        .create_sale(CreateSaleRequest {
            client_id: "client-1".to_string(),
            beneficiary_id: None,
            organization_id: None,
            bundle_id: None,
            sale_type: SaleType::Direct,
            cart: vec![CartLineInput {
                item_id: flour.id.clone(),
                quantity: 35,
                unit_price_cents: 180,
                override_price_cents: None,
            }],
            notes: None,
        })
        .await
        .unwrap();

    db.selling()
        .create_sale(CreateSaleRequest {
            client_id: "client-2".to_string(),
            beneficiary_id: None,
            organization_id: None,
            bundle_id: None,
            sale_type: SaleType::Presale,
            cart: vec![CartLineInput {
                item_id: salt.id.clone(),
                quantity: 4,
                unit_price_cents: 90,
                override_price_cents: Some(80),
            }],
            notes: Some("deliver next week".to_string()),
        })
        .await
        .unwrap();

    db.stock()
        .stock_in(StockInRequest {
            item_id: flour.id.clone(),
            quantity: 8,
            notes: None,
            reference: Some(LedgerReference::Manual {
                source: "supplier return".to_string(),
            }),
            transaction_type: None,
        })
        .await
        .unwrap();

    let flour_now = db.catalog().get_item(&flour.id).await.unwrap();
    assert_eq!(flour_now.current_stock, 8);
    assert_eq!(flour_now.reserved_stock, 5);

    let salt_now = db.catalog().get_item(&salt.id).await.unwrap();
    assert_eq!(salt_now.current_stock, 15);
    assert_eq!(salt_now.reserved_stock, 4);

    let reports = db.stock().reconcile_all().await.unwrap();
    assert_eq!(reports.len(), 2);
    assert!(reports.iter().all(|r| r.consistent));
}

#[tokio::test]
async fn inactive_bundle_cannot_be_sold() {
    let db = memory_db().await;
    let item = add_item(&db, "MILK-1L", 200, 10, false).await;
    let category = db.bundling().create_category("Dairy").await.unwrap();
    let bundle = db
        .bundling()
        .create_bundle(CreateBundleRequest {
            name: "Dairy pack".to_string(),
            description: None,
            category_id: category.id,
            items: vec![BundleLineInput {
                item_id: item.id.clone(),
                quantity: 2,
                override_price_cents: None,
            }],
            discount_bps: 0,
            currency_type: Default::default(),
            conversion_rate: None,
        })
        .await
        .unwrap()
        .bundle;
    db.bundling().deactivate_bundle(&bundle.id).await.unwrap();

    let err = db
        .selling()
        .create_sale(CreateSaleRequest {
            client_id: "client-1".to_string(),
            beneficiary_id: None,
            organization_id: None,
            bundle_id: Some(bundle.id.clone()),
            sale_type: SaleType::Direct,
            cart: vec![CartLineInput {
                item_id: item.id.clone(),
                quantity: 2,
                unit_price_cents: 200,
                override_price_cents: None,
            }],
            notes: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));

    let stored = db.catalog().get_item(&item.id).await.unwrap();
    assert_eq!(stored.current_stock, 10);
}

struct TempDb(PathBuf);

impl TempDb {
    fn new() -> Self {
        TempDb(std::env::temp_dir().join(format!("stockbook-{}.db", uuid::Uuid::new_v4())))
    }
}

impl Drop for TempDb {
    fn drop(&mut self) {
        for suffix in ["", "-wal", "-shm"] {
            let mut path = self.0.clone().into_os_string();
            path.push(suffix);
            let _ = std::fs::remove_file(path);
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_sales_never_oversell() {
    let file = TempDb::new();
    let db = Database::new(DbConfig::new(&file.0).max_connections(4))
        .await
        .unwrap();
    let item = add_item(&db, "WATER-5L", 300, 5, false).await;

    let mut handles = Vec::new();
    for _ in 0..10 {
        let db = db.clone();
        let item_id = item.id.clone();
        handles.push(tokio::spawn(async move {
            db.stock().stock_out(stock_out(&item_id, 1)).await
        }));
    }

    let mut sold = 0;
    let mut refused = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => sold += 1,
            Err(DbError::Domain(CoreError::InsufficientStock { .. })) => refused += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(sold, 5);
    assert_eq!(refused, 5);

    let report = db.stock().reconcile_item(&item.id).await.unwrap();
    assert_eq!(report.current_stock, 0);
    assert_eq!(report.ledger.physical, 0);

    db.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_edits_and_stock_moves_all_commit() {
    let file = TempDb::new();
    let db = Database::new(DbConfig::new(&file.0).max_connections(4))
        .await
        .unwrap();
    let item = add_item(&db, "OIL-1L", 500, 20, false).await;

    let mut handles = Vec::new();
    for round in 0..8 {
        let db = db.clone();
        let item_id = item.id.clone();
        handles.push(tokio::spawn(async move {
            if round % 2 == 0 {
                db.catalog()
                    .update_item(UpdateItemRequest {
                        id: item_id,
                        name: Some(format!("Sunflower oil {round}")),
                        ..Default::default()
                    })
                    .await
                    .map(|_| ())
            } else {
                db.stock().stock_out(stock_out(&item_id, 1)).await.map(|_| ())
            }
        }));
    }

    for handle in handles {
        if let Err(err) = handle.await.unwrap() {
            panic!("unexpected error: {err}");
        }
    }

    let report = db.stock().reconcile_item(&item.id).await.unwrap();
    assert!(report.consistent);
    assert_eq!(report.current_stock, 16);

    db.close().await;
}
