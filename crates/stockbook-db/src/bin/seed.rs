//! # Seed Data Generator
//!
//! Populates a database with demo items, a purchase and a bundle.
//!
//! ## Usage
//! ```bash
//! cargo run -p stockbook-db --bin seed
//!
//! # Specify database path
//! cargo run -p stockbook-db --bin seed -- --db ./data/stockbook.db
//! ```
//!
//! Every item gets an opening balance; the purchase then re-prices the
//! first few items with the moving average, and the bundle groups them.

use std::env;

use stockbook_core::bundle::BundleLineInput;
use stockbook_core::purchase::PurchaseLineInput;
use stockbook_core::{CurrencyType, ItemType};
use stockbook_db::services::bundle::CreateBundleRequest;
use stockbook_db::services::item::CreateItemRequest;
use stockbook_db::services::purchase::RegisterPurchaseRequest;
use stockbook_db::{Database, DbConfig};

/// `(sku, name, price, unit cost, opening stock, allow pre-sale)`
const ITEMS: &[(&str, &str, i64, i64, i64, bool)] = &[
    ("RICE-1KG", "Rice 1kg", 180, 120, 40, false),
    ("PASTA-500", "Pasta 500g", 150, 90, 60, false),
    ("OIL-1L", "Sunflower oil 1L", 420, 300, 24, false),
    ("SUGAR-1KG", "Sugar 1kg", 160, 100, 30, false),
    ("COFFEE-250", "Ground coffee 250g", 650, 450, 12, true),
    ("MILK-PWD", "Powdered milk 400g", 780, 560, 8, true),
    ("FLOUR-1KG", "Corn flour 1kg", 140, 85, 50, false),
    ("BEANS-1KG", "Black beans 1kg", 230, 150, 20, false),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./stockbook_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Stockbook Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./stockbook_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Stockbook Seed Data Generator");
    println!("=============================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected, migrations applied");

    if !db.catalog().list_items(true).await?.is_empty() {
        println!("⚠ Database already has items, skipping seed.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let mut ids = Vec::with_capacity(ITEMS.len());
    for (sku, name, price, cost, stock, pre_sale) in ITEMS {
        let item = db
            .catalog()
            .create_item(CreateItemRequest {
                sku: sku.to_string(),
                name: name.to_string(),
                description: None,
                item_type: ItemType::Physical,
                base_price_cents: *price,
                cost_price_cents: None,
                margin_bps: Some(3000),
                minimum_stock: 10,
                allow_pre_sale: *pre_sale,
                initial_stock: Some(*stock),
                initial_unit_cost_cents: Some(*cost),
            })
            .await?;
        ids.push(item.id);
    }
    println!("✓ Created {} items", ids.len());

    let receipt = db
        .purchasing()
        .register_purchase(RegisterPurchaseRequest {
            supplier_name: "Distribuidora Central".to_string(),
            invoice_number: Some("F-0001".to_string()),
            notes: None,
            due_date: None,
            items: ids
                .iter()
                .take(3)
                .zip(ITEMS)
                .map(|(id, (_, _, _, cost, _, _))| PurchaseLineInput {
                    item_id: id.clone(),
                    quantity: 20,
                    unit_cost_cents: cost + 15,
                })
                .collect(),
        })
        .await?;
    println!(
        "✓ Registered purchase {} for {}",
        receipt.purchase.id,
        receipt.purchase.total_amount()
    );

    let category = db.bundling().create_category("Food kits").await?;
    let bundle = db
        .bundling()
        .create_bundle(CreateBundleRequest {
            name: "Basic food kit".to_string(),
            description: Some("Staples for one week".to_string()),
            category_id: category.id,
            items: ids
                .iter()
                .take(4)
                .map(|id| BundleLineInput {
                    item_id: id.clone(),
                    quantity: 2,
                    override_price_cents: None,
                })
                .collect(),
            discount_bps: 500,
            currency_type: CurrencyType::Usd,
            conversion_rate: None,
        })
        .await?;
    println!(
        "✓ Created bundle '{}' at {}",
        bundle.bundle.name, bundle.pricing.discounted_price
    );

    let alerts = db.catalog().check_stock_alerts().await?;
    println!("  {} low stock alerts", alerts.len());

    println!();
    println!("✓ Seed complete!");

    Ok(())
}
