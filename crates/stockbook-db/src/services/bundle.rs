//! # Bundle Service
//!
//! Categories, bundle creation and editing, and priced bundle views.
//!
//! Creating a bundle moves no stock. Editing one diffs the stored lines
//! against the requested lines and books the difference as `ADJUSTMENT`
//! entries referencing the bundle:
//!
//! ```text
//! stored 2 × A, 1 × B      requested 3 × A, 1 × C
//!
//!   A: 2 → 3   adjust −1   (one more unit committed)
//!   B: 1 → 0   adjust +1   (returned)
//!   C: 0 → 1   adjust −1
//! ```
//!
//! All adjustments, the header update and the line replacement share one
//! unit of work; an adjustment that would overdraw stock rolls back the
//! whole edit.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::{BundleRepository, ItemRepository};
use crate::services::stock::adjust_within;
use crate::unit_of_work::UnitOfWork;
use stockbook_core::bundle::{
    diff_lines, price_bundle, validate_bundle_lines, validate_discount, BundleComponent,
    BundleLineInput, LineChange,
};
use stockbook_core::validation::{validate_name, validate_notes};
use stockbook_core::{
    Bundle, BundleCategory, BundleItem, BundlePricing, CoreError, CurrencyType, ExchangeRate,
    InventoryItem, InventoryTransaction, LedgerReference, Money, Percentage, PricingMode,
    RecordStatus, ValidationError,
};

// =============================================================================
// Requests & Views
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBundleRequest {
    pub name: String,
    pub description: Option<String>,
    pub category_id: String,
    pub items: Vec<BundleLineInput>,
    #[serde(default)]
    pub discount_bps: i64,
    #[serde(default)]
    pub currency_type: CurrencyType,
    pub conversion_rate: Option<ExchangeRate>,
}

/// Edit of an existing bundle. `None` fields keep their stored value;
/// `items` always replaces the lines.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBundleRequest {
    pub bundle_id: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<String>,
    pub items: Vec<BundleLineInput>,
    pub discount_bps: Option<i64>,
    pub pricing: Option<PricingMode>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleLineView {
    pub item_id: String,
    pub sku: String,
    pub name: String,
    pub quantity: i64,
    pub override_price_cents: Option<i64>,
    pub unit_price: Money,
    pub line_total: Money,
    pub available_stock: i64,
}

/// A bundle with its lines and live pricing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleView {
    pub bundle: Bundle,
    pub lines: Vec<BundleLineView>,
    pub pricing: BundlePricing,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleUpdateResult {
    pub bundle: BundleView,
    pub changes: Vec<LineChange>,
    pub transactions: Vec<InventoryTransaction>,
}

// =============================================================================
// Service
// =============================================================================

/// Bundle engine operations.
#[derive(Debug, Clone)]
pub struct BundleService {
    pool: SqlitePool,
}

impl BundleService {
    pub fn new(pool: SqlitePool) -> Self {
        BundleService { pool }
    }

    // =========================================================================
    // Categories
    // =========================================================================

    pub async fn create_category(&self, name: &str) -> DbResult<BundleCategory> {
        validate_name("name", name)?;

        let category = BundleCategory {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            status: RecordStatus::Active,
            created_at: chrono::Utc::now(),
        };
        BundleRepository::insert_category(&self.pool, &category).await?;

        info!(id = %category.id, name = %category.name, "Bundle category created");
        Ok(category)
    }

    pub async fn list_categories(&self, include_inactive: bool) -> DbResult<Vec<BundleCategory>> {
        BundleRepository::new(self.pool.clone())
            .list_categories(include_inactive)
            .await
    }

    /// Hides a category from new bundles; existing bundles keep it.
    pub async fn deactivate_category(&self, id: &str) -> DbResult<BundleCategory> {
        let updated =
            BundleRepository::set_category_status(&self.pool, id, RecordStatus::Inactive).await?;
        if updated == 0 {
            return Err(CoreError::CategoryNotFound(id.to_string()).into());
        }

        let category = BundleRepository::fetch_category(&self.pool, id)
            .await?
            .ok_or_else(|| DbError::from(CoreError::CategoryNotFound(id.to_string())))?;

        info!(id = %category.id, name = %category.name, "Bundle category deactivated");
        Ok(category)
    }

    // =========================================================================
    // Bundles
    // =========================================================================

    /// Creates a bundle priced from its components. Moves no stock.
    pub async fn create_bundle(&self, request: CreateBundleRequest) -> DbResult<BundleView> {
        validate_name("name", &request.name)?;
        validate_notes("description", request.description.as_deref())?;
        validate_bundle_lines(&request.items)?;
        let discount = Percentage::from_bps(request.discount_bps);
        validate_discount(discount)?;

        let mode = PricingMode::Derived {
            currency: request.currency_type,
            conversion_rate: request.conversion_rate,
        };
        mode.validate()?;

        let mut uow = UnitOfWork::begin(&self.pool).await?;
        ensure_category(uow.conn(), &request.category_id).await?;

        let mut items = HashMap::new();
        for line in &request.items {
            let item = load_item(uow.conn(), &line.item_id).await?;
            ensure_active(&item)?;
            items.insert(item.id.clone(), item);
        }

        let now = uow.now();
        let bundle_id = Uuid::new_v4().to_string();
        let lines = line_rows(&bundle_id, &request.items);
        let (components, _) = components_for(&lines, &items)?;
        let pricing = price_bundle(&components, &mode, discount)?;

        let bundle = Bundle {
            id: bundle_id,
            name: request.name.trim().to_string(),
            description: request.description,
            category_id: request.category_id,
            pricing_mode: mode.kind(),
            base_price_cents: pricing.total_base_price.cents(),
            discount_bps: discount.bps(),
            margin_bps: None,
            currency_type: mode.currency(),
            conversion_rate_scaled: mode.conversion_rate().map(|r| r.scaled()),
            status: RecordStatus::Active,
            total_sales: 0,
            total_revenue_cents: 0,
            last_sale_date: None,
            created_at: now,
            updated_at: now,
        };

        BundleRepository::insert(uow.conn(), &bundle).await?;
        for line in &lines {
            BundleRepository::insert_item(uow.conn(), line).await?;
        }
        uow.commit().await?;

        info!(
            bundle_id = %bundle.id,
            name = %bundle.name,
            lines = lines.len(),
            price = %pricing.discounted_price,
            "Bundle created"
        );

        view(bundle, lines, &items)
    }

    /// Edits a bundle, booking line changes against stock.
    pub async fn update_bundle(&self, request: UpdateBundleRequest) -> DbResult<BundleUpdateResult> {
        if let Some(name) = &request.name {
            validate_name("name", name)?;
        }
        validate_notes("description", request.description.as_deref())?;
        validate_bundle_lines(&request.items)?;
        if let Some(bps) = request.discount_bps {
            validate_discount(Percentage::from_bps(bps))?;
        }
        if let Some(mode) = &request.pricing {
            mode.validate()?;
        }

        let mut uow = UnitOfWork::begin(&self.pool).await?;

        let mut bundle = BundleRepository::fetch(uow.conn(), &request.bundle_id)
            .await?
            .ok_or_else(|| DbError::from(CoreError::BundleNotFound(request.bundle_id.clone())))?;
        if let Some(category_id) = &request.category_id {
            ensure_category(uow.conn(), category_id).await?;
        }

        let previous = BundleRepository::fetch_items(uow.conn(), &bundle.id).await?;

        let mut items = HashMap::new();
        for line in &request.items {
            let item = uow.item(&line.item_id).await?;
            let is_new = !previous.iter().any(|p| p.item_id == item.id);
            if is_new {
                ensure_active(&item)?;
            }
            items.insert(item.id.clone(), item);
        }

        let changes = diff_lines(
            previous.iter().map(|l| (l.item_id.as_str(), l.quantity)),
            request.items.iter().map(|l| (l.item_id.as_str(), l.quantity)),
        );

        let notes = format!("Bundle update: {}", bundle.name);
        for change in &changes {
            debug!(
                item_id = %change.item_id,
                previous = change.previous,
                desired = change.desired,
                "Bundle line changed"
            );
            let item = adjust_within(
                &mut uow,
                &change.item_id,
                change.stock_delta(),
                Some(LedgerReference::BundleUpdate {
                    bundle_id: bundle.id.clone(),
                }),
                Some(notes.clone()),
            )
            .await?;
            items.insert(item.id.clone(), item);
        }

        let lines = line_rows(&bundle.id, &request.items);
        let mode = request.pricing.unwrap_or_else(|| bundle.pricing_mode());
        let discount = request
            .discount_bps
            .map(Percentage::from_bps)
            .unwrap_or_else(|| bundle.discount());
        let (components, _) = components_for(&lines, &items)?;
        let pricing = price_bundle(&components, &mode, discount)?;

        if let Some(name) = request.name {
            bundle.name = name.trim().to_string();
        }
        if request.description.is_some() {
            bundle.description = request.description;
        }
        if let Some(category_id) = request.category_id {
            bundle.category_id = category_id;
        }
        bundle.pricing_mode = mode.kind();
        bundle.base_price_cents = pricing.list_price.cents();
        bundle.discount_bps = discount.bps();
        bundle.margin_bps = mode.margin().map(|m| m.bps());
        bundle.currency_type = mode.currency();
        bundle.conversion_rate_scaled = mode.conversion_rate().map(|r| r.scaled());
        bundle.updated_at = uow.now();

        BundleRepository::update(uow.conn(), &bundle).await?;
        BundleRepository::delete_items(uow.conn(), &bundle.id).await?;
        for line in &lines {
            BundleRepository::insert_item(uow.conn(), line).await?;
        }

        let transactions = uow.commit().await?;

        info!(
            bundle_id = %bundle.id,
            changes = changes.len(),
            adjustments = transactions.len(),
            mode = ?bundle.pricing_mode,
            price = %pricing.discounted_price,
            "Bundle updated"
        );

        Ok(BundleUpdateResult {
            bundle: view(bundle, lines, &items)?,
            changes,
            transactions,
        })
    }

    /// Active bundles with live pricing, optionally for one category.
    pub async fn get_bundles(&self, category_id: Option<&str>) -> DbResult<Vec<BundleView>> {
        let repo = BundleRepository::new(self.pool.clone());
        let bundles = repo.list(category_id).await?;

        let items: HashMap<String, InventoryItem> = ItemRepository::new(self.pool.clone())
            .list(true)
            .await?
            .into_iter()
            .map(|item| (item.id.clone(), item))
            .collect();

        let mut views = Vec::with_capacity(bundles.len());
        for bundle in bundles {
            let lines = repo.get_items(&bundle.id).await?;
            views.push(view(bundle, lines, &items)?);
        }
        Ok(views)
    }

    pub async fn get_bundle(&self, id: &str) -> DbResult<BundleView> {
        let repo = BundleRepository::new(self.pool.clone());
        let bundle = repo
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::from(CoreError::BundleNotFound(id.to_string())))?;
        let lines = repo.get_items(id).await?;

        let mut items = HashMap::new();
        for line in &lines {
            if let Some(item) = ItemRepository::fetch(&self.pool, &line.item_id).await? {
                items.insert(item.id.clone(), item);
            }
        }

        view(bundle, lines, &items)
    }

    /// Hides a bundle from listings and new sales.
    pub async fn deactivate_bundle(&self, id: &str) -> DbResult<Bundle> {
        let updated = BundleRepository::set_status(&self.pool, id, RecordStatus::Inactive).await?;
        if updated == 0 {
            return Err(CoreError::BundleNotFound(id.to_string()).into());
        }

        let bundle = BundleRepository::fetch(&self.pool, id)
            .await?
            .ok_or_else(|| DbError::from(CoreError::BundleNotFound(id.to_string())))?;

        info!(bundle_id = %bundle.id, name = %bundle.name, "Bundle deactivated");
        Ok(bundle)
    }
}

// =============================================================================
// Helpers
// =============================================================================

async fn ensure_category(conn: &mut SqliteConnection, id: &str) -> DbResult<()> {
    let category = BundleRepository::fetch_category(&mut *conn, id)
        .await?
        .ok_or_else(|| DbError::from(CoreError::CategoryNotFound(id.to_string())))?;

    if category.status != RecordStatus::Active {
        return Err(ValidationError::InvalidFormat {
            field: "category_id".to_string(),
            reason: format!("category '{}' is inactive", category.name),
        }
        .into());
    }
    Ok(())
}

async fn load_item(conn: &mut SqliteConnection, id: &str) -> DbResult<InventoryItem> {
    ItemRepository::fetch(&mut *conn, id)
        .await?
        .ok_or_else(|| CoreError::ItemNotFound(id.to_string()).into())
}

fn ensure_active(item: &InventoryItem) -> DbResult<()> {
    if item.is_active() {
        Ok(())
    } else {
        Err(CoreError::ItemInactive(item.sku.clone()).into())
    }
}

fn line_rows(bundle_id: &str, lines: &[BundleLineInput]) -> Vec<BundleItem> {
    lines
        .iter()
        .enumerate()
        .map(|(position, line)| BundleItem {
            id: Uuid::new_v4().to_string(),
            bundle_id: bundle_id.to_string(),
            item_id: line.item_id.clone(),
            quantity: line.quantity,
            override_price_cents: line.override_price_cents,
            position: position as i64,
        })
        .collect()
}

fn components_for(
    lines: &[BundleItem],
    items: &HashMap<String, InventoryItem>,
) -> DbResult<(Vec<BundleComponent>, Vec<BundleLineView>)> {
    let mut components = Vec::with_capacity(lines.len());
    let mut views = Vec::with_capacity(lines.len());

    for line in lines {
        let item = items
            .get(&line.item_id)
            .ok_or_else(|| DbError::from(CoreError::ItemNotFound(line.item_id.clone())))?;

        let component = BundleComponent::new(
            item,
            line.quantity,
            line.override_price_cents.map(Money::from_cents),
        );
        views.push(BundleLineView {
            item_id: item.id.clone(),
            sku: item.sku.clone(),
            name: item.name.clone(),
            quantity: line.quantity,
            override_price_cents: line.override_price_cents,
            unit_price: component.unit_price(),
            line_total: component.line_total()?,
            available_stock: item.current_stock,
        });
        components.push(component);
    }

    Ok((components, views))
}

fn view(
    bundle: Bundle,
    lines: Vec<BundleItem>,
    items: &HashMap<String, InventoryItem>,
) -> DbResult<BundleView> {
    let (components, lines) = components_for(&lines, items)?;
    let pricing = price_bundle(&components, &bundle.pricing_mode(), bundle.discount())?;
    Ok(BundleView {
        bundle,
        lines,
        pricing,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::services::item::CreateItemRequest;
    use stockbook_core::{ItemType, PricingModeKind, TransactionType};

    async fn item(db: &Database, sku: &str, stock: i64, price: i64) -> InventoryItem {
        db.catalog()
            .create_item(CreateItemRequest {
                sku: sku.to_string(),
                name: sku.to_string(),
                description: None,
                item_type: ItemType::Physical,
                base_price_cents: price,
                cost_price_cents: None,
                margin_bps: None,
                minimum_stock: 0,
                allow_pre_sale: false,
                initial_stock: Some(stock),
                initial_unit_cost_cents: None,
            })
            .await
            .unwrap()
    }

    fn line(item: &InventoryItem, quantity: i64) -> BundleLineInput {
        BundleLineInput {
            item_id: item.id.clone(),
            quantity,
            override_price_cents: None,
        }
    }

    #[tokio::test]
    async fn test_create_bundle_moves_no_stock() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let a = item(&db, "A", 5, 1000).await;
        let b = item(&db, "B", 5, 2000).await;
        let category = db.bundling().create_category("Kits").await.unwrap();

        let view = db
            .bundling()
            .create_bundle(CreateBundleRequest {
                name: "Starter kit".to_string(),
                description: None,
                category_id: category.id,
                items: vec![line(&a, 1), line(&b, 1)],
                discount_bps: 1000,
                currency_type: CurrencyType::Usd,
                conversion_rate: None,
            })
            .await
            .unwrap();

        assert_eq!(view.bundle.base_price_cents, 3000);
        assert_eq!(view.pricing.discounted_price.cents(), 2700);
        assert_eq!(view.pricing.savings.cents(), 300);
        assert_eq!(view.bundle.pricing_mode, PricingModeKind::Derived);

        let a = db.items().get_by_id(&a.id).await.unwrap().unwrap();
        assert_eq!(a.current_stock, 5);
    }

    #[tokio::test]
    async fn test_duplicate_category() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.bundling().create_category("Kits").await.unwrap();

        let err = db.bundling().create_category("Kits").await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_inactive_category_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let a = item(&db, "A", 5, 1000).await;
        let category = db.bundling().create_category("Old").await.unwrap();
        db.bundling().deactivate_category(&category.id).await.unwrap();

        let err = db
            .bundling()
            .create_bundle(CreateBundleRequest {
                name: "Kit".to_string(),
                description: None,
                category_id: category.id,
                items: vec![line(&a, 1)],
                discount_bps: 0,
                currency_type: CurrencyType::Usd,
                conversion_rate: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_update_books_line_changes() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let a = item(&db, "A", 10, 1000).await;
        let b = item(&db, "B", 10, 500).await;
        let c = item(&db, "C", 10, 300).await;
        let category = db.bundling().create_category("Kits").await.unwrap();

        let created = db
            .bundling()
            .create_bundle(CreateBundleRequest {
                name: "Kit".to_string(),
                description: None,
                category_id: category.id,
                items: vec![line(&a, 2), line(&b, 1)],
                discount_bps: 0,
                currency_type: CurrencyType::Usd,
                conversion_rate: None,
            })
            .await
            .unwrap();

        let result = db
            .bundling()
            .update_bundle(UpdateBundleRequest {
                bundle_id: created.bundle.id.clone(),
                name: None,
                description: None,
                category_id: None,
                items: vec![line(&a, 3), line(&c, 1)],
                discount_bps: None,
                pricing: None,
            })
            .await
            .unwrap();

        assert_eq!(result.changes.len(), 3);
        assert!(result
            .transactions
            .iter()
            .all(|t| t.transaction_type == TransactionType::Adjustment));

        let stock = |id: &str| {
            let items = db.items();
            let id = id.to_string();
            async move { items.get_by_id(&id).await.unwrap().unwrap().current_stock }
        };
        assert_eq!(stock(&a.id).await, 9);
        assert_eq!(stock(&b.id).await, 11);
        assert_eq!(stock(&c.id).await, 9);

        assert_eq!(result.bundle.bundle.base_price_cents, 3300);
    }

    #[tokio::test]
    async fn test_update_rolls_back_on_insufficient_stock() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let a = item(&db, "A", 1, 1000).await;
        let b = item(&db, "B", 10, 500).await;
        let category = db.bundling().create_category("Kits").await.unwrap();

        let created = db
            .bundling()
            .create_bundle(CreateBundleRequest {
                name: "Kit".to_string(),
                description: None,
                category_id: category.id,
                items: vec![line(&b, 1)],
                discount_bps: 0,
                currency_type: CurrencyType::Usd,
                conversion_rate: None,
            })
            .await
            .unwrap();

        // Returning B may already have been applied when A fails.
        let err = db
            .bundling()
            .update_bundle(UpdateBundleRequest {
                bundle_id: created.bundle.id.clone(),
                name: Some("Renamed".to_string()),
                description: None,
                category_id: None,
                items: vec![line(&a, 5)],
                discount_bps: None,
                pricing: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::InsufficientStock { .. })));

        let b = db.items().get_by_id(&b.id).await.unwrap().unwrap();
        assert_eq!(b.current_stock, 10);
        let stored = db.bundling().get_bundle(&created.bundle.id).await.unwrap();
        assert_eq!(stored.bundle.name, "Kit");
        assert_eq!(stored.lines.len(), 1);
    }

    #[tokio::test]
    async fn test_direct_pricing_is_not_converted() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let a = item(&db, "A", 10, 1000).await;
        let category = db.bundling().create_category("Kits").await.unwrap();

        let created = db
            .bundling()
            .create_bundle(CreateBundleRequest {
                name: "Kit".to_string(),
                description: None,
                category_id: category.id,
                items: vec![line(&a, 1)],
                discount_bps: 0,
                currency_type: CurrencyType::Bs,
                conversion_rate: Some(ExchangeRate::from_scaled(400_000)),
            })
            .await
            .unwrap();
        assert_eq!(created.pricing.display_price.cents(), 40_000);

        let updated = db
            .bundling()
            .update_bundle(UpdateBundleRequest {
                bundle_id: created.bundle.id.clone(),
                name: None,
                description: None,
                category_id: None,
                items: vec![line(&a, 1)],
                discount_bps: None,
                pricing: Some(PricingMode::Direct {
                    amount: Money::from_cents(50_000),
                    currency: CurrencyType::Bs,
                    margin: Some(Percentage::from_bps(2500)),
                    conversion_rate: Some(ExchangeRate::from_scaled(400_000)),
                }),
            })
            .await
            .unwrap();

        assert!(updated.changes.is_empty());
        assert_eq!(updated.bundle.pricing.display_price.cents(), 50_000);
        assert_eq!(updated.bundle.pricing.estimated_cost.cents(), 40_000);
        assert_eq!(updated.bundle.bundle.margin_bps, Some(2500));
    }
}
