//! # Item Service
//!
//! The item catalogue: creation (with an optional opening balance), edits,
//! deletion and low-stock alerts.

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::error::DbResult;
use crate::repository::ItemRepository;
use crate::unit_of_work::UnitOfWork;
use stockbook_core::ledger::plan_stock_in;
use stockbook_core::validation::{
    validate_margin_bps, validate_name, validate_notes, validate_price_cents,
    validate_search_query, validate_sku, validate_stock_level,
};
use stockbook_core::{
    CoreError, InventoryItem, ItemType, LedgerReference, RecordStatus, StockAlert,
    TransactionType, ValidationError,
};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateItemRequest {
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub item_type: ItemType,
    pub base_price_cents: i64,
    pub cost_price_cents: Option<i64>,
    pub margin_bps: Option<i64>,
    #[serde(default)]
    pub minimum_stock: i64,
    #[serde(default)]
    pub allow_pre_sale: bool,
    /// Opening balance, booked as an `INITIAL` entry.
    pub initial_stock: Option<i64>,
    /// Unit cost of the opening balance; becomes the item's cost.
    pub initial_unit_cost_cents: Option<i64>,
}

/// Partial edit; `None` keeps the stored value. Stock is not editable here.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateItemRequest {
    pub id: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub item_type: Option<ItemType>,
    pub base_price_cents: Option<i64>,
    pub cost_price_cents: Option<i64>,
    pub margin_bps: Option<i64>,
    pub minimum_stock: Option<i64>,
    pub allow_pre_sale: Option<bool>,
    pub status: Option<RecordStatus>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeleteOutcome {
    /// The item had no history and is gone.
    Deleted,
    /// The item is referenced by history and was deactivated instead.
    Deactivated,
}

/// Item catalogue operations.
#[derive(Debug, Clone)]
pub struct ItemService {
    pool: SqlitePool,
}

impl ItemService {
    pub fn new(pool: SqlitePool) -> Self {
        ItemService { pool }
    }

    /// Creates an item, booking any opening stock in the same transaction.
    pub async fn create_item(&self, request: CreateItemRequest) -> DbResult<InventoryItem> {
        validate_sku(&request.sku)?;
        validate_name("name", &request.name)?;
        validate_notes("description", request.description.as_deref())?;
        validate_price_cents(request.base_price_cents)?;
        if let Some(cost) = request.cost_price_cents {
            validate_price_cents(cost)?;
        }
        if let Some(margin) = request.margin_bps {
            validate_margin_bps(margin)?;
        }
        validate_stock_level("minimum_stock", request.minimum_stock)?;
        let initial_stock = request.initial_stock.unwrap_or(0);
        validate_stock_level("initial_stock", initial_stock)?;
        if let Some(cost) = request.initial_unit_cost_cents {
            validate_price_cents(cost)?;
        }

        let sku = request.sku.trim().to_uppercase();
        let mut uow = UnitOfWork::begin(&self.pool).await?;

        let taken: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM inventory_items WHERE sku = ?1)")
            .bind(&sku)
            .fetch_one(uow.conn())
            .await?;
        if taken {
            return Err(ValidationError::Duplicate {
                field: "sku".to_string(),
                value: sku,
            }
            .into());
        }

        let now = uow.now();
        let mut item = InventoryItem {
            id: Uuid::new_v4().to_string(),
            sku,
            name: request.name.trim().to_string(),
            description: request.description,
            item_type: request.item_type,
            base_price_cents: request.base_price_cents,
            cost_price_cents: request.initial_unit_cost_cents.or(request.cost_price_cents),
            margin_bps: request.margin_bps,
            current_stock: 0,
            reserved_stock: 0,
            minimum_stock: request.minimum_stock,
            allow_pre_sale: request.allow_pre_sale,
            status: RecordStatus::Active,
            created_at: now,
            updated_at: now,
        };
        ItemRepository::insert(uow.conn(), &item).await?;

        if initial_stock > 0 {
            let movement = plan_stock_in(
                &item,
                initial_stock,
                TransactionType::Initial,
                Some(LedgerReference::Manual {
                    source: "opening balance".to_string(),
                }),
                None,
            )?;
            item = uow.apply(&item, &movement).await?;
        }

        uow.commit().await?;

        info!(
            id = %item.id,
            sku = %item.sku,
            initial_stock,
            "Item created"
        );
        Ok(item)
    }

    pub async fn update_item(&self, request: UpdateItemRequest) -> DbResult<InventoryItem> {
        if let Some(name) = &request.name {
            validate_name("name", name)?;
        }
        validate_notes("description", request.description.as_deref())?;
        if let Some(price) = request.base_price_cents {
            validate_price_cents(price)?;
        }
        if let Some(cost) = request.cost_price_cents {
            validate_price_cents(cost)?;
        }
        if let Some(margin) = request.margin_bps {
            validate_margin_bps(margin)?;
        }
        if let Some(minimum) = request.minimum_stock {
            validate_stock_level("minimum_stock", minimum)?;
        }

        let mut uow = UnitOfWork::begin(&self.pool).await?;
        let mut item = uow.item(&request.id).await?;

        if let Some(name) = request.name {
            item.name = name.trim().to_string();
        }
        if request.description.is_some() {
            item.description = request.description;
        }
        if let Some(item_type) = request.item_type {
            item.item_type = item_type;
        }
        if let Some(price) = request.base_price_cents {
            item.base_price_cents = price;
        }
        if request.cost_price_cents.is_some() {
            item.cost_price_cents = request.cost_price_cents;
        }
        if request.margin_bps.is_some() {
            item.margin_bps = request.margin_bps;
        }
        if let Some(minimum) = request.minimum_stock {
            item.minimum_stock = minimum;
        }
        if let Some(allow) = request.allow_pre_sale {
            item.allow_pre_sale = allow;
        }
        if let Some(status) = request.status {
            item.status = status;
        }
        item.updated_at = uow.now();

        ItemRepository::update_details(uow.conn(), &item).await?;
        uow.commit().await?;

        info!(id = %item.id, sku = %item.sku, "Item updated");
        Ok(item)
    }

    /// Deletes an item without history; otherwise deactivates it.
    pub async fn delete_item(&self, id: &str) -> DbResult<DeleteOutcome> {
        let mut uow = UnitOfWork::begin(&self.pool).await?;
        let item = uow.item(id).await?;

        let outcome = if ItemRepository::is_referenced(uow.conn(), id).await? {
            ItemRepository::set_status(uow.conn(), id, RecordStatus::Inactive).await?;
            DeleteOutcome::Deactivated
        } else {
            ItemRepository::delete(uow.conn(), id).await?;
            DeleteOutcome::Deleted
        };
        uow.commit().await?;

        info!(id = %item.id, sku = %item.sku, outcome = ?outcome, "Item removed");
        Ok(outcome)
    }

    pub async fn get_item(&self, id: &str) -> DbResult<InventoryItem> {
        ItemRepository::new(self.pool.clone())
            .get_by_id(id)
            .await?
            .ok_or_else(|| CoreError::ItemNotFound(id.to_string()).into())
    }

    pub async fn get_item_by_sku(&self, sku: &str) -> DbResult<InventoryItem> {
        ItemRepository::new(self.pool.clone())
            .get_by_sku(&sku.trim().to_uppercase())
            .await?
            .ok_or_else(|| CoreError::ItemNotFound(sku.to_string()).into())
    }

    pub async fn list_items(&self, include_inactive: bool) -> DbResult<Vec<InventoryItem>> {
        ItemRepository::new(self.pool.clone()).list(include_inactive).await
    }

    /// Case-insensitive match on SKU or name; an empty query lists
    /// active items.
    pub async fn search_items(&self, query: &str, limit: u32) -> DbResult<Vec<InventoryItem>> {
        let query = validate_search_query(query)?;
        ItemRepository::new(self.pool.clone()).search(&query, limit).await
    }

    /// Alerts for active items at or below their minimum stock.
    pub async fn check_stock_alerts(&self) -> DbResult<Vec<StockAlert>> {
        let items = ItemRepository::new(self.pool.clone()).low_stock().await?;
        let alerts: Vec<StockAlert> = items.iter().filter_map(StockAlert::for_item).collect();

        if !alerts.is_empty() {
            info!(count = alerts.len(), "Low stock alerts");
        }
        Ok(alerts)
    }
}
