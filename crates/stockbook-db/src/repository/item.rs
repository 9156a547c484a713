//! # Inventory Item Repository
//!
//! Rows of `inventory_items`.
//!
//! Stock counters are never written from here directly: the only writer of
//! `current_stock`, `reserved_stock` and `cost_price_cents` is
//! [`crate::unit_of_work::UnitOfWork::apply`], which records the matching
//! ledger rows in the same transaction.

use chrono::{DateTime, Utc};
use sqlx::{Executor, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use stockbook_core::{InventoryItem, RecordStatus};

/// Repository for inventory item database operations.
#[derive(Debug, Clone)]
pub struct ItemRepository {
    pool: SqlitePool,
}

impl ItemRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ItemRepository { pool }
    }

    /// Gets an item by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<InventoryItem>> {
        Self::fetch(&self.pool, id).await
    }

    /// Gets an item by its SKU.
    pub async fn get_by_sku(&self, sku: &str) -> DbResult<Option<InventoryItem>> {
        let item = sqlx::query_as::<_, InventoryItem>(
            "SELECT * FROM inventory_items WHERE sku = ?1",
        )
        .bind(sku.trim())
        .fetch_optional(&self.pool)
        .await?;

        Ok(item)
    }

    /// Lists items ordered by name.
    pub async fn list(&self, include_inactive: bool) -> DbResult<Vec<InventoryItem>> {
        let items = sqlx::query_as::<_, InventoryItem>(
            r#"
            SELECT * FROM inventory_items
            WHERE ?1 OR status = 'ACTIVE'
            ORDER BY name, sku
            "#,
        )
        .bind(include_inactive)
        .fetch_all(&self.pool)
        .await?;

        debug!(count = items.len(), include_inactive, "Listed items");
        Ok(items)
    }

    /// Active items whose SKU or name contains `query`. `%` and `_` in
    /// the query match themselves.
    pub async fn search(&self, query: &str, limit: u32) -> DbResult<Vec<InventoryItem>> {
        let pattern = format!("%{}%", escape_like(query));

        let items = sqlx::query_as::<_, InventoryItem>(
            r#"
            SELECT * FROM inventory_items
            WHERE status = 'ACTIVE' AND (sku LIKE ?1 ESCAPE '\' OR name LIKE ?1 ESCAPE '\')
            ORDER BY name, sku
            LIMIT ?2
            "#,
        )
        .bind(&pattern)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        debug!(query = %query, count = items.len(), "Searched items");
        Ok(items)
    }

    /// Active items at or below their reorder threshold.
    pub async fn low_stock(&self) -> DbResult<Vec<InventoryItem>> {
        let items = sqlx::query_as::<_, InventoryItem>(
            r#"
            SELECT * FROM inventory_items
            WHERE status = 'ACTIVE' AND current_stock <= minimum_stock
            ORDER BY current_stock - minimum_stock, name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Every item id, for full reconciliation.
    pub async fn all_ids(&self) -> DbResult<Vec<String>> {
        let ids = sqlx::query_scalar::<_, String>("SELECT id FROM inventory_items ORDER BY sku")
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }

    // =========================================================================
    // Executor-level operations (used inside a unit of work)
    // =========================================================================

    pub async fn fetch<'e, E>(executor: E, id: &str) -> DbResult<Option<InventoryItem>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let item = sqlx::query_as::<_, InventoryItem>("SELECT * FROM inventory_items WHERE id = ?1")
            .bind(id)
            .fetch_optional(executor)
            .await?;

        Ok(item)
    }

    /// Inserts a new item with zero stock.
    pub async fn insert<'e, E>(executor: E, item: &InventoryItem) -> DbResult<()>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        debug!(id = %item.id, sku = %item.sku, "Inserting item");

        sqlx::query(
            r#"
            INSERT INTO inventory_items (
                id, sku, name, description, item_type,
                base_price_cents, cost_price_cents, margin_bps,
                current_stock, reserved_stock, minimum_stock,
                allow_pre_sale, status, created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5,
                ?6, ?7, ?8,
                0, 0, ?9,
                ?10, ?11, ?12, ?13
            )
            "#,
        )
        .bind(&item.id)
        .bind(&item.sku)
        .bind(&item.name)
        .bind(&item.description)
        .bind(item.item_type)
        .bind(item.base_price_cents)
        .bind(item.cost_price_cents)
        .bind(item.margin_bps)
        .bind(item.minimum_stock)
        .bind(item.allow_pre_sale)
        .bind(item.status)
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(executor)
        .await?;

        Ok(())
    }

    /// Writes the editable metadata of an item.
    pub async fn update_details<'e, E>(executor: E, item: &InventoryItem) -> DbResult<u64>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            r#"
            UPDATE inventory_items SET
                name = ?2,
                description = ?3,
                item_type = ?4,
                base_price_cents = ?5,
                cost_price_cents = ?6,
                margin_bps = ?7,
                minimum_stock = ?8,
                allow_pre_sale = ?9,
                status = ?10,
                updated_at = ?11
            WHERE id = ?1
            "#,
        )
        .bind(&item.id)
        .bind(&item.name)
        .bind(&item.description)
        .bind(item.item_type)
        .bind(item.base_price_cents)
        .bind(item.cost_price_cents)
        .bind(item.margin_bps)
        .bind(item.minimum_stock)
        .bind(item.allow_pre_sale)
        .bind(item.status)
        .bind(item.updated_at)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    /// Writes new stock counters, guarded by the snapshot they were
    /// computed from. Returns the number of rows updated (0 on a stale
    /// snapshot).
    #[allow(clippy::too_many_arguments)]
    pub(crate) async fn write_counters<'e, E>(
        executor: E,
        id: &str,
        expected_stock: i64,
        expected_reserved: i64,
        new_stock: i64,
        new_reserved: i64,
        new_cost_cents: Option<i64>,
        now: DateTime<Utc>,
    ) -> DbResult<u64>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            r#"
            UPDATE inventory_items SET
                current_stock = ?4,
                reserved_stock = ?5,
                cost_price_cents = COALESCE(?6, cost_price_cents),
                updated_at = ?7
            WHERE id = ?1 AND current_stock = ?2 AND reserved_stock = ?3
            "#,
        )
        .bind(id)
        .bind(expected_stock)
        .bind(expected_reserved)
        .bind(new_stock)
        .bind(new_reserved)
        .bind(new_cost_cents)
        .bind(now)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    /// Sets an item's status.
    pub async fn set_status<'e, E>(executor: E, id: &str, status: RecordStatus) -> DbResult<u64>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("UPDATE inventory_items SET status = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(status)
            .bind(Utc::now())
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }

    /// Whether any ledger row, purchase line, bundle line or sale line
    /// points at the item.
    pub async fn is_referenced<'e, E>(executor: E, id: &str) -> DbResult<bool>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let referenced = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (SELECT 1 FROM inventory_transactions WHERE item_id = ?1)
                OR EXISTS (SELECT 1 FROM purchase_items WHERE item_id = ?1)
                OR EXISTS (SELECT 1 FROM bundle_items WHERE item_id = ?1)
                OR EXISTS (SELECT 1 FROM sale_items WHERE item_id = ?1)
            "#,
        )
        .bind(id)
        .fetch_one(executor)
        .await?;

        Ok(referenced)
    }

    pub async fn delete<'e, E>(executor: E, id: &str) -> DbResult<u64>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM inventory_items WHERE id = ?1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }
}

/// Escapes LIKE wildcards so they match literally under `ESCAPE '\'`.
fn escape_like(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len());
    for c in query.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("rice"), "rice");
        assert_eq!(escape_like("50%_off"), "50\\%\\_off");
        assert_eq!(escape_like("a\\b"), "a\\\\b");
    }
}
