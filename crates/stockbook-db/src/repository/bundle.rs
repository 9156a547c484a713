//! # Bundle Repository
//!
//! Bundle categories, bundles and their component lines.

use chrono::{DateTime, Utc};
use sqlx::{Executor, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use stockbook_core::{Bundle, BundleCategory, BundleItem, RecordStatus};

#[derive(Debug, Clone)]
pub struct BundleRepository {
    pool: SqlitePool,
}

impl BundleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        BundleRepository { pool }
    }

    // =========================================================================
    // Categories
    // =========================================================================

    pub async fn list_categories(&self, include_inactive: bool) -> DbResult<Vec<BundleCategory>> {
        let categories = sqlx::query_as::<_, BundleCategory>(
            "SELECT * FROM bundle_categories WHERE ?1 OR status = 'ACTIVE' ORDER BY name",
        )
        .bind(include_inactive)
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }

    pub async fn fetch_category<'e, E>(executor: E, id: &str) -> DbResult<Option<BundleCategory>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let category =
            sqlx::query_as::<_, BundleCategory>("SELECT * FROM bundle_categories WHERE id = ?1")
                .bind(id)
                .fetch_optional(executor)
                .await?;

        Ok(category)
    }

    pub(crate) async fn insert_category<'e, E>(executor: E, category: &BundleCategory) -> DbResult<()>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        debug!(id = %category.id, name = %category.name, "Inserting bundle category");

        sqlx::query(
            "INSERT INTO bundle_categories (id, name, status, created_at) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&category.id)
        .bind(&category.name)
        .bind(category.status)
        .bind(category.created_at)
        .execute(executor)
        .await?;

        Ok(())
    }

    pub(crate) async fn set_category_status<'e, E>(
        executor: E,
        id: &str,
        status: RecordStatus,
    ) -> DbResult<u64>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("UPDATE bundle_categories SET status = ?2 WHERE id = ?1")
            .bind(id)
            .bind(status)
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }

    // =========================================================================
    // Bundles
    // =========================================================================

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Bundle>> {
        Self::fetch(&self.pool, id).await
    }

    /// Active bundles, optionally restricted to one category.
    pub async fn list(&self, category_id: Option<&str>) -> DbResult<Vec<Bundle>> {
        let bundles = sqlx::query_as::<_, Bundle>(
            r#"
            SELECT * FROM bundles
            WHERE status = 'ACTIVE' AND (?1 IS NULL OR category_id = ?1)
            ORDER BY name
            "#,
        )
        .bind(category_id)
        .fetch_all(&self.pool)
        .await?;

        debug!(count = bundles.len(), "Listed bundles");
        Ok(bundles)
    }

    pub async fn get_items(&self, bundle_id: &str) -> DbResult<Vec<BundleItem>> {
        Self::fetch_items(&self.pool, bundle_id).await
    }

    pub async fn fetch<'e, E>(executor: E, id: &str) -> DbResult<Option<Bundle>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let bundle = sqlx::query_as::<_, Bundle>("SELECT * FROM bundles WHERE id = ?1")
            .bind(id)
            .fetch_optional(executor)
            .await?;

        Ok(bundle)
    }

    pub async fn fetch_items<'e, E>(executor: E, bundle_id: &str) -> DbResult<Vec<BundleItem>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let items = sqlx::query_as::<_, BundleItem>(
            "SELECT * FROM bundle_items WHERE bundle_id = ?1 ORDER BY position",
        )
        .bind(bundle_id)
        .fetch_all(executor)
        .await?;

        Ok(items)
    }

    pub(crate) async fn insert<'e, E>(executor: E, bundle: &Bundle) -> DbResult<()>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        debug!(id = %bundle.id, name = %bundle.name, "Inserting bundle");

        sqlx::query(
            r#"
            INSERT INTO bundles (
                id, name, description, category_id, pricing_mode,
                base_price_cents, discount_bps, margin_bps,
                currency_type, conversion_rate_scaled, status,
                total_sales, total_revenue_cents, last_sale_date,
                created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5,
                ?6, ?7, ?8,
                ?9, ?10, ?11,
                ?12, ?13, ?14,
                ?15, ?16
            )
            "#,
        )
        .bind(&bundle.id)
        .bind(&bundle.name)
        .bind(&bundle.description)
        .bind(&bundle.category_id)
        .bind(bundle.pricing_mode)
        .bind(bundle.base_price_cents)
        .bind(bundle.discount_bps)
        .bind(bundle.margin_bps)
        .bind(bundle.currency_type)
        .bind(bundle.conversion_rate_scaled)
        .bind(bundle.status)
        .bind(bundle.total_sales)
        .bind(bundle.total_revenue_cents)
        .bind(bundle.last_sale_date)
        .bind(bundle.created_at)
        .bind(bundle.updated_at)
        .execute(executor)
        .await?;

        Ok(())
    }

    /// Writes name, category and pricing columns.
    pub(crate) async fn update<'e, E>(executor: E, bundle: &Bundle) -> DbResult<u64>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            r#"
            UPDATE bundles SET
                name = ?2,
                description = ?3,
                category_id = ?4,
                pricing_mode = ?5,
                base_price_cents = ?6,
                discount_bps = ?7,
                margin_bps = ?8,
                currency_type = ?9,
                conversion_rate_scaled = ?10,
                updated_at = ?11
            WHERE id = ?1
            "#,
        )
        .bind(&bundle.id)
        .bind(&bundle.name)
        .bind(&bundle.description)
        .bind(&bundle.category_id)
        .bind(bundle.pricing_mode)
        .bind(bundle.base_price_cents)
        .bind(bundle.discount_bps)
        .bind(bundle.margin_bps)
        .bind(bundle.currency_type)
        .bind(bundle.conversion_rate_scaled)
        .bind(bundle.updated_at)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    pub(crate) async fn set_status<'e, E>(executor: E, id: &str, status: RecordStatus) -> DbResult<u64>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("UPDATE bundles SET status = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(status)
            .bind(Utc::now())
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }

    pub(crate) async fn delete_items<'e, E>(executor: E, bundle_id: &str) -> DbResult<u64>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM bundle_items WHERE bundle_id = ?1")
            .bind(bundle_id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }

    pub(crate) async fn insert_item<'e, E>(executor: E, line: &BundleItem) -> DbResult<()>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query(
            r#"
            INSERT INTO bundle_items (
                id, bundle_id, item_id, quantity, override_price_cents, position
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&line.id)
        .bind(&line.bundle_id)
        .bind(&line.item_id)
        .bind(line.quantity)
        .bind(line.override_price_cents)
        .bind(line.position)
        .execute(executor)
        .await?;

        Ok(())
    }

    /// Bumps the aggregate sales counters after a bundle-tagged sale.
    pub(crate) async fn record_sale<'e, E>(
        executor: E,
        id: &str,
        revenue_cents: i64,
        at: DateTime<Utc>,
    ) -> DbResult<u64>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            r#"
            UPDATE bundles SET
                total_sales = total_sales + 1,
                total_revenue_cents = total_revenue_cents + ?2,
                last_sale_date = ?3,
                updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(revenue_cents)
        .bind(at)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }
}
