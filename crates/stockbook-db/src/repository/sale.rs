//! # Sale Repository
//!
//! Sale headers and their lines. Stock effects of a sale are written by the
//! sale service through the unit of work, not here.

use sqlx::{Executor, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use stockbook_core::{Sale, SaleItem};

#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let sale = sqlx::query_as::<_, Sale>("SELECT * FROM sales WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(sale)
    }

    pub async fn get_items(&self, sale_id: &str) -> DbResult<Vec<SaleItem>> {
        let items = sqlx::query_as::<_, SaleItem>(
            "SELECT * FROM sale_items WHERE sale_id = ?1 ORDER BY position",
        )
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    pub(crate) async fn insert_sale<'e, E>(executor: E, sale: &Sale) -> DbResult<()>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        debug!(id = %sale.id, sale_type = ?sale.sale_type, "Inserting sale");

        sqlx::query(
            r#"
            INSERT INTO sales (
                id, client_id, beneficiary_id, organization_id, bundle_id,
                sale_type, status, total_amount_cents, notes, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&sale.id)
        .bind(&sale.client_id)
        .bind(&sale.beneficiary_id)
        .bind(&sale.organization_id)
        .bind(&sale.bundle_id)
        .bind(sale.sale_type)
        .bind(sale.status)
        .bind(sale.total_amount_cents)
        .bind(&sale.notes)
        .bind(sale.created_at)
        .execute(executor)
        .await?;

        Ok(())
    }

    pub(crate) async fn insert_item<'e, E>(executor: E, item: &SaleItem) -> DbResult<()>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query(
            r#"
            INSERT INTO sale_items (
                id, sale_id, item_id, quantity,
                unit_price_cents, override_price_cents, line_total_cents, position
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&item.id)
        .bind(&item.sale_id)
        .bind(&item.item_id)
        .bind(item.quantity)
        .bind(item.unit_price_cents)
        .bind(item.override_price_cents)
        .bind(item.line_total_cents)
        .bind(item.position)
        .execute(executor)
        .await?;

        Ok(())
    }
}
