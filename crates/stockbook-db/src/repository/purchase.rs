//! # Purchase Repository
//!
//! Supplier purchases, their lines and their payments.
//!
//! ## Purchase Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. REGISTER (one unit of work)                                        │
//! │     └── insert_header() → Purchase { status: PENDING }                 │
//! │     └── insert_line()   → PurchaseItem  (+ receipt on the ledger)      │
//! │     └── insert_line()   → PurchaseItem  (+ receipt on the ledger)      │
//! │                                                                         │
//! │  2. PAY (zero or more times)                                           │
//! │     └── insert_payment() + record_payment()                            │
//! │         PENDING → PARTIAL → PAID                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{Executor, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use stockbook_core::{Purchase, PurchaseItem, PurchasePayment, PurchaseStatus};

#[derive(Debug, Clone)]
pub struct PurchaseRepository {
    pool: SqlitePool,
}

impl PurchaseRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PurchaseRepository { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Purchase>> {
        Self::fetch(&self.pool, id).await
    }

    /// Lines of a purchase, in entry order.
    pub async fn get_items(&self, purchase_id: &str) -> DbResult<Vec<PurchaseItem>> {
        let items = sqlx::query_as::<_, PurchaseItem>(
            "SELECT * FROM purchase_items WHERE purchase_id = ?1 ORDER BY position",
        )
        .bind(purchase_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    pub async fn get_payments(&self, purchase_id: &str) -> DbResult<Vec<PurchasePayment>> {
        let payments = sqlx::query_as::<_, PurchasePayment>(
            "SELECT * FROM purchase_payments WHERE purchase_id = ?1 ORDER BY payment_date, rowid",
        )
        .bind(purchase_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(payments)
    }

    /// Most recent purchases first.
    pub async fn list(&self, limit: u32) -> DbResult<Vec<Purchase>> {
        let purchases = sqlx::query_as::<_, Purchase>(
            "SELECT * FROM purchases ORDER BY purchase_date DESC, rowid DESC LIMIT ?1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(purchases)
    }

    /// Purchases with an open balance, earliest due date first
    /// (purchases without a due date last).
    pub async fn list_outstanding(&self) -> DbResult<Vec<Purchase>> {
        let purchases = sqlx::query_as::<_, Purchase>(
            r#"
            SELECT * FROM purchases
            WHERE status <> 'PAID'
            ORDER BY due_date IS NULL, due_date, purchase_date
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        debug!(count = purchases.len(), "Listed outstanding purchases");
        Ok(purchases)
    }

    // =========================================================================
    // Executor-level operations
    // =========================================================================

    pub async fn fetch<'e, E>(executor: E, id: &str) -> DbResult<Option<Purchase>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let purchase = sqlx::query_as::<_, Purchase>("SELECT * FROM purchases WHERE id = ?1")
            .bind(id)
            .fetch_optional(executor)
            .await?;

        Ok(purchase)
    }

    pub(crate) async fn insert_header<'e, E>(executor: E, purchase: &Purchase) -> DbResult<()>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        debug!(id = %purchase.id, supplier = %purchase.supplier_name, "Inserting purchase");

        sqlx::query(
            r#"
            INSERT INTO purchases (
                id, supplier_name, invoice_number, notes,
                total_amount_cents, paid_amount_cents, status,
                purchase_date, due_date, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&purchase.id)
        .bind(&purchase.supplier_name)
        .bind(&purchase.invoice_number)
        .bind(&purchase.notes)
        .bind(purchase.total_amount_cents)
        .bind(purchase.paid_amount_cents)
        .bind(purchase.status)
        .bind(purchase.purchase_date)
        .bind(purchase.due_date)
        .bind(purchase.updated_at)
        .execute(executor)
        .await?;

        Ok(())
    }

    pub(crate) async fn insert_line<'e, E>(executor: E, line: &PurchaseItem) -> DbResult<()>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query(
            r#"
            INSERT INTO purchase_items (
                id, purchase_id, item_id, quantity,
                unit_cost_cents, total_cost_cents, position
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&line.id)
        .bind(&line.purchase_id)
        .bind(&line.item_id)
        .bind(line.quantity)
        .bind(line.unit_cost_cents)
        .bind(line.total_cost_cents)
        .bind(line.position)
        .execute(executor)
        .await?;

        Ok(())
    }

    pub(crate) async fn insert_payment<'e, E>(executor: E, payment: &PurchasePayment) -> DbResult<()>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        debug!(
            purchase_id = %payment.purchase_id,
            amount_cents = payment.amount_cents,
            "Recording purchase payment"
        );

        sqlx::query(
            r#"
            INSERT INTO purchase_payments (
                id, purchase_id, amount_cents, payment_method,
                reference, notes, payment_date
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&payment.id)
        .bind(&payment.purchase_id)
        .bind(payment.amount_cents)
        .bind(payment.payment_method)
        .bind(&payment.reference)
        .bind(&payment.notes)
        .bind(payment.payment_date)
        .execute(executor)
        .await?;

        Ok(())
    }

    /// Writes the new paid amount, guarded by the one it was computed from.
    pub(crate) async fn record_payment<'e, E>(
        executor: E,
        id: &str,
        expected_paid_cents: i64,
        paid_cents: i64,
        status: PurchaseStatus,
        now: DateTime<Utc>,
    ) -> DbResult<u64>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            r#"
            UPDATE purchases SET
                paid_amount_cents = ?3,
                status = ?4,
                updated_at = ?5
            WHERE id = ?1 AND paid_amount_cents = ?2
            "#,
        )
        .bind(id)
        .bind(expected_paid_cents)
        .bind(paid_cents)
        .bind(status)
        .bind(now)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }
}
