//! # Ledger Repository
//!
//! The append-only `inventory_transactions` table.
//!
//! References are stored as JSON text and decoded back into
//! [`LedgerReference`] on read; an undecodable reference is reported as a
//! [`DbError::Serialization`] rather than silently dropped.

use chrono::{DateTime, Utc};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use stockbook_core::{InventoryTransaction, LedgerEntry, LedgerReference, LedgerTotals, TransactionType};

/// Raw ledger row; `reference` is still JSON.
#[derive(Debug, FromRow)]
struct TransactionRow {
    id: String,
    item_id: String,
    quantity: i64,
    transaction_type: TransactionType,
    reference: Option<String>,
    notes: Option<String>,
    sequence: i64,
    created_at: DateTime<Utc>,
}

impl TryFrom<TransactionRow> for InventoryTransaction {
    type Error = DbError;

    fn try_from(row: TransactionRow) -> DbResult<Self> {
        let reference = row
            .reference
            .as_deref()
            .map(serde_json::from_str::<LedgerReference>)
            .transpose()?;

        Ok(InventoryTransaction {
            id: row.id,
            item_id: row.item_id,
            quantity: row.quantity,
            transaction_type: row.transaction_type,
            reference,
            notes: row.notes,
            sequence: row.sequence,
            created_at: row.created_at,
        })
    }
}

/// Repository for ledger rows.
#[derive(Debug, Clone)]
pub struct LedgerRepository {
    pool: SqlitePool,
}

impl LedgerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        LedgerRepository { pool }
    }

    /// Newest-first history of one item.
    pub async fn list_for_item(&self, item_id: &str, limit: u32) -> DbResult<Vec<InventoryTransaction>> {
        let rows = sqlx::query_as::<_, TransactionRow>(
            r#"
            SELECT * FROM inventory_transactions
            WHERE item_id = ?1
            ORDER BY sequence DESC, rowid DESC
            LIMIT ?2
            "#,
        )
        .bind(item_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        debug!(item_id = %item_id, count = rows.len(), "Loaded ledger history");
        rows.into_iter().map(InventoryTransaction::try_from).collect()
    }

    /// Every entry written by one unit of work, in write order.
    pub async fn list_for_sequence(&self, sequence: i64) -> DbResult<Vec<InventoryTransaction>> {
        let rows = sqlx::query_as::<_, TransactionRow>(
            "SELECT * FROM inventory_transactions WHERE sequence = ?1 ORDER BY rowid",
        )
        .bind(sequence)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(InventoryTransaction::try_from).collect()
    }

    // =========================================================================
    // Executor-level operations
    // =========================================================================

    /// Counter values implied by an item's ledger.
    pub async fn totals_for_item<'e, E>(executor: E, item_id: &str) -> DbResult<LedgerTotals>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let sums = sqlx::query_as::<_, (TransactionType, i64)>(
            r#"
            SELECT transaction_type, SUM(quantity)
            FROM inventory_transactions
            WHERE item_id = ?1
            GROUP BY transaction_type
            "#,
        )
        .bind(item_id)
        .fetch_all(executor)
        .await?;

        Ok(LedgerTotals::from_entries(sums))
    }

    /// Appends one entry.
    pub(crate) async fn append<'e, E>(
        executor: E,
        item_id: &str,
        entry: &LedgerEntry,
        notes: Option<&str>,
        sequence: i64,
        now: DateTime<Utc>,
    ) -> DbResult<InventoryTransaction>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let id = Uuid::new_v4().to_string();
        let reference = entry.reference.as_ref().map(serde_json::to_string).transpose()?;

        debug!(
            item_id = %item_id,
            transaction_type = entry.transaction_type.as_str(),
            quantity = entry.quantity,
            sequence,
            "Appending ledger entry"
        );

        sqlx::query(
            r#"
            INSERT INTO inventory_transactions (
                id, item_id, quantity, transaction_type,
                reference, notes, sequence, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&id)
        .bind(item_id)
        .bind(entry.quantity)
        .bind(entry.transaction_type)
        .bind(&reference)
        .bind(notes)
        .bind(sequence)
        .bind(now)
        .execute(executor)
        .await?;

        Ok(InventoryTransaction {
            id,
            item_id: item_id.to_string(),
            quantity: entry.quantity,
            transaction_type: entry.transaction_type,
            reference: entry.reference.clone(),
            notes: notes.map(str::to_string),
            sequence,
            created_at: now,
        })
    }
}
