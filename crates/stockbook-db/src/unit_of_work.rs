//! # Unit of Work
//!
//! The single write path for stock. Every operation that moves stock runs
//! inside one `UnitOfWork`: one SQLite transaction in which cached counters
//! and their ledger rows are written together, then committed or dropped
//! as a whole.
//!
//! ## Serialization
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  begin()                                                                │
//! │    BEGIN                                                                │
//! │    UPDATE ledger_sequence SET value = value + 1 ... RETURNING value     │
//! │      └── first statement is a write: takes the database write lock,    │
//! │          concurrent units wait here (busy_timeout)                     │
//! │                                                                         │
//! │  item(id)          read snapshot   (cannot be stale: lock is held)     │
//! │  apply(item, mv)   UPDATE counters WHERE counters = snapshot           │
//! │                    INSERT ledger rows tagged with the sequence         │
//! │                                                                         │
//! │  commit()          COMMIT          drop without commit → ROLLBACK      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::{ItemRepository, LedgerRepository};
use stockbook_core::{CoreError, InventoryItem, InventoryTransaction, StockMovement};

/// An open, write-locked transaction.
pub struct UnitOfWork {
    tx: Transaction<'static, Sqlite>,
    sequence: i64,
    now: DateTime<Utc>,
    written: Vec<InventoryTransaction>,
}

impl UnitOfWork {
    /// Opens a transaction and takes the write lock.
    pub async fn begin(pool: &SqlitePool) -> DbResult<Self> {
        let mut tx = pool.begin().await?;

        let sequence: i64 = sqlx::query_scalar(
            "UPDATE ledger_sequence SET value = value + 1 WHERE id = 1 RETURNING value",
        )
        .fetch_one(&mut *tx)
        .await?;

        debug!(sequence, "Unit of work started");

        Ok(UnitOfWork {
            tx,
            sequence,
            now: Utc::now(),
            written: Vec::new(),
        })
    }

    /// Sequence number stamped on every ledger row of this unit.
    #[inline]
    pub fn sequence(&self) -> i64 {
        self.sequence
    }

    /// Timestamp shared by every row written in this unit.
    #[inline]
    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// Connection for repository calls that belong to this unit.
    #[inline]
    pub fn conn(&mut self) -> &mut SqliteConnection {
        &mut self.tx
    }

    /// Loads an item snapshot or fails with `ItemNotFound`.
    pub async fn item(&mut self, id: &str) -> DbResult<InventoryItem> {
        ItemRepository::fetch(&mut *self.tx, id)
            .await?
            .ok_or_else(|| CoreError::ItemNotFound(id.to_string()).into())
    }

    /// Applies a planned movement to `item`.
    ///
    /// Writes the new counters (and cost, if re-priced) and appends every
    /// ledger entry of the movement. Returns the updated item.
    pub async fn apply(
        &mut self,
        item: &InventoryItem,
        movement: &StockMovement,
    ) -> DbResult<InventoryItem> {
        if movement.item_id != item.id {
            return Err(DbError::Internal(format!(
                "movement for {} applied to {}",
                movement.item_id, item.id
            )));
        }
        if movement.entries.is_empty() {
            return Ok(item.clone());
        }

        let (stock, reserved) = movement.resulting_counters(item)?;

        let updated = ItemRepository::write_counters(
            &mut *self.tx,
            &item.id,
            item.current_stock,
            item.reserved_stock,
            stock,
            reserved,
            movement.new_cost_cents,
            self.now,
        )
        .await?;

        if updated == 0 {
            return Err(DbError::TransactionFailed(format!(
                "stock counters of {} changed during the operation",
                item.sku
            )));
        }

        for entry in &movement.entries {
            let row = LedgerRepository::append(
                &mut *self.tx,
                &item.id,
                entry,
                movement.notes.as_deref(),
                self.sequence,
                self.now,
            )
            .await?;
            self.written.push(row);
        }

        debug!(
            sku = %item.sku,
            stock_delta = movement.stock_delta,
            reserved_delta = movement.reserved_delta,
            current_stock = stock,
            reserved_stock = reserved,
            "Applied stock movement"
        );

        let mut next = item.clone();
        next.current_stock = stock;
        next.reserved_stock = reserved;
        if let Some(cost) = movement.new_cost_cents {
            next.cost_price_cents = Some(cost);
        }
        next.updated_at = self.now;
        Ok(next)
    }

    /// Commits every write of this unit and returns the ledger rows.
    pub async fn commit(self) -> DbResult<Vec<InventoryTransaction>> {
        self.tx.commit().await?;
        debug!(sequence = self.sequence, entries = self.written.len(), "Unit of work committed");
        Ok(self.written)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
