//! # Stock Service
//!
//! Stock in, stock out (through the pre-sale split), adjustments,
//! reservation fulfillment, ledger history and reconciliation.
//!
//! The `*_within` functions run one movement inside a caller's unit of
//! work; purchase, sale and bundle services build on them.

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::error::{DbError, DbResult};
use crate::repository::{ItemRepository, LedgerRepository};
use crate::unit_of_work::UnitOfWork;
use stockbook_core::ledger::{
    plan_adjustment, plan_fulfillment, plan_reservation, plan_stock_in, reconcile,
};
use stockbook_core::presale::plan_outbound;
use stockbook_core::{
    CoreError, InventoryItem, InventoryTransaction, LedgerReference, LedgerTotals, OutboundSplit,
    TransactionType,
};

// =============================================================================
// Requests & Results
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockInRequest {
    pub item_id: String,
    pub quantity: i64,
    pub notes: Option<String>,
    pub reference: Option<LedgerReference>,
    /// `IN` unless stated; `INITIAL` for opening balances.
    #[serde(default)]
    pub transaction_type: Option<TransactionType>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockOutRequest {
    pub item_id: String,
    pub quantity: i64,
    pub notes: Option<String>,
    pub reference: Option<LedgerReference>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustStockRequest {
    pub item_id: String,
    /// Positive returns units, negative removes them.
    pub delta: i64,
    pub notes: Option<String>,
    pub reference: Option<LedgerReference>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FulfillReservationRequest {
    pub item_id: String,
    pub quantity: i64,
    pub notes: Option<String>,
    pub reference: Option<LedgerReference>,
}

/// Result of a stock movement: the item after the movement and the ledger
/// rows that justify it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockChange {
    pub item: InventoryItem,
    pub transactions: Vec<InventoryTransaction>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockOutResult {
    pub item: InventoryItem,
    pub split: OutboundSplit,
    pub transactions: Vec<InventoryTransaction>,
}

/// Cached counters next to the ledger's totals for one item.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationReport {
    pub item_id: String,
    pub sku: String,
    pub current_stock: i64,
    pub reserved_stock: i64,
    pub ledger: LedgerTotals,
    pub consistent: bool,
}

// =============================================================================
// Movements inside a unit of work
// =============================================================================

pub(crate) async fn stock_out_within(
    uow: &mut UnitOfWork,
    item_id: &str,
    quantity: i64,
    reference: Option<LedgerReference>,
    notes: Option<String>,
) -> DbResult<(InventoryItem, OutboundSplit)> {
    let item = uow.item(item_id).await?;
    let (movement, split) = plan_outbound(&item, quantity, reference, notes)?;
    let item = uow.apply(&item, &movement).await?;
    Ok((item, split))
}

pub(crate) async fn adjust_within(
    uow: &mut UnitOfWork,
    item_id: &str,
    delta: i64,
    reference: Option<LedgerReference>,
    notes: Option<String>,
) -> DbResult<InventoryItem> {
    let item = uow.item(item_id).await?;
    let movement = plan_adjustment(&item, delta, reference, notes)?;
    uow.apply(&item, &movement).await
}

pub(crate) async fn reserve_within(
    uow: &mut UnitOfWork,
    item_id: &str,
    quantity: i64,
    reference: Option<LedgerReference>,
    notes: Option<String>,
) -> DbResult<InventoryItem> {
    let item = uow.item(item_id).await?;
    let movement = plan_reservation(&item, quantity, reference, notes)?;
    uow.apply(&item, &movement).await
}

// =============================================================================
// Service
// =============================================================================

/// Stock ledger operations.
#[derive(Debug, Clone)]
pub struct StockService {
    pool: SqlitePool,
}

impl StockService {
    pub fn new(pool: SqlitePool) -> Self {
        StockService { pool }
    }

    /// Receives `quantity` units.
    pub async fn stock_in(&self, request: StockInRequest) -> DbResult<StockChange> {
        let transaction_type = request.transaction_type.unwrap_or(TransactionType::In);

        let mut uow = UnitOfWork::begin(&self.pool).await?;
        let item = uow.item(&request.item_id).await?;
        let movement = plan_stock_in(
            &item,
            request.quantity,
            transaction_type,
            request.reference,
            request.notes,
        )?;
        let item = uow.apply(&item, &movement).await?;
        let transactions = uow.commit().await?;

        info!(
            sku = %item.sku,
            quantity = request.quantity,
            current_stock = item.current_stock,
            "Stock in"
        );
        Ok(StockChange { item, transactions })
    }

    /// Removes `quantity` units, reserving any shortfall on pre-sale items.
    pub async fn stock_out(&self, request: StockOutRequest) -> DbResult<StockOutResult> {
        let mut uow = UnitOfWork::begin(&self.pool).await?;
        let (item, split) = stock_out_within(
            &mut uow,
            &request.item_id,
            request.quantity,
            request.reference,
            request.notes,
        )
        .await?;
        let transactions = uow.commit().await?;

        if split.is_split() {
            info!(
                sku = %item.sku,
                regular_units = split.regular_units,
                pre_sale_units = split.pre_sale_units,
                reserved_stock = item.reserved_stock,
                "Stock out split into pre-sale reservation"
            );
        } else {
            info!(
                sku = %item.sku,
                quantity = request.quantity,
                current_stock = item.current_stock,
                "Stock out"
            );
        }

        Ok(StockOutResult {
            item,
            split,
            transactions,
        })
    }

    /// Corrects stock by a signed delta.
    pub async fn adjust_stock(&self, request: AdjustStockRequest) -> DbResult<StockChange> {
        let mut uow = UnitOfWork::begin(&self.pool).await?;
        let item = adjust_within(
            &mut uow,
            &request.item_id,
            request.delta,
            request.reference,
            request.notes,
        )
        .await?;
        let transactions = uow.commit().await?;

        info!(
            sku = %item.sku,
            delta = request.delta,
            current_stock = item.current_stock,
            reserved_stock = item.reserved_stock,
            "Stock adjusted"
        );
        Ok(StockChange { item, transactions })
    }

    /// Delivers reserved units out of physical stock.
    pub async fn fulfill_reservation(
        &self,
        request: FulfillReservationRequest,
    ) -> DbResult<StockChange> {
        let mut uow = UnitOfWork::begin(&self.pool).await?;
        let item = uow.item(&request.item_id).await?;
        let movement = plan_fulfillment(&item, request.quantity, request.reference, request.notes)?;
        let item = uow.apply(&item, &movement).await?;
        let transactions = uow.commit().await?;

        info!(
            sku = %item.sku,
            quantity = request.quantity,
            reserved_stock = item.reserved_stock,
            "Reservation fulfilled"
        );
        Ok(StockChange { item, transactions })
    }

    /// Newest-first ledger history of an item.
    pub async fn list_transactions(
        &self,
        item_id: &str,
        limit: u32,
    ) -> DbResult<Vec<InventoryTransaction>> {
        if ItemRepository::fetch(&self.pool, item_id).await?.is_none() {
            return Err(CoreError::ItemNotFound(item_id.to_string()).into());
        }
        LedgerRepository::new(self.pool.clone())
            .list_for_item(item_id, limit)
            .await
    }

    /// Compares one item's counters with its ledger; a mismatch is a
    /// `Consistency` error.
    pub async fn reconcile_item(&self, item_id: &str) -> DbResult<ReconciliationReport> {
        let (item, ledger) = self.snapshot(item_id).await?;

        if let Err(err) = reconcile(&item, ledger) {
            warn!(
                sku = %item.sku,
                current_stock = item.current_stock,
                ledger_stock = ledger.physical,
                reserved_stock = item.reserved_stock,
                ledger_reserved = ledger.reserved,
                "Ledger mismatch"
            );
            return Err(err.into());
        }

        Ok(report_for(item, ledger))
    }

    /// Reports on every item; mismatches are flagged, not raised.
    pub async fn reconcile_all(&self) -> DbResult<Vec<ReconciliationReport>> {
        let ids = ItemRepository::new(self.pool.clone()).all_ids().await?;

        let mut reports = Vec::with_capacity(ids.len());
        for id in ids {
            let (item, ledger) = self.snapshot(&id).await?;
            reports.push(report_for(item, ledger));
        }

        let mismatches = reports.iter().filter(|r| !r.consistent).count();
        if mismatches > 0 {
            warn!(checked = reports.len(), mismatches, "Reconciliation found mismatches");
        } else {
            info!(checked = reports.len(), "Reconciliation clean");
        }

        Ok(reports)
    }

    /// Reads counters and ledger totals from one snapshot.
    async fn snapshot(&self, item_id: &str) -> DbResult<(InventoryItem, LedgerTotals)> {
        let mut tx = self.pool.begin().await?;

        let item = ItemRepository::fetch(&mut *tx, item_id)
            .await?
            .ok_or_else(|| DbError::from(CoreError::ItemNotFound(item_id.to_string())))?;
        let ledger = LedgerRepository::totals_for_item(&mut *tx, item_id).await?;

        tx.commit().await?;
        Ok((item, ledger))
    }
}

fn report_for(item: InventoryItem, ledger: LedgerTotals) -> ReconciliationReport {
    ReconciliationReport {
        consistent: reconcile(&item, ledger).is_ok(),
        item_id: item.id,
        sku: item.sku,
        current_stock: item.current_stock,
        reserved_stock: item.reserved_stock,
        ledger,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
