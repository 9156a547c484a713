//! # Sale Service
//!
//! Records sales and their stock effects.
//!
//! ```text
//! DIRECT   → each line goes out through the pre-sale split
//!            (OUT, plus RESERVATION for any shortfall on pre-sale items)
//! PRESALE  → each line is reserved in full, nothing leaves stock yet
//! ```

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::{BundleRepository, SaleRepository};
use crate::services::stock::{reserve_within, stock_out_within};
use crate::unit_of_work::UnitOfWork;
use stockbook_core::purchase::{cart_total, validate_cart, CartLineInput};
use stockbook_core::validation::validate_notes;
use stockbook_core::{
    CoreError, InventoryTransaction, LedgerReference, OutboundSplit, RecordStatus, Sale, SaleItem,
    SaleType, ValidationError,
};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSaleRequest {
    pub client_id: String,
    pub beneficiary_id: Option<String>,
    pub organization_id: Option<String>,
    pub bundle_id: Option<String>,
    pub sale_type: SaleType,
    pub cart: Vec<CartLineInput>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineSplit {
    pub item_id: String,
    #[serde(flatten)]
    pub split: OutboundSplit,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleReceipt {
    pub sale: Sale,
    pub items: Vec<SaleItem>,
    /// Per-line outcome of DIRECT sales; empty for PRESALE.
    pub splits: Vec<LineSplit>,
    pub transactions: Vec<InventoryTransaction>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleDetail {
    pub sale: Sale,
    pub items: Vec<SaleItem>,
}

/// Sale engine operations.
#[derive(Debug, Clone)]
pub struct SaleService {
    pool: SqlitePool,
}

impl SaleService {
    pub fn new(pool: SqlitePool) -> Self {
        SaleService { pool }
    }

    /// Records a sale with its lines and stock movements in one unit of
    /// work. Any line that cannot be served rolls back the whole sale.
    pub async fn create_sale(&self, request: CreateSaleRequest) -> DbResult<SaleReceipt> {
        validate_cart(&request.client_id, &request.cart)?;
        validate_notes("notes", request.notes.as_deref())?;

        let total = cart_total(&request.cart)?;
        let mut uow = UnitOfWork::begin(&self.pool).await?;

        if let Some(bundle_id) = &request.bundle_id {
            let bundle = BundleRepository::fetch(uow.conn(), bundle_id)
                .await?
                .ok_or_else(|| DbError::from(CoreError::BundleNotFound(bundle_id.clone())))?;
            if bundle.status != RecordStatus::Active {
                return Err(ValidationError::InvalidFormat {
                    field: "bundle_id".to_string(),
                    reason: format!("bundle '{}' is inactive", bundle.name),
                }
                .into());
            }
        }

        let sale = Sale {
            id: Uuid::new_v4().to_string(),
            client_id: request.client_id.trim().to_string(),
            beneficiary_id: request.beneficiary_id,
            organization_id: request.organization_id,
            bundle_id: request.bundle_id,
            sale_type: request.sale_type,
            status: request.sale_type.initial_status(),
            total_amount_cents: total.cents(),
            notes: request.notes,
            created_at: uow.now(),
        };
        SaleRepository::insert_sale(uow.conn(), &sale).await?;

        let mut items = Vec::with_capacity(request.cart.len());
        let mut splits = Vec::new();

        for (position, line) in request.cart.iter().enumerate() {
            let row = SaleItem {
                id: Uuid::new_v4().to_string(),
                sale_id: sale.id.clone(),
                item_id: line.item_id.clone(),
                quantity: line.quantity,
                unit_price_cents: line.unit_price_cents,
                override_price_cents: line.override_price_cents,
                line_total_cents: line.line_total()?.cents(),
                position: position as i64,
            };

            match sale.sale_type {
                SaleType::Direct => {
                    let reference = LedgerReference::Sale {
                        sale_id: sale.id.clone(),
                        bundle_id: sale.bundle_id.clone(),
                    };
                    let (_, split) = stock_out_within(
                        &mut uow,
                        &line.item_id,
                        line.quantity,
                        Some(reference),
                        sale.notes.clone(),
                    )
                    .await?;
                    splits.push(LineSplit {
                        item_id: line.item_id.clone(),
                        split,
                    });
                }
                SaleType::Presale => {
                    let reference = LedgerReference::Presale {
                        sale_id: Some(sale.id.clone()),
                        bundle_id: sale.bundle_id.clone(),
                        is_pre_sale: true,
                    };
                    reserve_within(
                        &mut uow,
                        &line.item_id,
                        line.quantity,
                        Some(reference),
                        sale.notes.clone(),
                    )
                    .await?;
                }
            }

            // After the movement so an unknown item reports ItemNotFound.
            SaleRepository::insert_item(uow.conn(), &row).await?;
            items.push(row);
        }

        if let Some(bundle_id) = &sale.bundle_id {
            let now = uow.now();
            BundleRepository::record_sale(uow.conn(), bundle_id, total.cents(), now).await?;
        }

        let transactions = uow.commit().await?;

        info!(
            sale_id = %sale.id,
            sale_type = ?sale.sale_type,
            lines = items.len(),
            total = %total,
            bundle_id = sale.bundle_id.as_deref().unwrap_or("-"),
            "Sale created"
        );

        Ok(SaleReceipt {
            sale,
            items,
            splits,
            transactions,
        })
    }

    pub async fn get_sale(&self, id: &str) -> DbResult<SaleDetail> {
        let repo = SaleRepository::new(self.pool.clone());
        let sale = repo
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::from(CoreError::SaleNotFound(id.to_string())))?;
        let items = repo.get_items(id).await?;
        Ok(SaleDetail { sale, items })
    }
}
