//! # Purchase Service
//!
//! Registers supplier purchases (stock in at a moving average cost) and
//! their payments.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::PurchaseRepository;
use crate::unit_of_work::UnitOfWork;
use stockbook_core::costing::plan_purchase_receipt;
use stockbook_core::purchase::{derive_status, purchase_total, validate_purchase, PurchaseLineInput};
use stockbook_core::validation::{validate_notes, validate_payment_amount};
use stockbook_core::{
    CoreError, InventoryTransaction, Money, PaymentMethod, Purchase, PurchaseItem, PurchasePayment,
};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterPurchaseRequest {
    pub supplier_name: String,
    pub invoice_number: Option<String>,
    pub notes: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub items: Vec<PurchaseLineInput>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterPaymentRequest {
    pub purchase_id: String,
    pub amount_cents: i64,
    pub payment_method: PaymentMethod,
    pub reference: Option<String>,
    pub notes: Option<String>,
}

/// A purchase with its lines and payments.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseDetail {
    pub purchase: Purchase,
    pub items: Vec<PurchaseItem>,
    pub payments: Vec<PurchasePayment>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseReceipt {
    pub purchase: Purchase,
    pub items: Vec<PurchaseItem>,
    pub transactions: Vec<InventoryTransaction>,
}

/// Purchase ledger operations.
#[derive(Debug, Clone)]
pub struct PurchaseService {
    pool: SqlitePool,
}

impl PurchaseService {
    pub fn new(pool: SqlitePool) -> Self {
        PurchaseService { pool }
    }

    /// Records a purchase and receives every line into stock.
    ///
    /// Each line re-prices its item with the moving average before the
    /// units are added. One missing item rolls back the whole purchase.
    pub async fn register_purchase(
        &self,
        request: RegisterPurchaseRequest,
    ) -> DbResult<PurchaseReceipt> {
        validate_purchase(&request.supplier_name, request.notes.as_deref(), &request.items)?;

        let total = purchase_total(&request.items)?;
        let mut uow = UnitOfWork::begin(&self.pool).await?;
        let now = uow.now();

        let purchase = Purchase {
            id: Uuid::new_v4().to_string(),
            supplier_name: request.supplier_name.trim().to_string(),
            invoice_number: request.invoice_number.filter(|s| !s.trim().is_empty()),
            notes: request.notes,
            total_amount_cents: total.cents(),
            paid_amount_cents: 0,
            status: derive_status(total, Money::zero()),
            purchase_date: now,
            due_date: request.due_date,
            updated_at: now,
        };
        PurchaseRepository::insert_header(uow.conn(), &purchase).await?;

        let mut items = Vec::with_capacity(request.items.len());
        for (position, line) in request.items.iter().enumerate() {
            let item = uow.item(&line.item_id).await?;

            let row = PurchaseItem {
                id: Uuid::new_v4().to_string(),
                purchase_id: purchase.id.clone(),
                item_id: item.id.clone(),
                quantity: line.quantity,
                unit_cost_cents: line.unit_cost_cents,
                total_cost_cents: line.total_cost()?.cents(),
                position: position as i64,
            };
            PurchaseRepository::insert_line(uow.conn(), &row).await?;

            let movement = plan_purchase_receipt(&item, &purchase.id, line.quantity, line.unit_cost())?;
            uow.apply(&item, &movement).await?;
            items.push(row);
        }

        let transactions = uow.commit().await?;

        info!(
            purchase_id = %purchase.id,
            supplier = %purchase.supplier_name,
            lines = items.len(),
            total = %total,
            "Purchase registered"
        );

        Ok(PurchaseReceipt {
            purchase,
            items,
            transactions,
        })
    }

    /// Records a supplier payment and updates the purchase status.
    pub async fn register_payment(&self, request: RegisterPaymentRequest) -> DbResult<Purchase> {
        validate_payment_amount(request.amount_cents)?;
        validate_notes("notes", request.notes.as_deref())?;

        let amount = Money::from_cents(request.amount_cents);
        let mut uow = UnitOfWork::begin(&self.pool).await?;
        let now = uow.now();

        let mut purchase = PurchaseRepository::fetch(uow.conn(), &request.purchase_id)
            .await?
            .ok_or_else(|| DbError::from(CoreError::PurchaseNotFound(request.purchase_id.clone())))?;

        let applied = purchase.accept_payment(amount)?;

        let updated = PurchaseRepository::record_payment(
            uow.conn(),
            &purchase.id,
            purchase.paid_amount_cents,
            applied.paid_amount.cents(),
            applied.status,
            now,
        )
        .await?;
        if updated == 0 {
            return Err(DbError::TransactionFailed(format!(
                "purchase {} was paid concurrently",
                purchase.id
            )));
        }

        let payment = PurchasePayment {
            id: Uuid::new_v4().to_string(),
            purchase_id: purchase.id.clone(),
            amount_cents: amount.cents(),
            payment_method: request.payment_method,
            reference: request.reference,
            notes: request.notes,
            payment_date: now,
        };
        PurchaseRepository::insert_payment(uow.conn(), &payment).await?;

        uow.commit().await?;

        purchase.paid_amount_cents = applied.paid_amount.cents();
        purchase.status = applied.status;
        purchase.updated_at = now;

        info!(
            purchase_id = %purchase.id,
            amount = %amount,
            remaining = %purchase.remaining(),
            status = ?purchase.status,
            "Purchase payment registered"
        );

        Ok(purchase)
    }

    pub async fn get_purchase(&self, id: &str) -> DbResult<PurchaseDetail> {
        let repo = PurchaseRepository::new(self.pool.clone());

        let purchase = repo
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::from(CoreError::PurchaseNotFound(id.to_string())))?;
        let items = repo.get_items(id).await?;
        let payments = repo.get_payments(id).await?;

        Ok(PurchaseDetail {
            purchase,
            items,
            payments,
        })
    }

    /// Most recent purchases first.
    pub async fn list_purchases(&self, limit: u32) -> DbResult<Vec<Purchase>> {
        PurchaseRepository::new(self.pool.clone()).list(limit).await
    }

    /// Purchases with an open balance, earliest due first.
    pub async fn list_outstanding(&self) -> DbResult<Vec<Purchase>> {
        PurchaseRepository::new(self.pool.clone()).list_outstanding().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::services::item::CreateItemRequest;
    use stockbook_core::{ItemType, PurchaseStatus};

    async fn setup() -> (Database, String) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let item = db
            .catalog()
            .create_item(CreateItemRequest {
                sku: "RICE-1KG".to_string(),
                name: "Rice 1kg".to_string(),
                description: None,
                item_type: ItemType::Physical,
                base_price_cents: 1500,
                cost_price_cents: Some(800),
                margin_bps: None,
                minimum_stock: 0,
                allow_pre_sale: false,
                initial_stock: None,
                initial_unit_cost_cents: None,
            })
            .await
            .unwrap();
        (db, item.id)
    }

    fn purchase(item_id: &str, quantity: i64, unit_cost_cents: i64) -> RegisterPurchaseRequest {
        RegisterPurchaseRequest {
            supplier_name: "Distribuidora Central".to_string(),
            invoice_number: Some("F-001".to_string()),
            notes: None,
            due_date: None,
            items: vec![PurchaseLineInput {
                item_id: item_id.to_string(),
                quantity,
                unit_cost_cents,
            }],
        }
    }

    #[tokio::test]
    async fn test_purchase_receives_stock_at_average_cost() {
        let (db, item_id) = setup().await;
        let service = db.purchasing();

        service.register_purchase(purchase(&item_id, 5, 800)).await.unwrap();
        let receipt = service.register_purchase(purchase(&item_id, 5, 1200)).await.unwrap();

        assert_eq!(receipt.purchase.total_amount_cents, 6000);
        assert_eq!(receipt.purchase.status, PurchaseStatus::Pending);
        assert_eq!(receipt.transactions.len(), 1);

        let item = db.items().get_by_id(&item_id).await.unwrap().unwrap();
        assert_eq!(item.current_stock, 10);
        assert_eq!(item.cost_price_cents, Some(1000));
    }

    #[tokio::test]
    async fn test_payment_flow() {
        let (db, item_id) = setup().await;
        let service = db.purchasing();

        let receipt = service.register_purchase(purchase(&item_id, 10, 1000)).await.unwrap();
        let id = receipt.purchase.id;

        let pay = |amount_cents| RegisterPaymentRequest {
            purchase_id: id.clone(),
            amount_cents,
            payment_method: PaymentMethod::Transfer,
            reference: None,
            notes: None,
        };

        let partial = service.register_payment(pay(6000)).await.unwrap();
        assert_eq!(partial.status, PurchaseStatus::Partial);

        let err = service.register_payment(pay(5000)).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::InvalidAmount { .. })));

        let paid = service.register_payment(pay(4000)).await.unwrap();
        assert_eq!(paid.status, PurchaseStatus::Paid);

        let detail = service.get_purchase(&id).await.unwrap();
        assert_eq!(detail.payments.len(), 2);
        assert!(service.list_outstanding().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_purchase() {
        let (db, _) = setup().await;
        let err = db.purchasing().get_purchase("nope").await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::PurchaseNotFound(_))));
    }
}
