//! # Ledger References
//!
//! Every ledger entry may point back at the operation that produced it.
//! References are a closed, tagged union so the audit trail stays
//! machine-checkable; they are persisted as JSON text.
//!
//! ```json
//! { "referenceKind": "PURCHASE", "purchaseId": "…", "unitCost": 1200,
//!   "previousCost": 800, "newCost": 1000 }
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Origin of a ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "referenceKind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LedgerReference {
    /// Stock received on a purchase line; costs are in cents.
    Purchase {
        #[serde(rename = "purchaseId")]
        purchase_id: String,
        #[serde(rename = "unitCost")]
        unit_cost_cents: i64,
        #[serde(rename = "previousCost")]
        previous_cost_cents: i64,
        #[serde(rename = "newCost")]
        new_cost_cents: i64,
    },

    /// Stock leaving on a sale line.
    Sale {
        #[serde(rename = "saleId")]
        sale_id: String,
        #[serde(rename = "bundleId")]
        bundle_id: Option<String>,
    },

    /// Compensation emitted by a bundle edit.
    BundleUpdate {
        #[serde(rename = "bundleId")]
        bundle_id: String,
    },

    /// Units promised ahead of stock.
    Presale {
        #[serde(rename = "saleId")]
        sale_id: Option<String>,
        #[serde(rename = "bundleId")]
        bundle_id: Option<String>,
        #[serde(rename = "isPreSale")]
        is_pre_sale: bool,
    },

    /// Direct operator action (stock screen, import, correction).
    Manual { source: String },
}

impl LedgerReference {
    /// Reference for the reservation half of a split outbound request,
    /// keeping whichever sale or bundle the request came from.
    pub fn presale_for(origin: Option<&LedgerReference>) -> Self {
        let (sale_id, bundle_id) = match origin {
            Some(LedgerReference::Sale { sale_id, bundle_id }) => {
                (Some(sale_id.clone()), bundle_id.clone())
            }
            Some(LedgerReference::BundleUpdate { bundle_id }) => (None, Some(bundle_id.clone())),
            Some(LedgerReference::Presale {
                sale_id, bundle_id, ..
            }) => (sale_id.clone(), bundle_id.clone()),
            _ => (None, None),
        };

        LedgerReference::Presale {
            sale_id,
            bundle_id,
            is_pre_sale: true,
        }
    }

    /// Short label for log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerReference::Purchase { .. } => "PURCHASE",
            LedgerReference::Sale { .. } => "SALE",
            LedgerReference::BundleUpdate { .. } => "BUNDLE_UPDATE",
            LedgerReference::Presale { .. } => "PRESALE",
            LedgerReference::Manual { .. } => "MANUAL",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_purchase_reference_json_shape() {
        let reference = LedgerReference::Purchase {
            purchase_id: "p-1".to_string(),
            unit_cost_cents: 1200,
            previous_cost_cents: 800,
            new_cost_cents: 1000,
        };

        let json = serde_json::to_value(&reference).unwrap();
        assert_eq!(json["referenceKind"], "PURCHASE");
        assert_eq!(json["purchaseId"], "p-1");
        assert_eq!(json["newCost"], 1000);

        let back: LedgerReference = serde_json::from_value(json).unwrap();
        assert_eq!(back, reference);
    }

    #[test]
    fn test_presale_keeps_sale_origin() {
        let origin = LedgerReference::Sale {
            sale_id: "s-9".to_string(),
            bundle_id: Some("b-1".to_string()),
        };

        match LedgerReference::presale_for(Some(&origin)) {
            LedgerReference::Presale {
                sale_id,
                bundle_id,
                is_pre_sale,
            } => {
                assert_eq!(sale_id.as_deref(), Some("s-9"));
                assert_eq!(bundle_id.as_deref(), Some("b-1"));
                assert!(is_pre_sale);
            }
            other => panic!("unexpected reference {other:?}"),
        }
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let raw = r#"{"referenceKind":"SOMETHING","x":1}"#;
        assert!(serde_json::from_str::<LedgerReference>(raw).is_err());
    }
}
