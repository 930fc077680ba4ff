//! # Operation Requests and Receipts
//!
//! What the request layer hands to the ledger and what it gets back.
//!
//! ```text
//! SaleRequest ──► Ledger::submit_sale ──► SaleReceipt { bill_number, totals }
//! PurchaseRequest ──► submit_purchase ──► PurchaseReceipt { purchase_id }
//! ReturnRequest ──► submit_return ──► ReturnReceipt { refund_cents }
//! AdjustmentRequest ──► submit_adjustment ──► AdjustmentReceipt
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::allocation::Allocation;
use crate::money::TaxBreakdown;
use crate::types::{AdjustmentReason, SaleLine};

// =============================================================================
// Sale
// =============================================================================

/// One product line on the till. The ledger picks the batches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SaleLineRequest {
    pub product_id: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    /// GST rate from the product master.
    pub tax_rate_bps: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SaleRequest {
    pub lines: Vec<SaleLineRequest>,
    pub customer_ref: Option<String>,
    /// Authenticated user performing the sale.
    pub actor: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SaleReceipt {
    pub sale_id: String,
    pub bill_number: String,
    pub totals: TaxBreakdown,
    pub total_cents: i64,
    /// Batch-level lines as persisted.
    pub lines: Vec<SaleLine>,
}

impl SaleReceipt {
    /// Batch allocations in the order they were debited.
    pub fn allocations(&self) -> Vec<Allocation> {
        self.lines
            .iter()
            .map(|l| Allocation::new(l.batch_id.clone(), l.quantity))
            .collect()
    }
}

// =============================================================================
// Purchase
// =============================================================================

/// One received lot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PurchaseLineRequest {
    pub product_id: String,
    pub lot_code: String,
    #[ts(as = "String")]
    pub mfg_date: NaiveDate,
    #[ts(as = "String")]
    pub exp_date: NaiveDate,
    pub unit_cost_cents: i64,
    pub mrp_cents: i64,
    pub quantity: i64,
    pub storage_location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PurchaseRequest {
    pub vendor_id: String,
    pub vendor_invoice_ref: Option<String>,
    pub lines: Vec<PurchaseLineRequest>,
    pub actor: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PurchaseReceipt {
    pub purchase_id: String,
    /// Batch credited by each request line, in request order.
    pub batch_ids: Vec<String>,
}

// =============================================================================
// Return
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ReturnRequest {
    pub sale_line_id: String,
    pub quantity: i64,
    pub reason: String,
    pub actor: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ReturnReceipt {
    pub return_id: String,
    pub batch_id: String,
    pub refund_cents: i64,
}

// =============================================================================
// Adjustment
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AdjustmentRequest {
    pub batch_id: String,
    /// Signed; negative removes stock.
    pub delta: i64,
    pub reason: AdjustmentReason,
    pub note: Option<String>,
    pub actor: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AdjustmentReceipt {
    pub adjustment_id: String,
    pub balance_after: i64,
}
