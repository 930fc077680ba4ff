//! Purchase receipt: one batch credit per received lot.
//!
//! ```text
//! line (product, lot) ──► existing batch? ──no──► insert batch (qty 0)
//!                              │ yes
//!                              ├── exp_date differs → LotMismatch
//!                              ├── price differs → warn, batch keeps its MRP
//!                              └── inactive → reactivate
//!                         apply_delta(+qty, purchase) ──► purchase line
//! ```

use chrono::{DateTime, Utc};
use lotledger_core::types::new_id;
use lotledger_core::validation::validate_purchase_request;
use lotledger_core::{
    AuditAction, Batch, CoreError, LedgerEntryType, Money, Purchase, PurchaseLine,
    PurchaseLineRequest, PurchaseReceipt, PurchaseRequest,
};
use serde_json::json;
use sqlx::SqliteConnection;
use tracing::{debug, info, warn};

use super::Ledger;
use crate::error::DbResult;
use crate::repository::audit::{self, AuditSubject};
use crate::repository::{batch, purchase};

impl Ledger {
    /// Receives stock from a vendor. A lot already on file for the product
    /// is topped up; a new lot becomes a new batch.
    ///
    /// A top-up never reprices the batch: the MRP printed on the lot stays
    /// the sale ceiling, and the new cost is kept on the purchase line.
    pub async fn submit_purchase(&self, request: PurchaseRequest) -> DbResult<PurchaseReceipt> {
        validate_purchase_request(&request)?;

        let receipt = self
            .with_retry("purchase", || self.purchase_once(&request))
            .await?;

        info!(
            purchase_id = %receipt.purchase_id,
            vendor_id = %request.vendor_id,
            batches = receipt.batch_ids.len(),
            actor = %request.actor,
            "Purchase committed"
        );
        Ok(receipt)
    }

    async fn purchase_once(&self, request: &PurchaseRequest) -> DbResult<PurchaseReceipt> {
        let now = self.clock.now();
        let purchase_id = new_id();
        let total_cost: Money = request
            .lines
            .iter()
            .map(|l| Money::from_cents(l.unit_cost_cents).multiply_quantity(l.quantity))
            .sum();

        let mut tx = self.begin_write().await?;

        purchase::insert_purchase(
            &mut *tx,
            &Purchase {
                id: purchase_id.clone(),
                vendor_id: request.vendor_id.clone(),
                vendor_invoice_ref: request.vendor_invoice_ref.clone(),
                actor: request.actor.clone(),
                total_cost_cents: total_cost.cents(),
                created_at: now,
            },
        )
        .await?;

        let mut batch_ids = Vec::with_capacity(request.lines.len());
        for line in &request.lines {
            let target = receiving_batch(&mut *tx, &request.vendor_id, line, now).await?;

            let line_id = new_id();
            let entry = batch::apply_delta(
                &mut *tx,
                &target.id,
                line.quantity,
                LedgerEntryType::Purchase,
                &line_id,
                now,
            )
            .await?;

            purchase::insert_line(
                &mut *tx,
                &PurchaseLine {
                    id: line_id,
                    purchase_id: purchase_id.clone(),
                    batch_id: target.id.clone(),
                    quantity: line.quantity,
                    unit_cost_cents: line.unit_cost_cents,
                    created_at: now,
                },
            )
            .await?;

            debug!(
                batch_id = %target.id,
                lot_code = %line.lot_code,
                balance_after = entry.balance_after,
                "Lot received"
            );
            batch_ids.push(target.id);
        }

        audit::record(
            &mut *tx,
            &request.actor,
            AuditAction::PurchaseReceived,
            AuditSubject {
                entity_type: "purchase",
                entity_id: &purchase_id,
            },
            None,
            Some(json!({
                "vendor_id": request.vendor_id,
                "total_cost_cents": total_cost.cents(),
                "batch_ids": batch_ids,
            })),
            now,
        )
        .await?;

        tx.commit().await?;

        Ok(PurchaseReceipt {
            purchase_id,
            batch_ids,
        })
    }
}

/// Finds or creates the batch a purchase line credits.
async fn receiving_batch(
    conn: &mut SqliteConnection,
    vendor_id: &str,
    line: &PurchaseLineRequest,
    now: DateTime<Utc>,
) -> DbResult<Batch> {
    match batch::fetch_by_lot(conn, &line.product_id, &line.lot_code).await? {
        Some(existing) if existing.exp_date != line.exp_date => Err(CoreError::LotMismatch {
            product_id: line.product_id.clone(),
            lot_code: line.lot_code.clone(),
        }
        .into()),
        Some(existing) => {
            if existing.mrp_cents != line.mrp_cents || existing.unit_cost_cents != line.unit_cost_cents {
                warn!(
                    batch_id = %existing.id,
                    lot_code = %existing.lot_code,
                    batch_mrp_cents = existing.mrp_cents,
                    line_mrp_cents = line.mrp_cents,
                    batch_cost_cents = existing.unit_cost_cents,
                    line_cost_cents = line.unit_cost_cents,
                    "Restocked lot priced differently; batch keeps its recorded MRP and cost"
                );
            }
            if !existing.is_active {
                batch::set_active(conn, &existing.id, true, now).await?;
                info!(batch_id = %existing.id, lot_code = %existing.lot_code, "Batch reactivated by purchase");
            }
            Ok(existing)
        }
        None => {
            let fresh = Batch {
                receipt_seq: 0,
                id: new_id(),
                product_id: line.product_id.clone(),
                lot_code: line.lot_code.clone(),
                mfg_date: line.mfg_date,
                exp_date: line.exp_date,
                unit_cost_cents: line.unit_cost_cents,
                mrp_cents: line.mrp_cents,
                quantity_available: 0,
                storage_location: line.storage_location.clone(),
                is_active: true,
                vendor_id: Some(vendor_id.to_string()),
                created_at: now,
                updated_at: now,
            };
            batch::insert(conn, &fresh).await
        }
    }
}
