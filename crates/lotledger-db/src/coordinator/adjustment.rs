//! Manual stock corrections against a single batch.

use lotledger_core::types::new_id;
use lotledger_core::validation::validate_adjustment_request;
use lotledger_core::{
    Adjustment, AdjustmentReceipt, AdjustmentRequest, AuditAction, CoreError, LedgerEntryType,
};
use serde_json::json;
use tracing::info;

use super::Ledger;
use crate::error::DbResult;
use crate::repository::audit::{self, AuditSubject};
use crate::repository::{adjustment, batch};

impl Ledger {
    /// Applies a signed correction. A delta that would take the batch below
    /// zero fails with `NegativeBalance` and changes nothing.
    pub async fn submit_adjustment(&self, request: AdjustmentRequest) -> DbResult<AdjustmentReceipt> {
        validate_adjustment_request(&request)?;

        let receipt = self
            .with_retry("adjustment", || self.adjustment_once(&request))
            .await?;

        info!(
            adjustment_id = %receipt.adjustment_id,
            batch_id = %request.batch_id,
            delta = request.delta,
            reason = ?request.reason,
            balance_after = receipt.balance_after,
            actor = %request.actor,
            "Adjustment committed"
        );
        Ok(receipt)
    }

    async fn adjustment_once(&self, request: &AdjustmentRequest) -> DbResult<AdjustmentReceipt> {
        let now = self.clock.now();
        let mut tx = self.begin_write().await?;

        let target = batch::fetch(&mut *tx, &request.batch_id)
            .await?
            .ok_or_else(|| CoreError::BatchNotFound(request.batch_id.clone()))?;

        let adjustment_id = new_id();
        let entry = batch::apply_delta(
            &mut *tx,
            &target.id,
            request.delta,
            LedgerEntryType::Adjustment,
            &adjustment_id,
            now,
        )
        .await?;

        adjustment::insert(
            &mut *tx,
            &Adjustment {
                id: adjustment_id.clone(),
                batch_id: target.id.clone(),
                delta: request.delta,
                reason: request.reason,
                note: request
                    .note
                    .as_deref()
                    .map(str::trim)
                    .filter(|n| !n.is_empty())
                    .map(str::to_string),
                actor: request.actor.clone(),
                balance_after: entry.balance_after,
                created_at: now,
            },
        )
        .await?;

        audit::record(
            &mut *tx,
            &request.actor,
            AuditAction::StockAdjusted,
            AuditSubject {
                entity_type: "batch",
                entity_id: &target.id,
            },
            Some(json!({ "quantity_available": target.quantity_available })),
            Some(json!({
                "quantity_available": entry.balance_after,
                "adjustment_id": adjustment_id,
                "reason": request.reason,
            })),
            now,
        )
        .await?;

        tx.commit().await?;

        Ok(AdjustmentReceipt {
            adjustment_id,
            balance_after: entry.balance_after,
        })
    }
}
