//! Customer returns. Stock goes back to the exact batch the sale line
//! debited, even when that batch has since expired or been deactivated.

use lotledger_core::allocation::deallocate;
use lotledger_core::types::new_id;
use lotledger_core::validation::validate_return_request;
use lotledger_core::{
    AuditAction, CoreError, LedgerEntryType, Money, ReturnLine, ReturnReceipt, ReturnRequest,
    SaleReturn,
};
use serde_json::json;
use tracing::info;

use super::Ledger;
use crate::error::DbResult;
use crate::repository::audit::{self, AuditSubject};
use crate::repository::{batch, returns, sale};

impl Ledger {
    /// Accepts a return against one sale line.
    ///
    /// Cumulative returns for the line may not exceed the quantity sold;
    /// the refund is the line's unit price times the returned quantity.
    pub async fn submit_return(&self, request: ReturnRequest) -> DbResult<ReturnReceipt> {
        validate_return_request(&request)?;

        let receipt = self
            .with_retry("return", || self.return_once(&request))
            .await?;

        info!(
            return_id = %receipt.return_id,
            sale_line_id = %request.sale_line_id,
            batch_id = %receipt.batch_id,
            quantity = request.quantity,
            refund_cents = receipt.refund_cents,
            "Return committed"
        );
        Ok(receipt)
    }

    async fn return_once(&self, request: &ReturnRequest) -> DbResult<ReturnReceipt> {
        let now = self.clock.now();
        let mut tx = self.begin_write().await?;

        let line = sale::fetch_line(&mut *tx, &request.sale_line_id)
            .await?
            .ok_or_else(|| CoreError::SaleLineNotFound(request.sale_line_id.clone()))?;

        let already_returned = returns::returned_quantity_in(&mut *tx, &line.id).await?;
        if already_returned + request.quantity > line.quantity {
            return Err(CoreError::ReturnExceedsSoldQuantity {
                sale_line_id: line.id.clone(),
                sold: line.quantity,
                already_returned,
                requested: request.quantity,
            }
            .into());
        }

        let credit = deallocate(&line, request.quantity);
        let refund = Money::from_cents(line.unit_price_cents).multiply_quantity(credit.quantity);
        let return_id = new_id();
        let return_line_id = new_id();

        returns::insert_return(
            &mut *tx,
            &SaleReturn {
                id: return_id.clone(),
                sale_id: line.sale_id.clone(),
                actor: request.actor.clone(),
                reason: request.reason.trim().to_string(),
                refund_cents: refund.cents(),
                created_at: now,
            },
        )
        .await?;

        let entry = batch::apply_delta(
            &mut *tx,
            &credit.batch_id,
            credit.quantity,
            LedgerEntryType::Return,
            &return_line_id,
            now,
        )
        .await?;

        returns::insert_line(
            &mut *tx,
            &ReturnLine {
                id: return_line_id,
                return_id: return_id.clone(),
                sale_line_id: line.id.clone(),
                batch_id: credit.batch_id.clone(),
                quantity: credit.quantity,
                unit_price_cents: line.unit_price_cents,
                refund_cents: refund.cents(),
                created_at: now,
            },
        )
        .await?;

        audit::record(
            &mut *tx,
            &request.actor,
            AuditAction::ReturnAccepted,
            AuditSubject {
                entity_type: "sale_line",
                entity_id: &line.id,
            },
            Some(json!({ "returned_quantity": already_returned })),
            Some(json!({
                "returned_quantity": already_returned + credit.quantity,
                "return_id": return_id,
                "batch_balance": entry.balance_after,
                "refund_cents": refund.cents(),
            })),
            now,
        )
        .await?;

        tx.commit().await?;

        Ok(ReturnReceipt {
            return_id,
            batch_id: credit.batch_id,
            refund_cents: refund.cents(),
        })
    }
}
