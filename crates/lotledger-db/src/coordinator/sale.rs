//! Sale: invoice number, FEFO allocation, debits, lines, audit.

use lotledger_core::allocation::allocate_fefo;
use lotledger_core::types::new_id;
use lotledger_core::validation::validate_sale_request;
use lotledger_core::{
    AuditAction, CoreError, FiscalYear, InvoiceNumber, LedgerEntryType, Money, Sale, SaleLine,
    SaleReceipt, SaleRequest, TaxBreakdown, TaxRate,
};
use serde_json::json;
use tracing::{debug, info};

use super::Ledger;
use crate::error::DbResult;
use crate::repository::audit::{self, AuditSubject};
use crate::repository::{batch, sale, sequence};

impl Ledger {
    /// Records a sale atomically.
    ///
    /// Each request line is allocated across batches first-expired
    /// first-out and becomes one sale line per batch drawn from. The whole
    /// sale fails with no side effects on `InsufficientStock`,
    /// `PriceExceedsMrp` or any storage error; a rolled-back sale consumes
    /// no bill number.
    pub async fn submit_sale(&self, request: SaleRequest) -> DbResult<SaleReceipt> {
        validate_sale_request(&request)?;

        let receipt = self.with_retry("sale", || self.sale_once(&request)).await?;

        info!(
            sale_id = %receipt.sale_id,
            bill_number = %receipt.bill_number,
            lines = receipt.lines.len(),
            total_cents = receipt.total_cents,
            actor = %request.actor,
            "Sale committed"
        );
        Ok(receipt)
    }

    async fn sale_once(&self, request: &SaleRequest) -> DbResult<SaleReceipt> {
        let now = self.clock.now();
        let today = now.date_naive();
        let fiscal_year = FiscalYear::containing(today, self.fiscal_year_start_month).key();

        let mut tx = self.begin_write().await?;

        let sequence_number = sequence::next(&mut *tx, &fiscal_year).await?;
        let bill_number =
            InvoiceNumber::new(&self.invoice_prefix, &fiscal_year, sequence_number).to_string();
        let sale_id = new_id();

        let mut lines: Vec<SaleLine> = Vec::new();
        let mut totals = TaxBreakdown::default();

        for requested in &request.lines {
            let candidates = batch::fetch_available(&mut *tx, &requested.product_id, today).await?;
            let plan = allocate_fefo(&requested.product_id, &candidates, requested.quantity, today)?;

            for allocation in plan {
                let source = candidates
                    .iter()
                    .find(|b| b.id == allocation.batch_id)
                    .ok_or_else(|| CoreError::BatchNotFound(allocation.batch_id.clone()))?;

                if requested.unit_price_cents > source.mrp_cents {
                    return Err(CoreError::PriceExceedsMrp {
                        batch_id: source.id.clone(),
                        unit_price_cents: requested.unit_price_cents,
                        mrp_cents: source.mrp_cents,
                    }
                    .into());
                }

                let line_id = new_id();
                batch::apply_delta(
                    &mut *tx,
                    &source.id,
                    -allocation.quantity,
                    LedgerEntryType::Sale,
                    &line_id,
                    now,
                )
                .await?;

                let gross = Money::from_cents(requested.unit_price_cents)
                    .multiply_quantity(allocation.quantity);
                let tax = gross.tax_breakdown(TaxRate::from_bps(requested.tax_rate_bps), self.tax_mode);
                totals += tax;

                lines.push(SaleLine {
                    id: line_id,
                    sale_id: sale_id.clone(),
                    line_no: lines.len() as i64 + 1,
                    product_id: requested.product_id.clone(),
                    batch_id: source.id.clone(),
                    quantity: allocation.quantity,
                    unit_price_cents: requested.unit_price_cents,
                    mrp_cents: source.mrp_cents,
                    tax_rate_bps: i64::from(requested.tax_rate_bps),
                    taxable_cents: tax.taxable.cents(),
                    cgst_cents: tax.cgst.cents(),
                    sgst_cents: tax.sgst.cents(),
                    total_cents: tax.total().cents(),
                    created_at: now,
                });
            }
        }

        let record = Sale {
            id: sale_id.clone(),
            bill_number: bill_number.clone(),
            fiscal_year,
            sequence_number,
            customer_ref: request.customer_ref.clone(),
            actor: request.actor.clone(),
            taxable_cents: totals.taxable.cents(),
            cgst_cents: totals.cgst.cents(),
            sgst_cents: totals.sgst.cents(),
            total_cents: totals.total().cents(),
            created_at: now,
        };
        sale::insert_sale(&mut *tx, &record).await?;
        for line in &lines {
            sale::insert_line(&mut *tx, line).await?;
        }

        audit::record(
            &mut *tx,
            &request.actor,
            AuditAction::SaleCompleted,
            AuditSubject {
                entity_type: "sale",
                entity_id: &sale_id,
            },
            None,
            Some(json!({
                "bill_number": bill_number,
                "total_cents": record.total_cents,
                "lines": lines
                    .iter()
                    .map(|l| json!({ "batch_id": l.batch_id, "quantity": l.quantity }))
                    .collect::<Vec<_>>(),
            })),
            now,
        )
        .await?;

        tx.commit().await?;
        debug!(sale_id = %sale_id, bill_number = %bill_number, "Sale transaction committed");

        Ok(SaleReceipt {
            sale_id,
            bill_number,
            totals,
            total_cents: record.total_cents,
            lines,
        })
    }
}
