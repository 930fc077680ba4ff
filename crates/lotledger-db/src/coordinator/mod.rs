//! # Transaction Coordinator
//!
//! `Ledger` is the only writer of batch quantities and ledger entries. Each
//! business event runs as one SQLite transaction inside a bounded retry loop.
//!
//! ## Operation Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  submit_sale(request)                                                   │
//! │       │                                                                 │
//! │       ├── validate (no transaction yet)                                 │
//! │       ▼                                                                 │
//! │  with_retry ─────────────────────────────────────────┐                  │
//! │  │  BEGIN + write lock (begin_write)                 │  StaleBalance    │
//! │  │   ├── invoice number  (sequence::next)            │  Busy            │
//! │  │   ├── allocate FEFO   (lotledger_core)            │  PoolExhausted   │
//! │  │   ├── apply_delta per allocation → ledger entries │    → retry       │
//! │  │   ├── sale + sale lines                           │                  │
//! │  │   └── audit record                                │                  │
//! │  │  COMMIT  (any error: dropped tx rolls back)       │                  │
//! │  └───────────────────────────────────────────────────┘                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SaleReceipt                                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Concurrency
//! - Nothing mutable is cached between calls; every attempt re-reads.
//! - Writers serialize on SQLite's write lock. A stale read shows up as
//!   `StaleBalance` or `Busy` and the attempt is rerun from scratch.
//! - Lock waits are bounded by `busy_timeout`, pool waits by the acquire
//!   timeout.

mod adjustment;
mod purchase;
mod returns;
mod sale;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use futures_util::stream::BoxStream;
use lotledger_core::ledger::Reconciliation;
use lotledger_core::{
    AuditAction, AuditRecord, Batch, Clock, CoreError, FiscalYear, LedgerEntry, Sale, SaleLine,
    SystemClock, TaxMode,
};
use serde_json::json;
use sqlx::{Sqlite, Transaction};
use tracing::{error, info, warn};

use crate::config::LedgerConfig;
use crate::error::{DbError, DbResult};
use crate::pool::Database;
use crate::repository::audit::{self, AuditSubject};
use crate::repository::{batch, ledger};

/// Base delay between attempts; attempt `n` waits `n` times this.
const RETRY_BACKOFF: Duration = Duration::from_millis(25);

/// The transaction coordinator.
///
/// Cheap to clone; clones share the pool and the clock.
///
/// Every business operation holds SQLite's database-wide write lock for
/// the length of its transaction, so writes are serialized even when they
/// touch unrelated batches. A writer waits at most `busy_timeout` for the
/// lock and then fails with the retryable `Busy` error.
#[derive(Debug, Clone)]
pub struct Ledger {
    db: Database,
    clock: Arc<dyn Clock>,
    invoice_prefix: String,
    fiscal_year_start_month: u32,
    tax_mode: TaxMode,
    max_retries: u32,
}

impl Ledger {
    /// Builds a ledger over `db`, copying what it needs from `config`.
    pub fn new(db: Database, config: &LedgerConfig) -> Self {
        Ledger {
            db,
            clock: Arc::new(SystemClock),
            invoice_prefix: config.ledger.invoice_prefix.clone(),
            fiscal_year_start_month: config.ledger.fiscal_year_start_month,
            tax_mode: config.ledger.tax_mode,
            max_retries: config.ledger.max_retries,
        }
    }

    /// Replaces the clock (tests, backdated imports).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The underlying database.
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Fiscal-year key for today's date.
    pub fn current_fiscal_year(&self) -> String {
        FiscalYear::containing(self.clock.today(), self.fiscal_year_start_month).key()
    }

    /// Begins a transaction that holds SQLite's write lock from its first
    /// statement. Every read inside it sees the latest committed state.
    async fn begin_write(&self) -> DbResult<Transaction<'static, Sqlite>> {
        let mut tx = self.db.pool().begin().await?;
        sqlx::query("UPDATE invoice_sequences SET last_number = last_number WHERE 0")
            .execute(&mut *tx)
            .await?;
        Ok(tx)
    }

    /// Runs `attempt` until it succeeds, fails with a non-retryable error,
    /// or has been retried `max_retries` times.
    async fn with_retry<T, F, Fut>(&self, operation: &'static str, mut attempt: F) -> DbResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = DbResult<T>>,
    {
        let mut tries: u32 = 1;
        loop {
            match attempt().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && tries <= self.max_retries => {
                    warn!(operation, attempt = tries, error = %err, "Conflict, retrying");
                    tokio::time::sleep(RETRY_BACKOFF * tries).await;
                    tries += 1;
                }
                Err(err) => {
                    if err.is_defect() {
                        error!(operation, error = %err, "Ledger invariant violated");
                    } else if err.is_retryable() {
                        warn!(operation, attempts = tries, error = %err, "Giving up after retries");
                    }
                    return Err(err);
                }
            }
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Every ledger entry of a batch in append order.
    pub async fn query_batch_history(&self, batch_id: &str) -> DbResult<Vec<LedgerEntry>> {
        if self.db.batches().get(batch_id).await?.is_none() {
            return Err(CoreError::BatchNotFound(batch_id.to_string()).into());
        }
        self.db.ledger_entries().history_vec(batch_id).await
    }

    /// Lazy variant of [`Ledger::query_batch_history`].
    pub fn stream_batch_history(&self, batch_id: &str) -> BoxStream<'_, DbResult<LedgerEntry>> {
        ledger::history_stream(self.db.pool(), batch_id)
    }

    /// Batches a sale of `product_id` could draw from today, in FEFO order.
    pub async fn query_available_batches(&self, product_id: &str) -> DbResult<Vec<Batch>> {
        self.db
            .batches()
            .list_available(product_id, self.clock.today())
            .await
    }

    /// A sale with its lines.
    pub async fn get_sale(&self, sale_id: &str) -> DbResult<(Sale, Vec<SaleLine>)> {
        let sales = self.db.sales();
        let sale = sales
            .get(sale_id)
            .await?
            .ok_or_else(|| DbError::not_found("Sale", sale_id))?;
        let lines = sales.lines(sale_id).await?;
        Ok((sale, lines))
    }

    /// Quantity already returned against a sale line.
    pub async fn returned_quantity(&self, sale_line_id: &str) -> DbResult<i64> {
        self.db.returns().returned_quantity(sale_line_id).await
    }

    /// Audit history of one entity.
    pub async fn audit_history(&self, entity_type: &str, entity_id: &str) -> DbResult<Vec<AuditRecord>> {
        self.db.audit().history(entity_type, entity_id).await
    }

    /// Last bill number issued in a fiscal year, 0 when none.
    pub async fn current_invoice_number(&self, fiscal_year: &str) -> DbResult<i64> {
        self.db.sequences().current(fiscal_year).await
    }

    /// Expired batches still holding stock.
    pub async fn list_expired(&self) -> DbResult<Vec<Batch>> {
        self.db.batches().list_expired(self.clock.today()).await
    }

    // =========================================================================
    // Reconciliation
    // =========================================================================

    /// Replays a batch's ledger and compares it with `quantity_available`.
    pub async fn reconcile_batch(&self, batch_id: &str) -> DbResult<Reconciliation> {
        let batch = self
            .db
            .batches()
            .get(batch_id)
            .await?
            .ok_or_else(|| CoreError::BatchNotFound(batch_id.to_string()))?;
        let entries = self.db.ledger_entries().history_vec(batch_id).await?;
        let report = Reconciliation::build(batch_id, batch.quantity_available, &entries);

        if !report.is_consistent() {
            error!(
                batch_id,
                quantity_available = report.quantity_available,
                ledger_balance = ?report.ledger_balance,
                "Batch quantity disagrees with its ledger"
            );
        }

        Ok(report)
    }

    /// Reconciles every batch.
    pub async fn reconcile_all(&self) -> DbResult<Vec<Reconciliation>> {
        let mut reports = Vec::new();
        for batch in self.db.batches().list_all().await? {
            reports.push(self.reconcile_batch(&batch.id).await?);
        }

        let inconsistent = reports.iter().filter(|r| !r.is_consistent()).count();
        info!(batches = reports.len(), inconsistent, "Reconciliation finished");
        Ok(reports)
    }

    // =========================================================================
    // Batch lifecycle
    // =========================================================================

    /// Soft-deactivates batches that are both empty and expired. Returns the
    /// IDs deactivated; each gets an audit record.
    pub async fn deactivate_exhausted(&self, actor: &str) -> DbResult<Vec<String>> {
        lotledger_core::validation::validate_text("actor", actor, 64)?;
        let ids = self
            .with_retry("deactivate_exhausted", || self.deactivate_exhausted_once(actor))
            .await?;

        if !ids.is_empty() {
            info!(count = ids.len(), actor, "Exhausted batches deactivated");
        }
        Ok(ids)
    }

    async fn deactivate_exhausted_once(&self, actor: &str) -> DbResult<Vec<String>> {
        let now = self.clock.now();
        let today: NaiveDate = now.date_naive();
        let mut tx = self.begin_write().await?;

        let mut ids = Vec::new();
        for exhausted in batch::fetch_exhausted(&mut *tx, today).await? {
            if !batch::set_active(&mut *tx, &exhausted.id, false, now).await? {
                continue;
            }
            audit::record(
                &mut *tx,
                actor,
                AuditAction::BatchDeactivated,
                AuditSubject {
                    entity_type: "batch",
                    entity_id: &exhausted.id,
                },
                Some(json!({ "is_active": true, "quantity_available": 0 })),
                Some(json!({ "is_active": false, "exp_date": exhausted.exp_date })),
                now,
            )
            .await?;
            ids.push(exhausted.id);
        }

        tx.commit().await?;
        Ok(ids)
    }
}
