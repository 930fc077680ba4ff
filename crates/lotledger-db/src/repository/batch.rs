//! # Batch Repository
//!
//! Current-state view of every received lot.
//!
//! ## Quantity Changes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  apply_delta(conn, X1, -6, sale, line-7)        (inside a transaction)  │
//! │                                                                         │
//! │  1. read X1.quantity_available            → 10  (expected)              │
//! │  2. ledger::append(X1, -6, expected = 10) → balance_after = 4           │
//! │  3. UPDATE batches SET quantity_available = 4                           │
//! │       WHERE id = X1 AND quantity_available = 10                         │
//! │         ├── 1 row  → done                                               │
//! │         └── 0 rows → StaleBalance (retryable, whole tx rolls back)      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `quantity_available` is never written anywhere else.

use chrono::{DateTime, NaiveDate, Utc};
use lotledger_core::{Batch, CoreError, LedgerEntry, LedgerEntryType};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::ledger;

macro_rules! select_batches {
    ($rest:literal) => {
        concat!(
            r#"
            SELECT
                receipt_seq, id, product_id, lot_code, mfg_date, exp_date,
                unit_cost_cents, mrp_cents, quantity_available, storage_location,
                is_active, vendor_id, created_at, updated_at
            FROM batches
            "#,
            $rest
        )
    };
}

/// Repository for batch reads. Writes go through the coordinator.
#[derive(Debug, Clone)]
pub struct BatchRepository {
    pool: SqlitePool,
}

impl BatchRepository {
    /// Creates a new BatchRepository.
    pub fn new(pool: SqlitePool) -> Self {
        BatchRepository { pool }
    }

    /// Gets a batch by ID.
    pub async fn get(&self, id: &str) -> DbResult<Option<Batch>> {
        let batch = sqlx::query_as::<_, Batch>(select_batches!("WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(batch)
    }

    /// Gets a batch by its natural key.
    pub async fn get_by_lot(&self, product_id: &str, lot_code: &str) -> DbResult<Option<Batch>> {
        let batch = sqlx::query_as::<_, Batch>(select_batches!(
            "WHERE product_id = ?1 AND lot_code = ?2"
        ))
        .bind(product_id)
        .bind(lot_code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(batch)
    }

    /// Sellable batches of a product on `today`, in FEFO order.
    pub async fn list_available(&self, product_id: &str, today: NaiveDate) -> DbResult<Vec<Batch>> {
        let mut conn = self.pool.acquire().await?;
        fetch_available(&mut conn, product_id, today).await
    }

    /// Every batch in receipt order.
    pub async fn list_all(&self) -> DbResult<Vec<Batch>> {
        let batches = sqlx::query_as::<_, Batch>(select_batches!("ORDER BY receipt_seq"))
            .fetch_all(&self.pool)
            .await?;

        Ok(batches)
    }

    /// Expired batches still holding stock: candidates for write-off.
    pub async fn list_expired(&self, today: NaiveDate) -> DbResult<Vec<Batch>> {
        let batches = sqlx::query_as::<_, Batch>(select_batches!(
            r#"
            WHERE exp_date <= ?1 AND quantity_available > 0
            ORDER BY exp_date, receipt_seq
            "#
        ))
        .bind(today)
        .fetch_all(&self.pool)
        .await?;

        Ok(batches)
    }

    /// Counts all batches.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM batches")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Transaction-scoped operations (coordinator only)
// =============================================================================

pub(crate) async fn fetch(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Batch>> {
    let batch = sqlx::query_as::<_, Batch>(select_batches!("WHERE id = ?1"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(batch)
}

pub(crate) async fn fetch_by_lot(
    conn: &mut SqliteConnection,
    product_id: &str,
    lot_code: &str,
) -> DbResult<Option<Batch>> {
    let batch = sqlx::query_as::<_, Batch>(select_batches!(
        "WHERE product_id = ?1 AND lot_code = ?2"
    ))
    .bind(product_id)
    .bind(lot_code)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(batch)
}

/// `quantity_available > 0 AND is_active AND exp_date > today`, ordered by
/// expiry then receipt.
pub(crate) async fn fetch_available(
    conn: &mut SqliteConnection,
    product_id: &str,
    today: NaiveDate,
) -> DbResult<Vec<Batch>> {
    let batches = sqlx::query_as::<_, Batch>(select_batches!(
        r#"
        WHERE product_id = ?1
          AND is_active = 1
          AND quantity_available > 0
          AND exp_date > ?2
        ORDER BY exp_date, receipt_seq
        "#
    ))
    .bind(product_id)
    .bind(today)
    .fetch_all(&mut *conn)
    .await?;

    Ok(batches)
}

/// Active batches that are empty and expired.
pub(crate) async fn fetch_exhausted(
    conn: &mut SqliteConnection,
    today: NaiveDate,
) -> DbResult<Vec<Batch>> {
    let batches = sqlx::query_as::<_, Batch>(select_batches!(
        r#"
        WHERE is_active = 1 AND quantity_available = 0 AND exp_date <= ?1
        ORDER BY receipt_seq
        "#
    ))
    .bind(today)
    .fetch_all(&mut *conn)
    .await?;

    Ok(batches)
}

/// Inserts a new, empty batch and returns it with its receipt sequence.
///
/// Stock arrives afterwards through `apply_delta`.
pub(crate) async fn insert(conn: &mut SqliteConnection, batch: &Batch) -> DbResult<Batch> {
    debug!(id = %batch.id, product_id = %batch.product_id, lot_code = %batch.lot_code, "Inserting batch");

    let receipt_seq: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO batches (
            id, product_id, lot_code, mfg_date, exp_date,
            unit_cost_cents, mrp_cents, quantity_available, storage_location,
            is_active, vendor_id, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, ?8, ?9, ?10, ?11, ?12)
        RETURNING receipt_seq
        "#,
    )
    .bind(&batch.id)
    .bind(&batch.product_id)
    .bind(&batch.lot_code)
    .bind(batch.mfg_date)
    .bind(batch.exp_date)
    .bind(batch.unit_cost_cents)
    .bind(batch.mrp_cents)
    .bind(&batch.storage_location)
    .bind(batch.is_active)
    .bind(&batch.vendor_id)
    .bind(batch.created_at)
    .bind(batch.updated_at)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| match DbError::from(e) {
        DbError::UniqueViolation { field, .. } if field.contains("lot_code") => {
            DbError::duplicate("lot_code", format!("{}/{}", batch.product_id, batch.lot_code))
        }
        other => other,
    })?;

    Ok(Batch {
        receipt_seq,
        quantity_available: 0,
        ..batch.clone()
    })
}

/// Applies a signed quantity change to a batch and records it in the ledger.
///
/// Returns the ledger entry written. Fails with `BatchNotFound`,
/// `NegativeBalance` or `StaleBalance`.
pub(crate) async fn apply_delta(
    conn: &mut SqliteConnection,
    batch_id: &str,
    delta: i64,
    entry_type: LedgerEntryType,
    reference_id: &str,
    at: DateTime<Utc>,
) -> DbResult<LedgerEntry> {
    let expected: i64 =
        sqlx::query_scalar::<_, i64>("SELECT quantity_available FROM batches WHERE id = ?1")
            .bind(batch_id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| CoreError::BatchNotFound(batch_id.to_string()))?;

    let entry = ledger::append(
        conn,
        batch_id,
        entry_type,
        reference_id,
        delta,
        expected,
        at,
    )
    .await?;

    let result = sqlx::query(
        r#"
        UPDATE batches SET
            quantity_available = ?2,
            updated_at = ?3
        WHERE id = ?1 AND quantity_available = ?4
        "#,
    )
    .bind(batch_id)
    .bind(entry.balance_after)
    .bind(at)
    .bind(expected)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        let actual: i64 =
            sqlx::query_scalar("SELECT quantity_available FROM batches WHERE id = ?1")
                .bind(batch_id)
                .fetch_one(&mut *conn)
                .await?;
        return Err(DbError::StaleBalance {
            batch_id: batch_id.to_string(),
            expected,
            actual,
        });
    }

    debug!(
        batch_id,
        delta,
        balance_after = entry.balance_after,
        entry_type = entry_type.as_str(),
        "Batch quantity updated"
    );

    Ok(entry)
}

/// Sets `is_active`; returns false when the batch was already in that state.
pub(crate) async fn set_active(
    conn: &mut SqliteConnection,
    batch_id: &str,
    active: bool,
    at: DateTime<Utc>,
) -> DbResult<bool> {
    let result = sqlx::query(
        r#"
        UPDATE batches SET is_active = ?2, updated_at = ?3
        WHERE id = ?1 AND is_active <> ?2
        "#,
    )
    .bind(batch_id)
    .bind(active)
    .bind(at)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}
