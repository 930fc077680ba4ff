//! # Ledger Repository
//!
//! The append-only stock ledger.
//!
//! ## Append
//! ```text
//! append(X1, sale, line-7, delta = -6, expected_prior = 10)
//!      │
//!      ├── latest balance_after for X1 (0 when no entries)
//!      │        └── != expected_prior → StaleBalance
//!      ├── next_balance(10, -6) = 4     (NegativeBalance if < 0)
//!      └── INSERT stock_ledger (..., delta -6, balance_after 4) RETURNING seq
//! ```
//!
//! Rows are never updated or deleted. `update` / `delete` below exist only
//! to fail, and the schema triggers reject the same at the SQL level.

use chrono::{DateTime, Utc};
use futures_util::stream::{BoxStream, StreamExt};
use lotledger_core::ledger::next_balance;
use lotledger_core::types::new_id;
use lotledger_core::{CoreError, LedgerEntry, LedgerEntryType};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};

const TABLE: &str = "stock_ledger";

macro_rules! select_entries {
    ($rest:literal) => {
        concat!(
            r#"
            SELECT seq, id, batch_id, entry_type, reference_id, delta, balance_after, created_at
            FROM stock_ledger
            "#,
            $rest
        )
    };
}

/// Read access to the stock ledger.
#[derive(Debug, Clone)]
pub struct LedgerRepository {
    pool: SqlitePool,
}

impl LedgerRepository {
    /// Creates a new LedgerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        LedgerRepository { pool }
    }

    /// Lazily streams a batch's entries in append order.
    ///
    /// ```rust,ignore
    /// let mut history = db.ledger_entries().history("X1");
    /// while let Some(entry) = history.next().await {
    ///     let entry = entry?;
    /// }
    /// ```
    pub fn history(&self, batch_id: &str) -> BoxStream<'_, DbResult<LedgerEntry>> {
        history_stream(&self.pool, batch_id)
    }

    /// A batch's full history, collected.
    pub async fn history_vec(&self, batch_id: &str) -> DbResult<Vec<LedgerEntry>> {
        let entries = sqlx::query_as::<_, LedgerEntry>(select_entries!(
            "WHERE batch_id = ?1 ORDER BY seq"
        ))
        .bind(batch_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Entries written for one document line.
    pub async fn entries_for_reference(&self, reference_id: &str) -> DbResult<Vec<LedgerEntry>> {
        let entries = sqlx::query_as::<_, LedgerEntry>(select_entries!(
            "WHERE reference_id = ?1 ORDER BY seq"
        ))
        .bind(reference_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Latest `balance_after` of a batch, 0 when it has no entries.
    pub async fn balance(&self, batch_id: &str) -> DbResult<i64> {
        let mut conn = self.pool.acquire().await?;
        latest_balance(&mut conn, batch_id).await
    }

    /// Counts all entries.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM stock_ledger")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Ledger entries cannot be changed.
    pub async fn update(&self, _entry: &LedgerEntry) -> DbResult<()> {
        Err(CoreError::immutable(TABLE).into())
    }

    /// Ledger entries cannot be removed.
    pub async fn delete(&self, _id: &str) -> DbResult<()> {
        Err(CoreError::immutable(TABLE).into())
    }
}

// =============================================================================
// Transaction-scoped operations (coordinator only)
// =============================================================================

pub(crate) fn history_stream<'p>(
    pool: &'p SqlitePool,
    batch_id: &str,
) -> BoxStream<'p, DbResult<LedgerEntry>> {
    sqlx::query_as::<_, LedgerEntry>(select_entries!("WHERE batch_id = ?1 ORDER BY seq"))
        .bind(batch_id.to_string())
        .fetch(pool)
        .map(|row| row.map_err(DbError::from))
        .boxed()
}

pub(crate) async fn latest_balance(conn: &mut SqliteConnection, batch_id: &str) -> DbResult<i64> {
    let balance: Option<i64> = sqlx::query_scalar(
        "SELECT balance_after FROM stock_ledger WHERE batch_id = ?1 ORDER BY seq DESC LIMIT 1",
    )
    .bind(batch_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(balance.unwrap_or(0))
}

/// Appends one entry. See the module docs for the checks performed.
pub(crate) async fn append(
    conn: &mut SqliteConnection,
    batch_id: &str,
    entry_type: LedgerEntryType,
    reference_id: &str,
    delta: i64,
    expected_prior_balance: i64,
    at: DateTime<Utc>,
) -> DbResult<LedgerEntry> {
    let actual = latest_balance(conn, batch_id).await?;
    if actual != expected_prior_balance {
        return Err(DbError::StaleBalance {
            batch_id: batch_id.to_string(),
            expected: expected_prior_balance,
            actual,
        });
    }

    let balance_after = next_balance(batch_id, expected_prior_balance, delta)?;
    let id = new_id();

    let seq: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO stock_ledger (
            id, batch_id, entry_type, reference_id, delta, balance_after, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        RETURNING seq
        "#,
    )
    .bind(&id)
    .bind(batch_id)
    .bind(entry_type)
    .bind(reference_id)
    .bind(delta)
    .bind(balance_after)
    .bind(at)
    .fetch_one(&mut *conn)
    .await?;

    debug!(seq, batch_id, delta, balance_after, "Ledger entry appended");

    Ok(LedgerEntry {
        seq,
        id,
        batch_id: batch_id.to_string(),
        entry_type,
        reference_id: reference_id.to_string(),
        delta,
        balance_after,
        created_at: at,
    })
}
