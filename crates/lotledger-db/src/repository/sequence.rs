//! # Invoice Sequence Repository
//!
//! The only authority for bill numbers: one counter row per fiscal year.
//!
//! ## Issuing a Number
//! ```text
//! INSERT INTO invoice_sequences (fiscal_year, last_number) VALUES ('2024-25', 1)
//! ON CONFLICT (fiscal_year) DO UPDATE SET last_number = last_number + 1
//! RETURNING last_number
//! ```
//!
//! One statement, run inside the sale's transaction. It is a write, so it
//! takes SQLite's write lock and concurrent sales queue behind it. If the
//! sale rolls back, so does the increment.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;

/// Read access to the invoice counters.
#[derive(Debug, Clone)]
pub struct SequenceRepository {
    pool: SqlitePool,
}

impl SequenceRepository {
    /// Creates a new SequenceRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SequenceRepository { pool }
    }

    /// Last issued number for a fiscal year, 0 when none.
    pub async fn current(&self, fiscal_year: &str) -> DbResult<i64> {
        let last: Option<i64> =
            sqlx::query_scalar("SELECT last_number FROM invoice_sequences WHERE fiscal_year = ?1")
                .bind(fiscal_year)
                .fetch_optional(&self.pool)
                .await?;

        Ok(last.unwrap_or(0))
    }
}

/// Issues the next number for `fiscal_year`.
pub(crate) async fn next(conn: &mut SqliteConnection, fiscal_year: &str) -> DbResult<i64> {
    let number: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO invoice_sequences (fiscal_year, last_number) VALUES (?1, 1)
        ON CONFLICT (fiscal_year) DO UPDATE SET last_number = last_number + 1
        RETURNING last_number
        "#,
    )
    .bind(fiscal_year)
    .fetch_one(&mut *conn)
    .await?;

    debug!(fiscal_year, number, "Invoice number reserved");
    Ok(number)
}
