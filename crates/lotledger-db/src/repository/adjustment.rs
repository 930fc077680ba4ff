//! # Adjustment Repository
//!
//! Manual stock corrections (damage, expiry write-off, theft, count
//! correction), one row per ledger entry they caused.

use lotledger_core::Adjustment;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;

#[derive(Debug, Clone)]
pub struct AdjustmentRepository {
    pool: SqlitePool,
}

impl AdjustmentRepository {
    /// Creates a new AdjustmentRepository.
    pub fn new(pool: SqlitePool) -> Self {
        AdjustmentRepository { pool }
    }

    /// Adjustments against one batch, oldest first.
    pub async fn list_for_batch(&self, batch_id: &str) -> DbResult<Vec<Adjustment>> {
        let adjustments = sqlx::query_as::<_, Adjustment>(
            r#"
            SELECT id, batch_id, delta, reason, note, actor, balance_after, created_at
            FROM adjustments
            WHERE batch_id = ?1
            ORDER BY rowid
            "#,
        )
        .bind(batch_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(adjustments)
    }
}

pub(crate) async fn insert(conn: &mut SqliteConnection, adjustment: &Adjustment) -> DbResult<()> {
    debug!(id = %adjustment.id, batch_id = %adjustment.batch_id, delta = adjustment.delta, "Inserting adjustment");

    sqlx::query(
        r#"
        INSERT INTO adjustments (id, batch_id, delta, reason, note, actor, balance_after, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&adjustment.id)
    .bind(&adjustment.batch_id)
    .bind(adjustment.delta)
    .bind(adjustment.reason)
    .bind(&adjustment.note)
    .bind(&adjustment.actor)
    .bind(adjustment.balance_after)
    .bind(adjustment.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}
