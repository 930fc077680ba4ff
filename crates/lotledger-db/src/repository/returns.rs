//! # Return Repository
//!
//! Customer returns. Each return line credits the batch its sale line
//! debited; the running total per sale line caps what can come back.

use lotledger_core::{ReturnLine, SaleReturn};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;

/// Repository for return reads.
#[derive(Debug, Clone)]
pub struct ReturnRepository {
    pool: SqlitePool,
}

impl ReturnRepository {
    /// Creates a new ReturnRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ReturnRepository { pool }
    }

    /// Gets a return by ID.
    pub async fn get(&self, id: &str) -> DbResult<Option<SaleReturn>> {
        let ret = sqlx::query_as::<_, SaleReturn>(
            r#"
            SELECT id, sale_id, actor, reason, refund_cents, created_at
            FROM returns
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(ret)
    }

    /// Lines of a return.
    pub async fn lines(&self, return_id: &str) -> DbResult<Vec<ReturnLine>> {
        let lines = sqlx::query_as::<_, ReturnLine>(
            r#"
            SELECT id, return_id, sale_line_id, batch_id, quantity,
                   unit_price_cents, refund_cents, created_at
            FROM return_lines
            WHERE return_id = ?1
            ORDER BY created_at, id
            "#,
        )
        .bind(return_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(lines)
    }

    /// Quantity already returned against a sale line.
    pub async fn returned_quantity(&self, sale_line_id: &str) -> DbResult<i64> {
        let mut conn = self.pool.acquire().await?;
        returned_quantity_in(&mut conn, sale_line_id).await
    }
}

pub(crate) async fn returned_quantity_in(
    conn: &mut SqliteConnection,
    sale_line_id: &str,
) -> DbResult<i64> {
    let returned: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(quantity), 0) FROM return_lines WHERE sale_line_id = ?1",
    )
    .bind(sale_line_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(returned)
}

pub(crate) async fn insert_return(conn: &mut SqliteConnection, ret: &SaleReturn) -> DbResult<()> {
    debug!(id = %ret.id, sale_id = %ret.sale_id, "Inserting return");

    sqlx::query(
        r#"
        INSERT INTO returns (id, sale_id, actor, reason, refund_cents, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(&ret.id)
    .bind(&ret.sale_id)
    .bind(&ret.actor)
    .bind(&ret.reason)
    .bind(ret.refund_cents)
    .bind(ret.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub(crate) async fn insert_line(conn: &mut SqliteConnection, line: &ReturnLine) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO return_lines (
            id, return_id, sale_line_id, batch_id, quantity,
            unit_price_cents, refund_cents, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&line.id)
    .bind(&line.return_id)
    .bind(&line.sale_line_id)
    .bind(&line.batch_id)
    .bind(line.quantity)
    .bind(line.unit_price_cents)
    .bind(line.refund_cents)
    .bind(line.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}
