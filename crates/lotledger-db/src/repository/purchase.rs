//! # Purchase Repository
//!
//! Goods receipts from vendors. Each line points at the batch it created
//! or replenished.

use lotledger_core::{Purchase, PurchaseLine};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;

/// Repository for purchase reads.
#[derive(Debug, Clone)]
pub struct PurchaseRepository {
    pool: SqlitePool,
}

impl PurchaseRepository {
    /// Creates a new PurchaseRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PurchaseRepository { pool }
    }

    /// Gets a purchase by ID.
    pub async fn get(&self, id: &str) -> DbResult<Option<Purchase>> {
        let purchase = sqlx::query_as::<_, Purchase>(
            r#"
            SELECT id, vendor_id, vendor_invoice_ref, actor, total_cost_cents, created_at
            FROM purchases
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(purchase)
    }

    /// Lines of a purchase in receipt order.
    pub async fn lines(&self, purchase_id: &str) -> DbResult<Vec<PurchaseLine>> {
        let lines = sqlx::query_as::<_, PurchaseLine>(
            r#"
            SELECT id, purchase_id, batch_id, quantity, unit_cost_cents, created_at
            FROM purchase_lines
            WHERE purchase_id = ?1
            ORDER BY rowid
            "#,
        )
        .bind(purchase_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(lines)
    }
}

pub(crate) async fn insert_purchase(conn: &mut SqliteConnection, purchase: &Purchase) -> DbResult<()> {
    debug!(id = %purchase.id, vendor_id = %purchase.vendor_id, "Inserting purchase");

    sqlx::query(
        r#"
        INSERT INTO purchases (id, vendor_id, vendor_invoice_ref, actor, total_cost_cents, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(&purchase.id)
    .bind(&purchase.vendor_id)
    .bind(&purchase.vendor_invoice_ref)
    .bind(&purchase.actor)
    .bind(purchase.total_cost_cents)
    .bind(purchase.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub(crate) async fn insert_line(conn: &mut SqliteConnection, line: &PurchaseLine) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO purchase_lines (id, purchase_id, batch_id, quantity, unit_cost_cents, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(&line.id)
    .bind(&line.purchase_id)
    .bind(&line.batch_id)
    .bind(line.quantity)
    .bind(line.unit_cost_cents)
    .bind(line.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}
