//! # Sale Repository
//!
//! Sales and their batch-level lines.
//!
//! ## Sale Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  sales        INV-2024-25-000042   taxable / cgst / sgst / total        │
//! │   └── sale_lines                                                        │
//! │        line 1  PARA-500  batch X1  qty 10  @ 85.00  (mrp 90.00 frozen)  │
//! │        line 2  PARA-500  batch X2  qty  5  @ 85.00                      │
//! │                                                                         │
//! │  One request line becomes one sale line per batch it drew from.         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Rows are written once by the coordinator and never updated.

use lotledger_core::{Sale, SaleLine};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};

macro_rules! select_lines {
    ($rest:literal) => {
        concat!(
            r#"
            SELECT id, sale_id, line_no, product_id, batch_id, quantity,
                   unit_price_cents, mrp_cents, tax_rate_bps,
                   taxable_cents, cgst_cents, sgst_cents, total_cents, created_at
            FROM sale_lines
            "#,
            $rest
        )
    };
}

macro_rules! select_sales {
    ($rest:literal) => {
        concat!(
            r#"
            SELECT id, bill_number, fiscal_year, sequence_number, customer_ref, actor,
                   taxable_cents, cgst_cents, sgst_cents, total_cents, created_at
            FROM sales
            "#,
            $rest
        )
    };
}

/// Repository for sale reads.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Gets a sale by ID.
    pub async fn get(&self, id: &str) -> DbResult<Option<Sale>> {
        let sale = sqlx::query_as::<_, Sale>(select_sales!("WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(sale)
    }

    /// Gets a sale by its bill number.
    pub async fn get_by_bill_number(&self, bill_number: &str) -> DbResult<Option<Sale>> {
        let sale = sqlx::query_as::<_, Sale>(select_sales!("WHERE bill_number = ?1"))
            .bind(bill_number)
            .fetch_optional(&self.pool)
            .await?;

        Ok(sale)
    }

    /// Sales of one fiscal year in bill order.
    pub async fn list_for_fiscal_year(&self, fiscal_year: &str) -> DbResult<Vec<Sale>> {
        let sales = sqlx::query_as::<_, Sale>(select_sales!(
            "WHERE fiscal_year = ?1 ORDER BY sequence_number"
        ))
        .bind(fiscal_year)
        .fetch_all(&self.pool)
        .await?;

        Ok(sales)
    }

    /// Lines of a sale in line order.
    pub async fn lines(&self, sale_id: &str) -> DbResult<Vec<SaleLine>> {
        let lines = sqlx::query_as::<_, SaleLine>(select_lines!(
            "WHERE sale_id = ?1 ORDER BY line_no"
        ))
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(lines)
    }

    /// Gets one sale line.
    pub async fn get_line(&self, id: &str) -> DbResult<Option<SaleLine>> {
        let mut conn = self.pool.acquire().await?;
        fetch_line(&mut conn, id).await
    }
}

// =============================================================================
// Transaction-scoped operations (coordinator only)
// =============================================================================

pub(crate) async fn fetch_line(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<SaleLine>> {
    let line = sqlx::query_as::<_, SaleLine>(select_lines!("WHERE id = ?1"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(line)
}

/// Inserts the sale header.
///
/// A UNIQUE failure on the bill number means the counter issued a number
/// twice and surfaces as `DuplicateSequenceNumber`.
pub(crate) async fn insert_sale(conn: &mut SqliteConnection, sale: &Sale) -> DbResult<()> {
    debug!(id = %sale.id, bill_number = %sale.bill_number, "Inserting sale");

    sqlx::query(
        r#"
        INSERT INTO sales (
            id, bill_number, fiscal_year, sequence_number, customer_ref, actor,
            taxable_cents, cgst_cents, sgst_cents, total_cents, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        "#,
    )
    .bind(&sale.id)
    .bind(&sale.bill_number)
    .bind(&sale.fiscal_year)
    .bind(sale.sequence_number)
    .bind(&sale.customer_ref)
    .bind(&sale.actor)
    .bind(sale.taxable_cents)
    .bind(sale.cgst_cents)
    .bind(sale.sgst_cents)
    .bind(sale.total_cents)
    .bind(sale.created_at)
    .execute(&mut *conn)
    .await
    .map_err(|e| match DbError::from(e) {
        DbError::UniqueViolation { field, .. }
            if field.contains("bill_number") || field.contains("sequence_number") =>
        {
            DbError::DuplicateSequenceNumber {
                bill_number: sale.bill_number.clone(),
            }
        }
        other => other,
    })?;

    Ok(())
}

/// Snapshot pattern: price, MRP and tax are copied onto the line so the
/// bill reads the same after the batch changes.
pub(crate) async fn insert_line(conn: &mut SqliteConnection, line: &SaleLine) -> DbResult<()> {
    debug!(sale_id = %line.sale_id, batch_id = %line.batch_id, quantity = line.quantity, "Inserting sale line");

    sqlx::query(
        r#"
        INSERT INTO sale_lines (
            id, sale_id, line_no, product_id, batch_id, quantity,
            unit_price_cents, mrp_cents, tax_rate_bps,
            taxable_cents, cgst_cents, sgst_cents, total_cents, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
        "#,
    )
    .bind(&line.id)
    .bind(&line.sale_id)
    .bind(line.line_no)
    .bind(&line.product_id)
    .bind(&line.batch_id)
    .bind(line.quantity)
    .bind(line.unit_price_cents)
    .bind(line.mrp_cents)
    .bind(line.tax_rate_bps)
    .bind(line.taxable_cents)
    .bind(line.cgst_cents)
    .bind(line.sgst_cents)
    .bind(line.total_cents)
    .bind(line.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}
