//! Shared fixtures for the ledger integration tests.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;
use lotledger_core::{
    FixedClock, PurchaseLineRequest, PurchaseRequest, SaleLineRequest, SaleRequest,
};
use lotledger_db::{Database, DbConfig, Ledger, LedgerConfig};

pub const ACTOR: &str = "cashier-1";
pub const PRODUCT: &str = "PARACETAMOL-500";
pub const MRP: i64 = 90;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Business date all scenarios run on.
pub fn today() -> NaiveDate {
    date(2023, 12, 1)
}

/// In-memory ledger frozen on [`today`].
pub async fn memory_ledger() -> Ledger {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    db.ledger(&LedgerConfig::default())
        .with_clock(Arc::new(FixedClock::on(today())))
}

/// File-backed ledger with a real multi-connection pool.
pub async fn file_ledger(path: &Path) -> Ledger {
    let config = DbConfig::new(path).max_connections(4);
    let db = Database::new(config).await.unwrap();
    db.ledger(&LedgerConfig::default())
        .with_clock(Arc::new(FixedClock::on(today())))
}

pub fn lot(lot_code: &str, exp_date: NaiveDate, quantity: i64) -> PurchaseLineRequest {
    lot_of(PRODUCT, lot_code, exp_date, quantity)
}

pub fn lot_of(product_id: &str, lot_code: &str, exp_date: NaiveDate, quantity: i64) -> PurchaseLineRequest {
    PurchaseLineRequest {
        product_id: product_id.to_string(),
        lot_code: lot_code.to_string(),
        mfg_date: date(2023, 1, 1),
        exp_date,
        unit_cost_cents: 40,
        mrp_cents: MRP,
        quantity,
        storage_location: None,
    }
}

pub fn purchase(lines: Vec<PurchaseLineRequest>) -> PurchaseRequest {
    PurchaseRequest {
        vendor_id: "VENDOR-1".to_string(),
        vendor_invoice_ref: Some("VB-100".to_string()),
        lines,
        actor: ACTOR.to_string(),
    }
}

/// Receives the lots and returns the batch ID of each, in order.
pub async fn receive(ledger: &Ledger, lines: Vec<PurchaseLineRequest>) -> Vec<String> {
    ledger.submit_purchase(purchase(lines)).await.unwrap().batch_ids
}

/// Receives the scenario pair: X1 (exp 2024-01-01, 10) and X2 (exp 2024-06-01, 20).
pub async fn receive_x1_x2(ledger: &Ledger) -> (String, String) {
    let ids = receive(
        ledger,
        vec![
            lot("X1", date(2024, 1, 1), 10),
            lot("X2", date(2024, 6, 1), 20),
        ],
    )
    .await;
    (ids[0].clone(), ids[1].clone())
}

pub fn sale(quantity: i64, unit_price_cents: i64) -> SaleRequest {
    SaleRequest {
        lines: vec![SaleLineRequest {
            product_id: PRODUCT.to_string(),
            quantity,
            unit_price_cents,
            tax_rate_bps: 1200,
        }],
        customer_ref: None,
        actor: ACTOR.to_string(),
    }
}

pub async fn quantity(ledger: &Ledger, batch_id: &str) -> i64 {
    ledger
        .database()
        .batches()
        .get(batch_id)
        .await
        .unwrap()
        .unwrap()
        .quantity_available
}
