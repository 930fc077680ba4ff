//! # Demo Data Seeder
//!
//! Receives a few lots into a database and rings up one sale against them,
//! so a fresh install has something to look at.
//!
//! ## Usage
//! ```bash
//! # Seed using lotledger.toml / LOTLEDGER_* settings
//! cargo run -p lotledger-db --bin seed
//!
//! # Specify database path
//! cargo run -p lotledger-db --bin seed -- --db ./data/lotledger.db
//!
//! # Specify config file
//! cargo run -p lotledger-db --bin seed -- --config ./lotledger.toml
//! ```
//!
//! ## Generated Data
//! - One purchase from `VENDOR-DEMO` with three lots per product,
//!   expiring 30, 90 and 365 days out
//! - One sale large enough to span two lots of the first product

use std::env;
use std::path::PathBuf;

use chrono::{Duration, NaiveDate, Utc};
use lotledger_core::{PurchaseLineRequest, PurchaseRequest, SaleLineRequest, SaleRequest};
use lotledger_db::{Database, LedgerConfig};
use tracing_subscriber::EnvFilter;

/// (product id, lot prefix, unit cost, MRP, GST bps)
const PRODUCTS: &[(&str, &str, i64, i64, u32)] = &[
    ("PARACETAMOL-500", "PCM", 120, 250, 1200),
    ("ORS-SACHET", "ORS", 1500, 2100, 500),
    ("VITAMIN-C-TAB", "VTC", 800, 1450, 1200),
];

/// Days to expiry for each lot of a product.
const LOT_SHELF_LIFE_DAYS: &[i64] = &[30, 90, 365];

const LOT_QUANTITY: i64 = 40;
const SEED_ACTOR: &str = "seed";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,lotledger_db=debug,sqlx=warn")),
        )
        .init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut db_path: Option<PathBuf> = None;
    let mut config_path: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("LotLedger Demo Seeder");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>        Database file path (overrides config)");
                println!("  -c, --config <PATH>    Config file path (default: platform config dir)");
                println!("  -h, --help             Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    let mut config = LedgerConfig::load(config_path)?;
    if let Some(path) = db_path {
        config.database.path = path;
    }

    println!("🌱 LotLedger Demo Seeder");
    println!("========================");
    println!("Database: {}", config.database.path.display());
    println!();

    let db = Database::new(config.db_config()).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.batches().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} batches", existing);
        println!("  Skipping seed to avoid duplicate lots.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let ledger = db.ledger(&config);
    let today = Utc::now().date_naive();

    // Receive stock
    let purchase = ledger.submit_purchase(demo_purchase(today)).await?;
    println!(
        "✓ Received purchase {} ({} batches)",
        purchase.purchase_id,
        purchase.batch_ids.len()
    );

    // Sell across two lots of the first product
    let (product_id, _, _, mrp, tax_bps) = PRODUCTS[0];
    let sale = ledger
        .submit_sale(SaleRequest {
            lines: vec![SaleLineRequest {
                product_id: product_id.to_string(),
                quantity: LOT_QUANTITY + 5,
                unit_price_cents: mrp,
                tax_rate_bps: tax_bps,
            }],
            customer_ref: None,
            actor: SEED_ACTOR.to_string(),
        })
        .await?;

    println!();
    println!("✓ Sale {} total {}", sale.bill_number, lotledger_core::Money::from_cents(sale.total_cents));
    for line in &sale.lines {
        println!("    batch {}  qty {}", line.batch_id, line.quantity);
    }

    // Verify ledger
    println!();
    println!("Reconciling batches...");
    let reports = ledger.reconcile_all().await?;
    let inconsistent = reports.iter().filter(|r| !r.is_consistent()).count();
    println!("  {} batches, {} inconsistent", reports.len(), inconsistent);

    println!();
    println!("✅ Seed complete!");

    db.close().await;
    Ok(())
}

fn demo_purchase(today: NaiveDate) -> PurchaseRequest {
    let mfg_date = today - Duration::days(60);

    let lines = PRODUCTS
        .iter()
        .flat_map(|&(product_id, prefix, cost, mrp, _)| {
            LOT_SHELF_LIFE_DAYS
                .iter()
                .enumerate()
                .map(move |(n, days)| PurchaseLineRequest {
                    product_id: product_id.to_string(),
                    lot_code: format!("{}-{:03}", prefix, n + 1),
                    mfg_date,
                    exp_date: today + Duration::days(*days),
                    unit_cost_cents: cost,
                    mrp_cents: mrp,
                    quantity: LOT_QUANTITY,
                    storage_location: Some(format!("RACK-{}", n + 1)),
                })
        })
        .collect();

    PurchaseRequest {
        vendor_id: "VENDOR-DEMO".to_string(),
        vendor_invoice_ref: Some("DEMO-0001".to_string()),
        lines,
        actor: SEED_ACTOR.to_string(),
    }
}
