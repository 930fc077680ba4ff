//! # lotledger-db: Storage and Transactions for LotLedger
//!
//! SQLite persistence for batches, the stock ledger, sales, returns,
//! purchases, adjustments, invoice sequences and the audit log, plus the
//! [`Ledger`] coordinator that turns each business event into one
//! transaction.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        LotLedger Data Flow                              │
//! │                                                                         │
//! │  Request layer (SaleRequest, PurchaseRequest, ...)                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐    │
//! │  │                   lotledger-db (THIS CRATE)                     │    │
//! │  │                                                                 │    │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐    │    │
//! │  │   │    Ledger     │    │  Repositories │    │  Migrations  │    │    │
//! │  │   │ (coordinator) │───►│ batch, ledger │    │  (embedded)  │    │    │
//! │  │   │ retry + tx    │    │ sale, audit   │    │ 001_initial  │    │    │
//! │  │   └───────┬───────┘    └───────┬───────┘    └──────────────┘    │    │
//! │  │           │                    │                                │    │
//! │  │           ▼                    ▼                                │    │
//! │  │   lotledger-core        Database (pool.rs)                      │    │
//! │  │   FEFO, money, ledger   SqlitePool, WAL, busy_timeout           │    │
//! │  └─────────────────────────────────────────────────────────────────┘    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐    │
//! │  │                     SQLite Database                             │    │
//! │  └─────────────────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`config`] - `lotledger.toml` plus `LOTLEDGER_*` overrides
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Table access; writes are crate-private
//! - [`coordinator`] - `Ledger`, the only writer
//!
//! ## Usage
//!
//! ```rust,ignore
//! use lotledger_db::{Database, LedgerConfig};
//!
//! let config = LedgerConfig::load(None)?;
//! let db = Database::new(config.db_config()).await?;
//! let ledger = db.ledger(&config);
//!
//! let receipt = ledger.submit_sale(request).await?;
//! println!("{}", receipt.bill_number);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod coordinator;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{DatabaseSettings, LedgerConfig, LedgerSettings};
pub use coordinator::Ledger;
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::{
    AdjustmentRepository, AuditRepository, BatchRepository, LedgerRepository,
    PurchaseRepository, ReturnRepository, SaleRepository, SequenceRepository,
};
