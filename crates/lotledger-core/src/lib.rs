//! # lotledger-core: Pure Business Logic for LotLedger
//!
//! Domain rules for an expiry-dated, lot-tracked retail stock ledger. Every
//! function here is deterministic and free of I/O; `lotledger-db` wraps them
//! in transactions.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        LotLedger Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │          Request layer (HTTP / RPC, outside workspace)          │   │
//! │  │   submit_sale, submit_purchase, submit_return, submit_adjustment│   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │        lotledger-db: Ledger (transaction coordinator)           │   │
//! │  │   repositories ── one SQLite transaction per business event     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ pure calls                             │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ lotledger-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │  ┌────────────┐ ┌──────────┐ ┌──────────┐ ┌────────────────┐    │   │
//! │  │  │ allocation │ │  ledger  │ │  money   │ │    invoice     │    │   │
//! │  │  │   FEFO     │ │ balances │ │ tax/GST  │ │ fiscal years   │    │   │
//! │  │  └────────────┘ └──────────┘ └──────────┘ └────────────────┘    │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain records (Batch, LedgerEntry, Sale, ...)
//! - [`request`] - Operation inputs and receipts
//! - [`allocation`] - First-expired, first-out batch selection
//! - [`ledger`] - Balance arithmetic and history replay
//! - [`invoice`] - Fiscal years and bill numbers
//! - [`money`] - Integer money and tax breakdowns
//! - [`clock`] - Injectable source of "now"
//! - [`validation`] - Input validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use lotledger_core::money::Money;
//! use lotledger_core::types::{TaxMode, TaxRate};
//!
//! // MRP-style pricing: the price already contains 12% GST.
//! let gross = Money::from_cents(11200);
//! let tax = gross.tax_breakdown(TaxRate::from_bps(1200), TaxMode::Inclusive);
//!
//! assert_eq!(tax.taxable.cents(), 10000);
//! assert_eq!(tax.cgst.cents() + tax.sgst.cents(), 1200);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod allocation;
pub mod clock;
pub mod error;
pub mod invoice;
pub mod ledger;
pub mod money;
pub mod request;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use allocation::{allocate_fefo, Allocation};
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{CoreError, CoreResult, ValidationError};
pub use invoice::{FiscalYear, InvoiceNumber};
pub use money::{Money, TaxBreakdown};
pub use request::*;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum quantity on a single request line.
///
/// Guards against keying errors (1000 instead of 10) on the till.
pub const MAX_LINE_QUANTITY: i64 = 100_000;

/// Maximum unit price, cost or MRP in cents (1 crore rupees).
///
/// With `MAX_LINE_QUANTITY` and `MAX_REQUEST_LINES` this keeps every
/// document total well inside `i64`.
pub const MAX_PRICE_CENTS: i64 = 1_000_000_000;

/// Maximum number of lines in one sale or purchase request.
pub const MAX_REQUEST_LINES: usize = 200;

/// Default prefix for bill numbers (`INV-2024-25-000001`).
pub const DEFAULT_INVOICE_PREFIX: &str = "INV";

/// Width the sequence part of a bill number is zero-padded to.
pub const INVOICE_NUMBER_WIDTH: usize = 6;
