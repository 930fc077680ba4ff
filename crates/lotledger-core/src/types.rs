//! # Domain Types
//!
//! Records persisted by the ledger.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐        ┌─────────────────┐                         │
//! │  │     Batch       │ 1    * │  LedgerEntry    │  append-only            │
//! │  │  ─────────────  │◄───────│  ─────────────  │                         │
//! │  │  lot_code       │        │  delta (signed) │                         │
//! │  │  exp_date       │        │  balance_after  │                         │
//! │  │  mrp_cents      │        │  entry_type     │                         │
//! │  │  qty_available  │        └─────────────────┘                         │
//! │  └───────▲─────────┘                                                    │
//! │          │ batch_id                                                     │
//! │  ┌───────┴─────┐  ┌──────────────┐  ┌─────────────┐  ┌──────────────┐   │
//! │  │  SaleLine   │  │  ReturnLine  │  │PurchaseLine │  │  Adjustment  │   │
//! │  └─────────────┘  └──────────────┘  └─────────────┘  └──────────────┘   │
//! │                                                                         │
//! │  AuditRecord: who / when / before / after, write-once                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Identity
//! Every record has a UUID v4 `id` used for relations. Append-ordered tables
//! (batches, ledger) also carry an integer sequence that fixes receipt /
//! write order.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::money::Money;

/// Generates a new record ID.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// 1200 bps = 12% GST.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Zero tax rate (exempt goods).
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

// =============================================================================
// Tax Mode
// =============================================================================

/// Whether selling prices include tax.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum TaxMode {
    /// Price includes tax; MRP-labelled goods are sold this way.
    #[default]
    Inclusive,
    /// Tax is added on top of the price.
    Exclusive,
}

// =============================================================================
// Batch
// =============================================================================

/// A received lot of one product.
///
/// `quantity_available` is only ever changed together with a ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Batch {
    /// Receipt order; breaks expiry ties in FEFO.
    pub receipt_seq: i64,
    pub id: String,
    pub product_id: String,
    /// Manufacturer's lot code, unique per product.
    pub lot_code: String,
    #[ts(as = "String")]
    pub mfg_date: NaiveDate,
    #[ts(as = "String")]
    pub exp_date: NaiveDate,
    pub unit_cost_cents: i64,
    /// Maximum retail price per unit, tax inclusive.
    pub mrp_cents: i64,
    pub quantity_available: i64,
    pub storage_location: Option<String>,
    pub is_active: bool,
    pub vendor_id: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Batch {
    /// Expired on `today` (expiry day itself counts as expired).
    #[inline]
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.exp_date <= today
    }

    /// Can be drawn from by a sale.
    pub fn is_sellable(&self, today: NaiveDate) -> bool {
        self.is_active && self.quantity_available > 0 && !self.is_expired(today)
    }

    /// Empty and expired: nothing left to sell or write off.
    pub fn is_exhausted(&self, today: NaiveDate) -> bool {
        self.quantity_available == 0 && self.is_expired(today)
    }

    #[inline]
    pub fn mrp(&self) -> Money {
        Money::from_cents(self.mrp_cents)
    }
}

// =============================================================================
// Ledger Entry
// =============================================================================

/// Cause of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum LedgerEntryType {
    Purchase,
    Sale,
    Return,
    Adjustment,
}

impl LedgerEntryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerEntryType::Purchase => "purchase",
            LedgerEntryType::Sale => "sale",
            LedgerEntryType::Return => "return",
            LedgerEntryType::Adjustment => "adjustment",
        }
    }
}

/// One signed quantity change to one batch. Never updated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct LedgerEntry {
    /// Global append order.
    pub seq: i64,
    pub id: String,
    pub batch_id: String,
    pub entry_type: LedgerEntryType,
    /// Originating document line (sale line, purchase line, ...).
    pub reference_id: String,
    pub delta: i64,
    pub balance_after: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Sale
// =============================================================================

/// A completed sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Sale {
    pub id: String,
    /// Formatted bill number, e.g. `INV-2024-25-000042`.
    pub bill_number: String,
    pub fiscal_year: String,
    pub sequence_number: i64,
    pub customer_ref: Option<String>,
    pub actor: String,
    pub taxable_cents: i64,
    pub cgst_cents: i64,
    pub sgst_cents: i64,
    pub total_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// One batch-level allocation of a sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleLine {
    pub id: String,
    pub sale_id: String,
    pub line_no: i64,
    pub product_id: String,
    pub batch_id: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    /// Batch MRP at the time of sale (frozen).
    pub mrp_cents: i64,
    pub tax_rate_bps: i64,
    pub taxable_cents: i64,
    pub cgst_cents: i64,
    pub sgst_cents: i64,
    pub total_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl SaleLine {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }
}

// =============================================================================
// Return
// =============================================================================

/// A customer return against one sale line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleReturn {
    pub id: String,
    pub sale_id: String,
    pub actor: String,
    pub reason: String,
    pub refund_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Quantity credited back to the batch the sale line debited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ReturnLine {
    pub id: String,
    pub return_id: String,
    pub sale_line_id: String,
    pub batch_id: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub refund_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Purchase
// =============================================================================

/// A goods receipt from a vendor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Purchase {
    pub id: String,
    pub vendor_id: String,
    pub vendor_invoice_ref: Option<String>,
    pub actor: String,
    pub total_cost_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct PurchaseLine {
    pub id: String,
    pub purchase_id: String,
    pub batch_id: String,
    pub quantity: i64,
    pub unit_cost_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Adjustment
// =============================================================================

/// Why stock was corrected by hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentReason {
    Damage,
    ExpiryWriteOff,
    Theft,
    Correction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Adjustment {
    pub id: String,
    pub batch_id: String,
    pub delta: i64,
    pub reason: AdjustmentReason,
    pub note: Option<String>,
    pub actor: String,
    pub balance_after: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Audit
// =============================================================================

/// What happened to an audited entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    SaleCompleted,
    PurchaseReceived,
    ReturnAccepted,
    StockAdjusted,
    BatchDeactivated,
}

/// Write-once history entry. `before_state` / `after_state` hold JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct AuditRecord {
    pub seq: i64,
    pub id: String,
    pub actor: String,
    pub action: AuditAction,
    pub entity_type: String,
    pub entity_id: String,
    pub before_state: Option<String>,
    pub after_state: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================
