//! # Invoice Numbers
//!
//! Fiscal-year keys and bill number formatting. The counter itself lives in
//! `lotledger-db` (one row per fiscal-year key).
//!
//! ## Format
//! ```text
//!   INV-2024-25-000042
//!   ─┬─ ───┬─── ───┬──
//!    │     │       └── sequence, zero-padded, restarts each fiscal year
//!    │     └────────── fiscal-year key (April start → "2024-25")
//!    └──────────────── configurable prefix
//! ```

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::INVOICE_NUMBER_WIDTH;

// =============================================================================
// Fiscal Year
// =============================================================================

/// Accounting year under which bill numbers are scoped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct FiscalYear {
    /// Calendar year the fiscal year starts in.
    pub start_year: i32,
    /// First month of the fiscal year (1-12).
    pub start_month: u32,
}

impl FiscalYear {
    /// Fiscal year that contains `date`.
    ///
    /// ```rust
    /// use chrono::NaiveDate;
    /// use lotledger_core::invoice::FiscalYear;
    ///
    /// let march = NaiveDate::from_ymd_opt(2025, 3, 31).unwrap();
    /// assert_eq!(FiscalYear::containing(march, 4).key(), "2024-25");
    ///
    /// let april = NaiveDate::from_ymd_opt(2025, 4, 1).unwrap();
    /// assert_eq!(FiscalYear::containing(april, 4).key(), "2025-26");
    /// ```
    pub fn containing(date: NaiveDate, start_month: u32) -> Self {
        let start_month = start_month.clamp(1, 12);
        let start_year = if date.month() >= start_month {
            date.year()
        } else {
            date.year() - 1
        };
        FiscalYear {
            start_year,
            start_month,
        }
    }

    /// Counter key: `"2024"` for calendar years, `"2024-25"` otherwise.
    pub fn key(&self) -> String {
        if self.start_month == 1 {
            self.start_year.to_string()
        } else {
            format!(
                "{}-{:02}",
                self.start_year,
                (self.start_year + 1).rem_euclid(100)
            )
        }
    }
}

impl fmt::Display for FiscalYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

// =============================================================================
// Invoice Number
// =============================================================================

/// A bill number issued from a fiscal-year counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InvoiceNumber {
    pub prefix: String,
    pub fiscal_year: String,
    pub sequence: i64,
}

impl InvoiceNumber {
    pub fn new(prefix: impl Into<String>, fiscal_year: impl Into<String>, sequence: i64) -> Self {
        InvoiceNumber {
            prefix: prefix.into(),
            fiscal_year: fiscal_year.into(),
            sequence,
        }
    }
}

impl fmt::Display for InvoiceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{:0width$}",
            self.prefix,
            self.fiscal_year,
            self.sequence,
            width = INVOICE_NUMBER_WIDTH
        )
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
