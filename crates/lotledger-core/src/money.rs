//! # Money Module
//!
//! Integer money and GST breakdowns.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌                                  │
//! │                                                                         │
//! │  OUR SOLUTION: smallest currency unit (paise / cents) in an i64         │
//! │    Refund = quantity × original unit price, exact to the paisa          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Tax Breakdown
//! ```text
//!   Inclusive (MRP)            Exclusive
//!   gross = 112.00             gross = 100.00
//!   taxable = gross/1.12       taxable = gross
//!         = 100.00             tax = 12.00
//!   tax = 12.00                total = 112.00
//!   cgst = 6.00, sgst = 6.00   cgst = 6.00, sgst = 6.00
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub};
use ts_rs::TS;

use crate::types::{TaxMode, TaxRate};

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit.
///
/// Signed so refunds and reversals can be represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    ///
    /// ```rust
    /// use lotledger_core::money::Money;
    ///
    /// let mrp = Money::from_cents(9000);
    /// assert_eq!(mrp.cents(), 9000);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies a unit amount by a quantity.
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Tax on top of this amount, rounded half up.
    ///
    /// `(amount * bps + 5000) / 10000` in i128 so large amounts cannot
    /// overflow.
    pub fn calculate_tax(&self, rate: TaxRate) -> Money {
        let tax_cents = (self.0 as i128 * rate.bps() as i128 + 5000) / 10000;
        Money::from_cents(tax_cents as i64)
    }

    /// Taxable value contained in a tax-inclusive amount, rounded half up.
    ///
    /// ```rust
    /// use lotledger_core::money::Money;
    /// use lotledger_core::types::TaxRate;
    ///
    /// let gross = Money::from_cents(10500);
    /// assert_eq!(gross.taxable_portion(TaxRate::from_bps(500)).cents(), 10000);
    /// ```
    pub fn taxable_portion(&self, rate: TaxRate) -> Money {
        let divisor = 10000_i128 + rate.bps() as i128;
        let scaled = self.0 as i128 * 10000;
        let taxable = (scaled + divisor / 2) / divisor;
        Money::from_cents(taxable as i64)
    }

    /// Splits a line amount into taxable value and CGST/SGST halves.
    ///
    /// An odd paisa of tax goes to SGST so `cgst + sgst == tax` always.
    pub fn tax_breakdown(&self, rate: TaxRate, mode: TaxMode) -> TaxBreakdown {
        let (taxable, tax) = match mode {
            TaxMode::Inclusive => {
                let taxable = self.taxable_portion(rate);
                (taxable, *self - taxable)
            }
            TaxMode::Exclusive => (*self, self.calculate_tax(rate)),
        };

        let cgst = Money::from_cents(tax.cents() / 2);
        TaxBreakdown {
            taxable,
            cgst,
            sgst: tax - cgst,
        }
    }
}

// =============================================================================
// Tax Breakdown
// =============================================================================

/// Taxable value and its two GST components.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxBreakdown {
    pub taxable: Money,
    pub cgst: Money,
    pub sgst: Money,
}

impl TaxBreakdown {
    #[inline]
    pub fn tax(&self) -> Money {
        self.cgst + self.sgst
    }

    /// Amount the customer pays for the line.
    #[inline]
    pub fn total(&self) -> Money {
        self.taxable + self.tax()
    }
}

impl Add for TaxBreakdown {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        TaxBreakdown {
            taxable: self.taxable + other.taxable,
            cgst: self.cgst + other.cgst,
            sgst: self.sgst + other.sgst,
        }
    }
}

impl AddAssign for TaxBreakdown {
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Two decimal places, no currency symbol; formatting for receipts belongs
/// to the presentation layer.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, (self.0 / 100).abs(), (self.0 % 100).abs())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(1099).to_string(), "10.99");
        assert_eq!(Money::from_cents(500).to_string(), "5.00");
        assert_eq!(Money::from_cents(-550).to_string(), "-5.50");
        assert_eq!(Money::zero().to_string(), "0.00");
    }

    #[test]
    fn test_arithmetic_and_sum() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);
        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!((a * 3).cents(), 3000);

        let total: Money = vec![a, b, b].into_iter().sum();
        assert_eq!(total.cents(), 2000);
    }

    #[test]
    fn test_exclusive_breakdown() {
        let gross = Money::from_cents(10000);
        let tax = gross.tax_breakdown(TaxRate::from_bps(1200), TaxMode::Exclusive);
        assert_eq!(tax.taxable.cents(), 10000);
        assert_eq!(tax.cgst.cents(), 600);
        assert_eq!(tax.sgst.cents(), 600);
        assert_eq!(tax.total().cents(), 11200);
    }

    #[test]
    fn test_inclusive_breakdown_keeps_total_equal_to_gross() {
        // 99.99 at 5%: taxable 95.23, tax 4.76
        let gross = Money::from_cents(9999);
        let tax = gross.tax_breakdown(TaxRate::from_bps(500), TaxMode::Inclusive);
        assert_eq!(tax.taxable.cents(), 9523);
        assert_eq!(tax.tax().cents(), 476);
        assert_eq!(tax.total(), gross);
    }

    #[test]
    fn test_odd_tax_paisa_goes_to_sgst() {
        let gross = Money::from_cents(1000);
        let tax = gross.tax_breakdown(TaxRate::from_bps(1800), TaxMode::Exclusive);
        assert_eq!(tax.cgst.cents(), 90);
        assert_eq!(tax.sgst.cents(), 90);
        let odd = Money::from_cents(1050).tax_breakdown(TaxRate::from_bps(1800), TaxMode::Exclusive);
        // 189 tax
        assert_eq!(odd.cgst.cents(), 94);
        assert_eq!(odd.sgst.cents(), 95);
    }

    #[test]
    fn test_zero_rate_has_no_tax() {
        let gross = Money::from_cents(4321);
        let tax = gross.tax_breakdown(TaxRate::zero(), TaxMode::Inclusive);
        assert_eq!(tax.taxable, gross);
        assert!(tax.tax().is_zero());
    }

    #[test]
    fn test_breakdowns_accumulate() {
        let mut total = TaxBreakdown::default();
        total += Money::from_cents(10000).tax_breakdown(TaxRate::from_bps(1200), TaxMode::Exclusive);
        total += Money::from_cents(5000).tax_breakdown(TaxRate::from_bps(1200), TaxMode::Exclusive);
        assert_eq!(total.taxable.cents(), 15000);
        assert_eq!(total.tax().cents(), 1800);
    }
}
