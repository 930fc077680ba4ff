//! # Allocation Engine
//!
//! Decides which batches a sale draws from, first-expired first-out.
//!
//! ## FEFO
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Sale: 15 units of PARA-500, today = 2023-12-01                         │
//! │                                                                         │
//! │  Candidates                 eligible?   order                           │
//! │  X0  exp 2023-11-30  qty 50    ✗ expired                                │
//! │  X1  exp 2024-01-01  qty 10    ✓          1st → take 10                 │
//! │  X2  exp 2024-06-01  qty 20    ✓          2nd → take  5                 │
//! │  X3  exp 2024-06-01  qty 30    ✓          3rd (same expiry, received    │
//! │                                            later than X2)                │
//! │                                                                         │
//! │  Result: [(X1, 10), (X2, 5)]                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All-or-nothing: when eligible stock is short the caller gets
//! `InsufficientStock` and no allocation at all.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::types::{Batch, SaleLine};

/// Quantity to move against one batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Allocation {
    pub batch_id: String,
    pub quantity: i64,
}

impl Allocation {
    pub fn new(batch_id: impl Into<String>, quantity: i64) -> Self {
        Allocation {
            batch_id: batch_id.into(),
            quantity,
        }
    }
}

/// Sorts batches into FEFO order: expiry ascending, then receipt order.
pub fn fefo_sort(batches: &mut [Batch]) {
    batches.sort_by(|a, b| {
        a.exp_date
            .cmp(&b.exp_date)
            .then(a.receipt_seq.cmp(&b.receipt_seq))
    });
}

/// Allocates `required` units of `product_id` across `candidates`.
///
/// Candidates that belong to another product, are inactive, empty, or
/// expired on `today` are skipped. The returned allocations are in the
/// order they were consumed and their quantities sum to `required`.
///
/// ```rust
/// use lotledger_core::allocation::allocate_fefo;
/// # use lotledger_core::types::Batch;
/// # use chrono::{NaiveDate, Utc};
/// # let mk = |id: &str, seq, exp: NaiveDate, qty| Batch {
/// #     receipt_seq: seq, id: id.into(), product_id: "P".into(),
/// #     lot_code: id.into(), mfg_date: NaiveDate::MIN, exp_date: exp,
/// #     unit_cost_cents: 1, mrp_cents: 2, quantity_available: qty,
/// #     storage_location: None, is_active: true, vendor_id: None,
/// #     created_at: Utc::now(), updated_at: Utc::now(),
/// # };
/// let d = |m| NaiveDate::from_ymd_opt(2024, m, 1).unwrap();
/// let batches = vec![mk("X2", 2, d(6), 20), mk("X1", 1, d(1), 10)];
///
/// let today = NaiveDate::from_ymd_opt(2023, 12, 1).unwrap();
/// let plan = allocate_fefo("P", &batches, 15, today).unwrap();
/// assert_eq!(plan[0].batch_id, "X1");
/// assert_eq!(plan[0].quantity, 10);
/// assert_eq!(plan[1].quantity, 5);
/// ```
pub fn allocate_fefo(
    product_id: &str,
    candidates: &[Batch],
    required: i64,
    today: NaiveDate,
) -> CoreResult<Vec<Allocation>> {
    if required <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        }
        .into());
    }

    let mut eligible: Vec<Batch> = candidates
        .iter()
        .filter(|b| b.product_id == product_id && b.is_sellable(today))
        .cloned()
        .collect();
    fefo_sort(&mut eligible);

    let available: i64 = eligible.iter().map(|b| b.quantity_available).sum();
    if available < required {
        return Err(CoreError::InsufficientStock {
            product_id: product_id.to_string(),
            available,
            requested: required,
        });
    }

    let mut remaining = required;
    let mut plan = Vec::new();
    for batch in eligible {
        if remaining == 0 {
            break;
        }
        let take = batch.quantity_available.min(remaining);
        plan.push(Allocation::new(batch.id, take));
        remaining -= take;
    }

    Ok(plan)
}

/// The credit a return makes: always the batch the sale line debited,
/// whatever its expiry or active flag is now.
pub fn deallocate(line: &SaleLine, quantity: i64) -> Allocation {
    Allocation::new(line.batch_id.clone(), quantity)
}

// =============================================================================
// Unit Tests
// =============================================================================
