//! # Ledger Arithmetic
//!
//! Balance rules shared by the ledger store and reconciliation.
//!
//! ## Invariant
//! ```text
//! batch.quantity_available == Σ entry.delta          (in seq order)
//! entry[n].balance_after   == entry[n-1].balance_after + entry[n].delta
//! entry[n].balance_after   >= 0
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::types::LedgerEntry;

/// Balance after applying `delta` to `prior_balance`.
///
/// Fails with `NegativeBalance` instead of ever producing a value below zero.
pub fn next_balance(batch_id: &str, prior_balance: i64, delta: i64) -> CoreResult<i64> {
    if delta == 0 {
        return Err(ValidationError::MustBeNonZero {
            field: "delta".to_string(),
        }
        .into());
    }

    match prior_balance.checked_add(delta) {
        Some(balance) if balance >= 0 => Ok(balance),
        _ => Err(CoreError::NegativeBalance {
            batch_id: batch_id.to_string(),
            prior_balance,
            delta,
        }),
    }
}

/// Replays a batch's entries in order and returns the final balance.
///
/// Every entry's recorded `balance_after` must match the running sum and
/// must never go negative; the first mismatch is reported with its `seq`.
pub fn replay<'a, I>(batch_id: &str, entries: I) -> CoreResult<i64>
where
    I: IntoIterator<Item = &'a LedgerEntry>,
{
    let mut balance = 0_i64;
    let mut last_seq = i64::MIN;

    for entry in entries {
        if entry.batch_id != batch_id || entry.seq <= last_seq {
            return Err(CoreError::CorruptHistory {
                batch_id: batch_id.to_string(),
                seq: entry.seq,
            });
        }
        balance += entry.delta;
        if balance < 0 || balance != entry.balance_after {
            return Err(CoreError::CorruptHistory {
                batch_id: batch_id.to_string(),
                seq: entry.seq,
            });
        }
        last_seq = entry.seq;
    }

    Ok(balance)
}

/// Result of comparing a batch's stored quantity with its ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Reconciliation {
    pub batch_id: String,
    pub quantity_available: i64,
    /// Replayed balance, `None` when the history itself is corrupt.
    pub ledger_balance: Option<i64>,
    pub entry_count: usize,
}

impl Reconciliation {
    pub fn build(batch_id: &str, quantity_available: i64, entries: &[LedgerEntry]) -> Self {
        Reconciliation {
            batch_id: batch_id.to_string(),
            quantity_available,
            ledger_balance: replay(batch_id, entries).ok(),
            entry_count: entries.len(),
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.ledger_balance == Some(self.quantity_available)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LedgerEntryType;
    use chrono::Utc;

    fn entry(seq: i64, delta: i64, balance_after: i64) -> LedgerEntry {
        LedgerEntry {
            seq,
            id: format!("e{seq}"),
            batch_id: "X1".to_string(),
            entry_type: if delta > 0 {
                LedgerEntryType::Purchase
            } else {
                LedgerEntryType::Sale
            },
            reference_id: format!("ref{seq}"),
            delta,
            balance_after,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_next_balance() {
        assert_eq!(next_balance("X1", 10, -10).unwrap(), 0);
        assert_eq!(next_balance("X1", 0, 7).unwrap(), 7);
        assert_eq!(
            next_balance("X1", 4, -6).unwrap_err(),
            CoreError::NegativeBalance {
                batch_id: "X1".to_string(),
                prior_balance: 4,
                delta: -6,
            }
        );
        assert!(matches!(
            next_balance("X1", 4, 0).unwrap_err(),
            CoreError::Validation(_)
        ));
    }

    #[test]
    fn test_replay_reconstructs_balance() {
        let entries = vec![entry(1, 10, 10), entry(4, -10, 0), entry(9, 3, 3)];
        assert_eq!(replay("X1", &entries).unwrap(), 3);
        assert_eq!(replay("X1", &[]).unwrap(), 0);
    }

    #[test]
    fn test_replay_flags_bad_running_balance() {
        let entries = vec![entry(1, 10, 10), entry(2, -5, 6)];
        assert_eq!(
            replay("X1", &entries).unwrap_err(),
            CoreError::CorruptHistory {
                batch_id: "X1".to_string(),
                seq: 2,
            }
        );
    }

    #[test]
    fn test_replay_flags_out_of_order_entries() {
        let entries = vec![entry(5, 10, 10), entry(2, -5, 5)];
        assert!(replay("X1", &entries).is_err());
    }

    #[test]
    fn test_reconciliation() {
        let entries = vec![entry(1, 10, 10), entry(2, -4, 6)];
        assert!(Reconciliation::build("X1", 6, &entries).is_consistent());

        let drifted = Reconciliation::build("X1", 7, &entries);
        assert!(!drifted.is_consistent());
        assert_eq!(drifted.ledger_balance, Some(6));
        assert_eq!(drifted.entry_count, 2);
    }
}
