//! # Error Types
//!
//! Domain-specific error types for lotledger-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  lotledger-core errors (this file)                                      │
//! │  ├── CoreError        - Business rule and invariant violations          │
//! │  └── ValidationError  - Input validation failures                       │
//! │                                                                         │
//! │  lotledger-db errors (separate crate)                                   │
//! │  └── DbError          - Storage failures, stale balances, lock waits    │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → request layer            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Categories
//! - **Rejections** (caller fixes input and resubmits): `InsufficientStock`,
//!   `PriceExceedsMrp`, `ReturnExceedsSoldQuantity`, `Validation`, not-found.
//! - **Invariant violations** (bug or corruption, surfaced to operators):
//!   `NegativeBalance`, `ImmutableRecordViolation`.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Requested quantity exceeds what FEFO-eligible batches hold.
    ///
    /// ## User Workflow
    /// ```text
    /// Sale line: PARA-500 × 35
    ///      │
    ///      ▼
    /// Eligible batches: X1 (10) + X2 (20) = 30
    ///      │
    ///      ▼
    /// InsufficientStock { product_id: "PARA-500", available: 30, requested: 35 }
    ///      │
    ///      ▼
    /// Cashier reduces quantity or stock is received
    /// ```
    #[error("Insufficient stock for {product_id}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        available: i64,
        requested: i64,
    },

    /// Selling price above the batch's maximum retail price. Rejected, never
    /// clamped.
    #[error("Price {unit_price_cents} exceeds MRP {mrp_cents} of batch {batch_id}")]
    PriceExceedsMrp {
        batch_id: String,
        unit_price_cents: i64,
        mrp_cents: i64,
    },

    /// A ledger write would leave a batch below zero.
    #[error("Negative balance on batch {batch_id}: prior {prior_balance}, delta {delta}")]
    NegativeBalance {
        batch_id: String,
        prior_balance: i64,
        delta: i64,
    },

    /// Return quantity larger than what is left un-returned on the sale line.
    #[error(
        "Return of {requested} exceeds sold quantity on line {sale_line_id}: sold {sold}, already returned {already_returned}"
    )]
    ReturnExceedsSoldQuantity {
        sale_line_id: String,
        sold: i64,
        already_returned: i64,
        requested: i64,
    },

    /// Update or delete attempted on an append-only record.
    #[error("Records in {table} are immutable")]
    ImmutableRecordViolation { table: String },

    /// Batch cannot be found.
    #[error("Batch not found: {0}")]
    BatchNotFound(String),

    /// Sale line cannot be found.
    #[error("Sale line not found: {0}")]
    SaleLineNotFound(String),

    /// Purchase line names an existing lot but disagrees with its expiry.
    #[error("Lot {lot_code} of {product_id} already exists with a different expiry date")]
    LotMismatch { product_id: String, lot_code: String },

    /// Replayed ledger history does not add up.
    #[error("Ledger history for batch {batch_id} is inconsistent at entry {seq}")]
    CorruptHistory { batch_id: String, seq: i64 },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Shorthand for the append-only guard.
    pub fn immutable(table: impl Into<String>) -> Self {
        CoreError::ImmutableRecordViolation {
            table: table.into(),
        }
    }

    /// True for errors that indicate a bug or data corruption rather than
    /// bad input.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            CoreError::NegativeBalance { .. }
                | CoreError::ImmutableRecordViolation { .. }
                | CoreError::CorruptHistory { .. }
        )
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any transaction is opened.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be zero.
    #[error("{field} must not be zero")]
    MustBeNonZero { field: String },

    /// Invalid format (e.g., bad characters in a lot code).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Collection is empty or too large.
    #[error("{field} must contain between 1 and {max} entries")]
    BadLength { field: String, max: usize },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            product_id: "PARA-500".to_string(),
            available: 30,
            requested: 35,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for PARA-500: available 30, requested 35"
        );

        let err = CoreError::immutable("stock_ledger");
        assert_eq!(err.to_string(), "Records in stock_ledger are immutable");
    }

    #[test]
    fn test_invariant_classification() {
        assert!(CoreError::immutable("audit_log").is_invariant_violation());
        assert!(CoreError::NegativeBalance {
            batch_id: "b".into(),
            prior_balance: 1,
            delta: -2,
        }
        .is_invariant_violation());
        assert!(!CoreError::BatchNotFound("b".into()).is_invariant_violation());
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "actor".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
