//! # Validation Module
//!
//! Request validation, run before any transaction is opened.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Request layer (outside workspace)                             │
//! │  └── Deserialization, authentication                                    │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                   │
//! │  └── Shapes and ranges: quantities, prices, dates, lot codes            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Ledger transaction                                            │
//! │  └── Stock, MRP ceiling, returnable quantity (needs current state)      │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 4: SQLite                                                        │
//! │  └── CHECK, UNIQUE, FOREIGN KEY, append-only triggers                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::request::{AdjustmentRequest, PurchaseRequest, ReturnRequest, SaleRequest};
use crate::{MAX_LINE_QUANTITY, MAX_PRICE_CENTS, MAX_REQUEST_LINES};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Non-empty after trimming and at most `max` characters.
pub fn validate_text(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

/// Validates a manufacturer lot code.
///
/// ## Rules
/// - 1 to 40 characters
/// - Letters, digits, `-`, `_`, `/`
///
/// ```rust
/// use lotledger_core::validation::validate_lot_code;
///
/// assert!(validate_lot_code("B2311/07").is_ok());
/// assert!(validate_lot_code("").is_err());
/// assert!(validate_lot_code("LOT 7").is_err());
/// ```
pub fn validate_lot_code(lot_code: &str) -> ValidationResult<()> {
    validate_text("lot_code", lot_code, 40)?;

    if !lot_code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '/')
    {
        return Err(ValidationError::InvalidFormat {
            field: "lot_code".to_string(),
            reason: "must contain only letters, numbers, '-', '_' and '/'".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity: `1..=MAX_LINE_QUANTITY`.
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a price in cents: `1..=MAX_PRICE_CENTS`.
pub fn validate_price_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if cents <= 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }

    if cents > MAX_PRICE_CENTS {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 1,
            max: MAX_PRICE_CENTS,
        });
    }

    Ok(())
}

/// Validates a tax rate in basis points (0% to 100%).
pub fn validate_tax_rate_bps(bps: u32) -> ValidationResult<()> {
    if bps > 10000 {
        return Err(ValidationError::OutOfRange {
            field: "tax_rate".to_string(),
            min: 0,
            max: 10000,
        });
    }

    Ok(())
}

fn validate_line_count(field: &str, count: usize) -> ValidationResult<()> {
    if count == 0 || count > MAX_REQUEST_LINES {
        return Err(ValidationError::BadLength {
            field: field.to_string(),
            max: MAX_REQUEST_LINES,
        });
    }

    Ok(())
}

// =============================================================================
// Request Validators
// =============================================================================

pub fn validate_sale_request(request: &SaleRequest) -> ValidationResult<()> {
    validate_text("actor", &request.actor, 64)?;
    validate_line_count("lines", request.lines.len())?;

    if let Some(customer) = &request.customer_ref {
        validate_text("customer_ref", customer, 64)?;
    }

    for line in &request.lines {
        validate_text("product_id", &line.product_id, 64)?;
        validate_quantity(line.quantity)?;
        validate_price_cents("unit_price", line.unit_price_cents)?;
        validate_tax_rate_bps(line.tax_rate_bps)?;
    }

    Ok(())
}

pub fn validate_purchase_request(request: &PurchaseRequest) -> ValidationResult<()> {
    validate_text("actor", &request.actor, 64)?;
    validate_text("vendor_id", &request.vendor_id, 64)?;
    validate_line_count("lines", request.lines.len())?;

    for line in &request.lines {
        validate_text("product_id", &line.product_id, 64)?;
        validate_lot_code(&line.lot_code)?;
        validate_quantity(line.quantity)?;
        validate_price_cents("mrp", line.mrp_cents)?;

        if !(0..=MAX_PRICE_CENTS).contains(&line.unit_cost_cents) {
            return Err(ValidationError::OutOfRange {
                field: "unit_cost".to_string(),
                min: 0,
                max: MAX_PRICE_CENTS,
            });
        }

        if line.exp_date <= line.mfg_date {
            return Err(ValidationError::InvalidFormat {
                field: "exp_date".to_string(),
                reason: "must be after mfg_date".to_string(),
            });
        }
    }

    Ok(())
}

pub fn validate_return_request(request: &ReturnRequest) -> ValidationResult<()> {
    validate_text("actor", &request.actor, 64)?;
    validate_text("sale_line_id", &request.sale_line_id, 64)?;
    validate_text("reason", &request.reason, 200)?;
    validate_quantity(request.quantity)
}

pub fn validate_adjustment_request(request: &AdjustmentRequest) -> ValidationResult<()> {
    validate_text("actor", &request.actor, 64)?;
    validate_text("batch_id", &request.batch_id, 64)?;

    if request.delta == 0 {
        return Err(ValidationError::MustBeNonZero {
            field: "delta".to_string(),
        });
    }

    if request.delta.unsigned_abs() > MAX_LINE_QUANTITY.unsigned_abs() {
        return Err(ValidationError::OutOfRange {
            field: "delta".to_string(),
            min: -MAX_LINE_QUANTITY,
            max: MAX_LINE_QUANTITY,
        });
    }

    if let Some(note) = &request.note {
        validate_text("note", note, 500)?;
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
