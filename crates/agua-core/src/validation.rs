//! # Validation Module
//!
//! Input validation for the ordering, payment and subscription flows.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Service entry (agua-db services)                             │
//! │  └── THIS MODULE: shape of the input (positive, non-empty, in range)   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Engine rules (pricing, ledger, subscription)                 │
//! │  └── CoreError: configuration, debt, entitlement, state machine        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  └── CHECK / UNIQUE / FOREIGN KEY constraints                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::NaiveDate;

use crate::error::ValidationError;
use crate::money::Money;
use crate::{MAX_ITEM_QUANTITY, MAX_ORDER_LINES, MAX_PRICE_CENTS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a display name (product, district, client, plan).
///
/// ## Rules
/// - Must not be empty after trimming
/// - At most 120 characters
///
/// ```rust
/// use agua_core::validation::validate_name;
///
/// assert!(validate_name("district", "Centro").is_ok());
/// assert!(validate_name("district", "  ").is_err());
/// ```
pub fn validate_name(field: &str, name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if name.chars().count() > 120 {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: 120,
        });
    }

    Ok(())
}

/// Validates a UUID string.
pub fn validate_uuid(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates an ordered quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a price or fee in cents: `0..=MAX_PRICE_CENTS`. Zero is
/// allowed (free delivery district).
pub fn validate_price_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if !(0..=MAX_PRICE_CENTS).contains(&cents) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_PRICE_CENTS,
        });
    }

    Ok(())
}

/// Validates an amount that must be strictly positive (voucher amount, payment).
///
/// ```rust
/// use agua_core::money::Money;
/// use agua_core::validation::validate_positive_amount;
///
/// assert!(validate_positive_amount("payment amount", Money::from_cents(1)).is_ok());
/// assert!(validate_positive_amount("payment amount", Money::zero()).is_err());
/// ```
pub fn validate_positive_amount(field: &str, amount: Money) -> ValidationResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }

    Ok(())
}

/// Validates a bottle count for a subscription delivery.
pub fn validate_bottle_count(count: i64) -> ValidationResult<()> {
    if count <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "bottle count".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Collection & Period Validators
// =============================================================================

/// Validates the number of lines in an order.
pub fn validate_order_lines(count: usize) -> ValidationResult<()> {
    if count == 0 {
        return Err(ValidationError::Required {
            field: "order lines".to_string(),
        });
    }

    if count > MAX_ORDER_LINES {
        return Err(ValidationError::OutOfRange {
            field: "order lines".to_string(),
            min: 1,
            max: MAX_ORDER_LINES as i64,
        });
    }

    Ok(())
}

/// Validates a reporting period. Both ends are inclusive; a single day is allowed.
pub fn validate_period(start: NaiveDate, end: NaiveDate) -> ValidationResult<()> {
    if start > end {
        return Err(ValidationError::InvalidFormat {
            field: "period".to_string(),
            reason: format!("start {} is after end {}", start, end),
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
