//! # Error Types
//!
//! Domain-specific error types for agua-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  agua-core errors (this file)                                          │
//! │  ├── CoreError        - Engine rule violations                         │
//! │  │   ├── Configuration          (bad tiers / discount policy)          │
//! │  │   ├── UnknownReference       (unresolvable id)                      │
//! │  │   ├── InsufficientPayment    (full settlement not met)              │
//! │  │   ├── SubscriptionExhausted  (entitlement exceeded)                 │
//! │  │   └── InvalidStateTransition (status machine violated)              │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  agua-db errors (separate crate)                                       │
//! │  └── DbError          - Database failures, wraps CoreError             │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → caller                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every variant is raised at the point of the call. Nothing in the engine
//! retries; a rejected mutation leaves state untouched.

use thiserror::Error;

use crate::money::Money;

// =============================================================================
// Core Error
// =============================================================================

/// Engine rule violations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Malformed pricing configuration.
    ///
    /// ## When This Occurs
    /// - Tier 3 minimum quantity not above tier 2
    /// - Tier price above the base price
    /// - Delivery discount thresholds out of order
    ///
    /// Order pricing must stop here instead of guessing which tier applies.
    #[error("Configuration error: {reason}")]
    Configuration { reason: String },

    /// An id that does not resolve to a stored entity.
    #[error("Unknown {entity}: {id}")]
    UnknownReference { entity: String, id: String },

    /// Payment below the client's total outstanding debt.
    ///
    /// ## User Workflow
    /// ```text
    /// Client owes 30.00 across vouchers
    ///      │
    ///      ▼
    /// allocate_payment(20.00)
    ///      │
    ///      ▼
    /// InsufficientPayment { outstanding: 30.00, offered: 20.00 }
    ///      │
    ///      ▼
    /// No voucher touched
    /// ```
    #[error("Insufficient payment for client {client_id}: outstanding {outstanding}, offered {offered}")]
    InsufficientPayment {
        client_id: String,
        outstanding: Money,
        offered: Money,
    },

    /// Delivery would exceed the subscription entitlement.
    #[error("Subscription {subscription_id} exhausted: {remaining} bottles left, {requested} requested")]
    SubscriptionExhausted {
        subscription_id: String,
        remaining: i64,
        requested: i64,
    },

    /// A status change the state machine does not allow.
    #[error("Invalid {entity} transition: {from} -> {to}")]
    InvalidStateTransition {
        entity: String,
        from: String,
        to: String,
    },

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    pub fn configuration(reason: impl Into<String>) -> Self {
        CoreError::Configuration {
            reason: reason.into(),
        }
    }

    pub fn unknown(entity: impl Into<String>, id: impl Into<String>) -> Self {
        CoreError::UnknownReference {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn invalid_transition(
        entity: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        CoreError::InvalidStateTransition {
            entity: entity.into(),
            from: from.into(),
            to: to.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors, raised before any business rule runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, reversed period).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientPayment {
            client_id: "c-1".to_string(),
            outstanding: Money::from_cents(3000),
            offered: Money::from_cents(2000),
        };
        assert_eq!(
            err.to_string(),
            "Insufficient payment for client c-1: outstanding $30.00, offered $20.00"
        );

        let err = CoreError::SubscriptionExhausted {
            subscription_id: "s-1".to_string(),
            remaining: 0,
            requested: 1,
        };
        assert_eq!(
            err.to_string(),
            "Subscription s-1 exhausted: 0 bottles left, 1 requested"
        );
    }

    #[test]
    fn test_constructors() {
        let err = CoreError::unknown("district", "d-9");
        assert_eq!(err.to_string(), "Unknown district: d-9");

        let err = CoreError::invalid_transition("subscription", "cancelled", "active");
        assert_eq!(
            err.to_string(),
            "Invalid subscription transition: cancelled -> active"
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::MustBePositive {
            field: "quantity".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
