//! # Error Types
//!
//! Domain-specific error types for caja-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  caja-core errors (this file)                                          │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  caja-sync errors (separate crate)                                     │
//! │  └── SyncError        - Push channel failures                          │
//! │                                                                         │
//! │  caja-terminal errors (runtime layer)                                  │
//! │  └── TerminalError    - What the operator sees (code + message)        │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → TerminalError → Operator          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (product name, quantities, etc.)
//! 3. Errors are enum variants, never String
//! 4. Each error variant maps to a user-facing message

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent business rule violations in the checkout flow.
/// They block the offending operation and are surfaced inline; they never
/// abort the wizard.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product has no stock left at all.
    #[error("{name} is out of stock")]
    OutOfStock { name: String },

    /// Requested quantity exceeds the available stock.
    ///
    /// ## When This Occurs
    /// - Adding a product would push the line past its stock
    /// - A quantity edit exceeds the (size-specific) stock
    ///
    /// ## User Workflow
    /// ```text
    /// Add to cart (qty: 5)
    ///      │
    ///      ▼
    /// Check stock: available=3
    ///      │
    ///      ▼
    /// InsufficientStock { name: "Remera M", available: 3, requested: 5 }
    ///      │
    ///      ▼
    /// UI shows: "Only 3 of Remera M in stock"
    /// ```
    #[error("Insufficient stock for {name}: available {available}, requested {requested}")]
    InsufficientStock {
        name: String,
        available: i64,
        requested: i64,
    },

    /// Cart line cannot be found.
    #[error("Cart line not found: {0}")]
    LineNotFound(String),

    /// Checkout cannot proceed with an empty cart.
    #[error("Cart is empty")]
    EmptyCart,

    /// No payment methods are enabled for this branch.
    ///
    /// This is a configuration error surfaced to the operator; the wizard
    /// stays on the item list instead of crashing.
    #[error("No payment methods are configured")]
    NoPaymentMethods,

    /// Cart has exceeded maximum allowed lines.
    #[error("Cart cannot have more than {max} lines")]
    CartTooLarge { max: usize },

    /// A sale submission is already in flight.
    #[error("A sale submission is already in progress")]
    SubmissionInFlight,

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too short.
    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid characters in a scanned code).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
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
            name: "Coca-Cola 330ml".to_string(),
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for Coca-Cola 330ml: available 3, requested 5"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::MustBePositive {
            field: "quantity".to_string(),
        };
        assert_eq!(err.to_string(), "quantity must be positive");

        let err = ValidationError::TooShort {
            field: "code".to_string(),
            min: 3,
        };
        assert_eq!(err.to_string(), "code must be at least 3 characters");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "code".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
