//! # Validation Module
//!
//! Input validation utilities for Caja POS.
//!
//! ## Usage
//! ```rust
//! use caja_core::validation::{validate_quantity, validate_code};
//!
//! // Validate quantity before a cart operation
//! validate_quantity(5).unwrap();
//!
//! // Validate a scanned code before emitting it
//! validate_code("7790895000782", 3, 50).unwrap();
//! ```

use crate::error::ValidationError;
use crate::MAX_LINE_QUANTITY;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Scanned Code Validators
// =============================================================================

/// Checks whether a character is allowed inside a scanned code.
///
/// Barcode scanners emit alphanumerics plus a small set of separators;
/// anything else is keyboard noise and never enters the scan buffer.
#[inline]
pub fn is_code_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.'
}

/// Validates a completed scan buffer before it is emitted as a code.
///
/// ## Rules
/// - Length must be within `[min_len, max_len]`
/// - Every character must pass [`is_code_char`]
///
/// ## Example
/// ```rust
/// use caja_core::validation::validate_code;
///
/// assert!(validate_code("7790895000782", 3, 50).is_ok());
/// assert!(validate_code("ab", 3, 50).is_err());
/// assert!(validate_code("has space", 3, 50).is_err());
/// ```
pub fn validate_code(code: &str, min_len: usize, max_len: usize) -> ValidationResult<()> {
    if code.len() < min_len {
        return Err(ValidationError::TooShort {
            field: "code".to_string(),
            min: min_len,
        });
    }

    if code.len() > max_len {
        return Err(ValidationError::TooLong {
            field: "code".to_string(),
            max: max_len,
        });
    }

    if !code.chars().all(is_code_char) {
        return Err(ValidationError::InvalidFormat {
            field: "code".to_string(),
            reason: "must contain only letters, numbers, hyphens, underscores and dots"
                .to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a cart line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_LINE_QUANTITY (999)
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

/// Validates a price in cents.
///
/// Zero is allowed (free items), negatives are not.
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a percentage rate in basis points.
///
/// ## Rules
/// - Must be between 0 and 10000 (0% to 100%)
pub fn validate_rate_bps(bps: u32) -> ValidationResult<()> {
    if bps > 10000 {
        return Err(ValidationError::OutOfRange {
            field: "rate".to_string(),
            min: 0,
            max: 10000,
        });
    }

    Ok(())
}

/// Validates an installment count.
pub fn validate_installments(count: u32) -> ValidationResult<()> {
    if count == 0 {
        return Err(ValidationError::MustBePositive {
            field: "installments".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_code_char() {
        assert!(is_code_char('7'));
        assert!(is_code_char('A'));
        assert!(is_code_char('z'));
        assert!(is_code_char('-'));
        assert!(is_code_char('_'));
        assert!(is_code_char('.'));

        assert!(!is_code_char(' '));
        assert!(!is_code_char('#'));
        assert!(!is_code_char('á'));
    }

    #[test]
    fn test_validate_code() {
        assert!(validate_code("7790895000782", 3, 50).is_ok());
        assert!(validate_code("ABC-123", 3, 50).is_ok());
        assert!(validate_code("a.b", 3, 50).is_ok());

        assert!(validate_code("", 3, 50).is_err());
        assert!(validate_code("ab", 3, 50).is_err());
        assert!(validate_code(&"9".repeat(51), 3, 50).is_err());
        assert!(validate_code("has space", 3, 50).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(100).is_ok());
        assert!(validate_quantity(999).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(1000).is_err());
    }

    #[test]
    fn test_validate_price_cents() {
        assert!(validate_price_cents(0).is_ok());
        assert!(validate_price_cents(1099).is_ok());
        assert!(validate_price_cents(-100).is_err());
    }

    #[test]
    fn test_validate_rate_bps() {
        assert!(validate_rate_bps(0).is_ok());
        assert!(validate_rate_bps(2100).is_ok());
        assert!(validate_rate_bps(10000).is_ok());
        assert!(validate_rate_bps(10001).is_err());
    }

    #[test]
    fn test_validate_installments() {
        assert!(validate_installments(1).is_ok());
        assert!(validate_installments(12).is_ok());
        assert!(validate_installments(0).is_err());
    }
}
