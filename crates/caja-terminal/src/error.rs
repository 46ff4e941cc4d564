//! # Terminal Error Type
//!
//! Unified error type for the runtime layer.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Error Flow in Caja POS                              │
//! │                                                                         │
//! │  validation tier     CoreError (insufficient stock, empty cart, ...)   │
//! │                         │ blocked transition, surfaced inline           │
//! │                         ▼                                               │
//! │  infrastructure tier SyncError (channel down, retries exhausted)       │
//! │                         │ degrade: stale stock, fewer payment options   │
//! │                         ▼                                               │
//! │  submission tier     TerminalError { code, message }                    │
//! │                         │ surfaced to the operator, cart preserved      │
//! │                         ▼                                               │
//! │                      UI front-end                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The front-end receives both a machine-readable `code` and a
//! human-readable `message`.

use serde::Serialize;

use caja_core::CoreError;
use caja_sync::SyncError;

/// Result type alias for terminal operations.
pub type TerminalResult<T> = Result<T, TerminalError>;

/// Error surfaced to the operator-facing layer.
///
/// ## Serialization
/// ```json
/// {
///   "code": "INSUFFICIENT_STOCK",
///   "message": "Insufficient stock for Remera M: available 3, requested 5"
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminalError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for the operator-facing layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Resource not found (product code with no match, ...)
    NotFound,

    /// Input validation failed
    ValidationError,

    /// Insufficient stock
    InsufficientStock,

    /// Cart operation failed
    CartError,

    /// Payment configuration problem
    PaymentError,

    /// Backend request failed (network or non-2xx)
    BackendError,

    /// Sale submission failed; cart preserved for retry
    SubmissionFailed,

    /// Station configuration problem
    ConfigError,

    /// Push channel problem
    SyncError,

    /// Anything unexpected
    Internal,
}

impl TerminalError {
    /// Creates a new terminal error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        TerminalError {
            code,
            message: message.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(resource: &str, id: &str) -> Self {
        TerminalError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        TerminalError::new(ErrorCode::ValidationError, message)
    }

    /// Creates a backend error.
    pub fn backend(message: impl Into<String>) -> Self {
        TerminalError::new(ErrorCode::BackendError, message)
    }

    /// Creates a submission error.
    pub fn submission(message: impl Into<String>) -> Self {
        TerminalError::new(ErrorCode::SubmissionFailed, message)
    }

    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        TerminalError::new(ErrorCode::ConfigError, message)
    }
}

/// Converts core errors to terminal errors.
impl From<CoreError> for TerminalError {
    fn from(err: CoreError) -> Self {
        let code = match &err {
            CoreError::OutOfStock { .. } | CoreError::InsufficientStock { .. } => {
                ErrorCode::InsufficientStock
            }
            CoreError::LineNotFound(_) => ErrorCode::CartError,
            CoreError::EmptyCart | CoreError::CartTooLarge { .. } => ErrorCode::CartError,
            CoreError::NoPaymentMethods => ErrorCode::PaymentError,
            CoreError::SubmissionInFlight => ErrorCode::SubmissionFailed,
            CoreError::Validation(_) => ErrorCode::ValidationError,
        };
        TerminalError::new(code, err.to_string())
    }
}

/// Converts sync errors to terminal errors.
impl From<SyncError> for TerminalError {
    fn from(err: SyncError) -> Self {
        TerminalError::new(ErrorCode::SyncError, err.to_string())
    }
}

/// Converts HTTP client errors to terminal errors.
impl From<reqwest::Error> for TerminalError {
    fn from(err: reqwest::Error) -> Self {
        // Log the transport detail, hand the operator something readable.
        tracing::error!(error = %err, "Backend request failed");
        TerminalError::backend("Backend request failed")
    }
}

impl std::fmt::Display for TerminalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for TerminalError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_error_mapping() {
        let err: TerminalError = CoreError::EmptyCart.into();
        assert_eq!(err.code, ErrorCode::CartError);

        let err: TerminalError = CoreError::InsufficientStock {
            name: "X".into(),
            available: 1,
            requested: 2,
        }
        .into();
        assert_eq!(err.code, ErrorCode::InsufficientStock);

        let err: TerminalError = CoreError::NoPaymentMethods.into();
        assert_eq!(err.code, ErrorCode::PaymentError);
    }

    #[test]
    fn test_serialized_shape() {
        let err = TerminalError::not_found("Product", "p-1");
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("\"code\":\"NOT_FOUND\""));
        assert!(json.contains("Product not found: p-1"));
    }
}
