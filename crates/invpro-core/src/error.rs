//! # Error Types
//!
//! Domain-specific error types for invpro-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  invpro-core errors (this file)                                        │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  invpro-db errors (separate crate)                                     │
//! │  └── DbError          - Database failures (wraps CoreError raised      │
//! │                         inside a transaction)                          │
//! │                                                                         │
//! │  App shell errors                                                      │
//! │  └── AppError         - What the presentation layer sees               │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → AppError → View          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::permissions::{Capability, Section};

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Item cannot be found.
    #[error("Item not found: {0}")]
    ItemNotFound(i64),

    /// Stock would go below zero.
    ///
    /// ## When This Occurs
    /// - Issuing or transferring more than the item holds
    /// - Selling more than available on a sales invoice
    /// - Returning purchased goods that were already consumed
    ///
    /// Skipped entirely when negative stock is allowed by configuration.
    #[error("Insufficient stock for {sku}: available {available}, requested {requested}")]
    InsufficientStock {
        sku: String,
        available: i64,
        requested: i64,
    },

    /// A return line asks for more than is still returnable on the invoice line.
    ///
    /// ## User Workflow
    /// ```text
    /// Invoice line: 10 × Widget
    /// Earlier return: 4 × Widget
    ///      │
    ///      ▼
    /// New return: 7 × Widget
    ///      │
    ///      ▼
    /// ReturnExceedsInvoiced { line_id, invoiced: 10, already_returned: 4, requested: 7 }
    /// ```
    #[error(
        "Return for invoice line {line_id} exceeds invoiced quantity: invoiced {invoiced}, already returned {already_returned}, requested {requested}"
    )]
    ReturnExceedsInvoiced {
        line_id: i64,
        invoiced: i64,
        already_returned: i64,
        requested: i64,
    },

    /// A return references a line that is not part of the invoice.
    #[error("Invoice {invoice_id} has no line {line_id}")]
    UnknownInvoiceLine { invoice_id: i64, line_id: i64 },

    /// The acting user's role lacks the capability.
    #[error("Permission denied: {capability} on {section}")]
    PermissionDenied {
        section: Section,
        capability: Capability,
    },

    /// Username or password did not match.
    #[error("Invalid username or password")]
    InvalidCredentials,

    /// The operation conflicts with existing data (e.g. deleting a role in use).
    #[error("{0}")]
    Conflict(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before any write happens.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
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

    /// Invalid format (e.g. SKU with spaces).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// Duplicate value inside one request (e.g. the same item counted twice).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

impl ValidationError {
    /// Shorthand for [`ValidationError::Required`].
    pub fn required(field: &str) -> Self {
        ValidationError::Required {
            field: field.to_string(),
        }
    }

    /// Shorthand for [`ValidationError::MustBePositive`].
    pub fn must_be_positive(field: &str) -> Self {
        ValidationError::MustBePositive {
            field: field.to_string(),
        }
    }
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
            sku: "WID-01".to_string(),
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for WID-01: available 3, requested 5"
        );

        let err = CoreError::PermissionDenied {
            section: Section::Sales,
            capability: Capability::Add,
        };
        assert_eq!(err.to_string(), "Permission denied: add on sales");
    }

    #[test]
    fn test_validation_error_messages() {
        assert_eq!(ValidationError::required("name").to_string(), "name is required");

        let err = ValidationError::TooShort {
            field: "password".to_string(),
            min: 4,
        };
        assert_eq!(err.to_string(), "password must be at least 4 characters");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::required("sku").into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
