//! # Error Types
//!
//! Domain-specific error types for medibill-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  medibill-core errors (this file)                                      │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  medibill-db errors (separate crate)                                   │
//! │  ├── DbError          - Database operation failures                    │
//! │  └── BillingError     - Service-level failures (permissions,           │
//! │                         not-found, exhausted retries)                  │
//! │                                                                         │
//! │  Flow: ValidationError → BillingError → caller                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (field, limit, value)
//! 3. Errors are enum variants, never String
//! 4. Validation failures are rejected BEFORE any transaction opens

use thiserror::Error;

/// Input validation errors.
///
/// These occur when a create/edit request doesn't meet business rules.
/// They carry no side effects: nothing has been written when one is raised.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// A bill must carry at least one line item.
    #[error("a bill must have at least one line item")]
    NoLineItems,

    /// Too many line items on one bill.
    #[error("a bill cannot have more than {max} line items")]
    TooManyLineItems { max: usize },
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = ValidationError::Required {
            field: "medicineName".to_string(),
        };
        assert_eq!(err.to_string(), "medicineName is required");

        let err = ValidationError::MustBePositive {
            field: "quantity".to_string(),
        };
        assert_eq!(err.to_string(), "quantity must be positive");

        assert_eq!(
            ValidationError::NoLineItems.to_string(),
            "a bill must have at least one line item"
        );
    }
}
