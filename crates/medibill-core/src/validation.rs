//! # Validation Module
//!
//! Business rule validation for bill requests.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Caller (UI / API)                                            │
//! │  ├── Basic format checks (empty, length)                               │
//! │  └── Immediate user feedback                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE - business rule validation                       │
//! │  └── Runs BEFORE any transaction opens: a rejected request has         │
//! │      provably zero side effects                                        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / UNIQUE / CHECK constraints                             │
//! │  └── Foreign key constraints                                           │
//! │                                                                         │
//! │  Defense in depth: multiple layers catch different errors              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::{ValidationError, ValidationResult};
use crate::types::NewLineItem;
use crate::{MAX_LINE_ITEMS, MAX_LINE_QUANTITY};

/// Maximum length of a customer name.
const MAX_CUSTOMER_NAME: usize = 120;

/// Maximum length of a line item's medicine name.
const MAX_MEDICINE_NAME: usize = 200;

/// Maximum length of free-text audit notes.
const MAX_NOTES: usize = 500;

/// Validates the line items of a create request or an edit replacement set.
///
/// ## Rules
/// - At least one item, at most [`MAX_LINE_ITEMS`]
/// - Every item: non-empty name, `0 < quantity <= MAX_LINE_QUANTITY`,
///   positive cost per piece
pub fn validate_line_items(items: &[NewLineItem]) -> ValidationResult<()> {
    if items.is_empty() {
        return Err(ValidationError::NoLineItems);
    }

    if items.len() > MAX_LINE_ITEMS {
        return Err(ValidationError::TooManyLineItems {
            max: MAX_LINE_ITEMS,
        });
    }

    for item in items {
        if item.medicine_name.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "medicineName".to_string(),
            });
        }

        if item.medicine_name.len() > MAX_MEDICINE_NAME {
            return Err(ValidationError::TooLong {
                field: "medicineName".to_string(),
                max: MAX_MEDICINE_NAME,
            });
        }

        if item.quantity <= 0 {
            return Err(ValidationError::MustBePositive {
                field: "quantity".to_string(),
            });
        }

        if item.quantity > MAX_LINE_QUANTITY {
            return Err(ValidationError::OutOfRange {
                field: "quantity".to_string(),
                min: 1,
                max: MAX_LINE_QUANTITY,
            });
        }

        if item.cost_per_piece_cents <= 0 {
            return Err(ValidationError::MustBePositive {
                field: "costPerPiece".to_string(),
            });
        }
    }

    Ok(())
}

/// Validates an optional customer name.
pub fn validate_customer_name(name: Option<&str>) -> ValidationResult<()> {
    if let Some(name) = name {
        if name.len() > MAX_CUSTOMER_NAME {
            return Err(ValidationError::TooLong {
                field: "customerName".to_string(),
                max: MAX_CUSTOMER_NAME,
            });
        }
    }
    Ok(())
}

/// Validates optional free-text notes attached to an edit/delete audit entry.
pub fn validate_notes(notes: Option<&str>) -> ValidationResult<()> {
    if let Some(notes) = notes {
        if notes.len() > MAX_NOTES {
            return Err(ValidationError::TooLong {
                field: "notes".to_string(),
                max: MAX_NOTES,
            });
        }
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn item(quantity: i64, cost: i64) -> NewLineItem {
        NewLineItem {
            medicine_name: "Amoxicillin 250mg".into(),
            quantity,
            cost_per_piece_cents: cost,
            medicine_id: None,
        }
    }

    #[test]
    fn test_valid_items_pass() {
        assert!(validate_line_items(&[item(1, 100), item(999, 1)]).is_ok());
    }

    #[test]
    fn test_empty_items_rejected() {
        assert_eq!(validate_line_items(&[]), Err(ValidationError::NoLineItems));
    }

    #[test]
    fn test_non_positive_quantity_rejected() {
        assert!(matches!(
            validate_line_items(&[item(0, 100)]),
            Err(ValidationError::MustBePositive { .. })
        ));
        assert!(matches!(
            validate_line_items(&[item(-3, 100)]),
            Err(ValidationError::MustBePositive { .. })
        ));
    }

    #[test]
    fn test_non_positive_cost_rejected() {
        assert!(matches!(
            validate_line_items(&[item(1, 0)]),
            Err(ValidationError::MustBePositive { .. })
        ));
    }

    #[test]
    fn test_excessive_quantity_rejected() {
        assert!(matches!(
            validate_line_items(&[item(MAX_LINE_QUANTITY + 1, 100)]),
            Err(ValidationError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_blank_name_rejected() {
        let mut it = item(1, 100);
        it.medicine_name = "   ".into();
        assert!(matches!(
            validate_line_items(&[it]),
            Err(ValidationError::Required { .. })
        ));
    }

    #[test]
    fn test_customer_name_length() {
        assert!(validate_customer_name(Some("Walk-in")).is_ok());
        assert!(validate_customer_name(None).is_ok());
        let long = "x".repeat(MAX_CUSTOMER_NAME + 1);
        assert!(validate_customer_name(Some(&long)).is_err());
    }
}
