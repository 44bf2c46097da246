//! # Validation Module
//!
//! Input validation for engine requests.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                              │
//! │                                                                     │
//! │  Layer 1: Host application                                          │
//! │  ├── Form/API input checks                                          │
//! │  └── Immediate user feedback                                        │
//! │           │                                                         │
//! │           ▼                                                         │
//! │  Layer 2: THIS MODULE (before any database work)                    │
//! │  ├── Positive quantities, non-zero deltas                           │
//! │  └── Reason/note presence and length                                │
//! │           │                                                         │
//! │           ▼                                                         │
//! │  Layer 3: Database (SQLite)                                         │
//! │  ├── NOT NULL / CHECK constraints                                   │
//! │  └── Foreign key constraints                                        │
//! │                                                                     │
//! │  Defense in depth: multiple layers catch different errors           │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::quantity::Quantity;
use crate::{MAX_NOTES_LEN, MAX_REASON_LEN};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Quantity Validators
// =============================================================================

/// Validates that an operation quantity is strictly positive.
///
/// Deductions, restorations, receipts, transfers and reservations all
/// express their magnitude as a positive quantity; direction comes from
/// the operation, never from the sign.
///
/// ## Example
/// ```rust
/// use stockbook_core::validation::validate_positive_quantity;
/// use stockbook_core::Quantity;
///
/// assert!(validate_positive_quantity("quantity", Quantity::from_units(4)).is_ok());
/// assert!(validate_positive_quantity("quantity", Quantity::zero()).is_err());
/// assert!(validate_positive_quantity("quantity", Quantity::from_milli(-1)).is_err());
/// ```
pub fn validate_positive_quantity(field: &str, quantity: Quantity) -> ValidationResult<()> {
    if !quantity.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
            value: quantity,
        });
    }

    Ok(())
}

/// Validates an adjustment delta: any sign, but never zero.
///
/// ## Example
/// ```rust
/// use stockbook_core::validation::validate_adjustment_delta;
/// use stockbook_core::Quantity;
///
/// assert!(validate_adjustment_delta(Quantity::from_milli(-500)).is_ok());
/// assert!(validate_adjustment_delta(Quantity::zero()).is_err());
/// ```
pub fn validate_adjustment_delta(delta: Quantity) -> ValidationResult<()> {
    if delta.is_zero() {
        return Err(ValidationError::MustBeNonZero {
            field: "delta".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// String Validators
// =============================================================================

/// Validates an adjustment reason.
///
/// ## Rules
/// - Must not be empty (a correction without a reason is not auditable)
/// - Must be at most [`MAX_REASON_LEN`] characters
pub fn validate_reason(reason: &str) -> ValidationResult<()> {
    let reason = reason.trim();

    if reason.is_empty() {
        return Err(ValidationError::Required {
            field: "reason".to_string(),
        });
    }

    if reason.len() > MAX_REASON_LEN {
        return Err(ValidationError::TooLong {
            field: "reason".to_string(),
            max: MAX_REASON_LEN,
        });
    }

    Ok(())
}

/// Validates optional free-text notes attached to a ledger entry.
pub fn validate_notes(notes: Option<&str>) -> ValidationResult<()> {
    if let Some(notes) = notes {
        if notes.len() > MAX_NOTES_LEN {
            return Err(ValidationError::TooLong {
                field: "notes".to_string(),
                max: MAX_NOTES_LEN,
            });
        }
    }

    Ok(())
}

/// Validates that an identifier field is present and non-empty.
pub fn validate_id(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    Ok(())
}

/// Validates that an identifier is a well-formed UUID.
///
/// ## When To Use
/// Host applications that mint their own reference ids can check them
/// before handing them to the engine; the engine itself treats ids as
/// opaque.
///
/// ## Example
/// ```rust
/// use stockbook_core::validation::validate_uuid;
///
/// assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("not-a-uuid").is_err());
/// ```
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positive_quantity() {
        assert!(validate_positive_quantity("quantity", Quantity::from_milli(1)).is_ok());
        assert!(validate_positive_quantity("quantity", Quantity::zero()).is_err());
        assert!(validate_positive_quantity("quantity", Quantity::from_units(-2)).is_err());
    }

    #[test]
    fn test_adjustment_delta() {
        assert!(validate_adjustment_delta(Quantity::from_units(3)).is_ok());
        assert!(validate_adjustment_delta(Quantity::from_units(-3)).is_ok());
        assert!(validate_adjustment_delta(Quantity::zero()).is_err());
    }

    #[test]
    fn test_reason() {
        assert!(validate_reason("cycle count correction").is_ok());
        assert!(validate_reason("").is_err());
        assert!(validate_reason("   ").is_err());
        assert!(validate_reason(&"x".repeat(MAX_REASON_LEN + 1)).is_err());
    }

    #[test]
    fn test_notes() {
        assert!(validate_notes(None).is_ok());
        assert!(validate_notes(Some("shrinkage found during audit")).is_ok());
        assert!(validate_notes(Some(&"x".repeat(MAX_NOTES_LEN + 1))).is_err());
    }

    #[test]
    fn test_id() {
        assert!(validate_id("account_id", "acc-1").is_ok());
        assert!(validate_id("account_id", "  ").is_err());
    }

    #[test]
    fn test_uuid() {
        assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_uuid("").is_err());
        assert!(validate_uuid("not-a-uuid").is_err());
    }
}
