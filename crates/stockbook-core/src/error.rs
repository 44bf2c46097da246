//! # Error Types
//!
//! Domain-specific error types for stockbook-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                 │
//! │                                                                     │
//! │  stockbook-core errors (this file)                                  │
//! │  ├── StockError       - Stock policy violations                     │
//! │  └── ValidationError  - Input validation failures                   │
//! │                                                                     │
//! │  stockbook-db errors (separate crate)                               │
//! │  ├── DbError          - Database operation failures                 │
//! │  └── EngineError      - Stock | Db, surfaced by the engine          │
//! │                                                                     │
//! │  Flow: ValidationError → StockError → EngineError → host app        │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (SKU, available vs requested)
//! 3. Errors are enum variants, never String
//! 4. Every stock-mutation error aborts the enclosing transaction;
//!    no partial ledger writes ever reach the caller

use thiserror::Error;

// =============================================================================
// Stock Error
// =============================================================================

/// Stock policy violations raised by the engine before or during a
/// mutation. Any of these aborts the whole transaction.
#[derive(Debug, Error)]
pub enum StockError {
    /// Requested deduction exceeds available quantity and the product
    /// disallows negative stock.
    ///
    /// ## When This Occurs
    /// - Sale/service/rental line requests more than the snapshot holds
    /// - Transfer-out leg exceeds the source key's quantity
    ///
    /// ## Guarantee
    /// Nothing was written: snapshot, ledger and movements are untouched.
    ///
    /// ## User Workflow
    /// ```text
    /// Deduct 10 × FAB-NAVY
    ///      │
    ///      ▼
    /// Snapshot: quantity = 6.000, allow_negative_stock = false
    ///      │
    ///      ▼
    /// InsufficientStock { sku: "FAB-NAVY", available: 6.000, requested: 10.000 }
    ///      │
    ///      ▼
    /// Host shows: "Only 6 Navy Fabric in stock"
    /// ```
    #[error("Insufficient stock for {name} ({sku}): available {available}, requested {requested}")]
    InsufficientStock {
        sku: String,
        name: String,
        available: crate::Quantity,
        requested: crate::Quantity,
    },

    /// No warehouse could be resolved for the addressed branch or the
    /// given warehouse id.
    ///
    /// ## When This Occurs
    /// - Branch has no active warehouse with modify access AND the
    ///   account has no active main warehouse
    /// - Explicit warehouse id is unknown, inactive, or belongs to
    ///   another account
    ///
    /// This is always an explicit failure, never a silent no-op.
    #[error("No warehouse could be resolved for {scope}")]
    WarehouseResolutionFailed { scope: String },

    /// The variant does not belong to the product (or account) of the
    /// request. Rejected before any stock mutation.
    #[error("Variant {variant_id} does not belong to product {product_id}")]
    VariantOwnershipMismatch {
        variant_id: String,
        product_id: String,
    },

    /// Product cannot be found in the account's catalog.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Release of a reservation exceeds the reserved quantity.
    #[error(
        "Cannot release {requested} for {sku}: only {reserved} reserved"
    )]
    ReleaseExceedsReserved {
        sku: String,
        reserved: crate::Quantity,
        requested: crate::Quantity,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These occur when request input doesn't meet requirements. Used for
/// early validation before any database work starts.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Quantity must be strictly positive for this operation.
    #[error("{field} must be positive, got {value}")]
    MustBePositive {
        field: String,
        value: crate::Quantity,
    },

    /// Adjustment deltas of zero are rejected: they would write a ledger
    /// entry that changes nothing.
    #[error("{field} must not be zero")]
    MustBeNonZero { field: String },

    /// Invalid format (e.g., invalid UUID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with StockError.
pub type StockResult<T> = Result<T, StockError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Quantity;

    #[test]
    fn test_insufficient_stock_message() {
        let err = StockError::InsufficientStock {
            sku: "FAB-NAVY".to_string(),
            name: "Navy Fabric".to_string(),
            available: Quantity::from_units(6),
            requested: Quantity::from_units(10),
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for Navy Fabric (FAB-NAVY): available 6.000, requested 10.000"
        );
    }

    #[test]
    fn test_warehouse_resolution_message() {
        let err = StockError::WarehouseResolutionFailed {
            scope: "branch br-1".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "No warehouse could be resolved for branch br-1"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "reason".to_string(),
        };
        assert_eq!(err.to_string(), "reason is required");

        let err = ValidationError::MustBePositive {
            field: "quantity".to_string(),
            value: Quantity::from_milli(-500),
        };
        assert_eq!(err.to_string(), "quantity must be positive, got -0.500");
    }

    #[test]
    fn test_validation_converts_to_stock_error() {
        let validation_err = ValidationError::MustBeNonZero {
            field: "delta".to_string(),
        };
        let stock_err: StockError = validation_err.into();
        assert!(matches!(stock_err, StockError::Validation(_)));
    }
}
