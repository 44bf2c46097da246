//! # Stock References
//!
//! Typed links from ledger entries back to the records that caused them.
//!
//! ## Why a Tagged Union?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  An untyped (reference_type: String, reference_id: i64) pair lets   │
//! │  a sale id land in a receipt column without anyone noticing.        │
//! │                                                                     │
//! │  StockReference carries the id INSIDE the variant, so a ledger      │
//! │  write cannot mix up its originating flow:                          │
//! │                                                                     │
//! │    StockReference::Sale { sale_id }                                 │
//! │    StockReference::GoodsReceipt { receipt_id }                      │
//! │    StockReference::ManualAdjustment        (no id to carry)         │
//! │                                                                     │
//! │  The stored reference_type tag is DERIVED from the variant plus     │
//! │  the trigger:  (Sale, Return) → "sale_return"                       │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};

// =============================================================================
// Stock Reference
// =============================================================================

/// The record a stock mutation traces back to.
///
/// One variant per calling flow, each carrying its strongly-typed id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum StockReference {
    /// A sale or POS transaction line.
    Sale { sale_id: String },
    /// A tailor service order line.
    TailorService { service_id: String },
    /// A goods receipt line.
    GoodsReceipt { receipt_id: String },
    /// A product unit allocated to rental inventory.
    RentalInventory { rental_id: String },
    /// A manual adjustment; the reason travels in the entry notes.
    ManualAdjustment,
}

impl StockReference {
    /// Base tag for the originating flow.
    pub const fn source_tag(&self) -> &'static str {
        match self {
            StockReference::Sale { .. } => "sale",
            StockReference::TailorService { .. } => "tailor_service",
            StockReference::GoodsReceipt { .. } => "goods_receipt",
            StockReference::RentalInventory { .. } => "rental_inventory",
            StockReference::ManualAdjustment => "manual_adjustment",
        }
    }

    /// The id of the originating record, if the flow has one.
    pub fn reference_id(&self) -> Option<&str> {
        match self {
            StockReference::Sale { sale_id } => Some(sale_id),
            StockReference::TailorService { service_id } => Some(service_id),
            StockReference::GoodsReceipt { receipt_id } => Some(receipt_id),
            StockReference::RentalInventory { rental_id } => Some(rental_id),
            StockReference::ManualAdjustment => None,
        }
    }

    /// Derives the stored `reference_type` tag for this reference under a
    /// given trigger.
    ///
    /// ## Example
    /// ```rust
    /// use stockbook_core::reference::{StockReference, StockTrigger};
    ///
    /// let sale = StockReference::Sale { sale_id: "S1".to_string() };
    /// assert_eq!(sale.ledger_tag(StockTrigger::Creation), "sale");
    /// assert_eq!(sale.ledger_tag(StockTrigger::Return), "sale_return");
    /// assert_eq!(sale.ledger_tag(StockTrigger::Deletion), "sale_delete");
    /// ```
    pub fn ledger_tag(&self, trigger: StockTrigger) -> String {
        match trigger.suffix() {
            Some(suffix) => format!("{}_{}", self.source_tag(), suffix),
            None => self.source_tag().to_string(),
        }
    }
}

// =============================================================================
// Stock Trigger
// =============================================================================

/// What happened to the originating record.
///
/// Distinguishes a sale's original deduction ("sale") from the
/// restoration written when that sale is deleted ("sale_delete").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockTrigger {
    /// The record was created; the base tag is used unqualified.
    Creation,
    /// The record was edited and its old stock effect reversed.
    Edit,
    /// Goods came back (customer return).
    Return,
    /// The record was deleted and its stock effect reversed.
    Deletion,
}

impl StockTrigger {
    /// Tag suffix for this trigger; `None` for creation.
    const fn suffix(&self) -> Option<&'static str> {
        match self {
            StockTrigger::Creation => None,
            StockTrigger::Edit => Some("edit"),
            StockTrigger::Return => Some("return"),
            StockTrigger::Deletion => Some("delete"),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_tags() {
        let service = StockReference::TailorService {
            service_id: "T9".to_string(),
        };
        assert_eq!(service.source_tag(), "tailor_service");
        assert_eq!(
            StockReference::ManualAdjustment.source_tag(),
            "manual_adjustment"
        );
    }

    #[test]
    fn test_reference_ids() {
        let receipt = StockReference::GoodsReceipt {
            receipt_id: "GR-7".to_string(),
        };
        assert_eq!(receipt.reference_id(), Some("GR-7"));
        assert_eq!(StockReference::ManualAdjustment.reference_id(), None);
    }

    #[test]
    fn test_ledger_tag_derivation() {
        let sale = StockReference::Sale {
            sale_id: "S1".to_string(),
        };
        assert_eq!(sale.ledger_tag(StockTrigger::Creation), "sale");
        assert_eq!(sale.ledger_tag(StockTrigger::Edit), "sale_edit");
        assert_eq!(sale.ledger_tag(StockTrigger::Return), "sale_return");
        assert_eq!(sale.ledger_tag(StockTrigger::Deletion), "sale_delete");

        let rental = StockReference::RentalInventory {
            rental_id: "R2".to_string(),
        };
        assert_eq!(
            rental.ledger_tag(StockTrigger::Deletion),
            "rental_inventory_delete"
        );
    }
}
