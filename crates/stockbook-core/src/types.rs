//! # Domain Types
//!
//! Core domain types for the stock ledger engine.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                │
//! │                                                                     │
//! │  Master data                    Ledger data                         │
//! │  ┌─────────────────┐            ┌──────────────────────┐            │
//! │  │    Product      │            │   StockSnapshot      │            │
//! │  │  ProductVariant │──keys for──│   (current quantity) │            │
//! │  │    Warehouse    │            └──────────┬───────────┘            │
//! │  │    Branch       │                       │ every mutation        │
//! │  └─────────────────┘            ┌──────────▼───────────┐            │
//! │                                 │  StockLedgerEntry    │            │
//! │  ┌─────────────────┐            │  (before/change/     │            │
//! │  │ MovementKind    │            │   after, immutable)  │            │
//! │  │ AlertStatus     │            ├──────────────────────┤            │
//! │  │ WarehouseKind   │            │  StockMovement       │            │
//! │  └─────────────────┘            │  (reporting log)     │            │
//! │                                 ├──────────────────────┤            │
//! │                                 │  NegativeStockAlert  │            │
//! │                                 └──────────────────────┘            │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business ID where one exists (sku, warehouse name) - human-readable
//!
//! ## Raw Column + Typed Accessor Pattern
//! Quantity columns are stored as `*_milli: i64` and cost columns as
//! `*_cents: i64`; structs expose typed accessors (`quantity()`,
//! `unit_cost()`) returning [`Quantity`]/[`Money`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::quantity::Quantity;

// =============================================================================
// Warehouse Kind
// =============================================================================

/// Classification of a warehouse within an account.
///
/// The `Main` warehouse is the account-wide fallback when a branch has no
/// modifiable warehouse of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum WarehouseKind {
    /// Account-wide primary warehouse; deduction fallback target.
    Main,
    /// Warehouse tied to one or more branches.
    Branch,
    /// Back-room storage; never resolved implicitly.
    Storage,
}

// =============================================================================
// Movement Kind
// =============================================================================

/// The kind of a ledger entry.
///
/// ## Kinds
/// ```text
/// inbound      ← goods receipt, restoration (return/delete reversal)
/// outbound     ← sale/service/rental deduction, receipt deletion
/// adjustment   ← manual discrepancy correction (signed delta)
/// transfer_in  ← quantity arriving at a key during a rebinding edit
/// transfer_out ← quantity leaving a key during a rebinding edit
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum MovementKind {
    Inbound,
    Outbound,
    Adjustment,
    TransferIn,
    TransferOut,
}

// =============================================================================
// Movement Direction
// =============================================================================

/// Direction of a movement record.
///
/// Movements are coarser than ledger entries: an adjustment's direction is
/// derived from the sign of its delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum MovementDirection {
    Inbound,
    Outbound,
}

// =============================================================================
// Alert Status
// =============================================================================

/// Lifecycle status of a negative-stock alert.
///
/// `Active → Resolved` only, and only through an explicit resolve call.
/// Nothing auto-resolves on restock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Active,
    Resolved,
}

impl Default for AlertStatus {
    fn default() -> Self {
        AlertStatus::Active
    }
}

// =============================================================================
// Product
// =============================================================================

/// A product whose stock the engine tracks.
///
/// Pricing, barcodes and presentation fields live with the host
/// application; the engine only needs identity and stock policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Account this product belongs to.
    pub account_id: String,

    /// Stock Keeping Unit - business identifier, unique per account.
    pub sku: String,

    /// Display name, used in error messages and alerts.
    pub name: String,

    /// Default unit cost in cents, copied onto movements for valuation.
    pub unit_cost_cents: Option<i64>,

    /// Whether the engine tracks stock for this product at all.
    /// Service items (labor, fees) set this to false.
    pub track_inventory: bool,

    /// Allow deductions to drive quantity below zero.
    pub allow_negative_stock: bool,

    /// Whether product is active (soft delete).
    pub is_active: bool,

    /// When the product was created.
    pub created_at: DateTime<Utc>,

    /// When the product was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the default unit cost, if configured.
    #[inline]
    pub fn unit_cost(&self) -> Option<Money> {
        self.unit_cost_cents.map(Money::from_cents)
    }

    /// Checks whether a deduction of `requested` may proceed given the
    /// currently available quantity.
    ///
    /// ## Decision Table
    /// ```text
    /// track_inventory = false            → always yes (nothing tracked)
    /// available >= requested             → yes
    /// allow_negative_stock = true        → yes (alert will fire)
    /// otherwise                          → no (InsufficientStock)
    /// ```
    pub fn can_deduct(&self, available: Quantity, requested: Quantity) -> bool {
        if !self.track_inventory {
            return true;
        }

        if available >= requested {
            return true;
        }

        self.allow_negative_stock
    }
}

// =============================================================================
// Product Variant
// =============================================================================

/// A sellable variation of a product (size, color, fabric).
///
/// Snapshot keys optionally carry a variant; a variant may only be used
/// with its own product and account (ownership is checked before any
/// stock mutation).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ProductVariant {
    pub id: String,
    pub account_id: String,
    pub product_id: String,
    /// Variant name, unique within the product (e.g. "XL", "Navy").
    pub name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Branch
// =============================================================================

/// A retail branch. Deductions arrive addressed to a branch and are
/// resolved to a warehouse through the branch's access grants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Branch {
    pub id: String,
    pub account_id: String,
    pub name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Warehouse
// =============================================================================

/// A physical or logical stock location.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Warehouse {
    pub id: String,
    pub account_id: String,
    pub name: String,
    /// Warehouse classification; `main` is the resolution fallback.
    pub kind: WarehouseKind,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Stock Snapshot
// =============================================================================

/// Current quantity for one (account, product, variant?, warehouse) key.
///
/// ## Lifecycle
/// Created lazily on the first stock-affecting event for its key; mutated
/// by every deduction/restoration/adjustment/transfer afterwards.
///
/// ## Invariant
/// `quantity` equals the sum of all ledger entry changes for this key
/// since creation. The ledger is the authority; the snapshot is the
/// denormalized read path.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StockSnapshot {
    pub id: String,
    pub account_id: String,
    pub product_id: String,
    /// Variant of the key; `None` for variant-less products.
    pub variant_id: Option<String>,
    pub warehouse_id: String,

    /// Current quantity in milliunits. May be negative.
    pub quantity_milli: i64,

    /// Quantity reserved (allocated) but not yet deducted, in milliunits.
    pub reserved_milli: i64,

    /// Reorder threshold in milliunits, if configured.
    pub min_level_milli: Option<i64>,

    /// Overstock threshold in milliunits, if configured.
    pub max_level_milli: Option<i64>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StockSnapshot {
    /// Current quantity.
    #[inline]
    pub fn quantity(&self) -> Quantity {
        Quantity::from_milli(self.quantity_milli)
    }

    /// Reserved quantity.
    #[inline]
    pub fn reserved(&self) -> Quantity {
        Quantity::from_milli(self.reserved_milli)
    }

    /// Quantity available for new reservations: current minus reserved.
    #[inline]
    pub fn available(&self) -> Quantity {
        Quantity::from_milli(self.quantity_milli - self.reserved_milli)
    }

    /// Reorder threshold, if configured.
    #[inline]
    pub fn min_level(&self) -> Option<Quantity> {
        self.min_level_milli.map(Quantity::from_milli)
    }

    /// Whether the current quantity sits at or below the reorder
    /// threshold. Always false when no threshold is configured.
    pub fn is_below_min(&self) -> bool {
        match self.min_level_milli {
            Some(min) => self.quantity_milli <= min,
            None => false,
        }
    }
}

// =============================================================================
// Stock Ledger Entry
// =============================================================================

/// One immutable record of a stock mutation.
///
/// ## Invariants
/// - `quantity_after = quantity_before + change` (also CHECK-enforced in
///   the schema)
/// - `quantity_before` equals the snapshot quantity immediately prior to
///   the write, so entries for a key form an unbroken chain
/// - never updated or deleted, except by account-cascade deletion
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StockLedgerEntry {
    pub id: String,
    pub account_id: String,
    pub product_id: String,
    pub variant_id: Option<String>,
    pub warehouse_id: String,

    /// Entry kind (inbound/outbound/adjustment/transfer).
    pub kind: MovementKind,

    /// Snapshot quantity before this entry, in milliunits.
    pub quantity_before_milli: i64,

    /// Signed change in milliunits.
    pub change_milli: i64,

    /// Snapshot quantity after this entry, in milliunits.
    pub quantity_after_milli: i64,

    /// Derived tag naming the originating flow and trigger,
    /// e.g. "sale", "sale_return", "goods_receipt_delete".
    pub reference_type: String,

    /// Id of the originating record, if the flow has one.
    pub reference_id: Option<String>,

    /// User who caused the mutation.
    pub actor_id: String,

    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl StockLedgerEntry {
    /// Quantity before this entry.
    #[inline]
    pub fn quantity_before(&self) -> Quantity {
        Quantity::from_milli(self.quantity_before_milli)
    }

    /// Signed change recorded by this entry.
    #[inline]
    pub fn change(&self) -> Quantity {
        Quantity::from_milli(self.change_milli)
    }

    /// Quantity after this entry.
    #[inline]
    pub fn quantity_after(&self) -> Quantity {
        Quantity::from_milli(self.quantity_after_milli)
    }

    /// Checks the per-entry arithmetic invariant.
    #[inline]
    pub fn is_balanced(&self) -> bool {
        self.quantity_before_milli + self.change_milli == self.quantity_after_milli
    }
}

// =============================================================================
// Stock Movement
// =============================================================================

/// Coarser, reporting-oriented log of a stock-affecting transaction.
///
/// Redundant with [`StockLedgerEntry`] by design: movements carry unit
/// cost and serve valuation/timeline queries without before/after detail.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StockMovement {
    pub id: String,
    pub account_id: String,
    pub warehouse_id: String,
    pub product_id: String,
    pub variant_id: Option<String>,

    /// Direction of the flow; adjustments derive this from delta sign.
    pub direction: MovementDirection,

    /// Moved quantity in milliunits; always positive.
    pub quantity_milli: i64,

    /// Unit cost in cents at movement time, for valuation reports.
    pub unit_cost_cents: Option<i64>,

    pub reference_type: String,
    pub reference_id: Option<String>,
    pub actor_id: String,
    pub created_at: DateTime<Utc>,
}

impl StockMovement {
    /// Moved quantity.
    #[inline]
    pub fn quantity(&self) -> Quantity {
        Quantity::from_milli(self.quantity_milli)
    }

    /// Unit cost at movement time, if recorded.
    #[inline]
    pub fn unit_cost(&self) -> Option<Money> {
        self.unit_cost_cents.map(Money::from_cents)
    }

    /// Total value of this movement (unit cost × quantity), if a unit
    /// cost was recorded.
    pub fn value(&self) -> Option<Money> {
        self.unit_cost().map(|c| c.extend(self.quantity()))
    }
}

// =============================================================================
// Negative Stock Alert
// =============================================================================

/// Record created when a deduction drives a snapshot below zero.
///
/// The record itself is the deliverable; delivery (email, dashboard) is a
/// host-application concern.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct NegativeStockAlert {
    pub id: String,
    pub account_id: String,
    pub product_id: String,
    pub variant_id: Option<String>,
    pub warehouse_id: String,

    /// Quantity the triggering deduction requested, in milliunits.
    pub quantity_requested_milli: i64,

    /// Resulting (negative) stock level in milliunits.
    pub stock_level_milli: i64,

    pub status: AlertStatus,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl NegativeStockAlert {
    /// Quantity the triggering deduction requested.
    #[inline]
    pub fn quantity_requested(&self) -> Quantity {
        Quantity::from_milli(self.quantity_requested_milli)
    }

    /// Resulting stock level.
    #[inline]
    pub fn stock_level(&self) -> Quantity {
        Quantity::from_milli(self.stock_level_milli)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
