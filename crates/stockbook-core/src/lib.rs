//! # stockbook-core: Pure Domain Logic for the Stock Ledger Engine
//!
//! This crate is the **heart** of Stockbook. It contains all domain logic
//! as pure functions and types with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                      Stockbook Architecture                         │
//! │                                                                     │
//! │  ┌───────────────────────────────────────────────────────────────┐  │
//! │  │              Host Application (out of scope)                  │  │
//! │  │   Sales/POS ── Tailor Services ── Goods Receipts ── Rentals   │  │
//! │  └──────────────────────────────┬────────────────────────────────┘  │
//! │                                 │ in-process calls                  │
//! │  ┌──────────────────────────────▼────────────────────────────────┐  │
//! │  │              stockbook-db (StockEngine + SQLite)              │  │
//! │  │   deduct / restore / receive / adjust / transfer / reserve    │  │
//! │  └──────────────────────────────┬────────────────────────────────┘  │
//! │                                 │                                   │
//! │  ┌──────────────────────────────▼────────────────────────────────┐  │
//! │  │            ★ stockbook-core (THIS CRATE) ★                    │  │
//! │  │                                                               │  │
//! │  │  ┌──────────┐ ┌──────────┐ ┌───────────┐ ┌────────────────┐  │  │
//! │  │  │  types   │ │ quantity │ │ reference │ │   validation   │  │  │
//! │  │  │ Snapshot │ │ Quantity │ │ StockRef  │ │     rules      │  │  │
//! │  │  │ Ledger   │ │  Money   │ │ triggers  │ │     checks     │  │  │
//! │  │  └──────────┘ └──────────┘ └───────────┘ └────────────────┘  │  │
//! │  │                                                               │  │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS          │  │
//! │  └───────────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (StockSnapshot, StockLedgerEntry, etc.)
//! - [`quantity`] - Quantity type with integer arithmetic (no floats!)
//! - [`money`] - Money type for movement unit costs and valuation
//! - [`reference`] - Typed links from ledger entries to their causes
//! - [`error`] - Domain error types
//! - [`validation`] - Request input validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: every function is deterministic
//! 2. **No I/O**: database, network, file system access is FORBIDDEN here
//! 3. **Integer Quantities**: milliunits (i64), never floating point
//! 4. **Explicit Errors**: all errors are typed, never strings or panics
//! 5. **No Ambient State**: account and actor are explicit parameters on
//!    every engine call; there is no "current user" global anywhere
//!
//! ## Example Usage
//!
//! ```rust
//! use stockbook_core::{Quantity, StockReference, StockTrigger};
//!
//! // Quantities are integer milliunits (never floats!)
//! let requested = Quantity::from_units_milli(4, 250); // 4.250
//!
//! // References are typed per calling flow
//! let reference = StockReference::Sale { sale_id: "S1".into() };
//!
//! // The stored ledger tag is derived from flow + trigger
//! assert_eq!(reference.ledger_tag(StockTrigger::Deletion), "sale_delete");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod quantity;
pub mod reference;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use stockbook_core::Quantity` instead of
// `use stockbook_core::quantity::Quantity`

pub use error::{StockError, StockResult, ValidationError};
pub use money::Money;
pub use quantity::Quantity;
pub use reference::{StockReference, StockTrigger};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum length of an adjustment reason.
///
/// ## Business Reason
/// Reasons land in ledger notes and discrepancy reports; a bound keeps
/// exports and list views usable.
pub const MAX_REASON_LEN: usize = 250;

/// Maximum length of free-text notes on a ledger entry.
pub const MAX_NOTES_LEN: usize = 500;
