//! # stockbook-db: Database Layer and Stock Engine
//!
//! This crate provides SQLite persistence and the transactional stock
//! engine for Stockbook.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                      Stockbook Data Flow                            │
//! │                                                                     │
//! │  Host flow (sale finalized, receipt booked, service edited)         │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  ┌───────────────────────────────────────────────────────────────┐  │
//! │  │                  stockbook-db (THIS CRATE)                    │  │
//! │  │                                                               │  │
//! │  │  ┌────────────┐  ┌──────────────┐  ┌────────────────────┐     │  │
//! │  │  │  Database  │  │ StockEngine  │  │   Repositories     │     │  │
//! │  │  │ (pool.rs)  │  │ (engine.rs)  │  │ (repository/*.rs)  │     │  │
//! │  │  │            │  │              │  │                    │     │  │
//! │  │  │ SqlitePool │◄─│ deduct       │  │ SnapshotRepository │     │  │
//! │  │  │ Migrations │  │ restore      │  │ LedgerRepository   │     │  │
//! │  │  │ WAL mode   │  │ adjust ...   │  │ MovementRepository │     │  │
//! │  │  └────────────┘  └──────────────┘  └────────────────────┘     │  │
//! │  │                                                               │  │
//! │  └───────────────────────────────────────────────────────────────┘  │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  SQLite Database (stockbook.db)                                     │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`engine`] - The transactional stock operations
//! - [`repository`] - Repository implementations (one per table)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stockbook_db::{Database, DbConfig, StockContext};
//!
//! let db = Database::new(DbConfig::new("path/to/stockbook.db")).await?;
//! let ctx = StockContext::new(account_id, user_id);
//!
//! // Mutations run through the engine, one transaction each
//! let outcome = db.engine().deduct(&ctx, request).await?;
//!
//! // Reporting reads go straight to repositories
//! let alerts = db.alerts().list_active(&ctx.account_id).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod engine;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use engine::{
    AdjustmentRequest, DeductionRequest, EngineError, EngineResult, MutationOutcome,
    ReceiptRequest, ReservationRequest, RestorationRequest, StockContext, StockEngine,
    TransferOutcome, TransferRequest, WarehouseSelector,
};
pub use error::DbError;
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::alert::AlertRepository;
pub use repository::ledger::LedgerRepository;
pub use repository::movement::MovementRepository;
pub use repository::product::ProductRepository;
pub use repository::snapshot::SnapshotRepository;
pub use repository::warehouse::WarehouseRepository;
