//! # Repository Module
//!
//! Database repository implementations for Stockbook.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern Explained                     │
//! │                                                                     │
//! │  The Repository pattern abstracts database access behind a clean    │
//! │  API and keeps all SQL in one place per table.                      │
//! │                                                                     │
//! │  Host application / StockEngine                                     │
//! │       │                                                             │
//! │       │  db.ledger().for_key(account, key, 50)                      │
//! │       ▼                                                             │
//! │  LedgerRepository                                                   │
//! │  ├── for_key(...)        read-only, runs on the pool                │
//! │  ├── for_reference(...)                                             │
//! │  └── append_tx(conn, ..) write, runs inside the engine transaction  │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  SQLite Database                                                    │
//! │                                                                     │
//! │  Write-path functions take `&mut SqliteConnection` so one engine    │
//! │  transaction can span snapshot, ledger, movement and alert writes.  │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`product::ProductRepository`] - Products and variants
//! - [`warehouse::WarehouseRepository`] - Branches, warehouses, access grid
//! - [`snapshot::SnapshotRepository`] - Current-quantity rows
//! - [`ledger::LedgerRepository`] - Append-only stock ledger
//! - [`movement::MovementRepository`] - Reporting movement log
//! - [`alert::AlertRepository`] - Negative-stock alerts

pub mod alert;
pub mod ledger;
pub mod movement;
pub mod product;
pub mod snapshot;
pub mod warehouse;
