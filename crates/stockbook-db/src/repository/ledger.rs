//! # Ledger Repository
//!
//! Append and read operations for the immutable stock ledger.
//!
//! ## Append-Only Contract
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  Writes:  INSERT, nothing else. No UPDATE or DELETE exists here.    │
//! │                                                                     │
//! │  Each entry chains to its predecessor for the same key:             │
//! │                                                                     │
//! │    { before: 10.000, change: -4.000, after: 6.000 }                 │
//! │    { before:  6.000, change: -10.000, after: -4.000 }               │
//! │              ▲                                                      │
//! │              └── equals previous entry's after                      │
//! │                                                                     │
//! │  Reads are the activity timeline and discrepancy investigations.    │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use stockbook_core::StockLedgerEntry;

/// Repository for stock ledger operations.
#[derive(Debug, Clone)]
pub struct LedgerRepository {
    pool: SqlitePool,
}

const LEDGER_COLUMNS: &str = "id, account_id, product_id, variant_id, warehouse_id, kind, \
     quantity_before_milli, change_milli, quantity_after_milli, \
     reference_type, reference_id, actor_id, notes, created_at";

impl LedgerRepository {
    /// Creates a new LedgerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        LedgerRepository { pool }
    }

    /// Lists entries for a stock key, newest first.
    ///
    /// ## Usage
    /// Activity timeline for one product/warehouse combination.
    pub async fn for_key(
        &self,
        account_id: &str,
        product_id: &str,
        variant_id: Option<&str>,
        warehouse_id: &str,
        limit: u32,
    ) -> DbResult<Vec<StockLedgerEntry>> {
        let entries = sqlx::query_as::<_, StockLedgerEntry>(&format!(
            "SELECT {LEDGER_COLUMNS} FROM stock_ledger \
             WHERE account_id = ?1 AND product_id = ?2 AND variant_id IS ?3 AND warehouse_id = ?4 \
             ORDER BY created_at DESC, id DESC \
             LIMIT ?5"
        ))
        .bind(account_id)
        .bind(product_id)
        .bind(variant_id)
        .bind(warehouse_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Lists the full chain for a stock key, oldest first.
    ///
    /// ## Usage
    /// Consistency audits: walk the chain and verify each entry's
    /// before-value equals its predecessor's after-value.
    pub async fn chain_for_key(
        &self,
        account_id: &str,
        product_id: &str,
        variant_id: Option<&str>,
        warehouse_id: &str,
    ) -> DbResult<Vec<StockLedgerEntry>> {
        let entries = sqlx::query_as::<_, StockLedgerEntry>(&format!(
            "SELECT {LEDGER_COLUMNS} FROM stock_ledger \
             WHERE account_id = ?1 AND product_id = ?2 AND variant_id IS ?3 AND warehouse_id = ?4 \
             ORDER BY created_at, id"
        ))
        .bind(account_id)
        .bind(product_id)
        .bind(variant_id)
        .bind(warehouse_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Lists entries written for one originating record.
    ///
    /// ## Example
    /// All entries for sale S1, across its lines and reversals:
    /// `for_reference(account, "S1").await?`
    pub async fn for_reference(
        &self,
        account_id: &str,
        reference_id: &str,
    ) -> DbResult<Vec<StockLedgerEntry>> {
        let entries = sqlx::query_as::<_, StockLedgerEntry>(&format!(
            "SELECT {LEDGER_COLUMNS} FROM stock_ledger \
             WHERE account_id = ?1 AND reference_id = ?2 \
             ORDER BY created_at, id"
        ))
        .bind(account_id)
        .bind(reference_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Sums the signed changes recorded for a stock key.
    ///
    /// The snapshot invariant says this equals the snapshot quantity for
    /// keys created at zero.
    pub async fn net_change_for_key(
        &self,
        account_id: &str,
        product_id: &str,
        variant_id: Option<&str>,
        warehouse_id: &str,
    ) -> DbResult<i64> {
        let net: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT SUM(change_milli)
            FROM stock_ledger
            WHERE account_id = ?1 AND product_id = ?2 AND variant_id IS ?3 AND warehouse_id = ?4
            "#,
        )
        .bind(account_id)
        .bind(product_id)
        .bind(variant_id)
        .bind(warehouse_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(net.unwrap_or(0))
    }

    /// Counts all entries for an account (for diagnostics).
    pub async fn count(&self, account_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM stock_ledger WHERE account_id = ?1")
            .bind(account_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Transaction-Scoped Writes
// =============================================================================

/// Appends a ledger entry on an existing transaction.
///
/// The only write this table ever sees.
pub(crate) async fn append_tx(
    conn: &mut SqliteConnection,
    entry: &StockLedgerEntry,
) -> DbResult<()> {
    debug!(
        product_id = %entry.product_id,
        warehouse_id = %entry.warehouse_id,
        kind = ?entry.kind,
        change = %entry.change(),
        reference = %entry.reference_type,
        "Appending ledger entry"
    );

    sqlx::query(
        r#"
        INSERT INTO stock_ledger (
            id, account_id, product_id, variant_id, warehouse_id, kind,
            quantity_before_milli, change_milli, quantity_after_milli,
            reference_type, reference_id, actor_id, notes, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
        "#,
    )
    .bind(&entry.id)
    .bind(&entry.account_id)
    .bind(&entry.product_id)
    .bind(&entry.variant_id)
    .bind(&entry.warehouse_id)
    .bind(entry.kind)
    .bind(entry.quantity_before_milli)
    .bind(entry.change_milli)
    .bind(entry.quantity_after_milli)
    .bind(&entry.reference_type)
    .bind(&entry.reference_id)
    .bind(&entry.actor_id)
    .bind(&entry.notes)
    .bind(entry.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Helper to generate a new ledger entry ID.
pub fn generate_entry_id() -> String {
    Uuid::new_v4().to_string()
}
