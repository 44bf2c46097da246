//! # Snapshot Repository
//!
//! Database operations for current-quantity snapshot rows.
//!
//! ## Delta Updates
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                    Snapshot Update Strategy                         │
//! │                                                                     │
//! │  ❌ WRONG: absolute write computed outside the transaction          │
//! │     UPDATE stock_snapshots SET quantity_milli = 6000 WHERE id = ?   │
//! │                                                                     │
//! │  ✅ CORRECT: relative delta inside the engine transaction           │
//! │     UPDATE stock_snapshots                                          │
//! │     SET quantity_milli = quantity_milli + (-4000) WHERE id = ?      │
//! │                                                                     │
//! │  The engine reads the before-value in the same transaction, so the  │
//! │  ledger entry's before/after pair and the snapshot cannot diverge   │
//! │  under concurrent writers.                                          │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use stockbook_core::{Quantity, StockSnapshot};

/// Repository for stock snapshot operations.
#[derive(Debug, Clone)]
pub struct SnapshotRepository {
    pool: SqlitePool,
}

const SNAPSHOT_COLUMNS: &str = "id, account_id, product_id, variant_id, warehouse_id, \
     quantity_milli, reserved_milli, min_level_milli, max_level_milli, created_at, updated_at";

impl SnapshotRepository {
    /// Creates a new SnapshotRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SnapshotRepository { pool }
    }

    /// Gets the snapshot for a stock key, if one exists yet.
    ///
    /// ## Note
    /// Snapshots are created lazily by the engine; a missing row means no
    /// stock-affecting event has touched this key.
    pub async fn get(
        &self,
        account_id: &str,
        product_id: &str,
        variant_id: Option<&str>,
        warehouse_id: &str,
    ) -> DbResult<Option<StockSnapshot>> {
        let mut conn = self.pool.acquire().await?;
        get_tx(&mut conn, account_id, product_id, variant_id, warehouse_id).await
    }

    /// Sets the reorder/overstock thresholds on a snapshot.
    pub async fn set_levels(
        &self,
        account_id: &str,
        snapshot_id: &str,
        min_level: Option<Quantity>,
        max_level: Option<Quantity>,
    ) -> DbResult<()> {
        debug!(id = %snapshot_id, "Setting snapshot levels");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE stock_snapshots
            SET min_level_milli = ?3, max_level_milli = ?4, updated_at = ?5
            WHERE account_id = ?1 AND id = ?2
            "#,
        )
        .bind(account_id)
        .bind(snapshot_id)
        .bind(min_level.map(|q| q.milli()))
        .bind(max_level.map(|q| q.milli()))
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("StockSnapshot", snapshot_id));
        }

        Ok(())
    }

    /// Lists snapshots sitting at or below their reorder threshold.
    ///
    /// ## Usage
    /// Reorder report; read-only.
    pub async fn list_low_stock(&self, account_id: &str) -> DbResult<Vec<StockSnapshot>> {
        let snapshots = sqlx::query_as::<_, StockSnapshot>(&format!(
            "SELECT {SNAPSHOT_COLUMNS} FROM stock_snapshots \
             WHERE account_id = ?1 \
               AND min_level_milli IS NOT NULL \
               AND quantity_milli <= min_level_milli \
             ORDER BY quantity_milli"
        ))
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(snapshots)
    }

    /// Lists all snapshots in a warehouse.
    pub async fn list_for_warehouse(
        &self,
        account_id: &str,
        warehouse_id: &str,
    ) -> DbResult<Vec<StockSnapshot>> {
        let snapshots = sqlx::query_as::<_, StockSnapshot>(&format!(
            "SELECT {SNAPSHOT_COLUMNS} FROM stock_snapshots \
             WHERE account_id = ?1 AND warehouse_id = ?2 \
             ORDER BY product_id, variant_id"
        ))
        .bind(account_id)
        .bind(warehouse_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(snapshots)
    }
}

// =============================================================================
// Transaction-Scoped Operations
// =============================================================================

/// Gets the snapshot for a stock key on an existing connection.
///
/// `IS ?` (not `=`) so a NULL variant key matches NULL rows.
pub(crate) async fn get_tx(
    conn: &mut SqliteConnection,
    account_id: &str,
    product_id: &str,
    variant_id: Option<&str>,
    warehouse_id: &str,
) -> DbResult<Option<StockSnapshot>> {
    let snapshot = sqlx::query_as::<_, StockSnapshot>(&format!(
        "SELECT {SNAPSHOT_COLUMNS} FROM stock_snapshots \
         WHERE account_id = ?1 AND product_id = ?2 AND variant_id IS ?3 AND warehouse_id = ?4"
    ))
    .bind(account_id)
    .bind(product_id)
    .bind(variant_id)
    .bind(warehouse_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(snapshot)
}

/// Gets the snapshot for a key, creating a zero-quantity row on first use.
///
/// ## Lazy Creation
/// Snapshot rows exist only for keys that have seen a stock-affecting
/// event. The caller is already inside the engine transaction, so the
/// create is atomic with the mutation that triggered it.
pub(crate) async fn get_or_create_tx(
    conn: &mut SqliteConnection,
    account_id: &str,
    product_id: &str,
    variant_id: Option<&str>,
    warehouse_id: &str,
) -> DbResult<StockSnapshot> {
    if let Some(snapshot) = get_tx(conn, account_id, product_id, variant_id, warehouse_id).await? {
        return Ok(snapshot);
    }

    let now = Utc::now();
    let snapshot = StockSnapshot {
        id: Uuid::new_v4().to_string(),
        account_id: account_id.to_string(),
        product_id: product_id.to_string(),
        variant_id: variant_id.map(str::to_string),
        warehouse_id: warehouse_id.to_string(),
        quantity_milli: 0,
        reserved_milli: 0,
        min_level_milli: None,
        max_level_milli: None,
        created_at: now,
        updated_at: now,
    };

    debug!(
        product_id = %product_id,
        warehouse_id = %warehouse_id,
        "Creating snapshot row on first movement"
    );

    sqlx::query(
        r#"
        INSERT INTO stock_snapshots (
            id, account_id, product_id, variant_id, warehouse_id,
            quantity_milli, reserved_milli, min_level_milli, max_level_milli,
            created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        "#,
    )
    .bind(&snapshot.id)
    .bind(&snapshot.account_id)
    .bind(&snapshot.product_id)
    .bind(&snapshot.variant_id)
    .bind(&snapshot.warehouse_id)
    .bind(snapshot.quantity_milli)
    .bind(snapshot.reserved_milli)
    .bind(snapshot.min_level_milli)
    .bind(snapshot.max_level_milli)
    .bind(snapshot.created_at)
    .bind(snapshot.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(snapshot)
}

/// Applies a signed quantity delta to a snapshot row.
///
/// Relative update; the engine has already read the before-value in this
/// transaction and checked the arithmetic with [`Quantity::checked_add`].
pub(crate) async fn apply_quantity_delta_tx(
    conn: &mut SqliteConnection,
    snapshot_id: &str,
    delta: Quantity,
) -> DbResult<()> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        UPDATE stock_snapshots
        SET quantity_milli = quantity_milli + ?2, updated_at = ?3
        WHERE id = ?1
        "#,
    )
    .bind(snapshot_id)
    .bind(delta.milli())
    .bind(now)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("StockSnapshot", snapshot_id));
    }

    Ok(())
}

/// Applies a signed delta to a snapshot's reserved quantity.
pub(crate) async fn apply_reserved_delta_tx(
    conn: &mut SqliteConnection,
    snapshot_id: &str,
    delta: Quantity,
) -> DbResult<()> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        UPDATE stock_snapshots
        SET reserved_milli = reserved_milli + ?2, updated_at = ?3
        WHERE id = ?1
        "#,
    )
    .bind(snapshot_id)
    .bind(delta.milli())
    .bind(now)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("StockSnapshot", snapshot_id));
    }

    Ok(())
}
