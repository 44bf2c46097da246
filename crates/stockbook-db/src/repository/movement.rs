//! # Movement Repository
//!
//! Append and read operations for the coarse movement log.
//!
//! Movements repeat information the ledger already holds, on purpose:
//! reporting queries want per-warehouse flow and valuation without
//! reconstructing it from before/after pairs.

use serde::Serialize;
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use stockbook_core::{Money, Quantity, StockMovement};

/// Repository for stock movement operations.
#[derive(Debug, Clone)]
pub struct MovementRepository {
    pool: SqlitePool,
}

const MOVEMENT_COLUMNS: &str = "id, account_id, warehouse_id, product_id, variant_id, \
     direction, quantity_milli, unit_cost_cents, reference_type, reference_id, \
     actor_id, created_at";

/// Inbound/outbound flow totals for one warehouse.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct WarehouseFlow {
    pub inbound_milli: i64,
    pub outbound_milli: i64,
}

impl WarehouseFlow {
    /// Total quantity received.
    pub fn inbound(&self) -> Quantity {
        Quantity::from_milli(self.inbound_milli)
    }

    /// Total quantity shipped/sold.
    pub fn outbound(&self) -> Quantity {
        Quantity::from_milli(self.outbound_milli)
    }

    /// Net flow (inbound - outbound).
    pub fn net(&self) -> Quantity {
        Quantity::from_milli(self.inbound_milli - self.outbound_milli)
    }
}

impl MovementRepository {
    /// Creates a new MovementRepository.
    pub fn new(pool: SqlitePool) -> Self {
        MovementRepository { pool }
    }

    /// Lists recent movements in a warehouse, newest first.
    pub async fn recent_for_warehouse(
        &self,
        account_id: &str,
        warehouse_id: &str,
        limit: u32,
    ) -> DbResult<Vec<StockMovement>> {
        let movements = sqlx::query_as::<_, StockMovement>(&format!(
            "SELECT {MOVEMENT_COLUMNS} FROM stock_movements \
             WHERE account_id = ?1 AND warehouse_id = ?2 \
             ORDER BY created_at DESC, id DESC \
             LIMIT ?3"
        ))
        .bind(account_id)
        .bind(warehouse_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(movements)
    }

    /// Lists movements written for one originating record.
    pub async fn for_reference(
        &self,
        account_id: &str,
        reference_id: &str,
    ) -> DbResult<Vec<StockMovement>> {
        let movements = sqlx::query_as::<_, StockMovement>(&format!(
            "SELECT {MOVEMENT_COLUMNS} FROM stock_movements \
             WHERE account_id = ?1 AND reference_id = ?2 \
             ORDER BY created_at, id"
        ))
        .bind(account_id)
        .bind(reference_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(movements)
    }

    /// Sums inbound/outbound flow for a warehouse.
    ///
    /// ## Usage
    /// Flow dashboards and receiving-vs-shipping reconciliation.
    pub async fn flow_for_warehouse(
        &self,
        account_id: &str,
        warehouse_id: &str,
    ) -> DbResult<WarehouseFlow> {
        let flow = sqlx::query_as::<_, WarehouseFlow>(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN direction = 'inbound' THEN quantity_milli ELSE 0 END), 0)
                    AS inbound_milli,
                COALESCE(SUM(CASE WHEN direction = 'outbound' THEN quantity_milli ELSE 0 END), 0)
                    AS outbound_milli
            FROM stock_movements
            WHERE account_id = ?1 AND warehouse_id = ?2
            "#,
        )
        .bind(account_id)
        .bind(warehouse_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(flow)
    }

    /// Total value of outbound movements for a warehouse, over movements
    /// that carry a unit cost.
    ///
    /// Movements without a recorded cost are excluded, not treated as
    /// zero-cost.
    pub async fn outbound_value_for_warehouse(
        &self,
        account_id: &str,
        warehouse_id: &str,
    ) -> DbResult<Money> {
        // unit_cost_cents × quantity_milli / 1000, summed in SQL
        let cents: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT CAST(SUM(unit_cost_cents * quantity_milli / 1000) AS INTEGER)
            FROM stock_movements
            WHERE account_id = ?1 AND warehouse_id = ?2
              AND direction = 'outbound'
              AND unit_cost_cents IS NOT NULL
            "#,
        )
        .bind(account_id)
        .bind(warehouse_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(Money::from_cents(cents.unwrap_or(0)))
    }
}

// =============================================================================
// Transaction-Scoped Writes
// =============================================================================

/// Appends a movement record on an existing transaction.
pub(crate) async fn append_tx(
    conn: &mut SqliteConnection,
    movement: &StockMovement,
) -> DbResult<()> {
    debug!(
        product_id = %movement.product_id,
        warehouse_id = %movement.warehouse_id,
        direction = ?movement.direction,
        quantity = %movement.quantity(),
        "Appending movement"
    );

    sqlx::query(
        r#"
        INSERT INTO stock_movements (
            id, account_id, warehouse_id, product_id, variant_id,
            direction, quantity_milli, unit_cost_cents,
            reference_type, reference_id, actor_id, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        "#,
    )
    .bind(&movement.id)
    .bind(&movement.account_id)
    .bind(&movement.warehouse_id)
    .bind(&movement.product_id)
    .bind(&movement.variant_id)
    .bind(movement.direction)
    .bind(movement.quantity_milli)
    .bind(movement.unit_cost_cents)
    .bind(&movement.reference_type)
    .bind(&movement.reference_id)
    .bind(&movement.actor_id)
    .bind(movement.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Helper to generate a new movement ID.
pub fn generate_movement_id() -> String {
    Uuid::new_v4().to_string()
}
