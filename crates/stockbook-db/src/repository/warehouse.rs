//! # Warehouse Repository
//!
//! Database operations for branches, warehouses and the access grid that
//! deduction resolution walks.
//!
//! ## Resolution Inputs
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  branch_warehouses (branch_id, warehouse_id, can_modify)            │
//! │                                                                     │
//! │  branch "Mall"   ──can_modify=1──► warehouse "Mall backroom"        │
//! │  branch "Mall"   ──can_modify=0──► warehouse "Central"   (read-only)│
//! │  branch "Kiosk"  ──(no rows)                                        │
//! │                                                                     │
//! │  deduct @ Mall   → "Mall backroom"                                  │
//! │  deduct @ Kiosk  → account's active 'main' warehouse, or error      │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//! The decision itself (grid → main fallback → explicit error) is made in
//! the engine; this module only answers the individual questions.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use stockbook_core::{Branch, Warehouse};

/// Repository for warehouse and branch database operations.
#[derive(Debug, Clone)]
pub struct WarehouseRepository {
    pool: SqlitePool,
}

const WAREHOUSE_COLUMNS: &str = "id, account_id, name, kind, is_active, created_at";

impl WarehouseRepository {
    /// Creates a new WarehouseRepository.
    pub fn new(pool: SqlitePool) -> Self {
        WarehouseRepository { pool }
    }

    /// Inserts a warehouse.
    pub async fn insert(&self, warehouse: &Warehouse) -> DbResult<()> {
        debug!(name = %warehouse.name, kind = ?warehouse.kind, "Inserting warehouse");

        sqlx::query(
            r#"
            INSERT INTO warehouses (id, account_id, name, kind, is_active, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&warehouse.id)
        .bind(&warehouse.account_id)
        .bind(&warehouse.name)
        .bind(warehouse.kind)
        .bind(warehouse.is_active)
        .bind(warehouse.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Inserts a branch.
    pub async fn insert_branch(&self, branch: &Branch) -> DbResult<()> {
        debug!(name = %branch.name, "Inserting branch");

        sqlx::query(
            r#"
            INSERT INTO branches (id, account_id, name, is_active, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&branch.id)
        .bind(&branch.account_id)
        .bind(&branch.name)
        .bind(branch.is_active)
        .bind(branch.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Grants (or updates) a branch's access to a warehouse.
    ///
    /// ## Arguments
    /// * `can_modify` - whether stock mutations addressed to the branch
    ///   may land in this warehouse
    pub async fn grant_access(
        &self,
        branch_id: &str,
        warehouse_id: &str,
        can_modify: bool,
    ) -> DbResult<()> {
        debug!(branch_id = %branch_id, warehouse_id = %warehouse_id, can_modify = can_modify, "Granting warehouse access");

        sqlx::query(
            r#"
            INSERT INTO branch_warehouses (branch_id, warehouse_id, can_modify)
            VALUES (?1, ?2, ?3)
            ON CONFLICT (branch_id, warehouse_id) DO UPDATE SET can_modify = ?3
            "#,
        )
        .bind(branch_id)
        .bind(warehouse_id)
        .bind(can_modify)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a warehouse by its ID within an account.
    pub async fn get_by_id(&self, account_id: &str, id: &str) -> DbResult<Option<Warehouse>> {
        let mut conn = self.pool.acquire().await?;
        get_by_id_tx(&mut conn, account_id, id).await
    }

    /// Lists active warehouses of an account.
    pub async fn list(&self, account_id: &str) -> DbResult<Vec<Warehouse>> {
        let warehouses = sqlx::query_as::<_, Warehouse>(&format!(
            "SELECT {WAREHOUSE_COLUMNS} FROM warehouses \
             WHERE account_id = ?1 AND is_active = 1 ORDER BY name"
        ))
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(warehouses)
    }
}

// =============================================================================
// Transaction-Scoped Reads
// =============================================================================

/// Gets a warehouse by ID on an existing connection/transaction.
pub(crate) async fn get_by_id_tx(
    conn: &mut SqliteConnection,
    account_id: &str,
    id: &str,
) -> DbResult<Option<Warehouse>> {
    let warehouse = sqlx::query_as::<_, Warehouse>(&format!(
        "SELECT {WAREHOUSE_COLUMNS} FROM warehouses WHERE account_id = ?1 AND id = ?2"
    ))
    .bind(account_id)
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(warehouse)
}

/// Finds an active warehouse the branch may modify, if any.
///
/// Ordered by creation time so resolution is deterministic when a branch
/// holds several modifiable warehouses.
pub(crate) async fn modifiable_for_branch_tx(
    conn: &mut SqliteConnection,
    account_id: &str,
    branch_id: &str,
) -> DbResult<Option<Warehouse>> {
    let warehouse = sqlx::query_as::<_, Warehouse>(
        r#"
        SELECT w.id, w.account_id, w.name, w.kind, w.is_active, w.created_at
        FROM warehouses w
        INNER JOIN branch_warehouses bw ON bw.warehouse_id = w.id
        WHERE bw.branch_id = ?1
          AND bw.can_modify = 1
          AND w.account_id = ?2
          AND w.is_active = 1
        ORDER BY w.created_at
        LIMIT 1
        "#,
    )
    .bind(branch_id)
    .bind(account_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(warehouse)
}

/// Finds the account's active main warehouse, if any.
pub(crate) async fn main_for_account_tx(
    conn: &mut SqliteConnection,
    account_id: &str,
) -> DbResult<Option<Warehouse>> {
    let warehouse = sqlx::query_as::<_, Warehouse>(&format!(
        "SELECT {WAREHOUSE_COLUMNS} FROM warehouses \
         WHERE account_id = ?1 AND kind = 'main' AND is_active = 1 \
         ORDER BY created_at LIMIT 1"
    ))
    .bind(account_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(warehouse)
}

/// Helper to generate a new warehouse ID.
pub fn generate_warehouse_id() -> String {
    Uuid::new_v4().to_string()
}

/// Helper to generate a new branch ID.
pub fn generate_branch_id() -> String {
    Uuid::new_v4().to_string()
}
