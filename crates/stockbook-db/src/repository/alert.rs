//! # Alert Repository
//!
//! Database operations for negative-stock alerts.
//!
//! Alerts are created by the engine when a deduction drives a snapshot
//! below zero, and resolved manually by account staff once the shortfall
//! is investigated. Delivery (email, dashboards) is out of scope.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use stockbook_core::NegativeStockAlert;

/// Repository for negative-stock alert operations.
#[derive(Debug, Clone)]
pub struct AlertRepository {
    pool: SqlitePool,
}

const ALERT_COLUMNS: &str = "id, account_id, product_id, variant_id, warehouse_id, \
     quantity_requested_milli, stock_level_milli, status, created_at, resolved_at";

impl AlertRepository {
    /// Creates a new AlertRepository.
    pub fn new(pool: SqlitePool) -> Self {
        AlertRepository { pool }
    }

    /// Gets an alert by its ID within an account.
    pub async fn get_by_id(
        &self,
        account_id: &str,
        id: &str,
    ) -> DbResult<Option<NegativeStockAlert>> {
        let alert = sqlx::query_as::<_, NegativeStockAlert>(&format!(
            "SELECT {ALERT_COLUMNS} FROM negative_stock_alerts \
             WHERE account_id = ?1 AND id = ?2"
        ))
        .bind(account_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(alert)
    }

    /// Lists active alerts for an account, newest first.
    pub async fn list_active(&self, account_id: &str) -> DbResult<Vec<NegativeStockAlert>> {
        let alerts = sqlx::query_as::<_, NegativeStockAlert>(&format!(
            "SELECT {ALERT_COLUMNS} FROM negative_stock_alerts \
             WHERE account_id = ?1 AND status = 'active' \
             ORDER BY created_at DESC"
        ))
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(alerts)
    }

    /// Marks an alert resolved.
    ///
    /// ## State Machine
    /// `active → resolved`, one way, manual. Resolving an already
    /// resolved (or unknown) alert is a NotFound.
    pub async fn resolve(&self, account_id: &str, id: &str) -> DbResult<()> {
        debug!(id = %id, "Resolving negative-stock alert");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE negative_stock_alerts
            SET status = 'resolved', resolved_at = ?3
            WHERE account_id = ?1 AND id = ?2 AND status = 'active'
            "#,
        )
        .bind(account_id)
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("NegativeStockAlert (active)", id));
        }

        Ok(())
    }
}

// =============================================================================
// Transaction-Scoped Writes
// =============================================================================

/// Inserts an alert on an existing transaction.
///
/// Lives inside the deduction transaction so a negative-crossing
/// deduction and its alert commit (or roll back) together.
pub(crate) async fn insert_tx(
    conn: &mut SqliteConnection,
    alert: &NegativeStockAlert,
) -> DbResult<()> {
    debug!(
        product_id = %alert.product_id,
        stock_level = %alert.stock_level(),
        "Creating negative-stock alert"
    );

    sqlx::query(
        r#"
        INSERT INTO negative_stock_alerts (
            id, account_id, product_id, variant_id, warehouse_id,
            quantity_requested_milli, stock_level_milli, status,
            created_at, resolved_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
    )
    .bind(&alert.id)
    .bind(&alert.account_id)
    .bind(&alert.product_id)
    .bind(&alert.variant_id)
    .bind(&alert.warehouse_id)
    .bind(alert.quantity_requested_milli)
    .bind(alert.stock_level_milli)
    .bind(alert.status)
    .bind(alert.created_at)
    .bind(alert.resolved_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Helper to generate a new alert ID.
pub fn generate_alert_id() -> String {
    Uuid::new_v4().to_string()
}
