//! # Stock Engine
//!
//! The transactional operations over the stock ledger.
//!
//! ## Operation Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                 Every Mutation Is One Transaction                   │
//! │                                                                     │
//! │  deduct(ctx, request)                                               │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  ┌───────────────────────────────────────────────────────────────┐  │
//! │  │                   SINGLE TRANSACTION                          │  │
//! │  │                                                               │  │
//! │  │  1. Load product, check variant ownership                     │  │
//! │  │  2. Resolve warehouse (branch grid → main fallback → error)   │  │
//! │  │  3. Read snapshot (create lazily at zero)                     │  │
//! │  │  4. Availability check (unless negative stock allowed)        │  │
//! │  │  5. UPDATE snapshot quantity by delta                         │  │
//! │  │  6. INSERT ledger entry (before/change/after)                 │  │
//! │  │  7. INSERT movement record                                    │  │
//! │  │  8. INSERT negative-stock alert (if result < 0)               │  │
//! │  │                                                               │  │
//! │  └───────────────────────────────────────────────────────────────┘  │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  COMMIT ← all writes land together, or none do                      │
//! │                                                                     │
//! │  Concurrent calls against the same key are serialized by SQLite's   │
//! │  locking; there are no version counters or app-level locks.         │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Callers
//! Sales/POS (deduct per line, restore on delete), tailor services
//! (deduct on create, restore on edit/delete), goods receipts (receive on
//! create, deduct on delete, transfer on relocation edits), rental
//! inventory (deduct on allocation, restore on release).

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::{Sqlite, SqlitePool, Transaction};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::DbError;
use crate::repository::{alert, ledger, movement, product, snapshot, warehouse};
use stockbook_core::validation::{
    validate_adjustment_delta, validate_notes, validate_positive_quantity, validate_reason,
};
use stockbook_core::{
    AlertStatus, Money, MovementDirection, MovementKind, NegativeStockAlert, Product, Quantity,
    StockError, StockLedgerEntry, StockMovement, StockReference, StockSnapshot, StockTrigger,
    Warehouse,
};

// =============================================================================
// Engine Error
// =============================================================================

/// Errors surfaced by engine operations: stock policy violations or
/// database failures. Either way the transaction was rolled back.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Stock(#[from] StockError),

    #[error(transparent)]
    Db(#[from] DbError),
}

impl From<stockbook_core::ValidationError> for EngineError {
    fn from(err: stockbook_core::ValidationError) -> Self {
        EngineError::Stock(StockError::Validation(err))
    }
}

impl From<sqlx::Error> for EngineError {
    fn from(err: sqlx::Error) -> Self {
        EngineError::Db(DbError::from(err))
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

// =============================================================================
// Context & Request Types
// =============================================================================

/// Explicit caller identity for every engine call.
///
/// There is deliberately no ambient "current account/user" anywhere in
/// this crate; the host threads these through from its own session.
#[derive(Debug, Clone)]
pub struct StockContext {
    /// Account (tenant) every query and write is scoped to.
    pub account_id: String,
    /// User recorded as the actor on ledger entries and movements.
    pub actor_id: String,
}

impl StockContext {
    /// Creates a new context.
    pub fn new(account_id: impl Into<String>, actor_id: impl Into<String>) -> Self {
        StockContext {
            account_id: account_id.into(),
            actor_id: actor_id.into(),
        }
    }
}

/// How an operation addresses its warehouse.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum WarehouseSelector {
    /// Resolve through the branch's access grid, falling back to the
    /// account's main warehouse.
    Branch { branch_id: String },
    /// Use this exact warehouse (must be active and owned by the
    /// account).
    Warehouse { warehouse_id: String },
}

/// A deduction: stock leaving a key for a sale, service line, rental
/// allocation, or receipt deletion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeductionRequest {
    pub product_id: String,
    pub variant_id: Option<String>,
    pub warehouse: WarehouseSelector,
    /// Quantity to deduct; must be positive.
    pub quantity: Quantity,
    /// Unit cost for the movement record; falls back to the product's
    /// configured cost.
    pub unit_cost: Option<Money>,
    pub reference: StockReference,
    pub trigger: StockTrigger,
    pub notes: Option<String>,
}

/// A restoration: stock coming back on a return, deletion, or the
/// reversal half of an edit. Never availability-checked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestorationRequest {
    pub product_id: String,
    pub variant_id: Option<String>,
    pub warehouse: WarehouseSelector,
    /// Quantity to restore; must be positive.
    pub quantity: Quantity,
    pub unit_cost: Option<Money>,
    pub reference: StockReference,
    /// Why the stock is coming back; lands in the ledger tag
    /// (e.g. `sale_return`, `tailor_service_delete`).
    pub trigger: StockTrigger,
    pub notes: Option<String>,
}

/// An inbound goods receipt line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptRequest {
    pub product_id: String,
    pub variant_id: Option<String>,
    pub warehouse: WarehouseSelector,
    /// Quantity received; must be positive.
    pub quantity: Quantity,
    /// Purchase unit cost; falls back to the product's configured cost.
    pub unit_cost: Option<Money>,
    pub reference: StockReference,
    pub notes: Option<String>,
}

/// A manual discrepancy correction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdjustmentRequest {
    pub product_id: String,
    pub variant_id: Option<String>,
    pub warehouse: WarehouseSelector,
    /// Signed delta; positive adds stock, negative removes it. Zero is
    /// rejected.
    pub delta: Quantity,
    /// Mandatory free-text reason, stored in the entry notes.
    pub reason: String,
}

/// A rebinding of recorded stock from one key to another, used when an
/// edit changes the warehouse or variant of an already-recorded event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferRequest {
    pub product_id: String,
    pub from_variant_id: Option<String>,
    pub from_warehouse_id: String,
    pub to_variant_id: Option<String>,
    pub to_warehouse_id: String,
    /// Quantity to move; must be positive.
    pub quantity: Quantity,
    pub reference: StockReference,
    pub trigger: StockTrigger,
    pub notes: Option<String>,
}

/// A reservation against future deduction (e.g. a rental booking).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationRequest {
    pub product_id: String,
    pub variant_id: Option<String>,
    pub warehouse: WarehouseSelector,
    /// Quantity to reserve or release; must be positive.
    pub quantity: Quantity,
}

// =============================================================================
// Outcome Types
// =============================================================================

/// Result of one committed stock mutation.
#[derive(Debug, Clone, Serialize)]
pub struct MutationOutcome {
    /// The snapshot after the mutation.
    pub snapshot: StockSnapshot,
    /// The ledger entry that was appended.
    pub entry: StockLedgerEntry,
    /// Alert created when a deduction drove the quantity negative.
    pub alert: Option<NegativeStockAlert>,
}

/// Result of a committed transfer: one outcome per key.
#[derive(Debug, Clone, Serialize)]
pub struct TransferOutcome {
    pub outbound: MutationOutcome,
    pub inbound: MutationOutcome,
}

// =============================================================================
// Stock Engine
// =============================================================================

/// The transactional stock-mutation engine.
///
/// Cheap to clone; every operation acquires its own connection and runs
/// inside its own transaction.
#[derive(Debug, Clone)]
pub struct StockEngine {
    pool: SqlitePool,
}

impl StockEngine {
    /// Creates a new StockEngine.
    pub fn new(pool: SqlitePool) -> Self {
        StockEngine { pool }
    }

    /// Deducts stock for a sale, service line, rental allocation, or
    /// deduction-shaped reversal (receipt deletion).
    ///
    /// ## Returns
    /// * `Ok(Some(outcome))` - committed; outcome carries the alert if
    ///   the quantity went negative
    /// * `Ok(None)` - product does not track inventory; nothing written
    /// * `Err(StockError::InsufficientStock)` - nothing written
    ///
    /// ## Guarantee
    /// Snapshot decrement, ledger entry, movement and (possibly) alert
    /// commit together or not at all.
    pub async fn deduct(
        &self,
        ctx: &StockContext,
        request: DeductionRequest,
    ) -> EngineResult<Option<MutationOutcome>> {
        validate_positive_quantity("quantity", request.quantity)?;
        validate_notes(request.notes.as_deref())?;

        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        let (product, warehouse) = resolve_target(
            &mut tx,
            ctx,
            &request.product_id,
            request.variant_id.as_deref(),
            &request.warehouse,
        )
        .await?;

        if !product.track_inventory {
            debug!(sku = %product.sku, "Product does not track inventory; skipping deduction");
            return Ok(None);
        }

        let snap = snapshot::get_or_create_tx(
            &mut tx,
            &ctx.account_id,
            &product.id,
            request.variant_id.as_deref(),
            &warehouse.id,
        )
        .await?;

        // Availability gate. Failing here drops the transaction, which
        // also rolls back a snapshot row created two lines up.
        let available = snap.quantity();
        if !product.can_deduct(available, request.quantity) {
            return Err(StockError::InsufficientStock {
                sku: product.sku,
                name: product.name,
                available,
                requested: request.quantity,
            }
            .into());
        }

        let unit_cost = request.unit_cost.or_else(|| product.unit_cost());
        let (snapshot, entry) = write_mutation(
            &mut tx,
            ctx,
            snap,
            MovementKind::Outbound,
            -request.quantity,
            request.reference.ledger_tag(request.trigger),
            request.reference.reference_id().map(str::to_string),
            unit_cost,
            request.notes,
        )
        .await?;

        // Negative crossing: record the alert inside the same
        // transaction so "deducted negative" and "alerted" cannot
        // disagree.
        let alert = if snapshot.quantity().is_negative() {
            let alert = NegativeStockAlert {
                id: Uuid::new_v4().to_string(),
                account_id: ctx.account_id.clone(),
                product_id: snapshot.product_id.clone(),
                variant_id: snapshot.variant_id.clone(),
                warehouse_id: snapshot.warehouse_id.clone(),
                quantity_requested_milli: request.quantity.milli(),
                stock_level_milli: snapshot.quantity_milli,
                status: AlertStatus::Active,
                created_at: Utc::now(),
                resolved_at: None,
            };
            alert::insert_tx(&mut tx, &alert).await?;
            Some(alert)
        } else {
            None
        };

        tx.commit().await.map_err(DbError::from)?;

        info!(
            tag = %entry.reference_type,
            product_id = %snapshot.product_id,
            warehouse_id = %snapshot.warehouse_id,
            quantity = %request.quantity,
            after = %snapshot.quantity(),
            negative = alert.is_some(),
            "Stock deducted"
        );

        Ok(Some(MutationOutcome {
            snapshot,
            entry,
            alert,
        }))
    }

    /// Restores previously deducted stock (sale deletion, service edit or
    /// deletion, rental release).
    ///
    /// Restoration is always permitted; there is no availability check.
    /// Each reversal must correspond to exactly one prior deduction
    /// reference - callers are responsible for not double-reversing.
    pub async fn restore(
        &self,
        ctx: &StockContext,
        request: RestorationRequest,
    ) -> EngineResult<Option<MutationOutcome>> {
        validate_positive_quantity("quantity", request.quantity)?;
        validate_notes(request.notes.as_deref())?;

        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        let (product, warehouse) = resolve_target(
            &mut tx,
            ctx,
            &request.product_id,
            request.variant_id.as_deref(),
            &request.warehouse,
        )
        .await?;

        if !product.track_inventory {
            debug!(sku = %product.sku, "Product does not track inventory; skipping restoration");
            return Ok(None);
        }

        let snap = snapshot::get_or_create_tx(
            &mut tx,
            &ctx.account_id,
            &product.id,
            request.variant_id.as_deref(),
            &warehouse.id,
        )
        .await?;

        let unit_cost = request.unit_cost.or_else(|| product.unit_cost());
        let (snapshot, entry) = write_mutation(
            &mut tx,
            ctx,
            snap,
            MovementKind::Inbound,
            request.quantity,
            request.reference.ledger_tag(request.trigger),
            request.reference.reference_id().map(str::to_string),
            unit_cost,
            request.notes,
        )
        .await?;

        tx.commit().await.map_err(DbError::from)?;

        info!(
            product_id = %snapshot.product_id,
            warehouse_id = %snapshot.warehouse_id,
            quantity = %request.quantity,
            after = %snapshot.quantity(),
            tag = %entry.reference_type,
            "Stock restored"
        );

        Ok(Some(MutationOutcome {
            snapshot,
            entry,
            alert: None,
        }))
    }

    /// Books an inbound goods receipt line.
    pub async fn receive(
        &self,
        ctx: &StockContext,
        request: ReceiptRequest,
    ) -> EngineResult<Option<MutationOutcome>> {
        self.restore(
            ctx,
            RestorationRequest {
                product_id: request.product_id,
                variant_id: request.variant_id,
                warehouse: request.warehouse,
                quantity: request.quantity,
                unit_cost: request.unit_cost,
                reference: request.reference,
                trigger: StockTrigger::Creation,
                notes: request.notes,
            },
        )
        .await
    }

    /// Applies a manual discrepancy correction.
    ///
    /// The signed delta is applied directly, bypassing the availability
    /// check; the movement direction is derived from the delta's sign.
    pub async fn adjust(
        &self,
        ctx: &StockContext,
        request: AdjustmentRequest,
    ) -> EngineResult<Option<MutationOutcome>> {
        validate_adjustment_delta(request.delta)?;
        validate_reason(&request.reason)?;

        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        let (product, warehouse) = resolve_target(
            &mut tx,
            ctx,
            &request.product_id,
            request.variant_id.as_deref(),
            &request.warehouse,
        )
        .await?;

        if !product.track_inventory {
            debug!(sku = %product.sku, "Product does not track inventory; skipping adjustment");
            return Ok(None);
        }

        let snap = snapshot::get_or_create_tx(
            &mut tx,
            &ctx.account_id,
            &product.id,
            request.variant_id.as_deref(),
            &warehouse.id,
        )
        .await?;

        let unit_cost = product.unit_cost();
        let (snapshot, entry) = write_mutation(
            &mut tx,
            ctx,
            snap,
            MovementKind::Adjustment,
            request.delta,
            StockReference::ManualAdjustment.ledger_tag(StockTrigger::Creation),
            None,
            unit_cost,
            Some(request.reason),
        )
        .await?;

        tx.commit().await.map_err(DbError::from)?;

        info!(
            product_id = %snapshot.product_id,
            warehouse_id = %snapshot.warehouse_id,
            delta = %request.delta,
            after = %snapshot.quantity(),
            "Stock adjusted"
        );

        Ok(Some(MutationOutcome {
            snapshot,
            entry,
            alert: None,
        }))
    }

    /// Moves recorded stock from one (warehouse, variant) key to another.
    ///
    /// Used when an edit changes where an already-recorded event should
    /// have landed. Writes two ledger entries - `transfer_out` against
    /// the old key and `transfer_in` against the new key - never a single
    /// entry describing both. Both legs commit together.
    pub async fn transfer(
        &self,
        ctx: &StockContext,
        request: TransferRequest,
    ) -> EngineResult<Option<TransferOutcome>> {
        validate_positive_quantity("quantity", request.quantity)?;
        validate_notes(request.notes.as_deref())?;

        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        // One product, two independently validated keys.
        let (product, from_warehouse) = resolve_target(
            &mut tx,
            ctx,
            &request.product_id,
            request.from_variant_id.as_deref(),
            &WarehouseSelector::Warehouse {
                warehouse_id: request.from_warehouse_id.clone(),
            },
        )
        .await?;

        if !product.track_inventory {
            debug!(sku = %product.sku, "Product does not track inventory; skipping transfer");
            return Ok(None);
        }

        check_variant_ownership(
            &mut tx,
            ctx,
            &product,
            request.to_variant_id.as_deref(),
        )
        .await?;
        let to_warehouse = resolve_warehouse(
            &mut tx,
            ctx,
            &WarehouseSelector::Warehouse {
                warehouse_id: request.to_warehouse_id.clone(),
            },
        )
        .await?;

        let tag = request.reference.ledger_tag(request.trigger);
        let reference_id = request.reference.reference_id().map(str::to_string);
        let unit_cost = product.unit_cost();

        // Outbound leg, availability-checked like a deduction.
        let from_snap = snapshot::get_or_create_tx(
            &mut tx,
            &ctx.account_id,
            &product.id,
            request.from_variant_id.as_deref(),
            &from_warehouse.id,
        )
        .await?;

        let available = from_snap.quantity();
        if !product.can_deduct(available, request.quantity) {
            return Err(StockError::InsufficientStock {
                sku: product.sku,
                name: product.name,
                available,
                requested: request.quantity,
            }
            .into());
        }

        let (from_snapshot, out_entry) = write_mutation(
            &mut tx,
            ctx,
            from_snap,
            MovementKind::TransferOut,
            -request.quantity,
            tag.clone(),
            reference_id.clone(),
            unit_cost,
            request.notes.clone(),
        )
        .await?;

        // Inbound leg against the new key.
        let to_snap = snapshot::get_or_create_tx(
            &mut tx,
            &ctx.account_id,
            &product.id,
            request.to_variant_id.as_deref(),
            &to_warehouse.id,
        )
        .await?;

        let (to_snapshot, in_entry) = write_mutation(
            &mut tx,
            ctx,
            to_snap,
            MovementKind::TransferIn,
            request.quantity,
            tag,
            reference_id,
            unit_cost,
            request.notes,
        )
        .await?;

        tx.commit().await.map_err(DbError::from)?;

        info!(
            product_id = %product.id,
            from = %from_snapshot.warehouse_id,
            to = %to_snapshot.warehouse_id,
            quantity = %request.quantity,
            "Stock transferred"
        );

        Ok(Some(TransferOutcome {
            outbound: MutationOutcome {
                snapshot: from_snapshot,
                entry: out_entry,
                alert: None,
            },
            inbound: MutationOutcome {
                snapshot: to_snapshot,
                entry: in_entry,
                alert: None,
            },
        }))
    }

    /// Reserves quantity against future deduction.
    ///
    /// Reservations hold `reserved_milli` only; no ledger entry is
    /// written because no stock has moved yet.
    pub async fn reserve(
        &self,
        ctx: &StockContext,
        request: ReservationRequest,
    ) -> EngineResult<Option<StockSnapshot>> {
        validate_positive_quantity("quantity", request.quantity)?;

        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        let (product, warehouse) = resolve_target(
            &mut tx,
            ctx,
            &request.product_id,
            request.variant_id.as_deref(),
            &request.warehouse,
        )
        .await?;

        if !product.track_inventory {
            return Ok(None);
        }

        let mut snap = snapshot::get_or_create_tx(
            &mut tx,
            &ctx.account_id,
            &product.id,
            request.variant_id.as_deref(),
            &warehouse.id,
        )
        .await?;

        // Reservations never overdraw, regardless of the negative-stock
        // allowance: a hold on stock that isn't there is meaningless.
        if snap.available() < request.quantity {
            return Err(StockError::InsufficientStock {
                sku: product.sku,
                name: product.name,
                available: snap.available(),
                requested: request.quantity,
            }
            .into());
        }

        snapshot::apply_reserved_delta_tx(&mut tx, &snap.id, request.quantity).await?;
        snap.reserved_milli += request.quantity.milli();
        snap.updated_at = Utc::now();

        tx.commit().await.map_err(DbError::from)?;

        debug!(
            product_id = %snap.product_id,
            reserved = %snap.reserved(),
            "Stock reserved"
        );

        Ok(Some(snap))
    }

    /// Releases a previously made reservation.
    pub async fn release(
        &self,
        ctx: &StockContext,
        request: ReservationRequest,
    ) -> EngineResult<Option<StockSnapshot>> {
        validate_positive_quantity("quantity", request.quantity)?;

        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        let (product, warehouse) = resolve_target(
            &mut tx,
            ctx,
            &request.product_id,
            request.variant_id.as_deref(),
            &request.warehouse,
        )
        .await?;

        if !product.track_inventory {
            return Ok(None);
        }

        let mut snap = snapshot::get_or_create_tx(
            &mut tx,
            &ctx.account_id,
            &product.id,
            request.variant_id.as_deref(),
            &warehouse.id,
        )
        .await?;

        if snap.reserved() < request.quantity {
            return Err(StockError::ReleaseExceedsReserved {
                sku: product.sku,
                reserved: snap.reserved(),
                requested: request.quantity,
            }
            .into());
        }

        snapshot::apply_reserved_delta_tx(&mut tx, &snap.id, -request.quantity).await?;
        snap.reserved_milli -= request.quantity.milli();
        snap.updated_at = Utc::now();

        tx.commit().await.map_err(DbError::from)?;

        debug!(
            product_id = %snap.product_id,
            reserved = %snap.reserved(),
            "Reservation released"
        );

        Ok(Some(snap))
    }

    /// Marks a negative-stock alert resolved.
    pub async fn resolve_alert(&self, ctx: &StockContext, alert_id: &str) -> EngineResult<()> {
        alert::AlertRepository::new(self.pool.clone())
            .resolve(&ctx.account_id, alert_id)
            .await?;
        Ok(())
    }
}

// =============================================================================
// Internal Helpers
// =============================================================================

/// Loads the product, checks variant ownership, and resolves the
/// warehouse. Any failure here happens before any stock mutation.
async fn resolve_target(
    tx: &mut Transaction<'_, Sqlite>,
    ctx: &StockContext,
    product_id: &str,
    variant_id: Option<&str>,
    selector: &WarehouseSelector,
) -> EngineResult<(Product, Warehouse)> {
    let product = product::get_by_id_tx(tx, &ctx.account_id, product_id)
        .await?
        .ok_or_else(|| StockError::ProductNotFound(product_id.to_string()))?;

    check_variant_ownership(tx, ctx, &product, variant_id).await?;

    let warehouse = resolve_warehouse(tx, ctx, selector).await?;

    Ok((product, warehouse))
}

/// Rejects variants that don't belong to the product (or account).
async fn check_variant_ownership(
    tx: &mut Transaction<'_, Sqlite>,
    ctx: &StockContext,
    product: &Product,
    variant_id: Option<&str>,
) -> EngineResult<()> {
    if let Some(variant_id) = variant_id {
        let variant = product::variant_by_id_tx(tx, &ctx.account_id, variant_id)
            .await?
            .ok_or_else(|| StockError::VariantOwnershipMismatch {
                variant_id: variant_id.to_string(),
                product_id: product.id.clone(),
            })?;

        if variant.product_id != product.id {
            return Err(StockError::VariantOwnershipMismatch {
                variant_id: variant_id.to_string(),
                product_id: product.id.clone(),
            }
            .into());
        }
    }

    Ok(())
}

/// Resolves a warehouse selector to a concrete warehouse.
///
/// ## Resolution Order (branch selector)
/// 1. Active warehouse the branch may modify (`can_modify = 1`)
/// 2. The account's active `main` warehouse
/// 3. `WarehouseResolutionFailed` - never a silent no-op
async fn resolve_warehouse(
    tx: &mut Transaction<'_, Sqlite>,
    ctx: &StockContext,
    selector: &WarehouseSelector,
) -> EngineResult<Warehouse> {
    match selector {
        WarehouseSelector::Branch { branch_id } => {
            if let Some(warehouse) =
                warehouse::modifiable_for_branch_tx(tx, &ctx.account_id, branch_id).await?
            {
                return Ok(warehouse);
            }

            debug!(branch_id = %branch_id, "No modifiable warehouse for branch; trying main");

            warehouse::main_for_account_tx(tx, &ctx.account_id)
                .await?
                .ok_or_else(|| {
                    StockError::WarehouseResolutionFailed {
                        scope: format!("branch {}", branch_id),
                    }
                    .into()
                })
        }
        WarehouseSelector::Warehouse { warehouse_id } => {
            let warehouse = warehouse::get_by_id_tx(tx, &ctx.account_id, warehouse_id)
                .await?
                .filter(|w| w.is_active)
                .ok_or_else(|| StockError::WarehouseResolutionFailed {
                    scope: format!("warehouse {}", warehouse_id),
                })?;

            Ok(warehouse)
        }
    }
}

/// Applies one signed change to a snapshot and appends the matching
/// ledger entry and movement. The caller has already made all policy
/// decisions; this only keeps the three writes consistent.
#[allow(clippy::too_many_arguments)]
async fn write_mutation(
    tx: &mut Transaction<'_, Sqlite>,
    ctx: &StockContext,
    mut snap: StockSnapshot,
    kind: MovementKind,
    change: Quantity,
    reference_type: String,
    reference_id: Option<String>,
    unit_cost: Option<Money>,
    notes: Option<String>,
) -> EngineResult<(StockSnapshot, StockLedgerEntry)> {
    let before = snap.quantity();
    let after = before
        .checked_add(change)
        .ok_or_else(|| DbError::QuantityOverflow {
            entity: "StockSnapshot".to_string(),
            id: snap.id.clone(),
        })?;

    snapshot::apply_quantity_delta_tx(tx, &snap.id, change).await?;

    let now = Utc::now();
    let entry = StockLedgerEntry {
        id: Uuid::new_v4().to_string(),
        account_id: ctx.account_id.clone(),
        product_id: snap.product_id.clone(),
        variant_id: snap.variant_id.clone(),
        warehouse_id: snap.warehouse_id.clone(),
        kind,
        quantity_before_milli: before.milli(),
        change_milli: change.milli(),
        quantity_after_milli: after.milli(),
        reference_type,
        reference_id,
        actor_id: ctx.actor_id.clone(),
        notes,
        created_at: now,
    };
    ledger::append_tx(tx, &entry).await?;

    let direction = if change.is_negative() {
        MovementDirection::Outbound
    } else {
        MovementDirection::Inbound
    };
    let movement = StockMovement {
        id: Uuid::new_v4().to_string(),
        account_id: ctx.account_id.clone(),
        warehouse_id: snap.warehouse_id.clone(),
        product_id: snap.product_id.clone(),
        variant_id: snap.variant_id.clone(),
        direction,
        quantity_milli: change.abs().milli(),
        unit_cost_cents: unit_cost.map(|c| c.cents()),
        reference_type: entry.reference_type.clone(),
        reference_id: entry.reference_id.clone(),
        actor_id: ctx.actor_id.clone(),
        created_at: now,
    };
    movement::append_tx(tx, &movement).await?;

    snap.quantity_milli = after.milli();
    snap.updated_at = now;

    Ok((snap, entry))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use stockbook_core::{Branch, Product, ProductVariant, Warehouse, WarehouseKind};

    const ACCOUNT: &str = "acct-1";
    const ACTOR: &str = "user-1";

    struct Fixture {
        db: Database,
        ctx: StockContext,
        branch_id: String,
        main_warehouse_id: String,
        branch_warehouse_id: String,
        product_id: String,
        variant_id: String,
    }

    fn make_product(account_id: &str, sku: &str, track: bool, allow_negative: bool) -> Product {
        let now = Utc::now();
        Product {
            id: Uuid::new_v4().to_string(),
            account_id: account_id.to_string(),
            sku: sku.to_string(),
            name: format!("{} (test)", sku),
            unit_cost_cents: Some(1250),
            track_inventory: track,
            allow_negative_stock: allow_negative,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn make_warehouse(account_id: &str, name: &str, kind: WarehouseKind) -> Warehouse {
        Warehouse {
            id: Uuid::new_v4().to_string(),
            account_id: account_id.to_string(),
            name: name.to_string(),
            kind,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    async fn fixture() -> Fixture {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let branch = Branch {
            id: Uuid::new_v4().to_string(),
            account_id: ACCOUNT.to_string(),
            name: "Mall".to_string(),
            is_active: true,
            created_at: Utc::now(),
        };
        db.warehouses().insert_branch(&branch).await.unwrap();

        let main = make_warehouse(ACCOUNT, "Central", WarehouseKind::Main);
        let backroom = make_warehouse(ACCOUNT, "Mall backroom", WarehouseKind::Branch);
        db.warehouses().insert(&main).await.unwrap();
        db.warehouses().insert(&backroom).await.unwrap();
        db.warehouses()
            .grant_access(&branch.id, &backroom.id, true)
            .await
            .unwrap();

        let product = make_product(ACCOUNT, "FAB-NAVY", true, false);
        db.products().insert(&product).await.unwrap();

        let variant = ProductVariant {
            id: Uuid::new_v4().to_string(),
            account_id: ACCOUNT.to_string(),
            product_id: product.id.clone(),
            name: "Navy".to_string(),
            is_active: true,
            created_at: Utc::now(),
        };
        db.products().insert_variant(&variant).await.unwrap();

        Fixture {
            db,
            ctx: StockContext::new(ACCOUNT, ACTOR),
            branch_id: branch.id,
            main_warehouse_id: main.id,
            branch_warehouse_id: backroom.id,
            product_id: product.id,
            variant_id: variant.id,
        }
    }

    fn sale_ref(id: &str) -> StockReference {
        StockReference::Sale {
            sale_id: id.to_string(),
        }
    }

    fn deduction(fix: &Fixture, units: i64, reference: StockReference) -> DeductionRequest {
        DeductionRequest {
            product_id: fix.product_id.clone(),
            variant_id: None,
            warehouse: WarehouseSelector::Branch {
                branch_id: fix.branch_id.clone(),
            },
            quantity: Quantity::from_units(units),
            unit_cost: None,
            reference,
            trigger: StockTrigger::Creation,
            notes: None,
        }
    }

    /// Books opening stock into the branch warehouse through the engine,
    /// so every test key starts with a real inbound entry.
    async fn open_stock(fix: &Fixture, units: i64) {
        fix.db
            .engine()
            .receive(
                &fix.ctx,
                ReceiptRequest {
                    product_id: fix.product_id.clone(),
                    variant_id: None,
                    warehouse: WarehouseSelector::Warehouse {
                        warehouse_id: fix.branch_warehouse_id.clone(),
                    },
                    quantity: Quantity::from_units(units),
                    unit_cost: Some(Money::from_cents(1000)),
                    reference: StockReference::GoodsReceipt {
                        receipt_id: "GR-1".to_string(),
                    },
                    notes: None,
                },
            )
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_deduction_decrements_and_logs() {
        let fix = fixture().await;
        open_stock(&fix, 10).await;

        let outcome = fix
            .db
            .engine()
            .deduct(&fix.ctx, deduction(&fix, 4, sale_ref("S1")))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(outcome.snapshot.quantity_milli, 6000);
        assert_eq!(outcome.snapshot.warehouse_id, fix.branch_warehouse_id);
        assert!(outcome.alert.is_none());

        assert_eq!(outcome.entry.kind, MovementKind::Outbound);
        assert_eq!(outcome.entry.quantity_before_milli, 10_000);
        assert_eq!(outcome.entry.change_milli, -4000);
        assert_eq!(outcome.entry.quantity_after_milli, 6000);
        assert_eq!(outcome.entry.reference_type, "sale");
        assert_eq!(outcome.entry.reference_id.as_deref(), Some("S1"));
        assert_eq!(outcome.entry.actor_id, ACTOR);
        assert!(outcome.entry.is_balanced());

        // Movement carries the product's configured cost when the
        // request doesn't bring its own.
        let movements = fix.db.movements().for_reference(ACCOUNT, "S1").await.unwrap();
        assert_eq!(movements.len(), 1);
        assert_eq!(movements[0].direction, MovementDirection::Outbound);
        assert_eq!(movements[0].quantity_milli, 4000);
        assert_eq!(movements[0].unit_cost_cents, Some(1250));
    }

    #[tokio::test]
    async fn test_insufficient_stock_leaves_everything_unchanged() {
        let fix = fixture().await;
        open_stock(&fix, 6).await;

        let err = fix
            .db
            .engine()
            .deduct(&fix.ctx, deduction(&fix, 10, sale_ref("S2")))
            .await
            .unwrap_err();

        match err {
            EngineError::Stock(StockError::InsufficientStock {
                available,
                requested,
                ..
            }) => {
                assert_eq!(available.milli(), 6000);
                assert_eq!(requested.milli(), 10_000);
            }
            other => panic!("expected InsufficientStock, got {other:?}"),
        }

        // Snapshot untouched, ledger still only the opening receipt.
        let snap = fix
            .db
            .snapshots()
            .get(ACCOUNT, &fix.product_id, None, &fix.branch_warehouse_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(snap.quantity_milli, 6000);
        assert_eq!(fix.db.ledger().count(ACCOUNT).await.unwrap(), 1);
        assert!(fix.db.alerts().list_active(ACCOUNT).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_negative_stock_allowance_creates_single_alert() {
        let fix = fixture().await;
        open_stock(&fix, 6).await;

        fix.db
            .products()
            .set_allow_negative_stock(ACCOUNT, &fix.product_id, true)
            .await
            .unwrap();

        let outcome = fix
            .db
            .engine()
            .deduct(&fix.ctx, deduction(&fix, 10, sale_ref("S3")))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(outcome.snapshot.quantity_milli, -4000);

        let alert = outcome.alert.expect("negative crossing must alert");
        assert_eq!(alert.stock_level_milli, -4000);
        assert_eq!(alert.quantity_requested_milli, 10_000);
        assert_eq!(alert.status, AlertStatus::Active);

        let active = fix.db.alerts().list_active(ACCOUNT).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, alert.id);
    }

    /// The full walk-through: 10 on hand, sell 4, fail to sell 10, allow
    /// negative stock, sell 10 into the red.
    #[tokio::test]
    async fn test_oversell_scenario_end_to_end() {
        let fix = fixture().await;
        let engine = fix.db.engine();
        open_stock(&fix, 10).await;

        // Deduct 4 for sale S1.
        let outcome = engine
            .deduct(&fix.ctx, deduction(&fix, 4, sale_ref("S1")))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(outcome.snapshot.quantity_milli, 6000);
        assert_eq!(outcome.entry.quantity_before_milli, 10_000);
        assert_eq!(outcome.entry.change_milli, -4000);
        assert_eq!(outcome.entry.quantity_after_milli, 6000);

        // Deduct 10 more without the allowance: fails, nothing changes.
        let err = engine
            .deduct(&fix.ctx, deduction(&fix, 10, sale_ref("S2")))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Stock(StockError::InsufficientStock { .. })
        ));
        assert_eq!(fix.db.ledger().count(ACCOUNT).await.unwrap(), 2);

        // Enable the allowance and oversell.
        fix.db
            .products()
            .set_allow_negative_stock(ACCOUNT, &fix.product_id, true)
            .await
            .unwrap();

        let outcome = engine
            .deduct(&fix.ctx, deduction(&fix, 10, sale_ref("S2")))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(outcome.snapshot.quantity_milli, -4000);

        let alerts = fix.db.alerts().list_active(ACCOUNT).await.unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].stock_level_milli, -4000);
    }

    #[tokio::test]
    async fn test_restore_round_trips_the_snapshot() {
        let fix = fixture().await;
        let engine = fix.db.engine();
        open_stock(&fix, 10).await;

        engine
            .deduct(&fix.ctx, deduction(&fix, 4, sale_ref("S1")))
            .await
            .unwrap()
            .unwrap();

        let outcome = engine
            .restore(
                &fix.ctx,
                RestorationRequest {
                    product_id: fix.product_id.clone(),
                    variant_id: None,
                    warehouse: WarehouseSelector::Branch {
                        branch_id: fix.branch_id.clone(),
                    },
                    quantity: Quantity::from_units(4),
                    unit_cost: None,
                    reference: sale_ref("S1"),
                    trigger: StockTrigger::Deletion,
                    notes: None,
                },
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(outcome.snapshot.quantity_milli, 10_000);
        assert_eq!(outcome.entry.kind, MovementKind::Inbound);
        assert_eq!(outcome.entry.reference_type, "sale_delete");

        // The deduction and its reversal sum to zero net change.
        let entries = fix.db.ledger().for_reference(ACCOUNT, "S1").await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries.iter().map(|e| e.change_milli).sum::<i64>(), 0);
    }

    #[tokio::test]
    async fn test_ledger_chain_is_consistent() {
        let fix = fixture().await;
        let engine = fix.db.engine();
        open_stock(&fix, 20).await;

        engine
            .deduct(&fix.ctx, deduction(&fix, 3, sale_ref("S1")))
            .await
            .unwrap();
        engine
            .deduct(&fix.ctx, deduction(&fix, 5, sale_ref("S2")))
            .await
            .unwrap();
        engine
            .restore(
                &fix.ctx,
                RestorationRequest {
                    product_id: fix.product_id.clone(),
                    variant_id: None,
                    warehouse: WarehouseSelector::Branch {
                        branch_id: fix.branch_id.clone(),
                    },
                    quantity: Quantity::from_units(3),
                    unit_cost: None,
                    reference: sale_ref("S1"),
                    trigger: StockTrigger::Return,
                    notes: None,
                },
            )
            .await
            .unwrap();

        let chain = fix
            .db
            .ledger()
            .chain_for_key(ACCOUNT, &fix.product_id, None, &fix.branch_warehouse_id)
            .await
            .unwrap();
        assert_eq!(chain.len(), 4);

        for entry in &chain {
            assert!(entry.is_balanced());
        }
        for pair in chain.windows(2) {
            assert_eq!(pair[1].quantity_before_milli, pair[0].quantity_after_milli);
        }

        // Snapshot quantity equals the sum of all ledger changes.
        let net = fix
            .db
            .ledger()
            .net_change_for_key(ACCOUNT, &fix.product_id, None, &fix.branch_warehouse_id)
            .await
            .unwrap();
        let snap = fix
            .db
            .snapshots()
            .get(ACCOUNT, &fix.product_id, None, &fix.branch_warehouse_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(net, snap.quantity_milli);
        assert_eq!(net, 15_000);
    }

    #[tokio::test]
    async fn test_branch_without_grants_falls_back_to_main() {
        let fix = fixture().await;

        let lone_branch = Branch {
            id: Uuid::new_v4().to_string(),
            account_id: ACCOUNT.to_string(),
            name: "Kiosk".to_string(),
            is_active: true,
            created_at: Utc::now(),
        };
        fix.db.warehouses().insert_branch(&lone_branch).await.unwrap();

        let outcome = fix
            .db
            .engine()
            .restore(
                &fix.ctx,
                RestorationRequest {
                    product_id: fix.product_id.clone(),
                    variant_id: None,
                    warehouse: WarehouseSelector::Branch {
                        branch_id: lone_branch.id,
                    },
                    quantity: Quantity::from_units(2),
                    unit_cost: None,
                    reference: sale_ref("S9"),
                    trigger: StockTrigger::Return,
                    notes: None,
                },
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(outcome.snapshot.warehouse_id, fix.main_warehouse_id);
    }

    #[tokio::test]
    async fn test_missing_warehouse_is_an_explicit_error() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let ctx = StockContext::new("acct-2", ACTOR);

        // An account with a branch and a product but no warehouses at all.
        let branch = Branch {
            id: Uuid::new_v4().to_string(),
            account_id: "acct-2".to_string(),
            name: "Orphan".to_string(),
            is_active: true,
            created_at: Utc::now(),
        };
        db.warehouses().insert_branch(&branch).await.unwrap();

        let product = make_product("acct-2", "LONE-1", true, false);
        db.products().insert(&product).await.unwrap();

        let err = db
            .engine()
            .deduct(
                &ctx,
                DeductionRequest {
                    product_id: product.id,
                    variant_id: None,
                    warehouse: WarehouseSelector::Branch {
                        branch_id: branch.id,
                    },
                    quantity: Quantity::from_units(1),
                    unit_cost: None,
                    reference: sale_ref("S1"),
                    trigger: StockTrigger::Creation,
                    notes: None,
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            EngineError::Stock(StockError::WarehouseResolutionFailed { .. })
        ));
        assert_eq!(db.ledger().count("acct-2").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unknown_explicit_warehouse_rejected() {
        let fix = fixture().await;

        let err = fix
            .db
            .engine()
            .deduct(
                &fix.ctx,
                DeductionRequest {
                    product_id: fix.product_id.clone(),
                    variant_id: None,
                    warehouse: WarehouseSelector::Warehouse {
                        warehouse_id: "nope".to_string(),
                    },
                    quantity: Quantity::from_units(1),
                    unit_cost: None,
                    reference: sale_ref("S1"),
                    trigger: StockTrigger::Creation,
                    notes: None,
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            EngineError::Stock(StockError::WarehouseResolutionFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_variant_ownership_is_checked_before_mutation() {
        let fix = fixture().await;
        open_stock(&fix, 10).await;

        let other = make_product(ACCOUNT, "OTHER-1", true, false);
        fix.db.products().insert(&other).await.unwrap();

        // fix.variant_id belongs to FAB-NAVY, not OTHER-1.
        let err = fix
            .db
            .engine()
            .deduct(
                &fix.ctx,
                DeductionRequest {
                    product_id: other.id,
                    variant_id: Some(fix.variant_id.clone()),
                    warehouse: WarehouseSelector::Branch {
                        branch_id: fix.branch_id.clone(),
                    },
                    quantity: Quantity::from_units(1),
                    unit_cost: None,
                    reference: sale_ref("S1"),
                    trigger: StockTrigger::Creation,
                    notes: None,
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            EngineError::Stock(StockError::VariantOwnershipMismatch { .. })
        ));
        assert_eq!(fix.db.ledger().count(ACCOUNT).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_untracked_product_is_a_no_write_success() {
        let fix = fixture().await;

        let service = make_product(ACCOUNT, "HEMMING", false, false);
        fix.db.products().insert(&service).await.unwrap();

        let outcome = fix
            .db
            .engine()
            .deduct(
                &fix.ctx,
                DeductionRequest {
                    product_id: service.id.clone(),
                    variant_id: None,
                    warehouse: WarehouseSelector::Branch {
                        branch_id: fix.branch_id.clone(),
                    },
                    quantity: Quantity::from_units(1),
                    unit_cost: None,
                    reference: StockReference::TailorService {
                        service_id: "T1".to_string(),
                    },
                    trigger: StockTrigger::Creation,
                    notes: None,
                },
            )
            .await
            .unwrap();

        assert!(outcome.is_none());
        assert_eq!(fix.db.ledger().count(ACCOUNT).await.unwrap(), 0);
        assert!(fix
            .db
            .snapshots()
            .get(ACCOUNT, &service.id, None, &fix.branch_warehouse_id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_adjustment_direction_follows_delta_sign() {
        let fix = fixture().await;
        let engine = fix.db.engine();
        open_stock(&fix, 10).await;

        // Shrinkage: negative delta, outbound movement.
        let outcome = engine
            .adjust(
                &fix.ctx,
                AdjustmentRequest {
                    product_id: fix.product_id.clone(),
                    variant_id: None,
                    warehouse: WarehouseSelector::Warehouse {
                        warehouse_id: fix.branch_warehouse_id.clone(),
                    },
                    delta: Quantity::from_units_milli(-2, 500),
                    reason: "cycle count found shrinkage".to_string(),
                },
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(outcome.snapshot.quantity_milli, 7500);
        assert_eq!(outcome.entry.kind, MovementKind::Adjustment);
        assert_eq!(outcome.entry.reference_type, "manual_adjustment");
        assert_eq!(
            outcome.entry.notes.as_deref(),
            Some("cycle count found shrinkage")
        );

        let movements = fix
            .db
            .movements()
            .recent_for_warehouse(ACCOUNT, &fix.branch_warehouse_id, 1)
            .await
            .unwrap();
        assert_eq!(movements[0].direction, MovementDirection::Outbound);
        assert_eq!(movements[0].quantity_milli, 2500);

        // Found stock: positive delta, inbound movement.
        let outcome = engine
            .adjust(
                &fix.ctx,
                AdjustmentRequest {
                    product_id: fix.product_id.clone(),
                    variant_id: None,
                    warehouse: WarehouseSelector::Warehouse {
                        warehouse_id: fix.branch_warehouse_id.clone(),
                    },
                    delta: Quantity::from_units(1),
                    reason: "found misplaced roll".to_string(),
                },
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(outcome.snapshot.quantity_milli, 8500);
        let movements = fix
            .db
            .movements()
            .recent_for_warehouse(ACCOUNT, &fix.branch_warehouse_id, 1)
            .await
            .unwrap();
        assert_eq!(movements[0].direction, MovementDirection::Inbound);
    }

    #[tokio::test]
    async fn test_zero_delta_adjustment_rejected() {
        let fix = fixture().await;

        let err = fix
            .db
            .engine()
            .adjust(
                &fix.ctx,
                AdjustmentRequest {
                    product_id: fix.product_id.clone(),
                    variant_id: None,
                    warehouse: WarehouseSelector::Warehouse {
                        warehouse_id: fix.branch_warehouse_id.clone(),
                    },
                    delta: Quantity::zero(),
                    reason: "noop".to_string(),
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            EngineError::Stock(StockError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_transfer_writes_one_entry_per_key() {
        let fix = fixture().await;
        open_stock(&fix, 10).await;

        let outcome = fix
            .db
            .engine()
            .transfer(
                &fix.ctx,
                TransferRequest {
                    product_id: fix.product_id.clone(),
                    from_variant_id: None,
                    from_warehouse_id: fix.branch_warehouse_id.clone(),
                    to_variant_id: Some(fix.variant_id.clone()),
                    to_warehouse_id: fix.main_warehouse_id.clone(),
                    quantity: Quantity::from_units(4),
                    reference: StockReference::GoodsReceipt {
                        receipt_id: "GR-1".to_string(),
                    },
                    trigger: StockTrigger::Edit,
                    notes: None,
                },
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(outcome.outbound.entry.kind, MovementKind::TransferOut);
        assert_eq!(outcome.outbound.entry.change_milli, -4000);
        assert_eq!(outcome.outbound.snapshot.quantity_milli, 6000);
        assert_eq!(
            outcome.outbound.snapshot.warehouse_id,
            fix.branch_warehouse_id
        );

        assert_eq!(outcome.inbound.entry.kind, MovementKind::TransferIn);
        assert_eq!(outcome.inbound.entry.change_milli, 4000);
        assert_eq!(outcome.inbound.snapshot.quantity_milli, 4000);
        assert_eq!(outcome.inbound.snapshot.warehouse_id, fix.main_warehouse_id);
        assert_eq!(
            outcome.inbound.snapshot.variant_id.as_deref(),
            Some(fix.variant_id.as_str())
        );

        // Both legs carry the same edit tag, each against its own key.
        assert_eq!(outcome.outbound.entry.reference_type, "goods_receipt_edit");
        assert_eq!(outcome.inbound.entry.reference_type, "goods_receipt_edit");
        let entries = fix.db.ledger().for_reference(ACCOUNT, "GR-1").await.unwrap();
        // Opening receipt + two transfer legs.
        assert_eq!(entries.len(), 3);
    }

    #[tokio::test]
    async fn test_transfer_insufficient_blocks_both_legs() {
        let fix = fixture().await;
        open_stock(&fix, 2).await;

        let err = fix
            .db
            .engine()
            .transfer(
                &fix.ctx,
                TransferRequest {
                    product_id: fix.product_id.clone(),
                    from_variant_id: None,
                    from_warehouse_id: fix.branch_warehouse_id.clone(),
                    to_variant_id: None,
                    to_warehouse_id: fix.main_warehouse_id.clone(),
                    quantity: Quantity::from_units(5),
                    reference: StockReference::GoodsReceipt {
                        receipt_id: "GR-2".to_string(),
                    },
                    trigger: StockTrigger::Edit,
                    notes: None,
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            EngineError::Stock(StockError::InsufficientStock { .. })
        ));

        // Neither key changed.
        let from = fix
            .db
            .snapshots()
            .get(ACCOUNT, &fix.product_id, None, &fix.branch_warehouse_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(from.quantity_milli, 2000);
        assert!(fix
            .db
            .snapshots()
            .get(ACCOUNT, &fix.product_id, None, &fix.main_warehouse_id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_reserve_and_release() {
        let fix = fixture().await;
        let engine = fix.db.engine();
        open_stock(&fix, 10).await;

        let request = ReservationRequest {
            product_id: fix.product_id.clone(),
            variant_id: None,
            warehouse: WarehouseSelector::Warehouse {
                warehouse_id: fix.branch_warehouse_id.clone(),
            },
            quantity: Quantity::from_units(6),
        };

        let snap = engine
            .reserve(&fix.ctx, request.clone())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(snap.reserved_milli, 6000);
        assert_eq!(snap.available().milli(), 4000);

        // Second reservation beyond availability fails.
        let err = engine
            .reserve(
                &fix.ctx,
                ReservationRequest {
                    quantity: Quantity::from_units(5),
                    ..request.clone()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Stock(StockError::InsufficientStock { .. })
        ));

        // Reservations never touch the ledger.
        assert_eq!(fix.db.ledger().count(ACCOUNT).await.unwrap(), 1);

        let snap = engine
            .release(
                &fix.ctx,
                ReservationRequest {
                    quantity: Quantity::from_units(6),
                    ..request.clone()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(snap.reserved_milli, 0);

        let err = engine
            .release(&fix.ctx, request)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Stock(StockError::ReleaseExceedsReserved { .. })
        ));
    }

    #[tokio::test]
    async fn test_alert_lifecycle() {
        let fix = fixture().await;
        open_stock(&fix, 1).await;

        fix.db
            .products()
            .set_allow_negative_stock(ACCOUNT, &fix.product_id, true)
            .await
            .unwrap();

        let outcome = fix
            .db
            .engine()
            .deduct(&fix.ctx, deduction(&fix, 3, sale_ref("S1")))
            .await
            .unwrap()
            .unwrap();
        let alert = outcome.alert.unwrap();

        fix.db
            .engine()
            .resolve_alert(&fix.ctx, &alert.id)
            .await
            .unwrap();

        assert!(fix.db.alerts().list_active(ACCOUNT).await.unwrap().is_empty());
        let resolved = fix
            .db
            .alerts()
            .get_by_id(ACCOUNT, &alert.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(resolved.status, AlertStatus::Resolved);
        assert!(resolved.resolved_at.is_some());

        // Resolving twice is a NotFound on the active row.
        let err = fix
            .db
            .engine()
            .resolve_alert(&fix.ctx, &alert.id)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Db(DbError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_variant_keys_are_independent() {
        let fix = fixture().await;
        let engine = fix.db.engine();

        // Stock under the variant key only.
        engine
            .receive(
                &fix.ctx,
                ReceiptRequest {
                    product_id: fix.product_id.clone(),
                    variant_id: Some(fix.variant_id.clone()),
                    warehouse: WarehouseSelector::Warehouse {
                        warehouse_id: fix.branch_warehouse_id.clone(),
                    },
                    quantity: Quantity::from_units(5),
                    unit_cost: None,
                    reference: StockReference::GoodsReceipt {
                        receipt_id: "GR-5".to_string(),
                    },
                    notes: None,
                },
            )
            .await
            .unwrap()
            .unwrap();

        // The variant-less key for the same product/warehouse is empty,
        // so deducting from it without the allowance fails.
        let err = engine
            .deduct(&fix.ctx, deduction(&fix, 1, sale_ref("S1")))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Stock(StockError::InsufficientStock { .. })
        ));

        let variant_snap = fix
            .db
            .snapshots()
            .get(
                ACCOUNT,
                &fix.product_id,
                Some(&fix.variant_id),
                &fix.branch_warehouse_id,
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(variant_snap.quantity_milli, 5000);
    }

    #[tokio::test]
    async fn test_movement_flow_totals() {
        let fix = fixture().await;
        let engine = fix.db.engine();
        open_stock(&fix, 10).await;

        engine
            .deduct(&fix.ctx, deduction(&fix, 4, sale_ref("S1")))
            .await
            .unwrap();

        let flow = fix
            .db
            .movements()
            .flow_for_warehouse(ACCOUNT, &fix.branch_warehouse_id)
            .await
            .unwrap();
        assert_eq!(flow.inbound_milli, 10_000);
        assert_eq!(flow.outbound_milli, 4000);
        assert_eq!(flow.net().milli(), 6000);
    }
}
