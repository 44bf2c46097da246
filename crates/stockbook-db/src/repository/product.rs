//! # Product Repository
//!
//! Database operations for products and their variants.
//!
//! The engine only keeps the product fields it needs for stock policy
//! (SKU, name, tracking flags); presentation and pricing stay with the
//! host application.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use stockbook_core::{Product, ProductVariant};

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

const PRODUCT_COLUMNS: &str = "id, account_id, sku, name, unit_cost_cents, \
     track_inventory, allow_negative_stock, is_active, created_at, updated_at";

const VARIANT_COLUMNS: &str = "id, account_id, product_id, name, is_active, created_at";

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Gets a product by its ID within an account.
    pub async fn get_by_id(&self, account_id: &str, id: &str) -> DbResult<Option<Product>> {
        let mut conn = self.pool.acquire().await?;
        get_by_id_tx(&mut conn, account_id, id).await
    }

    /// Gets a product by its SKU within an account.
    pub async fn get_by_sku(&self, account_id: &str, sku: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE account_id = ?1 AND sku = ?2"
        ))
        .bind(account_id)
        .bind(sku)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Inserts a new product.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - SKU already exists in account
    pub async fn insert(&self, product: &Product) -> DbResult<()> {
        debug!(sku = %product.sku, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, account_id, sku, name, unit_cost_cents,
                track_inventory, allow_negative_stock, is_active,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&product.id)
        .bind(&product.account_id)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(product.unit_cost_cents)
        .bind(product.track_inventory)
        .bind(product.allow_negative_stock)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Toggles the negative-stock allowance on a product.
    ///
    /// ## When To Call
    /// Account staff enable this for products that may be sold ahead of a
    /// delayed goods receipt.
    pub async fn set_allow_negative_stock(
        &self,
        account_id: &str,
        product_id: &str,
        allow: bool,
    ) -> DbResult<()> {
        debug!(id = %product_id, allow = allow, "Updating negative-stock allowance");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE products
            SET allow_negative_stock = ?3, updated_at = ?4
            WHERE account_id = ?1 AND id = ?2
            "#,
        )
        .bind(account_id)
        .bind(product_id)
        .bind(allow)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", product_id));
        }

        Ok(())
    }

    /// Soft-deletes a product by setting is_active = false.
    ///
    /// Historical ledger entries still reference the product, so rows are
    /// never removed.
    pub async fn soft_delete(&self, account_id: &str, id: &str) -> DbResult<()> {
        debug!(id = %id, "Soft-deleting product");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE products
            SET is_active = 0, updated_at = ?3
            WHERE account_id = ?1 AND id = ?2
            "#,
        )
        .bind(account_id)
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Inserts a product variant.
    pub async fn insert_variant(&self, variant: &ProductVariant) -> DbResult<()> {
        debug!(product_id = %variant.product_id, name = %variant.name, "Inserting variant");

        sqlx::query(
            r#"
            INSERT INTO product_variants (
                id, account_id, product_id, name, is_active, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&variant.id)
        .bind(&variant.account_id)
        .bind(&variant.product_id)
        .bind(&variant.name)
        .bind(variant.is_active)
        .bind(variant.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a variant by its ID within an account.
    pub async fn get_variant(&self, account_id: &str, id: &str) -> DbResult<Option<ProductVariant>> {
        let mut conn = self.pool.acquire().await?;
        variant_by_id_tx(&mut conn, account_id, id).await
    }

    /// Lists variants of a product.
    pub async fn list_variants(
        &self,
        account_id: &str,
        product_id: &str,
    ) -> DbResult<Vec<ProductVariant>> {
        let variants = sqlx::query_as::<_, ProductVariant>(&format!(
            "SELECT {VARIANT_COLUMNS} FROM product_variants \
             WHERE account_id = ?1 AND product_id = ?2 AND is_active = 1 \
             ORDER BY name"
        ))
        .bind(account_id)
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(variants)
    }

    /// Counts active products in an account (for diagnostics).
    pub async fn count(&self, account_id: &str) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE account_id = ?1 AND is_active = 1")
                .bind(account_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }
}

// =============================================================================
// Transaction-Scoped Reads
// =============================================================================
// The engine reads master data inside its own transaction so the policy
// it checks (allow_negative_stock, variant ownership) is the one the
// write commits against.

/// Gets a product by ID on an existing connection/transaction.
pub(crate) async fn get_by_id_tx(
    conn: &mut SqliteConnection,
    account_id: &str,
    id: &str,
) -> DbResult<Option<Product>> {
    let product = sqlx::query_as::<_, Product>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE account_id = ?1 AND id = ?2"
    ))
    .bind(account_id)
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(product)
}

/// Gets a variant by ID on an existing connection/transaction.
pub(crate) async fn variant_by_id_tx(
    conn: &mut SqliteConnection,
    account_id: &str,
    id: &str,
) -> DbResult<Option<ProductVariant>> {
    let variant = sqlx::query_as::<_, ProductVariant>(&format!(
        "SELECT {VARIANT_COLUMNS} FROM product_variants WHERE account_id = ?1 AND id = ?2"
    ))
    .bind(account_id)
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(variant)
}

/// Helper to generate a new product ID.
pub fn generate_product_id() -> String {
    Uuid::new_v4().to_string()
}

/// Helper to generate a new variant ID.
pub fn generate_variant_id() -> String {
    Uuid::new_v4().to_string()
}
