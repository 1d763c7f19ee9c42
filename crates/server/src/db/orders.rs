//! Order repository.
//!
//! Orders are created lazily the first time a workflow touches them, keyed
//! by the remote GID. The unique constraint on `shopify_id` is the only
//! correctness guard against racing webhook deliveries, so creation always
//! goes through an `ON CONFLICT` upsert.

use chrono::{DateTime, Utc};
use order_hold_core::ShopifyGid;
use sqlx::PgPool;

use super::RepositoryError;

/// A local projection of a remote order.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Order {
    pub id: i64,
    pub shop_id: i64,
    /// Remote GID, e.g. `gid://shopify/Order/123`.
    pub shopify_id: String,
    /// When the order was placed remotely. Immutable once set.
    pub shopify_created_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const COLUMNS: &str = "id, shop_id, shopify_id, shopify_created_at, created_at, updated_at";

/// Find a shop's order by remote GID.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn find_by_shopify_id(
    pool: &PgPool,
    shop_id: i64,
    shopify_id: &ShopifyGid,
) -> Result<Option<Order>, RepositoryError> {
    let order = sqlx::query_as::<_, Order>(&format!(
        "SELECT {COLUMNS} FROM orders WHERE shop_id = $1 AND shopify_id = $2"
    ))
    .bind(shop_id)
    .bind(shopify_id.as_str())
    .fetch_optional(pool)
    .await?;

    Ok(order)
}

/// Find or create an order by remote GID. Idempotent and race-safe:
/// concurrent calls for the same GID converge on one row.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn find_or_create(
    pool: &PgPool,
    shop_id: i64,
    shopify_id: &ShopifyGid,
) -> Result<Order, RepositoryError> {
    let order = sqlx::query_as::<_, Order>(&format!(
        r"
        INSERT INTO orders (shop_id, shopify_id)
        VALUES ($1, $2)
        ON CONFLICT (shopify_id) DO UPDATE SET updated_at = NOW()
        RETURNING {COLUMNS}
        "
    ))
    .bind(shop_id)
    .bind(shopify_id.as_str())
    .fetch_one(pool)
    .await?;

    Ok(order)
}

/// Record the remote creation timestamp, only if it has never been set.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn backfill_shopify_created_at(
    pool: &PgPool,
    order_id: i64,
    shopify_created_at: DateTime<Utc>,
) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        UPDATE orders
        SET shopify_created_at = $2, updated_at = NOW()
        WHERE id = $1 AND shopify_created_at IS NULL
        ",
    )
    .bind(order_id)
    .bind(shopify_created_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Find a shop's orders matching any of the given remote GIDs.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn find_by_shopify_ids(
    pool: &PgPool,
    shop_id: i64,
    shopify_ids: &[ShopifyGid],
) -> Result<Vec<Order>, RepositoryError> {
    let ids: Vec<&str> = shopify_ids.iter().map(ShopifyGid::as_str).collect();

    let orders = sqlx::query_as::<_, Order>(&format!(
        "SELECT {COLUMNS} FROM orders WHERE shop_id = $1 AND shopify_id = ANY($2)"
    ))
    .bind(shop_id)
    .bind(&ids)
    .fetch_all(pool)
    .await?;

    Ok(orders)
}

/// Destroy orders by local id. Fulfillment orders cascade.
///
/// Returns the number of rows deleted.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn delete_by_ids(pool: &PgPool, order_ids: &[i64]) -> Result<u64, RepositoryError> {
    let result = sqlx::query("DELETE FROM orders WHERE id = ANY($1)")
        .bind(order_ids)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}
