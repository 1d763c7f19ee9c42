//! Fulfillment order repository.
//!
//! Upserts are keyed by the remote GID, the same race guard as orders:
//! duplicate webhook deliveries and concurrent jobs converge on one row.

use chrono::{DateTime, Utc};
use order_hold_core::ShopifyGid;
use sqlx::PgPool;

use super::RepositoryError;

/// A local projection of a remote fulfillment order.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FulfillmentOrder {
    pub id: i64,
    pub shop_id: i64,
    /// Owning order, if locally known.
    pub order_id: Option<i64>,
    /// Remote GID, e.g. `gid://shopify/FulfillmentOrder/456`.
    pub shopify_id: String,
    /// Remote status, kept as a free-form string so new remote states pass
    /// through untouched.
    pub status: String,
    /// When the hold was placed, if one was.
    pub held_at: Option<DateTime<Utc>>,
    /// When the fulfillment order was created remotely.
    pub shopify_created_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const COLUMNS: &str = "id, shop_id, order_id, shopify_id, status, held_at, \
                       shopify_created_at, created_at, updated_at";

/// Fields written when persisting a fulfillment order from remote data.
#[derive(Debug)]
pub struct PersistFulfillmentOrder<'a> {
    pub shop_id: i64,
    pub order_id: i64,
    pub shopify_id: &'a ShopifyGid,
    pub status: &'a str,
    pub held_at: Option<DateTime<Utc>>,
    pub shopify_created_at: Option<DateTime<Utc>>,
}

/// Create or refresh a fulfillment order keyed by remote GID.
///
/// `held_at` and `shopify_created_at` are only ever written forward - a
/// later upsert without them keeps the earlier values.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn upsert(
    pool: &PgPool,
    params: PersistFulfillmentOrder<'_>,
) -> Result<FulfillmentOrder, RepositoryError> {
    let record = sqlx::query_as::<_, FulfillmentOrder>(&format!(
        r"
        INSERT INTO fulfillment_orders
            (shop_id, order_id, shopify_id, status, held_at, shopify_created_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (shopify_id) DO UPDATE SET
            order_id = EXCLUDED.order_id,
            status = EXCLUDED.status,
            held_at = COALESCE(EXCLUDED.held_at, fulfillment_orders.held_at),
            shopify_created_at =
                COALESCE(EXCLUDED.shopify_created_at, fulfillment_orders.shopify_created_at),
            updated_at = NOW()
        RETURNING {COLUMNS}
        "
    ))
    .bind(params.shop_id)
    .bind(params.order_id)
    .bind(params.shopify_id.as_str())
    .bind(params.status)
    .bind(params.held_at)
    .bind(params.shopify_created_at)
    .fetch_one(pool)
    .await?;

    Ok(record)
}

/// Get a fulfillment order by local id.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn get(pool: &PgPool, id: i64) -> Result<Option<FulfillmentOrder>, RepositoryError> {
    let record = sqlx::query_as::<_, FulfillmentOrder>(&format!(
        "SELECT {COLUMNS} FROM fulfillment_orders WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(record)
}

/// Update the status from a remote response.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn update_status(pool: &PgPool, id: i64, status: &str) -> Result<(), RepositoryError> {
    sqlx::query("UPDATE fulfillment_orders SET status = $2, updated_at = NOW() WHERE id = $1")
        .bind(id)
        .bind(status)
        .execute(pool)
        .await?;

    Ok(())
}
