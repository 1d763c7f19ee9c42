//! Shop repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::RepositoryError;

/// An installed shop.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Shop {
    pub id: i64,
    /// Stable shop identifier, e.g. `example.myshopify.com`.
    pub shopify_domain: String,
    /// Admin API access token obtained at install time.
    pub access_token: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Find a shop by its domain.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn find_by_domain(
    pool: &PgPool,
    shopify_domain: &str,
) -> Result<Option<Shop>, RepositoryError> {
    let shop = sqlx::query_as::<_, Shop>(
        r"
        SELECT id, shopify_domain, access_token, created_at, updated_at
        FROM shops
        WHERE shopify_domain = $1
        ",
    )
    .bind(shopify_domain)
    .fetch_optional(pool)
    .await?;

    Ok(shop)
}

/// Get a shop by local id.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn get(pool: &PgPool, shop_id: i64) -> Result<Option<Shop>, RepositoryError> {
    let shop = sqlx::query_as::<_, Shop>(
        r"
        SELECT id, shopify_domain, access_token, created_at, updated_at
        FROM shops
        WHERE id = $1
        ",
    )
    .bind(shop_id)
    .fetch_optional(pool)
    .await?;

    Ok(shop)
}

/// Create a shop on install, or refresh its access token on reinstall.
///
/// Reinstall bumps `updated_at`, which is what lets a scheduled shop
/// redaction detect that the erasure should be skipped.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn upsert(
    pool: &PgPool,
    shopify_domain: &str,
    access_token: &str,
) -> Result<Shop, RepositoryError> {
    let shop = sqlx::query_as::<_, Shop>(
        r"
        INSERT INTO shops (shopify_domain, access_token)
        VALUES ($1, $2)
        ON CONFLICT (shopify_domain)
        DO UPDATE SET access_token = EXCLUDED.access_token, updated_at = NOW()
        RETURNING id, shopify_domain, access_token, created_at, updated_at
        ",
    )
    .bind(shopify_domain)
    .bind(access_token)
    .fetch_one(pool)
    .await?;

    Ok(shop)
}

/// Destroy a shop. Orders, fulfillment orders and settings cascade.
///
/// Returns `true` if a row was deleted.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn delete(pool: &PgPool, shop_id: i64) -> Result<bool, RepositoryError> {
    let result = sqlx::query("DELETE FROM shops WHERE id = $1")
        .bind(shop_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
