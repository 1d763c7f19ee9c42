//! Per-shop settings repository.

use chrono::{DateTime, Utc};
use order_hold_core::HoldDuration;
use sqlx::PgPool;

use super::RepositoryError;

/// A shop's settings row. Exactly one per shop (unique `shop_id`).
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Settings {
    pub id: i64,
    pub shop_id: i64,
    pub hold_duration_minutes: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Settings {
    /// The validated hold duration. A row can only hold an out-of-set value
    /// if it predates the current option list, in which case the default
    /// applies.
    #[must_use]
    pub fn hold_duration(&self) -> HoldDuration {
        HoldDuration::from_minutes(self.hold_duration_minutes).unwrap_or_default()
    }
}

const COLUMNS: &str = "id, shop_id, hold_duration_minutes, created_at, updated_at";

/// Get a shop's settings, creating the default row on first access.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn get_or_create(pool: &PgPool, shop_id: i64) -> Result<Settings, RepositoryError> {
    let settings = sqlx::query_as::<_, Settings>(&format!(
        r"
        INSERT INTO settings (shop_id)
        VALUES ($1)
        ON CONFLICT (shop_id) DO UPDATE SET shop_id = EXCLUDED.shop_id
        RETURNING {COLUMNS}
        "
    ))
    .bind(shop_id)
    .fetch_one(pool)
    .await?;

    Ok(settings)
}

/// Update a shop's hold duration.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn set_hold_duration(
    pool: &PgPool,
    shop_id: i64,
    duration: HoldDuration,
) -> Result<Settings, RepositoryError> {
    let settings = sqlx::query_as::<_, Settings>(&format!(
        r"
        INSERT INTO settings (shop_id, hold_duration_minutes)
        VALUES ($1, $2)
        ON CONFLICT (shop_id) DO UPDATE SET
            hold_duration_minutes = EXCLUDED.hold_duration_minutes,
            updated_at = NOW()
        RETURNING {COLUMNS}
        "
    ))
    .bind(shop_id)
    .bind(duration.minutes())
    .fetch_one(pool)
    .await?;

    Ok(settings)
}
