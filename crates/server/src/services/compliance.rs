//! Compliance data-request and erasure workflows.
//!
//! All three handlers are idempotent and tolerate unknown shops or orders:
//! a reference we have no data for is a no-op, not an error, because the
//! platform retries compliance webhooks and the data may already be gone.

use chrono::{DateTime, Duration, Utc};
use order_hold_core::ShopifyGid;
use sqlx::PgPool;
use tracing::{info, instrument};

use crate::db::{orders, shops};
use crate::error::AppError;
use crate::jobs::{self, JobKind, ShopRedactPayload};

/// Delay before a shop redaction executes, so an accidental uninstall can
/// be reversed before the data goes away.
const SHOP_REDACT_DELAY_HOURS: i64 = 48;

/// Compliance workflow service.
#[derive(Clone)]
pub struct ComplianceService {
    pool: PgPool,
}

impl ComplianceService {
    /// Create a new compliance service.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Handle `customers/data_request`: report which requested orders we
    /// hold data for. Emits an audit log entry; mutates nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if a database query fails.
    #[instrument(skip(self))]
    pub async fn data_request(
        &self,
        shop_domain: &str,
        customer_id: Option<u64>,
        requested_order_ids: &[u64],
    ) -> Result<(), AppError> {
        let Some(shop) = shops::find_by_domain(&self.pool, shop_domain).await? else {
            return Ok(());
        };

        let matching = self.find_orders(shop.id, requested_order_ids).await?;
        let data: Vec<(String, DateTime<Utc>)> = matching
            .iter()
            .map(|o| (o.shopify_id.clone(), o.created_at))
            .collect();

        info!(
            shop = %shop_domain,
            ?customer_id,
            orders_found = matching.len(),
            ?data,
            "Compliance data request"
        );
        Ok(())
    }

    /// Handle `customers/redact`: destroy the matching orders (their
    /// fulfillment orders cascade).
    ///
    /// # Errors
    ///
    /// Returns an error if a database query fails.
    #[instrument(skip(self))]
    pub async fn customer_redact(
        &self,
        shop_domain: &str,
        customer_id: Option<u64>,
        order_ids_to_redact: &[u64],
    ) -> Result<(), AppError> {
        let Some(shop) = shops::find_by_domain(&self.pool, shop_domain).await? else {
            return Ok(());
        };

        let matching = self.find_orders(shop.id, order_ids_to_redact).await?;

        info!(
            shop = %shop_domain,
            ?customer_id,
            destroying_orders = matching.len(),
            "Compliance customer redaction"
        );

        let ids: Vec<i64> = matching.iter().map(|o| o.id).collect();
        orders::delete_by_ids(&self.pool, &ids).await?;
        Ok(())
    }

    /// Handle `shop/redact`: schedule the erasure 48 hours out. The delay
    /// lets an accidental uninstall be reversed; the executing job
    /// re-checks before destroying anything.
    ///
    /// # Errors
    ///
    /// Returns an error if the job cannot be enqueued.
    #[instrument(skip(self))]
    pub async fn schedule_shop_redact(&self, shop_domain: &str) -> Result<(), AppError> {
        let requested_at = Utc::now();
        jobs::enqueue(
            &self.pool,
            JobKind::ShopRedact,
            &serde_json::to_value(ShopRedactPayload {
                shop_domain: shop_domain.to_string(),
                requested_at,
            })
            .map_err(|e| AppError::Internal(e.to_string()))?,
            requested_at + Duration::hours(SHOP_REDACT_DELAY_HOURS),
        )
        .await?;

        info!(shop = %shop_domain, "Scheduled shop redaction");
        Ok(())
    }

    /// Execute a scheduled shop redaction.
    ///
    /// Scheduling and execution are 48 hours apart and the world may have
    /// changed: a shop whose row was touched after the request was
    /// reinstalled, and erasing it would destroy live data - skip instead.
    ///
    /// # Errors
    ///
    /// Returns an error if a database query fails.
    #[instrument(skip(self))]
    pub async fn redact_shop(
        &self,
        shop_domain: &str,
        requested_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let Some(shop) = shops::find_by_domain(&self.pool, shop_domain).await? else {
            info!(shop = %shop_domain, "Shop already gone, nothing to redact");
            return Ok(());
        };

        if shop.updated_at > requested_at {
            info!(
                shop = %shop_domain,
                updated_at = %shop.updated_at,
                requested_at = %requested_at,
                "Shop reinstalled since redaction request, skipping erasure"
            );
            return Ok(());
        }

        shops::delete(&self.pool, shop.id).await?;
        info!(shop = %shop_domain, "Shop redacted");
        Ok(())
    }

    /// Map numeric platform order ids to local rows for one shop.
    async fn find_orders(
        &self,
        shop_id: i64,
        numeric_ids: &[u64],
    ) -> Result<Vec<orders::Order>, AppError> {
        let gids: Vec<ShopifyGid> = numeric_ids.iter().map(|id| ShopifyGid::order(*id)).collect();
        Ok(orders::find_by_shopify_ids(&self.pool, shop_id, &gids).await?)
    }
}
