//! Fulfillment-order hold lifecycle.
//!
//! A routing-complete event moves a fulfillment order through:
//!
//! ```text
//! unknown --hold--> held --scheduled release--> released
//!    \
//!     `--(hold exempt)--> persisted (never held)
//! ```
//!
//! Holding happens inline in the webhook job so the order cannot slip into
//! fulfillment while a deferred task waits its turn; the exempt path only
//! records the projection and runs fully deferred.

use chrono::Utc;
use order_hold_core::{ShopifyGid, edit_window};
use sqlx::PgPool;
use tracing::{info, instrument};

use crate::db::{
    fulfillment_orders::{self, FulfillmentOrder, PersistFulfillmentOrder},
    orders, settings,
    shops::Shop,
};
use crate::error::AppError;
use crate::jobs::{self, JobKind, PersistFulfillmentOrderPayload, ReleaseHoldPayload};
use crate::shopify::{HeldFulfillmentOrder, ShopSession, ShopifyClient};

/// Hold lifecycle service.
#[derive(Clone)]
pub struct HoldService {
    pool: PgPool,
    shopify: ShopifyClient,
}

impl HoldService {
    /// Create a new hold service.
    #[must_use]
    pub const fn new(pool: PgPool, shopify: ShopifyClient) -> Self {
        Self { pool, shopify }
    }

    /// Whether new fulfillment orders for this shop should be held at all.
    ///
    /// Always true today; the seam exists for delivery-method exemptions
    /// (e.g. same-day delivery must not be held).
    #[must_use]
    pub const fn should_hold(_shop: &Shop) -> bool {
        true
    }

    /// React to a routing-complete event for a fulfillment order.
    ///
    /// Holds immediately and schedules the release, or defers a plain
    /// persistence task when the shop is hold-exempt.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Shopify` for remote failures (the job runner
    /// decides retry vs discard) and `AppError::Database` for local ones.
    #[instrument(skip(self, shop), fields(shop = %shop.shopify_domain, fulfillment_order_id = %fulfillment_order_id))]
    pub async fn handle_routing_complete(
        &self,
        shop: &Shop,
        fulfillment_order_id: &ShopifyGid,
    ) -> Result<(), AppError> {
        if Self::should_hold(shop) {
            self.hold_and_schedule_release(shop, fulfillment_order_id)
                .await
        } else {
            jobs::enqueue(
                &self.pool,
                JobKind::PersistFulfillmentOrder,
                &serde_json::to_value(PersistFulfillmentOrderPayload {
                    shop_id: shop.id,
                    fulfillment_order_id: fulfillment_order_id.clone(),
                })
                .map_err(|e| AppError::Internal(e.to_string()))?,
                Utc::now(),
            )
            .await?;
            Ok(())
        }
    }

    /// Place the hold, persist the projection, and schedule the release for
    /// when the shop's edit window closes.
    async fn hold_and_schedule_release(
        &self,
        shop: &Shop,
        fulfillment_order_id: &ShopifyGid,
    ) -> Result<(), AppError> {
        let session = ShopSession::for_shop(shop);
        let held = self
            .shopify
            .hold_fulfillment_order(&session, fulfillment_order_id)
            .await?;

        let record = self
            .persist(shop, fulfillment_order_id, &held, true)
            .await?;

        let shop_settings = settings::get_or_create(&self.pool, shop.id).await?;
        let release_at = edit_window::closes_at(held.created_at, shop_settings.hold_duration());

        jobs::enqueue(
            &self.pool,
            JobKind::ReleaseHold,
            &serde_json::to_value(ReleaseHoldPayload {
                fulfillment_order_id: record.id,
            })
            .map_err(|e| AppError::Internal(e.to_string()))?,
            release_at,
        )
        .await?;

        info!(
            fulfillment_order = record.id,
            release_at = %release_at,
            "Held fulfillment order and scheduled release"
        );
        Ok(())
    }

    /// Persist a fulfillment order without holding it (hold-exempt path,
    /// runs as a deferred job).
    ///
    /// # Errors
    ///
    /// Returns `AppError::Shopify` for remote failures and
    /// `AppError::Database` for local ones.
    #[instrument(skip(self, shop), fields(shop = %shop.shopify_domain, fulfillment_order_id = %fulfillment_order_id))]
    pub async fn persist_without_hold(
        &self,
        shop: &Shop,
        fulfillment_order_id: &ShopifyGid,
    ) -> Result<(), AppError> {
        let session = ShopSession::for_shop(shop);
        let fetched = self
            .shopify
            .get_fulfillment_order(&session, fulfillment_order_id)
            .await?;

        self.persist(shop, fulfillment_order_id, &fetched, false)
            .await?;
        Ok(())
    }

    /// Release a held fulfillment order and record the resulting status.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database(RepositoryError::NotFound)` if the local
    /// record or its shop is gone (the job is discarded), and
    /// `AppError::Shopify` for remote failures - a `UserError` here means
    /// the hold no longer exists remotely and is likewise discarded.
    #[instrument(skip(self))]
    pub async fn release_hold(&self, fulfillment_order_id: i64) -> Result<(), AppError> {
        let record = fulfillment_orders::get(&self.pool, fulfillment_order_id)
            .await?
            .ok_or(crate::db::RepositoryError::NotFound)?;
        let shop = crate::db::shops::get(&self.pool, record.shop_id)
            .await?
            .ok_or(crate::db::RepositoryError::NotFound)?;

        let session = ShopSession::for_shop(&shop);
        let released = self
            .shopify
            .release_fulfillment_order_hold(&session, &ShopifyGid::new(record.shopify_id.clone()))
            .await?;

        fulfillment_orders::update_status(&self.pool, record.id, &released.status).await?;

        info!(
            fulfillment_order = record.id,
            status = %released.status,
            "Released fulfillment order hold"
        );
        Ok(())
    }

    /// Find-or-create the owning order and upsert the fulfillment order
    /// projection. Idempotent under duplicate webhook delivery.
    async fn persist(
        &self,
        shop: &Shop,
        fulfillment_order_id: &ShopifyGid,
        remote: &HeldFulfillmentOrder,
        held: bool,
    ) -> Result<FulfillmentOrder, AppError> {
        let order = orders::find_or_create(&self.pool, shop.id, &remote.order_id).await?;
        orders::backfill_shopify_created_at(&self.pool, order.id, remote.created_at).await?;

        let record = fulfillment_orders::upsert(
            &self.pool,
            PersistFulfillmentOrder {
                shop_id: shop.id,
                order_id: order.id,
                shopify_id: fulfillment_order_id,
                status: &remote.status,
                held_at: held.then(Utc::now),
                shopify_created_at: Some(remote.created_at),
            },
        )
        .await?;

        Ok(record)
    }
}
