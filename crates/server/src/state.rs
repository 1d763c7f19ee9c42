//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::AppConfig;
use crate::services::{AddressUpdateService, ComplianceService, HoldService};
use crate::shopify::ShopifyClient;

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AppConfig,
    pool: PgPool,
    shopify: ShopifyClient,
    address_updates: AddressUpdateService,
    holds: HoldService,
    compliance: ComplianceService,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(config: AppConfig, pool: PgPool) -> Self {
        let shopify = ShopifyClient::new(config.shopify.api_version.clone());
        let address_updates = AddressUpdateService::new(pool.clone(), shopify.clone());
        let holds = HoldService::new(pool.clone(), shopify.clone());
        let compliance = ComplianceService::new(pool.clone());

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                shopify,
                address_updates,
                holds,
                compliance,
            }),
        }
    }

    /// Get a reference to the configuration.
    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the Shopify Admin API client.
    #[must_use]
    pub fn shopify(&self) -> &ShopifyClient {
        &self.inner.shopify
    }

    /// Get a reference to the address update workflow.
    #[must_use]
    pub fn address_updates(&self) -> &AddressUpdateService {
        &self.inner.address_updates
    }

    /// Get a reference to the hold lifecycle workflow.
    #[must_use]
    pub fn holds(&self) -> &HoldService {
        &self.inner.holds
    }

    /// Get a reference to the compliance workflow.
    #[must_use]
    pub fn compliance(&self) -> &ComplianceService {
        &self.inner.compliance
    }
}
