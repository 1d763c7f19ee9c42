//! HTTP route definitions.
//!
//! - [`address_updates`] - the public extension-facing API
//! - [`install`] - OAuth app installation
//! - [`settings`] - merchant settings
//! - [`webhooks`] - Shopify webhook ingestion

pub mod address_updates;
pub mod install;
pub mod settings;
pub mod webhooks;

use axum::Router;

use crate::state::AppState;

/// Build the application router (health endpoints are added in `main`).
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(address_updates::router())
        .merge(install::router())
        .merge(settings::router())
        .merge(webhooks::router())
}
