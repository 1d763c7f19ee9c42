//! Public shipping-address update endpoint.
//!
//! Called cross-origin by the checkout UI extension, so the router carries
//! a CORS layer that only admits Shopify's extension sandbox origin.

use axum::{
    Json, Router,
    extract::State,
    http::{Method, StatusCode, header},
    response::IntoResponse,
    routing::post,
};
use order_hold_core::{ShippingAddress, ShopifyGid};
use serde::Deserialize;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::instrument;

use crate::db::orders;
use crate::error::AppError;
use crate::middleware::CurrentShop;
use crate::state::AppState;

/// Origin prefix of Shopify-hosted UI extensions.
const EXTENSION_ORIGIN_PREFIX: &str = "https://extensions.shopifycdn.com";

/// Build the address-update router with its CORS layer.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/shipping_address_updates", post(update_shipping_address))
        .layer(cors_layer())
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(|origin, _| {
            origin
                .to_str()
                .is_ok_and(|o| is_extension_origin(o))
        }))
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

/// Whether an `Origin` header value belongs to the extension sandbox.
///
/// The host must end where the prefix does - a bare prefix match would
/// also admit crafted sibling domains like
/// `extensions.shopifycdn.com.evil.com`.
fn is_extension_origin(origin: &str) -> bool {
    let origin = origin.to_ascii_lowercase();
    let Some(rest) = origin.strip_prefix(EXTENSION_ORIGIN_PREFIX) else {
        return false;
    };
    rest.is_empty() || rest.starts_with('/') || rest.starts_with(':')
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddressUpdateRequest {
    order_id: ShopifyGid,
    address: ShippingAddress,
}

/// POST /api/shipping_address_updates
///
/// Session-token authenticated. Returns the workflow outcome: 200 on
/// success, 422 on a classified failure, 404 when the order is unknown to
/// this app.
#[instrument(skip(state, request), fields(order_id = %request.order_id))]
async fn update_shipping_address(
    State(state): State<AppState>,
    CurrentShop(shop): CurrentShop,
    Json(request): Json<AddressUpdateRequest>,
) -> Result<impl IntoResponse, AppError> {
    orders::find_by_shopify_id(state.pool(), shop.id, &request.order_id)
        .await?
        .ok_or_else(|| AppError::NotFound(request.order_id.to_string()))?;

    let outcome = state
        .address_updates()
        .update_shipping_address(&shop, &request.order_id, &request.address)
        .await?;

    let status = if outcome.success {
        StatusCode::OK
    } else {
        StatusCode::UNPROCESSABLE_ENTITY
    };

    Ok((status, Json(outcome)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_origin_is_allowed_case_insensitively() {
        assert!(is_extension_origin("https://extensions.shopifycdn.com"));
        assert!(is_extension_origin("https://EXTENSIONS.SHOPIFYCDN.COM"));
        assert!(is_extension_origin(
            "https://extensions.shopifycdn.com/some/path"
        ));
        assert!(is_extension_origin("https://extensions.shopifycdn.com:443"));
    }

    #[test]
    fn test_other_origins_are_rejected() {
        assert!(!is_extension_origin("https://evil.example.com"));
        assert!(!is_extension_origin("http://extensions.shopifycdn.com"));
        assert!(!is_extension_origin(
            "https://notextensions.shopifycdn.com.evil.com"
        ));
    }

    #[test]
    fn test_crafted_sibling_domains_are_rejected() {
        assert!(!is_extension_origin(
            "https://extensions.shopifycdn.com.evil.com"
        ));
        assert!(!is_extension_origin(
            "https://extensions.shopifycdn.community"
        ));
    }

    #[test]
    fn test_request_body_is_camel_case() {
        let request: AddressUpdateRequest = serde_json::from_value(serde_json::json!({
            "orderId": "gid://shopify/Order/123",
            "address": {
                "address1": "1 Main St",
                "city": "Springfield",
                "zip": "12345"
            }
        }))
        .expect("deserialize");

        assert_eq!(request.order_id.as_str(), "gid://shopify/Order/123");
        assert_eq!(request.address.zip.as_deref(), Some("12345"));
    }
}
