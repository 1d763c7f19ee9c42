//! Shopify webhook endpoints.
//!
//! Every webhook is authenticated by an HMAC-SHA256 of the raw request
//! body, signed with the app secret and base64-encoded in the
//! `X-Shopify-Hmac-Sha256` header. Verification runs before the body is
//! parsed; handlers acknowledge with 204 so Shopify stops redelivering.

use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
};
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use chrono::Utc;
use hmac::{Hmac, Mac};
use order_hold_core::ShopifyGid;
use secrecy::ExposeSecret;
use serde::Deserialize;
use sha2::Sha256;
use tracing::{info, instrument, warn};

use crate::error::AppError;
use crate::jobs::{self, JobKind, RoutingCompletePayload};
use crate::state::AppState;

type HmacSha256 = Hmac<Sha256>;

const HMAC_HEADER: &str = "x-shopify-hmac-sha256";
const TOPIC_HEADER: &str = "x-shopify-topic";
const SHOP_DOMAIN_HEADER: &str = "x-shopify-shop-domain";

/// Build the webhook router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/webhooks/fulfillment_orders_routing_complete",
            post(routing_complete),
        )
        .route("/api/webhooks/compliance", post(compliance))
}

/// Verify a webhook body against its base64 HMAC-SHA256 signature.
///
/// Comparison is constant-time via the `Mac` verifier.
fn verify_webhook_hmac(secret: &str, body: &[u8], signature: &str) -> bool {
    let Ok(expected) = BASE64.decode(signature) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

/// Authenticate a webhook request and pull out the topic and shop domain.
fn authenticate(
    state: &AppState,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<(String, String), AppError> {
    let signature = headers
        .get(HMAC_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing webhook signature".to_string()))?;

    let secret = state.config().shopify.api_secret.expose_secret();
    if !verify_webhook_hmac(secret, body, signature) {
        return Err(AppError::Unauthorized(
            "Invalid webhook signature".to_string(),
        ));
    }

    let topic = headers
        .get(TOPIC_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let shop_domain = headers
        .get(SHOP_DOMAIN_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    Ok((topic, shop_domain))
}

#[derive(Debug, Deserialize)]
struct RoutingCompleteBody {
    fulfillment_order: FulfillmentOrderRef,
}

#[derive(Debug, Deserialize)]
struct FulfillmentOrderRef {
    id: ShopifyGid,
}

/// POST /api/webhooks/fulfillment_orders_routing_complete
///
/// Enqueues the hold workflow and acknowledges immediately; Shopify's
/// delivery timeout is far shorter than a hold mutation under rate limits.
#[instrument(skip(state, headers, body))]
async fn routing_complete(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, AppError> {
    let (_, shop_domain) = authenticate(&state, &headers, &body)?;

    let parsed: RoutingCompleteBody = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("Invalid webhook body: {e}")))?;

    jobs::enqueue(
        state.pool(),
        JobKind::RoutingComplete,
        &serde_json::to_value(RoutingCompletePayload {
            shop_domain: shop_domain.clone(),
            fulfillment_order_id: parsed.fulfillment_order.id.clone(),
        })
        .map_err(|e| AppError::Internal(e.to_string()))?,
        Utc::now(),
    )
    .await?;

    info!(
        shop = %shop_domain,
        fulfillment_order_id = %parsed.fulfillment_order.id,
        "Routing complete webhook accepted"
    );
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct ComplianceBody {
    #[serde(default)]
    customer: Option<CustomerRef>,
    #[serde(default)]
    orders_requested: Vec<u64>,
    #[serde(default)]
    orders_to_redact: Vec<u64>,
}

#[derive(Debug, Deserialize)]
struct CustomerRef {
    id: u64,
}

/// POST /api/webhooks/compliance
///
/// Dispatches the three mandatory privacy topics. Data request and
/// customer redaction run inline (local reads/deletes only); shop
/// redaction is deferred 48 hours.
#[instrument(skip(state, headers, body))]
async fn compliance(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, AppError> {
    let (topic, shop_domain) = authenticate(&state, &headers, &body)?;

    let parsed: ComplianceBody = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("Invalid webhook body: {e}")))?;
    let customer_id = parsed.customer.map(|c| c.id);

    match topic.as_str() {
        "customers/data_request" => {
            state
                .compliance()
                .data_request(&shop_domain, customer_id, &parsed.orders_requested)
                .await?;
        }
        "customers/redact" => {
            state
                .compliance()
                .customer_redact(&shop_domain, customer_id, &parsed.orders_to_redact)
                .await?;
        }
        "shop/redact" => {
            state.compliance().schedule_shop_redact(&shop_domain).await?;
        }
        other => {
            warn!(topic = %other, shop = %shop_domain, "Unhandled webhook topic");
        }
    }

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(secret: &str, body: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("hmac key");
        mac.update(body);
        BASE64.encode(mac.finalize().into_bytes())
    }

    #[test]
    fn test_canonical_signature_verifies() {
        let body = br#"{"fulfillment_order":{"id":"gid://shopify/FulfillmentOrder/1"}}"#;
        let signature = sign("secret", body);
        assert!(verify_webhook_hmac("secret", body, &signature));
    }

    #[test]
    fn test_tampered_body_is_rejected() {
        let signature = sign("secret", b"original body");
        assert!(!verify_webhook_hmac("secret", b"tampered body", &signature));
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let body = b"payload";
        let signature = sign("secret", body);
        assert!(!verify_webhook_hmac("other-secret", body, &signature));
    }

    #[test]
    fn test_malformed_signature_is_rejected() {
        assert!(!verify_webhook_hmac("secret", b"payload", "not-base64!!!"));
    }

    #[test]
    fn test_compliance_body_tolerates_missing_fields() {
        let parsed: ComplianceBody =
            serde_json::from_str(r#"{"shop_domain":"test.myshopify.com"}"#).expect("deserialize");
        assert!(parsed.customer.is_none());
        assert!(parsed.orders_requested.is_empty());
        assert!(parsed.orders_to_redact.is_empty());
    }

    #[test]
    fn test_routing_complete_body_parses_fulfillment_order_gid() {
        let parsed: RoutingCompleteBody = serde_json::from_str(
            r#"{"fulfillment_order":{"id":"gid://shopify/FulfillmentOrder/42","status":"in_progress"}}"#,
        )
        .expect("deserialize");
        assert_eq!(
            parsed.fulfillment_order.id.as_str(),
            "gid://shopify/FulfillmentOrder/42"
        );
    }
}
