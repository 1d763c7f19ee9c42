//! App installation via the Shopify OAuth flow.
//!
//! `GET /auth/shopify?shop=...` redirects the merchant to the authorize
//! page; the callback verifies Shopify's query HMAC, exchanges the code
//! for an access token, and upserts the shop row. A reinstall refreshes
//! the stored token and bumps `updated_at`, which is what cancels a
//! pending shop redaction.

use axum::{
    Router,
    extract::{Query, State},
    response::Redirect,
    routing::get,
};
use hmac::{Hmac, Mac};
use secrecy::ExposeSecret;
use serde::Deserialize;
use sha2::Sha256;
use tracing::{info, instrument};
use url::Url;

use crate::db::shops;
use crate::error::AppError;
use crate::state::AppState;

type HmacSha256 = Hmac<Sha256>;

/// Access scopes requested at install time.
const INSTALL_SCOPES: &[&str] = &[
    "read_orders",
    "write_orders",
    "read_fulfillments",
    "write_fulfillments",
    "read_merchant_managed_fulfillment_orders",
    "write_merchant_managed_fulfillment_orders",
];

/// Build the install router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/shopify", get(begin_install))
        .route("/auth/shopify/callback", get(callback))
}

/// Whether a `shop` parameter names a real `*.myshopify.com` domain.
fn is_shop_domain(shop: &str) -> bool {
    shop.strip_suffix(".myshopify.com").is_some_and(|name| {
        !name.is_empty()
            && !name.starts_with('-')
            && name
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    })
}

/// Build the authorize URL for a (validated) shop domain.
fn authorization_url(shop: &str, api_key: &str, redirect_uri: &str) -> Result<String, AppError> {
    let mut url = Url::parse(&format!("https://{shop}/admin/oauth/authorize"))
        .map_err(|e| AppError::BadRequest(format!("Invalid shop domain: {e}")))?;
    url.query_pairs_mut()
        .append_pair("client_id", api_key)
        .append_pair("scope", &INSTALL_SCOPES.join(","))
        .append_pair("redirect_uri", redirect_uri);
    Ok(url.into())
}

#[derive(Debug, Deserialize)]
struct BeginInstallParams {
    shop: String,
}

/// GET /auth/shopify - send the merchant to the authorize page.
#[instrument(skip(state))]
async fn begin_install(
    State(state): State<AppState>,
    Query(params): Query<BeginInstallParams>,
) -> Result<Redirect, AppError> {
    if !is_shop_domain(&params.shop) {
        return Err(AppError::BadRequest("Invalid shop domain".to_string()));
    }

    let redirect_uri = format!("{}/auth/shopify/callback", state.config().app_url);
    let url = authorization_url(
        &params.shop,
        &state.config().shopify.api_key,
        &redirect_uri,
    )?;

    Ok(Redirect::to(&url))
}

#[derive(Debug, Deserialize)]
struct CallbackParams {
    code: Option<String>,
    shop: Option<String>,
    hmac: Option<String>,
    state: Option<String>,
    timestamp: Option<String>,
    host: Option<String>,
}

/// Verify the hex HMAC-SHA256 Shopify puts on the callback query string.
///
/// The message is every parameter except `hmac` itself, sorted by key and
/// joined as `key=value&...`.
fn verify_install_hmac(params: &CallbackParams, api_secret: &str) -> bool {
    let Some(provided) = &params.hmac else {
        return false;
    };

    let mut pairs: Vec<(&str, &String)> = Vec::new();
    if let Some(v) = &params.code {
        pairs.push(("code", v));
    }
    if let Some(v) = &params.host {
        pairs.push(("host", v));
    }
    if let Some(v) = &params.shop {
        pairs.push(("shop", v));
    }
    if let Some(v) = &params.state {
        pairs.push(("state", v));
    }
    if let Some(v) = &params.timestamp {
        pairs.push(("timestamp", v));
    }
    pairs.sort_by_key(|(k, _)| *k);

    let message = pairs
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    let Ok(expected) = hex::decode(provided) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(api_secret.as_bytes()) else {
        return false;
    };
    mac.update(message.as_bytes());
    mac.verify_slice(&expected).is_ok()
}

/// GET /auth/shopify/callback - finish the install.
///
/// Authenticity rests on the query HMAC, which Shopify signs with the app
/// secret. On success the merchant lands back on the app inside the admin.
#[instrument(skip(state, params))]
async fn callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> Result<Redirect, AppError> {
    let shopify = &state.config().shopify;

    if !verify_install_hmac(&params, shopify.api_secret.expose_secret()) {
        return Err(AppError::Unauthorized(
            "Invalid OAuth signature".to_string(),
        ));
    }

    let shop = params
        .shop
        .as_deref()
        .filter(|s| is_shop_domain(s))
        .ok_or_else(|| AppError::BadRequest("Invalid shop domain".to_string()))?;
    let code = params
        .code
        .as_deref()
        .ok_or_else(|| AppError::BadRequest("Missing authorization code".to_string()))?;

    let token = state
        .shopify()
        .exchange_code(
            shop,
            &shopify.api_key,
            shopify.api_secret.expose_secret(),
            code,
        )
        .await?;

    shops::upsert(state.pool(), shop, &token.access_token).await?;

    info!(shop = %shop, scopes = %token.scope, "App installed");
    Ok(Redirect::to(&format!(
        "https://{shop}/admin/apps/{}",
        shopify.api_key
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(params: &CallbackParams, secret: &str) -> String {
        let mut pairs: Vec<(&str, &String)> = Vec::new();
        if let Some(v) = &params.code {
            pairs.push(("code", v));
        }
        if let Some(v) = &params.host {
            pairs.push(("host", v));
        }
        if let Some(v) = &params.shop {
            pairs.push(("shop", v));
        }
        if let Some(v) = &params.state {
            pairs.push(("state", v));
        }
        if let Some(v) = &params.timestamp {
            pairs.push(("timestamp", v));
        }
        pairs.sort_by_key(|(k, _)| *k);
        let message = pairs
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");

        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("hmac key");
        mac.update(message.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    fn callback_params() -> CallbackParams {
        CallbackParams {
            code: Some("abc123".to_string()),
            shop: Some("test.myshopify.com".to_string()),
            hmac: None,
            state: None,
            timestamp: Some("1700000000".to_string()),
            host: None,
        }
    }

    #[test]
    fn test_shop_domain_validation() {
        assert!(is_shop_domain("test.myshopify.com"));
        assert!(is_shop_domain("my-shop-2.myshopify.com"));

        assert!(!is_shop_domain(".myshopify.com"));
        assert!(!is_shop_domain("-bad.myshopify.com"));
        assert!(!is_shop_domain("Upper.myshopify.com"));
        assert!(!is_shop_domain("test.myshopify.com.evil.com"));
        assert!(!is_shop_domain("evil.com/?x=.myshopify.com"));
    }

    #[test]
    fn test_authorization_url_carries_client_and_redirect() {
        let url = authorization_url(
            "test.myshopify.com",
            "the-key",
            "https://app.example.com/auth/shopify/callback",
        )
        .expect("valid url");

        assert!(url.starts_with("https://test.myshopify.com/admin/oauth/authorize?"));
        assert!(url.contains("client_id=the-key"));
        assert!(url.contains("redirect_uri=https%3A%2F%2Fapp.example.com%2Fauth%2Fshopify%2Fcallback"));
    }

    #[test]
    fn test_canonical_query_hmac_verifies() {
        let mut params = callback_params();
        params.hmac = Some(sign(&params, "secret"));
        assert!(verify_install_hmac(&params, "secret"));
    }

    #[test]
    fn test_tampered_query_is_rejected() {
        let mut params = callback_params();
        params.hmac = Some(sign(&params, "secret"));
        params.shop = Some("other.myshopify.com".to_string());
        assert!(!verify_install_hmac(&params, "secret"));
    }

    #[test]
    fn test_missing_hmac_is_rejected() {
        assert!(!verify_install_hmac(&callback_params(), "secret"));
    }
}
