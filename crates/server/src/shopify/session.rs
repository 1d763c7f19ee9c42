//! Explicit per-shop API session.

use secrecy::{ExposeSecret, SecretString};

use crate::db::shops::Shop;

/// Credentials for one shop's Admin API, passed explicitly into every
/// client call rather than held as ambient state.
#[derive(Clone)]
pub struct ShopSession {
    shop_domain: String,
    access_token: SecretString,
}

impl ShopSession {
    /// Build a session from a stored shop row.
    #[must_use]
    pub fn for_shop(shop: &Shop) -> Self {
        Self {
            shop_domain: shop.shopify_domain.clone(),
            access_token: SecretString::from(shop.access_token.clone()),
        }
    }

    /// The shop's `*.myshopify.com` domain.
    #[must_use]
    pub fn shop_domain(&self) -> &str {
        &self.shop_domain
    }

    /// The raw access token, for the `X-Shopify-Access-Token` header.
    #[must_use]
    pub fn access_token(&self) -> &str {
        self.access_token.expose_secret()
    }
}

impl std::fmt::Debug for ShopSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopSession")
            .field("shop_domain", &self.shop_domain)
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}
