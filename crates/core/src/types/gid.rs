//! Shopify global IDs.
//!
//! Shopify resources are addressed by opaque, globally unique URI-like
//! strings such as `gid://shopify/Order/123`. The wrapper keeps them from
//! being confused with other strings and provides the constructors the
//! compliance webhooks need (their payloads carry bare numeric ids).

use std::fmt;

use serde::{Deserialize, Serialize};

/// An opaque Shopify global ID (`gid://shopify/<Type>/<id>`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShopifyGid(String);

impl ShopifyGid {
    /// Wrap an already-formed GID string.
    #[must_use]
    pub fn new(gid: impl Into<String>) -> Self {
        Self(gid.into())
    }

    /// Build an order GID from the numeric id used in webhook payloads.
    #[must_use]
    pub fn order(numeric_id: u64) -> Self {
        Self(format!("gid://shopify/Order/{numeric_id}"))
    }

    /// Get the underlying string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ShopifyGid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ShopifyGid {
    fn from(gid: String) -> Self {
        Self(gid)
    }
}

impl From<&str> for ShopifyGid {
    fn from(gid: &str) -> Self {
        Self(gid.to_string())
    }
}

impl From<ShopifyGid> for String {
    fn from(gid: ShopifyGid) -> Self {
        gid.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_gid_from_numeric_id() {
        assert_eq!(
            ShopifyGid::order(123).as_str(),
            "gid://shopify/Order/123"
        );
    }

    #[test]
    fn test_serde_is_transparent() {
        let gid = ShopifyGid::new("gid://shopify/FulfillmentOrder/42");
        let json = serde_json::to_string(&gid).expect("serialize");
        assert_eq!(json, "\"gid://shopify/FulfillmentOrder/42\"");

        let back: ShopifyGid = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, gid);
    }

    #[test]
    fn test_display_round_trip() {
        let gid = ShopifyGid::order(7);
        assert_eq!(gid.to_string(), "gid://shopify/Order/7");
    }
}
