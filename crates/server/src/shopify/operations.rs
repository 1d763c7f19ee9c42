//! The four Admin API operations this app issues.
//!
//! Each wrapper sends one document, narrows the response to the payload the
//! workflows care about, and raises [`ShopifyError::UserError`] when a
//! mutation reports `userErrors`.

use chrono::{DateTime, Utc};
use order_hold_core::{ShippingAddress, ShopifyGid};
use serde::Deserialize;
use tracing::instrument;

use super::{ShopSession, ShopifyClient, ShopifyError};

const GET_FULFILLMENT_ORDER: &str = r"
query fulfillmentOrder($id: ID!) {
  fulfillmentOrder(id: $id) {
    status
    createdAt
    order { id }
  }
}
";

const HOLD_FULFILLMENT_ORDER: &str = r"
mutation fulfillmentOrderHold($id: ID!, $fulfillmentHold: FulfillmentOrderHoldInput!) {
  fulfillmentOrderHold(id: $id, fulfillmentHold: $fulfillmentHold) {
    fulfillmentOrder {
      status
      createdAt
      order { id }
    }
    userErrors { field message }
  }
}
";

const RELEASE_FULFILLMENT_ORDER_HOLD: &str = r"
mutation fulfillmentOrderReleaseHold($id: ID!) {
  fulfillmentOrderReleaseHold(id: $id) {
    fulfillmentOrder {
      status
    }
    userErrors { field message }
  }
}
";

const UPDATE_ORDER_ADDRESS: &str = r"
mutation orderUpdate($input: OrderInput!) {
  orderUpdate(input: $input) {
    order {
      id
      statusPageUrl
      shippingAddress {
        firstName
        lastName
        address1
        address2
        city
        province
        zip
        country
        countryCode
        provinceCode
      }
    }
    userErrors {
      field
      message
    }
  }
}
";

// =============================================================================
// Typed results
// =============================================================================

/// A fulfillment order as returned by the fetch and hold operations.
#[derive(Debug, Clone)]
pub struct HeldFulfillmentOrder {
    /// Remote status string (free-form).
    pub status: String,
    /// When the fulfillment order was created remotely.
    pub created_at: DateTime<Utc>,
    /// GID of the owning order.
    pub order_id: ShopifyGid,
}

/// Result of releasing a hold.
#[derive(Debug, Clone)]
pub struct ReleasedHold {
    /// Remote status after the release.
    pub status: String,
}

/// Result of updating an order's shipping address.
#[derive(Debug, Clone)]
pub struct UpdatedOrder {
    pub order_id: ShopifyGid,
    /// Customer-facing order status page URL.
    pub status_page_url: Option<String>,
    /// The address as stored remotely after the update.
    pub shipping_address: Option<ShippingAddress>,
}

// =============================================================================
// Wire shapes
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FulfillmentOrderPayload {
    status: String,
    created_at: DateTime<Utc>,
    order: OrderRef,
}

#[derive(Debug, Deserialize)]
struct OrderRef {
    id: ShopifyGid,
}

#[derive(Debug, Deserialize)]
struct UserErrorPayload {
    #[serde(default)]
    field: Option<Vec<String>>,
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetFulfillmentOrderData {
    fulfillment_order: Option<FulfillmentOrderPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HoldData {
    fulfillment_order_hold: HoldPayload,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HoldPayload {
    fulfillment_order: Option<FulfillmentOrderPayload>,
    #[serde(default)]
    user_errors: Vec<UserErrorPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReleaseData {
    fulfillment_order_release_hold: ReleasePayload,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReleasePayload {
    fulfillment_order: Option<ReleasedFulfillmentOrderPayload>,
    #[serde(default)]
    user_errors: Vec<UserErrorPayload>,
}

#[derive(Debug, Deserialize)]
struct ReleasedFulfillmentOrderPayload {
    status: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderUpdateData {
    order_update: OrderUpdatePayload,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderUpdatePayload {
    order: Option<UpdatedOrderPayload>,
    #[serde(default)]
    user_errors: Vec<UserErrorPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdatedOrderPayload {
    id: ShopifyGid,
    status_page_url: Option<String>,
    shipping_address: Option<ShippingAddress>,
}

/// Raise `ShopifyError::UserError` if a mutation reported user errors.
fn check_user_errors(errors: Vec<UserErrorPayload>) -> Result<(), ShopifyError> {
    if errors.is_empty() {
        return Ok(());
    }

    let message = errors
        .iter()
        .map(|e| e.message.clone())
        .collect::<Vec<_>>()
        .join("; ");
    let fields = errors
        .into_iter()
        .filter_map(|e| e.field)
        .flatten()
        .collect();

    Err(ShopifyError::UserError { message, fields })
}

impl From<FulfillmentOrderPayload> for HeldFulfillmentOrder {
    fn from(payload: FulfillmentOrderPayload) -> Self {
        Self {
            status: payload.status,
            created_at: payload.created_at,
            order_id: payload.order.id,
        }
    }
}

// =============================================================================
// Operations
// =============================================================================

impl ShopifyClient {
    /// Fetch a fulfillment order's status, creation time and owning order.
    ///
    /// # Errors
    ///
    /// Returns `ShopifyError::NotFound` if the fulfillment order does not
    /// exist remotely, or any transport/GraphQL error from the call.
    #[instrument(skip(self, session), fields(fulfillment_order_id = %id))]
    pub async fn get_fulfillment_order(
        &self,
        session: &ShopSession,
        id: &ShopifyGid,
    ) -> Result<HeldFulfillmentOrder, ShopifyError> {
        let variables = serde_json::json!({ "id": id });
        let data: GetFulfillmentOrderData = self
            .execute(session, GET_FULFILLMENT_ORDER, variables)
            .await?;

        data.fulfillment_order
            .map(Into::into)
            .ok_or_else(|| ShopifyError::NotFound(id.to_string()))
    }

    /// Place a hold on a fulfillment order.
    ///
    /// The hold input is fixed: reason `OTHER`, not merchant-visible, with
    /// the app's handle so the release only lifts our own hold.
    ///
    /// # Errors
    ///
    /// Returns `ShopifyError::UserError` if the mutation reports field
    /// errors, or any transport/GraphQL error from the call.
    #[instrument(skip(self, session), fields(fulfillment_order_id = %id))]
    pub async fn hold_fulfillment_order(
        &self,
        session: &ShopSession,
        id: &ShopifyGid,
    ) -> Result<HeldFulfillmentOrder, ShopifyError> {
        let variables = serde_json::json!({
            "id": id,
            "fulfillmentHold": {
                "reason": "OTHER",
                "reasonNotes": "Held for order editing window",
                "notifyMerchant": false,
                "handle": "order-editing-window",
            },
        });
        let data: HoldData = self
            .execute(session, HOLD_FULFILLMENT_ORDER, variables)
            .await?;

        check_user_errors(data.fulfillment_order_hold.user_errors)?;

        data.fulfillment_order_hold
            .fulfillment_order
            .map(Into::into)
            .ok_or_else(|| ShopifyError::NotFound(id.to_string()))
    }

    /// Release a previously placed hold.
    ///
    /// # Errors
    ///
    /// Returns `ShopifyError::UserError` if the mutation reports field
    /// errors (e.g. the hold was already released), or any transport/GraphQL
    /// error from the call.
    #[instrument(skip(self, session), fields(fulfillment_order_id = %id))]
    pub async fn release_fulfillment_order_hold(
        &self,
        session: &ShopSession,
        id: &ShopifyGid,
    ) -> Result<ReleasedHold, ShopifyError> {
        let variables = serde_json::json!({ "id": id });
        let data: ReleaseData = self
            .execute(session, RELEASE_FULFILLMENT_ORDER_HOLD, variables)
            .await?;

        check_user_errors(data.fulfillment_order_release_hold.user_errors)?;

        data.fulfillment_order_release_hold
            .fulfillment_order
            .map(|fo| ReleasedHold { status: fo.status })
            .ok_or_else(|| ShopifyError::NotFound(id.to_string()))
    }

    /// Update an order's shipping address.
    ///
    /// # Errors
    ///
    /// Returns `ShopifyError::UserError` if the mutation reports field
    /// errors, or any transport/GraphQL error from the call.
    #[instrument(skip(self, session, address), fields(order_id = %order_id))]
    pub async fn update_order_address(
        &self,
        session: &ShopSession,
        order_id: &ShopifyGid,
        address: &ShippingAddress,
    ) -> Result<UpdatedOrder, ShopifyError> {
        let variables = serde_json::json!({
            "input": {
                "id": order_id,
                "shippingAddress": address,
            },
        });
        let data: OrderUpdateData = self
            .execute(session, UPDATE_ORDER_ADDRESS, variables)
            .await?;

        check_user_errors(data.order_update.user_errors)?;

        data.order_update
            .order
            .map(|order| UpdatedOrder {
                order_id: order.id,
                status_page_url: order.status_page_url,
                shipping_address: order.shipping_address,
            })
            .ok_or_else(|| ShopifyError::NotFound(order_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fulfillment_order_payload_deserializes() {
        let json = r#"{
            "fulfillmentOrder": {
                "status": "ON_HOLD",
                "createdAt": "2026-03-01T12:00:00Z",
                "order": { "id": "gid://shopify/Order/123" }
            }
        }"#;

        let data: GetFulfillmentOrderData = serde_json::from_str(json).expect("valid payload");
        let fo: HeldFulfillmentOrder = data.fulfillment_order.expect("present").into();
        assert_eq!(fo.status, "ON_HOLD");
        assert_eq!(fo.order_id.as_str(), "gid://shopify/Order/123");
        assert_eq!(fo.created_at.to_rfc3339(), "2026-03-01T12:00:00+00:00");
    }

    #[test]
    fn test_order_update_payload_deserializes() {
        let json = r#"{
            "orderUpdate": {
                "order": {
                    "id": "gid://shopify/Order/123",
                    "statusPageUrl": "https://example.com/status",
                    "shippingAddress": { "firstName": "Jane", "zip": "K1A 0B1" }
                },
                "userErrors": []
            }
        }"#;

        let data: OrderUpdateData = serde_json::from_str(json).expect("valid payload");
        let order = data.order_update.order.expect("present");
        assert_eq!(
            order.status_page_url.as_deref(),
            Some("https://example.com/status")
        );
        let address = order.shipping_address.expect("present");
        assert_eq!(address.zip.as_deref(), Some("K1A 0B1"));
    }

    #[test]
    fn test_user_errors_raise_with_joined_message_and_fields() {
        let errors = vec![
            UserErrorPayload {
                field: Some(vec!["shippingAddress".to_string(), "zip".to_string()]),
                message: "Postal code is invalid".to_string(),
            },
            UserErrorPayload {
                field: None,
                message: "Something else".to_string(),
            },
        ];

        let err = check_user_errors(errors).expect_err("should raise");
        match err {
            ShopifyError::UserError { message, fields } => {
                assert_eq!(message, "Postal code is invalid; Something else");
                assert_eq!(fields, vec!["shippingAddress", "zip"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_no_user_errors_is_ok() {
        assert!(check_user_errors(vec![]).is_ok());
    }
}
