//! Address update workflow.
//!
//! Orchestrates a customer's shipping address change: checks the edit
//! window against the local order projection, makes at most one remote
//! mutation, and classifies the outcome for the checkout extension. The
//! extension re-invokes the endpoint while an outcome is marked retryable
//! (it budgets 15 seconds at 2-second intervals), so retries are never
//! performed here.

use chrono::{DateTime, Utc};
use order_hold_core::{HoldDuration, ShippingAddress, ShopifyGid, edit_window};
use serde::Serialize;
use sqlx::PgPool;
use tracing::instrument;

use crate::db::{orders, settings, shops::Shop};
use crate::error::AppError;
use crate::shopify::{ShopSession, ShopifyClient, ShopifyError};

/// Outcome of one address update attempt. Serialized as the public API
/// response body.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AddressUpdateOutcome {
    pub success: bool,
    /// Banner-level error messages.
    pub errors: Vec<String>,
    /// Customer-facing status page URL, present on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_page_url: Option<String>,
    /// Whether the caller should simply try again (the remote order was not
    /// visible yet).
    pub retryable: bool,
    /// Field-level error codes, e.g. `"zip"`.
    pub field_errors: Vec<String>,
}

impl AddressUpdateOutcome {
    fn success(status_page_url: Option<String>) -> Self {
        Self {
            success: true,
            errors: vec![],
            status_page_url,
            retryable: false,
            field_errors: vec![],
        }
    }

    fn failure(errors: Vec<String>) -> Self {
        Self {
            success: false,
            errors,
            status_page_url: None,
            retryable: false,
            field_errors: vec![],
        }
    }

    fn retryable_failure() -> Self {
        Self {
            success: false,
            errors: vec![],
            status_page_url: None,
            retryable: true,
            field_errors: vec![],
        }
    }

    fn field_failure(field_errors: Vec<String>) -> Self {
        Self {
            success: false,
            errors: vec![],
            status_page_url: None,
            retryable: false,
            field_errors,
        }
    }
}

/// The failure returned when the edit window has already closed, or `None`
/// when the update may proceed.
///
/// An order whose placement time is unknown locally proceeds: the window
/// cannot be computed, and the remote mutation is the authority then.
fn expired_window_outcome(
    placed_at: Option<DateTime<Utc>>,
    duration: HoldDuration,
    now: DateTime<Utc>,
) -> Option<AddressUpdateOutcome> {
    let placed_at = placed_at?;
    let closes_at = edit_window::closes_at(placed_at, duration);

    edit_window::is_expired(now, closes_at).then(|| {
        AddressUpdateOutcome::failure(vec!["Editing window has expired".to_string()])
    })
}

/// Classify a remote user error into an outcome.
///
/// Prefers the structured field path when present and falls back to
/// message-text matching - the text patterns are a compatibility shim for
/// responses without usable field data, preserved exactly as the remote API
/// phrases them today.
fn classify_user_error(message: &str, fields: &[String]) -> AddressUpdateOutcome {
    // The order is not visible server-side yet; the caller retries.
    if message.contains("Order does not exist") {
        return AddressUpdateOutcome::retryable_failure();
    }

    let zip_field = fields.iter().any(|f| f == "zip");
    let zip_message = message.to_lowercase().contains("postal code");
    if zip_field || zip_message {
        return AddressUpdateOutcome::field_failure(vec!["zip".to_string()]);
    }

    AddressUpdateOutcome::failure(vec![message.to_string()])
}

/// Address update workflow service.
#[derive(Clone)]
pub struct AddressUpdateService {
    pool: PgPool,
    shopify: ShopifyClient,
}

impl AddressUpdateService {
    /// Create a new address update service.
    #[must_use]
    pub const fn new(pool: PgPool, shopify: ShopifyClient) -> Self {
        Self { pool, shopify }
    }

    /// Update an order's shipping address on behalf of a customer.
    ///
    /// Makes at most one remote mutation. If the local projection shows the
    /// edit window has expired, no remote call is made at all.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` on repository failures and
    /// `AppError::Shopify` on transport-level remote failures. Remote user
    /// errors are not errors here - they classify into the outcome.
    #[instrument(skip(self, shop, address), fields(shop = %shop.shopify_domain, order_id = %order_id))]
    pub async fn update_shipping_address(
        &self,
        shop: &Shop,
        order_id: &ShopifyGid,
        address: &ShippingAddress,
    ) -> Result<AddressUpdateOutcome, AppError> {
        let order = orders::find_by_shopify_id(&self.pool, shop.id, order_id).await?;

        if let Some(order) = &order {
            let shop_settings = settings::get_or_create(&self.pool, shop.id).await?;
            if let Some(expired) = expired_window_outcome(
                order.shopify_created_at,
                shop_settings.hold_duration(),
                Utc::now(),
            ) {
                return Ok(expired);
            }
        }

        let session = ShopSession::for_shop(shop);
        match self
            .shopify
            .update_order_address(&session, order_id, address)
            .await
        {
            Ok(updated) => Ok(AddressUpdateOutcome::success(updated.status_page_url)),
            Err(ShopifyError::UserError { message, fields }) => {
                tracing::info!(error = %message, "Address update rejected by Shopify");
                Ok(classify_user_error(&message, &fields))
            }
            Err(other) => Err(other.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, hour, min, 0)
            .single()
            .expect("valid time")
    }

    #[test]
    fn test_open_window_lets_the_update_proceed() {
        let duration = HoldDuration::from_minutes(30).expect("valid");
        assert!(expired_window_outcome(Some(at(12, 0)), duration, at(12, 29)).is_none());
    }

    #[test]
    fn test_expired_window_fails_without_a_remote_call() {
        let duration = HoldDuration::from_minutes(30).expect("valid");
        let outcome =
            expired_window_outcome(Some(at(12, 0)), duration, at(13, 0)).expect("expired");

        assert!(!outcome.success);
        assert_eq!(outcome.errors, vec!["Editing window has expired"]);
        assert!(!outcome.retryable);
        assert!(outcome.field_errors.is_empty());
    }

    #[test]
    fn test_window_boundary_counts_as_expired() {
        let duration = HoldDuration::from_minutes(30).expect("valid");
        assert!(expired_window_outcome(Some(at(12, 0)), duration, at(12, 30)).is_some());
    }

    #[test]
    fn test_unknown_placement_time_proceeds() {
        let duration = HoldDuration::from_minutes(30).expect("valid");
        assert!(expired_window_outcome(None, duration, at(12, 0)).is_none());
    }

    #[test]
    fn test_order_does_not_exist_is_retryable_with_no_errors() {
        let outcome = classify_user_error(
            "Failed. Response message = Order does not exist. Fields = [\"id\"].",
            &["id".to_string()],
        );

        assert!(!outcome.success);
        assert!(outcome.errors.is_empty());
        assert!(outcome.retryable);
        assert!(outcome.field_errors.is_empty());
    }

    #[test]
    fn test_postal_code_message_maps_to_zip_field_error() {
        let outcome = classify_user_error("Postal code is not valid for Canada", &[]);

        assert!(!outcome.success);
        assert!(outcome.errors.is_empty());
        assert!(!outcome.retryable);
        assert_eq!(outcome.field_errors, vec!["zip"]);
    }

    #[test]
    fn test_structured_zip_field_maps_to_zip_field_error() {
        let fields = vec!["shippingAddress".to_string(), "zip".to_string()];
        let outcome = classify_user_error("Invalid value", &fields);

        assert_eq!(outcome.field_errors, vec!["zip"]);
        assert!(outcome.errors.is_empty());
    }

    #[test]
    fn test_other_user_errors_surface_as_banner_errors() {
        let outcome = classify_user_error("Some other error", &[]);

        assert!(!outcome.success);
        assert_eq!(outcome.errors, vec!["Some other error"]);
        assert!(!outcome.retryable);
        assert!(outcome.field_errors.is_empty());
    }

    #[test]
    fn test_success_outcome_carries_status_page_url() {
        let outcome =
            AddressUpdateOutcome::success(Some("https://example.com/status".to_string()));

        assert!(outcome.success);
        assert_eq!(
            outcome.status_page_url.as_deref(),
            Some("https://example.com/status")
        );
        assert!(!outcome.retryable);
    }

    #[test]
    fn test_outcome_serializes_camel_case() {
        let outcome = AddressUpdateOutcome::field_failure(vec!["zip".to_string()]);
        let json = serde_json::to_value(&outcome).expect("serialize");

        assert_eq!(json["success"], false);
        assert_eq!(json["fieldErrors"][0], "zip");
        assert!(json.get("statusPageUrl").is_none());
    }
}
