//! Deferred jobs: kinds, payloads and scheduling policy.
//!
//! The queue itself is `db::jobs`; this module owns what each job means -
//! its payload shape, how many attempts it gets, and how retries back off.

pub mod runner;

use chrono::{DateTime, Duration, Utc};
use order_hold_core::ShopifyGid;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::db::{RepositoryError, jobs as jobs_db};

pub use runner::JobRunner;

/// The kinds of deferred work this app schedules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    /// Handle a routing-complete webhook: hold (or defer persistence of) a
    /// fulfillment order.
    RoutingComplete,
    /// Persist a fulfillment order projection without holding it.
    PersistFulfillmentOrder,
    /// Release a hold when the edit window closes.
    ReleaseHold,
    /// Erase a shop 48 hours after an uninstall-compliance event.
    ShopRedact,
}

impl JobKind {
    /// Stable identifier stored in the `jobs.kind` column.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RoutingComplete => "routing_complete",
            Self::PersistFulfillmentOrder => "persist_fulfillment_order",
            Self::ReleaseHold => "release_hold",
            Self::ShopRedact => "shop_redact",
        }
    }

    /// Parse a stored kind identifier.
    #[must_use]
    pub fn parse(kind: &str) -> Option<Self> {
        match kind {
            "routing_complete" => Some(Self::RoutingComplete),
            "persist_fulfillment_order" => Some(Self::PersistFulfillmentOrder),
            "release_hold" => Some(Self::ReleaseHold),
            "shop_redact" => Some(Self::ShopRedact),
            _ => None,
        }
    }

    /// How many attempts a job of this kind gets before failing terminally.
    ///
    /// Releases get more headroom than the hold/persist paths: a hold that
    /// cannot be released keeps an order stuck, so we try harder.
    #[must_use]
    pub const fn max_attempts(self) -> i64 {
        match self {
            Self::RoutingComplete | Self::PersistFulfillmentOrder | Self::ShopRedact => 5,
            Self::ReleaseHold => 10,
        }
    }
}

/// Retry backoff after the given (1-based) attempt number.
///
/// Polynomial in the attempt count: 3s, 18s, 83s, 258s, ...
#[must_use]
pub fn backoff(attempts: i64) -> Duration {
    let attempts = attempts.clamp(1, 20);
    Duration::seconds(attempts.pow(4) + 2)
}

/// Payload of a [`JobKind::RoutingComplete`] job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingCompletePayload {
    pub shop_domain: String,
    pub fulfillment_order_id: ShopifyGid,
}

/// Payload of a [`JobKind::PersistFulfillmentOrder`] job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistFulfillmentOrderPayload {
    pub shop_id: i64,
    pub fulfillment_order_id: ShopifyGid,
}

/// Payload of a [`JobKind::ReleaseHold`] job. Carries the local row id, not
/// the GID - the release must act on the exact record the hold created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseHoldPayload {
    pub fulfillment_order_id: i64,
}

/// Payload of a [`JobKind::ShopRedact`] job. `requested_at` is compared to
/// the shop's `updated_at` at execution time to detect reinstalls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShopRedactPayload {
    pub shop_domain: String,
    pub requested_at: DateTime<Utc>,
}

/// Enqueue a job with the kind's standard attempt budget.
///
/// # Errors
///
/// Returns an error if the database insert fails.
pub async fn enqueue(
    pool: &PgPool,
    kind: JobKind,
    payload: &serde_json::Value,
    run_at: DateTime<Utc>,
) -> Result<jobs_db::Job, RepositoryError> {
    jobs_db::enqueue(pool, kind.as_str(), payload, run_at, kind.max_attempts()).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trips_through_storage_identifier() {
        for kind in [
            JobKind::RoutingComplete,
            JobKind::PersistFulfillmentOrder,
            JobKind::ReleaseHold,
            JobKind::ShopRedact,
        ] {
            assert_eq!(JobKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(JobKind::parse("unknown"), None);
    }

    #[test]
    fn test_release_gets_the_larger_attempt_budget() {
        assert_eq!(JobKind::ReleaseHold.max_attempts(), 10);
        assert_eq!(JobKind::RoutingComplete.max_attempts(), 5);
        assert_eq!(JobKind::PersistFulfillmentOrder.max_attempts(), 5);
    }

    #[test]
    fn test_backoff_grows_with_attempts() {
        assert_eq!(backoff(1), Duration::seconds(3));
        assert_eq!(backoff(2), Duration::seconds(18));
        assert_eq!(backoff(3), Duration::seconds(83));

        let mut previous = Duration::zero();
        for attempts in 1..=10 {
            let delay = backoff(attempts);
            assert!(delay > previous);
            previous = delay;
        }
    }

    #[test]
    fn test_backoff_clamps_out_of_range_attempts() {
        assert_eq!(backoff(0), backoff(1));
        assert_eq!(backoff(-3), backoff(1));
        assert_eq!(backoff(100), backoff(20));
    }

    #[test]
    fn test_release_payload_round_trips() {
        let payload = ReleaseHoldPayload {
            fulfillment_order_id: 42,
        };
        let value = serde_json::to_value(&payload).expect("serialize");
        let back: ReleaseHoldPayload = serde_json::from_value(value).expect("deserialize");
        assert_eq!(back.fulfillment_order_id, 42);
    }

    #[test]
    fn test_routing_complete_payload_round_trips() {
        let payload = RoutingCompletePayload {
            shop_domain: "test.myshopify.com".to_string(),
            fulfillment_order_id: ShopifyGid::new("gid://shopify/FulfillmentOrder/1"),
        };
        let value = serde_json::to_value(&payload).expect("serialize");
        let back: RoutingCompletePayload = serde_json::from_value(value).expect("deserialize");
        assert_eq!(back.shop_domain, payload.shop_domain);
        assert_eq!(back.fulfillment_order_id, payload.fulfillment_order_id);
    }
}
