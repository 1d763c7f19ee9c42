//! Polling job runner.
//!
//! A single task claims due jobs in batches and executes them inline.
//! Claiming uses `FOR UPDATE SKIP LOCKED` (see `db::jobs`), so running more
//! than one server instance is safe.

use std::time::Duration;

use sqlx::PgPool;
use tracing::{error, info, warn};

use crate::db::{RepositoryError, jobs as jobs_db, shops};
use crate::error::AppError;
use crate::services::{ComplianceService, HoldService};

use super::{
    JobKind, PersistFulfillmentOrderPayload, ReleaseHoldPayload, RoutingCompletePayload,
    ShopRedactPayload, backoff,
};

const POLL_INTERVAL: Duration = Duration::from_secs(1);
const CLAIM_BATCH: i64 = 10;

/// What to do with a job after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Disposition {
    /// Transient failure; try again later.
    Retry,
    /// The job is permanently invalid; drop it without retrying.
    Discard,
}

/// Classify a failure. Transport-level remote errors and database errors
/// are worth retrying; domain errors (user errors, missing records) are
/// not - retrying cannot change the answer.
fn disposition(error: &AppError) -> Disposition {
    match error {
        AppError::Shopify(e) if e.is_retryable() => Disposition::Retry,
        AppError::Database(RepositoryError::Database(_)) => Disposition::Retry,
        _ => Disposition::Discard,
    }
}

/// Executes deferred jobs.
#[derive(Clone)]
pub struct JobRunner {
    pool: PgPool,
    holds: HoldService,
    compliance: ComplianceService,
}

impl JobRunner {
    /// Create a new runner.
    #[must_use]
    pub const fn new(pool: PgPool, holds: HoldService, compliance: ComplianceService) -> Self {
        Self {
            pool,
            holds,
            compliance,
        }
    }

    /// Poll for due jobs forever. Intended to be spawned as a task.
    pub async fn run(self) {
        info!("Job runner started");
        loop {
            match jobs_db::claim_due(&self.pool, CLAIM_BATCH).await {
                Ok(jobs) if jobs.is_empty() => {
                    tokio::time::sleep(POLL_INTERVAL).await;
                }
                Ok(jobs) => {
                    for job in jobs {
                        self.run_one(job).await;
                    }
                }
                Err(e) => {
                    error!(error = %e, "Failed to claim jobs");
                    tokio::time::sleep(POLL_INTERVAL).await;
                }
            }
        }
    }

    /// Execute one claimed job and settle its row. Settlement errors are
    /// logged but never propagate; the job will be re-claimed after a crash
    /// anyway.
    async fn run_one(&self, job: jobs_db::Job) {
        let outcome = self.execute(&job).await;

        let settle = match outcome {
            Ok(()) => jobs_db::mark_succeeded(&self.pool, job.id).await,
            Err(e) => match disposition(&e) {
                Disposition::Retry if job.attempts < job.max_attempts => {
                    let run_at = chrono::Utc::now() + backoff(job.attempts);
                    warn!(
                        job_id = %job.id,
                        kind = %job.kind,
                        attempts = job.attempts,
                        error = %e,
                        retry_at = %run_at,
                        "Job failed, will retry"
                    );
                    jobs_db::retry_later(&self.pool, job.id, &e.to_string(), run_at).await
                }
                Disposition::Retry => {
                    error!(
                        job_id = %job.id,
                        kind = %job.kind,
                        attempts = job.attempts,
                        error = %e,
                        "Job failed terminally, retries exhausted"
                    );
                    sentry::capture_error(&e);
                    jobs_db::mark_failed(&self.pool, job.id, &e.to_string()).await
                }
                Disposition::Discard => {
                    warn!(
                        job_id = %job.id,
                        kind = %job.kind,
                        error = %e,
                        "Job discarded"
                    );
                    jobs_db::mark_discarded(&self.pool, job.id, &e.to_string()).await
                }
            },
        };

        if let Err(e) = settle {
            error!(job_id = %job.id, error = %e, "Failed to settle job");
        }
    }

    async fn execute(&self, job: &jobs_db::Job) -> Result<(), AppError> {
        let Some(kind) = JobKind::parse(&job.kind) else {
            return Err(AppError::Internal(format!("Unknown job kind: {}", job.kind)));
        };

        match kind {
            JobKind::RoutingComplete => {
                let payload: RoutingCompletePayload = parse_payload(job)?;
                let shop = shops::find_by_domain(&self.pool, &payload.shop_domain)
                    .await?
                    .ok_or(RepositoryError::NotFound)?;
                self.holds
                    .handle_routing_complete(&shop, &payload.fulfillment_order_id)
                    .await
            }
            JobKind::PersistFulfillmentOrder => {
                let payload: PersistFulfillmentOrderPayload = parse_payload(job)?;
                let shop = shops::get(&self.pool, payload.shop_id)
                    .await?
                    .ok_or(RepositoryError::NotFound)?;
                self.holds
                    .persist_without_hold(&shop, &payload.fulfillment_order_id)
                    .await
            }
            JobKind::ReleaseHold => {
                let payload: ReleaseHoldPayload = parse_payload(job)?;
                self.holds.release_hold(payload.fulfillment_order_id).await
            }
            JobKind::ShopRedact => {
                let payload: ShopRedactPayload = parse_payload(job)?;
                self.compliance
                    .redact_shop(&payload.shop_domain, payload.requested_at)
                    .await
            }
        }
    }
}

/// Deserialize a job payload. A payload that no longer parses is a
/// permanent failure, so this surfaces as a non-retryable error.
fn parse_payload<T: serde::de::DeserializeOwned>(job: &jobs_db::Job) -> Result<T, AppError> {
    serde_json::from_value(job.payload.clone())
        .map_err(|e| AppError::Internal(format!("Invalid {} payload: {e}", job.kind)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shopify::ShopifyError;

    #[test]
    fn test_rate_limits_and_server_errors_retry() {
        assert_eq!(
            disposition(&AppError::Shopify(ShopifyError::RateLimited(30))),
            Disposition::Retry
        );
        assert_eq!(
            disposition(&AppError::Shopify(ShopifyError::Server(503))),
            Disposition::Retry
        );
    }

    #[test]
    fn test_user_errors_discard() {
        let error = AppError::Shopify(ShopifyError::UserError {
            message: "Fulfillment order is not on hold".to_string(),
            fields: vec![],
        });
        assert_eq!(disposition(&error), Disposition::Discard);
    }

    #[test]
    fn test_missing_records_discard() {
        assert_eq!(
            disposition(&AppError::Database(RepositoryError::NotFound)),
            Disposition::Discard
        );
        assert_eq!(
            disposition(&AppError::NotFound("shop".to_string())),
            Disposition::Discard
        );
    }

    #[test]
    fn test_unknown_payloads_discard() {
        assert_eq!(
            disposition(&AppError::Internal("Invalid payload".to_string())),
            Disposition::Discard
        );
    }
}
