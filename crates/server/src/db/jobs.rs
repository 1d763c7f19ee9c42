//! Deferred-work queue repository.
//!
//! The queue is a plain table: workers claim due rows with
//! `FOR UPDATE SKIP LOCKED`, so any number of workers can poll without
//! handing the same job to two of them. Scheduling policy (delay, retry
//! counts, backoff) lives with the callers; this module only moves rows
//! between states.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::RepositoryError;

/// Lifecycle state of a queued job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "job_status", rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Running,
    Succeeded,
    /// Dropped without retries because a domain error made it permanently
    /// invalid (e.g. the hold was already released).
    Discarded,
    /// Retries exhausted.
    Failed,
}

/// A queued unit of deferred work.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Job {
    pub id: Uuid,
    pub kind: String,
    pub payload: serde_json::Value,
    pub status: JobStatus,
    /// Scheduled-not-before time.
    pub run_at: DateTime<Utc>,
    /// Number of times execution has started (including the current one).
    pub attempts: i64,
    pub max_attempts: i64,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const COLUMNS: &str = "id, kind, payload, status, run_at, attempts, max_attempts, \
                       last_error, created_at, updated_at";

/// Enqueue a job to run at (or after) `run_at`.
///
/// # Errors
///
/// Returns an error if the database insert fails.
pub async fn enqueue(
    pool: &PgPool,
    kind: &str,
    payload: &serde_json::Value,
    run_at: DateTime<Utc>,
    max_attempts: i64,
) -> Result<Job, RepositoryError> {
    let job = sqlx::query_as::<_, Job>(&format!(
        r"
        INSERT INTO jobs (kind, payload, run_at, max_attempts)
        VALUES ($1, $2, $3, $4)
        RETURNING {COLUMNS}
        "
    ))
    .bind(kind)
    .bind(payload)
    .bind(run_at)
    .bind(max_attempts)
    .fetch_one(pool)
    .await?;

    Ok(job)
}

/// Claim up to `limit` due jobs, marking them running and bumping their
/// attempt counters. Claimed jobs are invisible to other workers.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn claim_due(pool: &PgPool, limit: i64) -> Result<Vec<Job>, RepositoryError> {
    let jobs = sqlx::query_as::<_, Job>(&format!(
        r"
        WITH due AS (
            SELECT id FROM jobs
            WHERE status = 'queued' AND run_at <= NOW()
            ORDER BY run_at
            LIMIT $1
            FOR UPDATE SKIP LOCKED
        )
        UPDATE jobs
        SET status = 'running', attempts = attempts + 1, updated_at = NOW()
        FROM due
        WHERE jobs.id = due.id
        RETURNING {COLUMNS}
        "
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(jobs)
}

/// Mark a job as completed successfully.
///
/// # Errors
///
/// Returns an error if the database update fails.
pub async fn mark_succeeded(pool: &PgPool, job_id: Uuid) -> Result<(), RepositoryError> {
    sqlx::query("UPDATE jobs SET status = 'succeeded', updated_at = NOW() WHERE id = $1")
        .bind(job_id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Re-queue a job for a later attempt after a retryable failure.
///
/// # Errors
///
/// Returns an error if the database update fails.
pub async fn retry_later(
    pool: &PgPool,
    job_id: Uuid,
    error: &str,
    run_at: DateTime<Utc>,
) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        UPDATE jobs
        SET status = 'queued', last_error = $2, run_at = $3, updated_at = NOW()
        WHERE id = $1
        ",
    )
    .bind(job_id)
    .bind(error)
    .bind(run_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Mark a job as terminally failed (retries exhausted).
///
/// # Errors
///
/// Returns an error if the database update fails.
pub async fn mark_failed(pool: &PgPool, job_id: Uuid, error: &str) -> Result<(), RepositoryError> {
    sqlx::query(
        "UPDATE jobs SET status = 'failed', last_error = $2, updated_at = NOW() WHERE id = $1",
    )
    .bind(job_id)
    .bind(error)
    .execute(pool)
    .await?;

    Ok(())
}

/// Discard a job without retrying.
///
/// # Errors
///
/// Returns an error if the database update fails.
pub async fn mark_discarded(
    pool: &PgPool,
    job_id: Uuid,
    reason: &str,
) -> Result<(), RepositoryError> {
    sqlx::query(
        "UPDATE jobs SET status = 'discarded', last_error = $2, updated_at = NOW() WHERE id = $1",
    )
    .bind(job_id)
    .bind(reason)
    .execute(pool)
    .await?;

    Ok(())
}
