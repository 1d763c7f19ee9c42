//! Database operations.
//!
//! # Tables
//!
//! - `shops` - installed shops (tenant root)
//! - `orders` - local projections of remote orders
//! - `fulfillment_orders` - local projections of remote fulfillment orders
//! - `settings` - per-shop hold duration configuration
//! - `jobs` - deferred-work queue
//!
//! All queries are runtime-checked (`sqlx::query_as` with `FromRow`), so the
//! workspace builds without a live database. Migrations live in
//! `crates/server/migrations` and run on startup.

pub mod fulfillment_orders;
pub mod jobs;
pub mod orders;
pub mod settings;
pub mod shops;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
