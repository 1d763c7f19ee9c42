//! Shopify Admin API GraphQL client.
//!
//! # Architecture
//!
//! - Raw GraphQL documents executed over `reqwest` with serde-typed
//!   responses (no vendored schema, no codegen)
//! - Every call takes an explicit [`ShopSession`] - there is no ambient
//!   "current shop" state
//! - Mutations translate remote `userErrors` into [`ShopifyError::UserError`]
//!
//! The error taxonomy matters to callers: rate limits, server faults and
//! transport failures are retryable by the job runner; user errors are
//! business-rule violations and never blindly retried.

mod client;
mod operations;
mod session;

pub use client::{AccessToken, ShopifyClient};
pub use operations::{HeldFulfillmentOrder, ReleasedHold, UpdatedOrder};
pub use session::ShopSession;

use thiserror::Error;

/// Errors that can occur when interacting with the Shopify Admin API.
#[derive(Debug, Error)]
pub enum ShopifyError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Rate limited by Shopify.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Shopify returned a server fault.
    #[error("Server error: HTTP {0}")]
    Server(u16),

    /// Access token rejected.
    #[error("Unauthorized: invalid or expired access token")]
    Unauthorized,

    /// GraphQL query returned top-level errors.
    #[error("GraphQL errors: {}", format_graphql_errors(.0))]
    GraphQL(Vec<GraphQLError>),

    /// A mutation reported business-rule violations.
    #[error("User error: {message}")]
    UserError {
        /// Joined messages of all reported user errors.
        message: String,
        /// Flattened field paths of all reported user errors.
        fields: Vec<String>,
    },

    /// Resource not found remotely.
    #[error("Not found: {0}")]
    NotFound(String),
}

impl ShopifyError {
    /// Whether the job runner should retry after this error.
    ///
    /// Rate limits, server faults and transport failures are transient;
    /// everything else indicates a permanently invalid request.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited(_) | Self::Server(_) | Self::Http(_)
        )
    }
}

/// A GraphQL error returned by the Shopify Admin API.
#[derive(Debug, Clone)]
pub struct GraphQLError {
    /// Error message.
    pub message: String,
    /// Path to the error in the response.
    pub path: Vec<serde_json::Value>,
}

fn format_graphql_errors(errors: &[GraphQLError]) -> String {
    errors
        .iter()
        .map(|e| e.message.clone())
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limited_error_display() {
        let err = ShopifyError::RateLimited(60);
        assert_eq!(err.to_string(), "Rate limited, retry after 60 seconds");
    }

    #[test]
    fn test_graphql_error_formatting() {
        let errors = vec![
            GraphQLError {
                message: "Field not found".to_string(),
                path: vec![],
            },
            GraphQLError {
                message: "Invalid ID".to_string(),
                path: vec![],
            },
        ];
        let err = ShopifyError::GraphQL(errors);
        assert_eq!(
            err.to_string(),
            "GraphQL errors: Field not found; Invalid ID"
        );
    }

    #[test]
    fn test_retryable_classification() {
        assert!(ShopifyError::RateLimited(10).is_retryable());
        assert!(ShopifyError::Server(503).is_retryable());
        assert!(!ShopifyError::Unauthorized.is_retryable());
        assert!(
            !ShopifyError::UserError {
                message: "Hold already released".to_string(),
                fields: vec![],
            }
            .is_retryable()
        );
        assert!(!ShopifyError::NotFound("order".to_string()).is_retryable());
    }
}
