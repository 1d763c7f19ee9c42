//! GraphQL execution against the Shopify Admin API.

use serde::{Deserialize, de::DeserializeOwned};
use tracing::instrument;

use super::{GraphQLError, ShopSession, ShopifyError};

/// Shopify Admin API GraphQL client.
///
/// Holds only the shared HTTP client and API version; the tenant session is
/// an explicit argument to every call, so one client serves all shops.
#[derive(Clone)]
pub struct ShopifyClient {
    client: reqwest::Client,
    api_version: String,
}

/// GraphQL response wrapper.
#[derive(Debug, Deserialize)]
struct GraphQLResponse<T> {
    data: Option<T>,
    errors: Option<Vec<GraphQLErrorResponse>>,
}

/// An Admin API access token obtained through the OAuth code exchange.
#[derive(Debug, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    /// Comma-separated granted scopes.
    pub scope: String,
}

#[derive(Debug, Deserialize)]
struct GraphQLErrorResponse {
    message: String,
    #[serde(default)]
    path: Vec<serde_json::Value>,
    #[serde(default)]
    extensions: Option<GraphQLErrorExtensions>,
}

#[derive(Debug, Deserialize)]
struct GraphQLErrorExtensions {
    #[serde(default)]
    code: Option<String>,
}

/// Whether a top-level error set reports throttling.
///
/// Shopify signals Admin API throttling as an HTTP 200 with a top-level
/// GraphQL error carrying `extensions.code = "THROTTLED"`, not as a 429.
fn is_throttled(errors: &[GraphQLErrorResponse]) -> bool {
    errors.iter().any(|e| {
        e.extensions
            .as_ref()
            .and_then(|ext| ext.code.as_deref())
            .is_some_and(|code| code.eq_ignore_ascii_case("THROTTLED"))
            || e.message.to_ascii_lowercase().contains("throttled")
    })
}

impl ShopifyClient {
    /// Create a new client for the given Admin API version.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be created. This should never happen
    /// under normal circumstances as we use standard TLS configuration.
    #[must_use]
    pub fn new(api_version: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            api_version: api_version.into(),
        }
    }

    /// Execute a GraphQL document under a shop's session.
    ///
    /// # Errors
    ///
    /// Returns `ShopifyError::RateLimited` on 429 or a throttled top-level
    /// error, `ShopifyError::Server` on 5xx, `ShopifyError::Unauthorized` on
    /// 401, `ShopifyError::GraphQL` for other top-level GraphQL errors, and
    /// `ShopifyError::Http` on transport failures.
    #[instrument(skip(self, session, query, variables), fields(shop = %session.shop_domain()))]
    pub(super) async fn execute<T: DeserializeOwned>(
        &self,
        session: &ShopSession,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<T, ShopifyError> {
        let endpoint = format!(
            "https://{}/admin/api/{}/graphql.json",
            session.shop_domain(),
            self.api_version
        );

        let body = serde_json::json!({
            "query": query,
            "variables": variables,
        });

        let response = self
            .client
            .post(&endpoint)
            .header("X-Shopify-Access-Token", session.access_token())
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);
            return Err(ShopifyError::RateLimited(retry_after));
        }

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ShopifyError::Unauthorized);
        }

        if status.is_server_error() {
            return Err(ShopifyError::Server(status.as_u16()));
        }

        let graphql_response: GraphQLResponse<T> = response.json().await?;

        if let Some(errors) = graphql_response.errors
            && !errors.is_empty()
        {
            if is_throttled(&errors) {
                return Err(ShopifyError::RateLimited(60));
            }

            let converted: Vec<GraphQLError> = errors
                .into_iter()
                .map(|e| GraphQLError {
                    message: e.message,
                    path: e.path,
                })
                .collect();
            return Err(ShopifyError::GraphQL(converted));
        }

        graphql_response.data.ok_or_else(|| {
            ShopifyError::GraphQL(vec![GraphQLError {
                message: "No data in response".to_string(),
                path: vec![],
            }])
        })
    }

    /// Exchange an OAuth authorization code for an access token at install
    /// time.
    ///
    /// # Errors
    ///
    /// Returns `ShopifyError::Unauthorized` if Shopify rejects the code,
    /// `ShopifyError::Server` on 5xx, and `ShopifyError::Http` on transport
    /// failures.
    #[instrument(skip(self, api_key, api_secret, code), fields(shop = %shop_domain))]
    pub async fn exchange_code(
        &self,
        shop_domain: &str,
        api_key: &str,
        api_secret: &str,
        code: &str,
    ) -> Result<AccessToken, ShopifyError> {
        let endpoint = format!("https://{shop_domain}/admin/oauth/access_token");
        let body = serde_json::json!({
            "client_id": api_key,
            "client_secret": api_secret,
            "code": code,
        });

        let response = self.client.post(&endpoint).json(&body).send().await?;
        let status = response.status();

        if status.is_server_error() {
            return Err(ShopifyError::Server(status.as_u16()));
        }
        if !status.is_success() {
            return Err(ShopifyError::Unauthorized);
        }

        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_errors(json: &str) -> Vec<GraphQLErrorResponse> {
        serde_json::from_str(json).expect("valid error payload")
    }

    #[test]
    fn test_throttled_extension_code_is_detected() {
        let errors = parse_errors(
            r#"[{"message":"Throttled","extensions":{"code":"THROTTLED"}}]"#,
        );
        assert!(is_throttled(&errors));
    }

    #[test]
    fn test_throttled_message_without_extensions_is_detected() {
        let errors = parse_errors(r#"[{"message":"Query was throttled"}]"#);
        assert!(is_throttled(&errors));
    }

    #[test]
    fn test_other_top_level_errors_are_not_throttling() {
        let errors = parse_errors(
            r#"[{"message":"Field 'bogus' doesn't exist","extensions":{"code":"undefinedField"}}]"#,
        );
        assert!(!is_throttled(&errors));
    }
}
