//! Shopify session token authentication.
//!
//! Requests from the checkout extension carry a Shopify session token (a
//! short-lived JWT signed with the app secret) in the `Authorization`
//! header. The [`CurrentShop`] extractor verifies the token and resolves
//! the shop it was issued for.

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use secrecy::ExposeSecret;
use serde::Deserialize;

use crate::db::shops::{self, Shop};
use crate::error::AppError;
use crate::state::AppState;

/// Claims of a Shopify session token. Only the fields we act on; the rest
/// are validated structurally by the JWT library.
#[derive(Debug, Deserialize)]
struct SessionTokenClaims {
    /// Shop the token was issued for, as `https://{shop}.myshopify.com`.
    dest: String,
}

/// Verify a session token and extract the shop domain it was issued for.
///
/// The token must be signed with the app secret (HS256) and its audience
/// must be the app's client id.
///
/// # Errors
///
/// Returns `AppError::Unauthorized` for any invalid, expired or
/// wrong-audience token.
pub fn verify_session_token(token: &str, secret: &str, api_key: &str) -> Result<String, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[api_key]);

    let data = jsonwebtoken::decode::<SessionTokenClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|_| AppError::Unauthorized("Invalid session token".to_string()))?;

    let domain = data
        .claims
        .dest
        .strip_prefix("https://")
        .unwrap_or(&data.claims.dest)
        .to_string();

    Ok(domain)
}

/// The authenticated shop behind a session-token request.
#[derive(Debug, Clone)]
pub struct CurrentShop(pub Shop);

impl FromRequestParts<AppState> for CurrentShop {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or_else(|| AppError::Unauthorized("Missing session token".to_string()))?;

        let shopify = &state.config().shopify;
        let domain =
            verify_session_token(token, shopify.api_secret.expose_secret(), &shopify.api_key)?;

        let shop = shops::find_by_domain(state.pool(), &domain)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Invalid session token".to_string()))?;

        Ok(Self(shop))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};
    use serde::Serialize;

    const SECRET: &str = "shpss_test_secret";
    const API_KEY: &str = "test-api-key";

    #[derive(Serialize)]
    struct TestClaims {
        iss: String,
        dest: String,
        aud: String,
        sub: String,
        exp: i64,
        nbf: i64,
        iat: i64,
    }

    fn make_token(dest: &str, aud: &str, exp_offset_secs: i64, secret: &str) -> String {
        let now = chrono::Utc::now().timestamp();
        let claims = TestClaims {
            iss: format!("{dest}/admin"),
            dest: dest.to_string(),
            aud: aud.to_string(),
            sub: "1".to_string(),
            exp: now + exp_offset_secs,
            nbf: now - 10,
            iat: now,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .expect("encode token")
    }

    #[test]
    fn test_valid_token_yields_shop_domain() {
        let token = make_token("https://test.myshopify.com", API_KEY, 60, SECRET);
        let domain = verify_session_token(&token, SECRET, API_KEY).expect("valid token");
        assert_eq!(domain, "test.myshopify.com");
    }

    #[test]
    fn test_expired_token_is_rejected() {
        // Past the library's default clock-skew leeway
        let token = make_token("https://test.myshopify.com", API_KEY, -120, SECRET);
        let result = verify_session_token(&token, SECRET, API_KEY);
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn test_wrong_audience_is_rejected() {
        let token = make_token("https://test.myshopify.com", "another-app", 60, SECRET);
        let result = verify_session_token(&token, SECRET, API_KEY);
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn test_wrong_signature_is_rejected() {
        let token = make_token("https://test.myshopify.com", API_KEY, 60, "other-secret");
        let result = verify_session_token(&token, SECRET, API_KEY);
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn test_garbage_token_is_rejected() {
        let result = verify_session_token("not-a-jwt", SECRET, API_KEY);
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }
}
