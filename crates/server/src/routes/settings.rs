//! Merchant settings endpoint.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use order_hold_core::{HOLD_DURATION_OPTIONS, HoldDuration};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::instrument;

use crate::db::settings;
use crate::error::AppError;
use crate::middleware::CurrentShop;
use crate::state::AppState;

/// Build the settings router.
pub fn router() -> Router<AppState> {
    Router::new().route("/api/settings", get(get_settings).put(put_settings))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SettingsResponse {
    hold_duration_minutes: i64,
    hold_duration_options: [i64; 6],
}

impl From<&settings::Settings> for SettingsResponse {
    fn from(row: &settings::Settings) -> Self {
        Self {
            hold_duration_minutes: row.hold_duration().minutes(),
            hold_duration_options: HOLD_DURATION_OPTIONS,
        }
    }
}

/// GET /api/settings - the shop's current hold duration.
#[instrument(skip(state))]
async fn get_settings(
    State(state): State<AppState>,
    CurrentShop(shop): CurrentShop,
) -> Result<Json<SettingsResponse>, AppError> {
    let row = settings::get_or_create(state.pool(), shop.id).await?;
    Ok(Json(SettingsResponse::from(&row)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateSettingsRequest {
    hold_duration_minutes: i64,
}

/// PUT /api/settings - change the hold duration.
///
/// The value must be one of the fixed options; anything else is a 422.
#[instrument(skip(state))]
async fn put_settings(
    State(state): State<AppState>,
    CurrentShop(shop): CurrentShop,
    Json(request): Json<UpdateSettingsRequest>,
) -> Result<Response, AppError> {
    let duration = match HoldDuration::from_minutes(request.hold_duration_minutes) {
        Ok(duration) => duration,
        Err(e) => {
            let body = Json(json!({ "success": false, "errors": [e.to_string()] }));
            return Ok((StatusCode::UNPROCESSABLE_ENTITY, body).into_response());
        }
    };

    let row = settings::set_hold_duration(state.pool(), shop.id, duration).await?;
    Ok(Json(SettingsResponse::from(&row)).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_response_serializes_camel_case() {
        let response = SettingsResponse {
            hold_duration_minutes: 45,
            hold_duration_options: HOLD_DURATION_OPTIONS,
        };
        let json = serde_json::to_value(&response).expect("serialize");

        assert_eq!(json["holdDurationMinutes"], 45);
        assert_eq!(json["holdDurationOptions"][0], 30);
        assert_eq!(json["holdDurationOptions"][5], 180);
    }

    #[test]
    fn test_update_request_is_camel_case() {
        let request: UpdateSettingsRequest =
            serde_json::from_str(r#"{"holdDurationMinutes":90}"#).expect("deserialize");
        assert_eq!(request.hold_duration_minutes, 90);
    }
}
