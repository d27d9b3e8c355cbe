use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::state::ApiState;

/// 204 while the product store answers, 503 otherwise.
pub async fn health(State(state): State<ApiState>) -> Response {
    match state.health.ping().await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => ApiError::service_unavailable()
            .with_detail(err.to_string())
            .into_response(),
    }
}
