//! API handlers organized by resource type.
//!
//! Error conversions shared by the resource modules live here.

mod health;
mod products;

pub use health::*;
pub use products::*;

use axum::http::{HeaderMap, header};

use crate::application::products::ProductError;
use crate::domain::version::ApiVersion;

use super::error::ApiError;
use super::state::ApiState;

pub(crate) fn product_to_api(err: ProductError) -> ApiError {
    match err {
        ProductError::NotFound => ApiError::not_found(),
        ProductError::Validation(errors) => ApiError::validation(errors),
        ProductError::InvalidPagination(message) => ApiError::bad_request(message),
        ProductError::Repo(err) => ApiError::internal(&err),
        ProductError::Render(err) => ApiError::internal(&err),
    }
}

/// Resolve the API version requested by the `Accept` header.
pub(crate) fn requested_version(
    state: &ApiState,
    headers: &HeaderMap,
) -> Result<ApiVersion, ApiError> {
    let accept = headers
        .get(header::ACCEPT)
        .and_then(|value| value.to_str().ok());
    state.versions.resolve(accept).map_err(|err| {
        ApiError::bad_request("Unsupported API version").with_detail(err.to_string())
    })
}
