pub mod api;
mod middleware;

pub use api::{ApiState, build_api_router};
pub use middleware::RequestContext;

use axum::{Router, middleware as axum_middleware, routing::get};

use api::error::ApiError;

/// Full HTTP surface: product API, health probe and JSON 404s for everything else.
pub fn build_router(state: ApiState) -> Router {
    let health = Router::new()
        .route("/health", get(api::handlers::health))
        .with_state(state.clone());

    Router::new()
        .merge(build_api_router(state))
        .merge(health)
        .fallback(not_found)
        .layer(axum_middleware::from_fn(middleware::log_responses))
        .layer(axum_middleware::from_fn(middleware::set_request_context))
}

async fn not_found() -> ApiError {
    ApiError::not_found()
}
