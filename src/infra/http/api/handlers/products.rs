//! Product handlers

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, Path, Query, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum_extra::extract::WithRejection;

use crate::application::render::product_href;
use crate::domain::api_keys::Role;

use super::{product_to_api, requested_version};
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::middleware::Viewer;
use crate::infra::http::api::models::{ProductListQuery, ProductPayload};
use crate::infra::http::api::state::ApiState;

pub async fn list_products(
    State(state): State<ApiState>,
    headers: HeaderMap,
    WithRejection(Query(query), _): WithRejection<Query<ProductListQuery>, ApiError>,
) -> Result<Response, ApiError> {
    let version = requested_version(&state, &headers)?;
    let body = state
        .products
        .list(query.into(), version)
        .await
        .map_err(product_to_api)?;

    Ok((
        [(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))],
        body,
    )
        .into_response())
}

pub async fn get_product(
    State(state): State<ApiState>,
    Extension(viewer): Extension<Viewer>,
    headers: HeaderMap,
    WithRejection(Path(id), _): WithRejection<Path<i64>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let version = requested_version(&state, &headers)?;
    let product = state
        .products
        .detail(id, version, viewer.role())
        .await
        .map_err(product_to_api)?;

    Ok(Json(product))
}

pub async fn create_product(
    State(state): State<ApiState>,
    Extension(viewer): Extension<Viewer>,
    headers: HeaderMap,
    payload: Result<Json<ProductPayload>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    viewer.require(Role::Admin)?;
    let Json(payload) = payload?;
    let version = requested_version(&state, &headers)?;

    let created = state
        .products
        .create(payload.into(), version, viewer.role())
        .await
        .map_err(product_to_api)?;

    let location = state
        .public_url
        .join(&product_href(created.record.id))
        .map_err(|err| ApiError::internal(&err))?;
    let location =
        HeaderValue::from_str(location.as_str()).map_err(|err| ApiError::internal(&err))?;

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(created.body),
    ))
}

pub async fn update_product(
    State(state): State<ApiState>,
    Extension(viewer): Extension<Viewer>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, ApiError>,
    payload: Result<Json<ProductPayload>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    viewer.require(Role::Admin)?;
    let Json(payload) = payload?;

    state
        .products
        .update(id, payload.into())
        .await
        .map_err(product_to_api)?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_product(
    State(state): State<ApiState>,
    Extension(viewer): Extension<Viewer>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, ApiError>,
) -> Result<StatusCode, ApiError> {
    viewer.require(Role::Admin)?;

    state
        .products
        .delete(id)
        .await
        .map_err(product_to_api)?;

    Ok(StatusCode::NO_CONTENT)
}
