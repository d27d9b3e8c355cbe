use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, Request, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::application::api_keys::{ApiAuthError, ApiPrincipal};
use crate::domain::api_keys::Role;

use super::error::ApiError;
use super::state::ApiState;

const API_KEY_HEADER: &str = "x-api-key";

/// Who is making a request. Reads are public, so credentials are optional.
#[derive(Debug, Clone)]
pub enum Viewer {
    Anonymous,
    Authenticated(ApiPrincipal),
}

impl Viewer {
    pub fn role(&self) -> Option<Role> {
        match self {
            Self::Anonymous => None,
            Self::Authenticated(principal) => Some(principal.role),
        }
    }

    pub fn principal(&self) -> Option<&ApiPrincipal> {
        match self {
            Self::Anonymous => None,
            Self::Authenticated(principal) => Some(principal),
        }
    }

    /// Require an authenticated principal holding `needed`: 401 without
    /// credentials, 403 with insufficient ones.
    pub fn require(&self, needed: Role) -> Result<&ApiPrincipal, ApiError> {
        let principal = self
            .principal()
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;
        principal
            .requires(needed)
            .map_err(|_| ApiError::forbidden())?;
        Ok(principal)
    }
}

pub async fn api_auth(
    State(state): State<ApiState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let viewer = match extract_token(request.headers()) {
        None => Viewer::Anonymous,
        Some(token) => match state.api_keys.authenticate(token).await {
            Ok(principal) => Viewer::Authenticated(principal),
            Err(err) => return auth_error(err).into_response(),
        },
    };

    request.extensions_mut().insert(viewer.clone());
    let mut response = next.run(request).await;
    response.extensions_mut().insert(viewer);
    response
}

fn auth_error(err: ApiAuthError) -> ApiError {
    let message = match &err {
        ApiAuthError::Store(store) => return ApiError::internal(store),
        ApiAuthError::Expired => "API key expired",
        ApiAuthError::Revoked => "API key revoked",
        ApiAuthError::Missing | ApiAuthError::Invalid | ApiAuthError::Forbidden { .. } => {
            "Invalid API key"
        }
    };
    ApiError::unauthorized(message).with_detail(err.to_string())
}

fn extract_token(headers: &HeaderMap) -> Option<&str> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|raw| raw.strip_prefix("Bearer "));

    bearer
        .or_else(|| {
            headers
                .get(API_KEY_HEADER)
                .and_then(|value| value.to_str().ok())
        })
        .map(str::trim)
        .filter(|token| !token.is_empty())
}
