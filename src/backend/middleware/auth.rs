/**
 * Authentication Middleware
 *
 * Protects the `/v1/api` routes: extracts the bearer token from the
 * Authorization header, verifies it and attaches the granted workspace id
 * to the request extensions. Handlers pull it back out with the
 * `AuthWorkspace` extractor.
 *
 * The streaming upgrade authenticates differently (`?jwt=` query
 * parameter, see the sync handler); both paths share `verify_token`.
 */

use axum::extract::{FromRequestParts, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;

use crate::backend::auth::tokens::verify_token;
use crate::backend::error::ServerError;
use crate::backend::server::state::AppState;

/// The workspace a verified request is allowed to act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthWorkspace(pub i64);

/// Reject unauthenticated requests before they reach a handler.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ServerError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or(ServerError::Unauthorized)?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or(ServerError::Unauthorized)?;

    let workspace_id = verify_token(&state.options.jwt_secret, token)?;

    request.extensions_mut().insert(AuthWorkspace(workspace_id));
    Ok(next.run(request).await)
}

impl FromRequestParts<AppState> for AuthWorkspace {
    type Rejection = ServerError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthWorkspace>()
            .copied()
            .ok_or(ServerError::Unauthorized)
    }
}
