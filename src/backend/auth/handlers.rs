/**
 * Login Handler
 *
 * Exchanges workspace credentials for a bearer token. An unknown workspace
 * is 404 and a bad password 401, mirroring the rest of the API's
 * not-found-versus-unauthorized split.
 */

use axum::extract::State;
use axum::response::Json;
use serde::{Deserialize, Serialize};

use crate::backend::auth::tokens::create_token;
use crate::backend::db::workspaces;
use crate::backend::error::ServerError;
use crate::backend::server::state::AppState;

#[derive(Debug, Clone, Deserialize)]
pub struct WorkspaceCredentials {
    pub name: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
}

/// `POST /v1/auth/login`
pub async fn login(
    State(state): State<AppState>,
    Json(credentials): Json<WorkspaceCredentials>,
) -> Result<Json<LoginResponse>, ServerError> {
    let workspace = workspaces::fetch_by_name(&state.pool, &credentials.name)
        .await?
        .ok_or_else(|| ServerError::not_found("workspace"))?;

    let valid = bcrypt::verify(&credentials.password, &workspace.password)
        .map_err(|_| ServerError::Unauthorized)?;
    if !valid {
        tracing::warn!(workspace = %credentials.name, "incorrect password on login");
        return Err(ServerError::Unauthorized);
    }

    let token = create_token(&state.options.jwt_secret, workspace.id)?;

    tracing::info!(workspace = %credentials.name, "workspace logged in");
    Ok(Json(LoginResponse { token }))
}
