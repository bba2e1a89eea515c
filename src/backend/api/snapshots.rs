/**
 * Snapshot Endpoints
 *
 * Listing and retrieval of a file's durable snapshots. A snapshot fetch
 * has the same response shape as a file fetch: metadata part plus content
 * part, base64-encoded when the parent file is not text.
 */

use axum::extract::{Path, State};
use axum::response::{Json, Response};

use super::files::{base_name, fetch_workspace_file};
use super::multipart_mixed_response;
use crate::backend::db::snapshots;
use crate::backend::db::Snapshot;
use crate::backend::error::ServerError;
use crate::backend::middleware::AuthWorkspace;
use crate::backend::server::state::AppState;

/// `GET /v1/api/file/{id}/snapshot`
pub async fn list_snapshots(
    State(state): State<AppState>,
    AuthWorkspace(workspace_id): AuthWorkspace,
    Path(id): Path<i64>,
) -> Result<Json<Vec<Snapshot>>, ServerError> {
    fetch_workspace_file(&state, workspace_id, id).await?;
    let snapshots = snapshots::list(&state.pool, id, workspace_id).await?;
    Ok(Json(snapshots))
}

/// `GET /v1/api/file/{id}/snapshot/{version}`
pub async fn fetch_snapshot(
    State(state): State<AppState>,
    AuthWorkspace(workspace_id): AuthWorkspace,
    Path((id, version)): Path<(i64, i64)>,
) -> Result<Response, ServerError> {
    let file = fetch_workspace_file(&state, workspace_id, id).await?;

    let snapshot = snapshots::fetch(&state.pool, id, version, workspace_id)
        .await?
        .ok_or_else(|| ServerError::not_found("snapshot"))?;

    let content = state.storage.read_object(&snapshot.disk_path).await?;
    let filename = base_name(&file.workspace_path);
    multipart_mixed_response(&snapshot, &file.mime_type, filename, &content)
}
