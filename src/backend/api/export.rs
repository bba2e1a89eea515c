/**
 * Workspace Export
 *
 * Bundles every file of the caller's workspace into a ZIP archive keyed
 * by workspace path. Cached pending changes are flushed first so the
 * archive matches what subscribers see.
 */

use std::io::{Cursor, Write};

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::Response;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::backend::db::files;
use crate::backend::error::ServerError;
use crate::backend::middleware::AuthWorkspace;
use crate::backend::server::state::AppState;

/// `GET /v1/api/export`
pub async fn export_workspace(
    State(state): State<AppState>,
    AuthWorkspace(workspace_id): AuthWorkspace,
) -> Result<Response, ServerError> {
    let files = files::list_for_workspace(&state.pool, workspace_id).await?;

    for file in &files {
        state.cache.flush(file.id).await?;
    }

    let mut buffer = Vec::new();
    {
        let mut zip = ZipWriter::new(Cursor::new(&mut buffer));
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

        for file in &files {
            let content = state.storage.read_object(&file.disk_path).await?;
            zip.start_file(file.workspace_path.as_str(), options)
                .map_err(zip_error)?;
            zip.write_all(&content).map_err(ServerError::Storage)?;
        }

        zip.finish().map_err(zip_error)?;
    }

    tracing::info!(workspace_id, files = files.len(), "workspace exported");

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/zip")
        .header(
            header::CONTENT_DISPOSITION,
            "attachment; filename=\"workspace.zip\"",
        )
        .body(Body::from(buffer))
        .map_err(|err| ServerError::Storage(std::io::Error::other(err)))
}

fn zip_error(err: zip::result::ZipError) -> ServerError {
    ServerError::Storage(std::io::Error::other(err))
}
