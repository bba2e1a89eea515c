/**
 * File Endpoints
 *
 * CRUD over workspace files. Uploads arrive as `multipart/form-data` with
 * a `file` part (optionally base64 transfer-encoded) and a `path` field;
 * fetches flush any pending cached changes first and answer with
 * `multipart/mixed` metadata + content.
 *
 * Every id-addressed route resolves the file first and answers 404 when
 * it belongs to another workspace.
 */

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{Json, Response};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::Deserialize;

use super::multipart_mixed_response;
use crate::backend::db::files::{self, NewFile};
use crate::backend::db::{snapshots, File};
use crate::backend::error::ServerError;
use crate::backend::middleware::AuthWorkspace;
use crate::backend::server::state::AppState;
use crate::backend::storage::generate_hash;

const MULTIPART_FILE_FIELD: &str = "file";
const MULTIPART_FILEPATH_FIELD: &str = "path";

/// `GET /v1/api/file`
pub async fn list_files(
    State(state): State<AppState>,
    AuthWorkspace(workspace_id): AuthWorkspace,
) -> Result<Json<Vec<File>>, ServerError> {
    let files = files::list_for_workspace(&state.pool, workspace_id).await?;
    Ok(Json(files))
}

/// `POST /v1/api/file`
pub async fn create_file(
    State(state): State<AppState>,
    AuthWorkspace(workspace_id): AuthWorkspace,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<File>), ServerError> {
    let mut content: Option<Vec<u8>> = None;
    let mut is_base64 = false;
    let mut workspace_path: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ServerError::validation(format!("unable to parse form: {err}")))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some(MULTIPART_FILE_FIELD) => {
                is_base64 = field
                    .headers()
                    .get("content-transfer-encoding")
                    .and_then(|value| value.to_str().ok())
                    .is_some_and(|encoding| encoding.eq_ignore_ascii_case("base64"));

                let bytes = field
                    .bytes()
                    .await
                    .map_err(|err| ServerError::validation(format!("error reading file: {err}")))?;
                content = Some(bytes.to_vec());
            }
            Some(MULTIPART_FILEPATH_FIELD) => {
                let text = field
                    .text()
                    .await
                    .map_err(|err| ServerError::validation(format!("error reading path: {err}")))?;
                workspace_path = Some(text);
            }
            _ => {}
        }
    }

    let content = content.ok_or_else(|| ServerError::validation("error retrieving the file"))?;
    let workspace_path = workspace_path
        .filter(|path| !path.is_empty())
        .ok_or_else(|| ServerError::validation("invalid filepath"))?;

    if content.len() as u64 > state.options.max_file_size {
        return Err(ServerError::validation("file exceeds the maximum size"));
    }

    let content = if is_base64 {
        let compact: Vec<u8> = content
            .into_iter()
            .filter(|byte| !byte.is_ascii_whitespace())
            .collect();
        BASE64
            .decode(compact)
            .map_err(|_| ServerError::validation("unable to parse base64"))?
    } else {
        content
    };

    if files::fetch_by_workspace_path(&state.pool, workspace_id, &workspace_path)
        .await?
        .is_some()
    {
        return Err(ServerError::conflict("duplicated file"));
    }

    let disk_path = state.storage.create_object(&content).await?;
    let file = files::create(
        &state.pool,
        NewFile {
            disk_path,
            workspace_path,
            mime_type: detect_mime(&content).to_string(),
            hash: generate_hash(&content),
            workspace_id,
        },
    )
    .await?;

    tracing::info!(file_id = file.id, workspace_id, "file created");
    Ok((StatusCode::CREATED, Json(file)))
}

/// `GET /v1/api/file/{id}`
pub async fn fetch_file(
    State(state): State<AppState>,
    AuthWorkspace(workspace_id): AuthWorkspace,
    Path(id): Path<i64>,
) -> Result<Response, ServerError> {
    let file = fetch_workspace_file(&state, workspace_id, id).await?;

    // pending edits live in the cache until flushed; the response must
    // reflect them
    state.cache.flush(id).await?;

    let content = state.storage.read_object(&file.disk_path).await?;
    let filename = base_name(&file.workspace_path);
    multipart_mixed_response(&file, &file.mime_type, filename, &content)
}

#[derive(Debug, Deserialize)]
pub struct UpdateFileBody {
    pub path: String,
}

/// `PATCH /v1/api/file/{id}`
pub async fn update_file(
    State(state): State<AppState>,
    AuthWorkspace(workspace_id): AuthWorkspace,
    Path(id): Path<i64>,
    Json(body): Json<UpdateFileBody>,
) -> Result<StatusCode, ServerError> {
    if body.path.is_empty() {
        return Err(ServerError::validation("invalid path ''"));
    }

    fetch_workspace_file(&state, workspace_id, id).await?;
    files::update_workspace_path(&state.pool, id, &body.path).await?;

    tracing::info!(file_id = id, path = %body.path, "file renamed");
    Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /v1/api/file/{id}`
///
/// Removes the file row, its canonical blob, and every snapshot row and
/// blob. The cache entry is dropped without flushing.
pub async fn delete_file(
    State(state): State<AppState>,
    AuthWorkspace(workspace_id): AuthWorkspace,
    Path(id): Path<i64>,
) -> Result<StatusCode, ServerError> {
    let file = fetch_workspace_file(&state, workspace_id, id).await?;

    state.cache.remove(id).await;
    state.storage.delete_object(&file.disk_path).await?;

    for snapshot in snapshots::list_for_file(&state.pool, id).await? {
        state.storage.delete_object(&snapshot.disk_path).await?;
    }

    files::delete(&state.pool, id).await?;

    tracing::info!(file_id = id, workspace_id, "file deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Resolve `id` inside `workspace_id`, answering 404 for both a missing
/// file and a file owned by another tenant.
pub(crate) async fn fetch_workspace_file(
    state: &AppState,
    workspace_id: i64,
    id: i64,
) -> Result<File, ServerError> {
    if id <= 0 {
        return Err(ServerError::validation("invalid file id"));
    }

    let file = files::fetch(&state.pool, id)
        .await?
        .ok_or_else(|| ServerError::not_found("file"))?;

    if file.workspace_id != workspace_id {
        return Err(ServerError::not_found("file"));
    }

    Ok(file)
}

pub(crate) fn base_name(workspace_path: &str) -> &str {
    workspace_path
        .rsplit('/')
        .next()
        .unwrap_or(workspace_path)
}

/// Best-effort MIME sniff: a handful of magic numbers, then valid UTF-8
/// means plain text, everything else an opaque octet stream.
fn detect_mime(content: &[u8]) -> &'static str {
    const MAGIC: &[(&[u8], &str)] = &[
        (b"\x89PNG\r\n\x1a\n", "image/png"),
        (b"\xff\xd8\xff", "image/jpeg"),
        (b"GIF8", "image/gif"),
        (b"%PDF-", "application/pdf"),
        (b"PK\x03\x04", "application/zip"),
    ];

    for (prefix, mime) in MAGIC {
        if content.starts_with(prefix) {
            return mime;
        }
    }

    if std::str::from_utf8(content).is_ok() {
        "text/plain; charset=utf-8"
    } else {
        "application/octet-stream"
    }
}
