/**
 * Operation Journal Endpoint
 *
 * Read access to the journal window for clients resuming after a
 * disconnect: rows after `from` for one file, chunk lists parsed out of
 * their stored JSON.
 */

use axum::extract::{Query, State};
use axum::response::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::backend::db::operations;
use crate::backend::error::ServerError;
use crate::backend::middleware::AuthWorkspace;
use crate::backend::server::state::AppState;
use crate::shared::Chunk;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListOperationsQuery {
    pub file_id: i64,
    pub from: i64,
}

/// A journal row with its chunk list decoded.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationView {
    pub file_id: i64,
    pub version: i64,
    pub operation: Vec<Chunk>,
    pub created_at: DateTime<Utc>,
}

/// `GET /v1/api/operation?fileId=&from=`
pub async fn list_operations(
    State(state): State<AppState>,
    AuthWorkspace(workspace_id): AuthWorkspace,
    Query(query): Query<ListOperationsQuery>,
) -> Result<Json<Vec<OperationView>>, ServerError> {
    if query.file_id <= 0 {
        return Err(ServerError::validation("invalid \"fileId\""));
    }
    if query.from < 0 {
        return Err(ServerError::validation("invalid \"from\" version"));
    }

    let rows =
        operations::fetch_from_version(&state.pool, query.file_id, query.from, workspace_id)
            .await?;

    let operations = rows
        .into_iter()
        .filter_map(|row| {
            let chunks: Vec<Chunk> = serde_json::from_str(&row.operation).ok()?;
            Some(OperationView {
                file_id: row.file_id,
                version: row.version,
                operation: chunks,
                created_at: row.created_at,
            })
        })
        .collect();

    Ok(Json(operations))
}
