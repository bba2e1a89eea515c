/**
 * Database Row Types
 *
 * Row structs for the four persisted tables. The serde renames define the
 * JSON wire shape clients see (`diskPath`, `workspacePath`, ...); keep them
 * stable.
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A file's metadata row. `version` counts applied chunk lists and starts
/// at 0 for a freshly uploaded file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct File {
    pub id: i64,
    pub disk_path: String,
    pub workspace_path: String,
    pub mime_type: String,
    pub hash: String,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub workspace_id: i64,
}

/// One journal row: the chunk list applied to reach `version`, stored as
/// JSON in `operation`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub file_id: i64,
    pub version: i64,
    pub operation: String,
    pub created_at: DateTime<Utc>,
}

/// A snapshot row tying a version to a durable blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub file_id: i64,
    pub version: i64,
    pub disk_path: String,
    pub hash: String,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub kind: String,
    pub created_at: DateTime<Utc>,
}

/// A tenant. `password` holds the bcrypt hash and never serializes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    pub id: i64,
    pub name: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
