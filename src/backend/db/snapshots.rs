/**
 * Snapshot Queries
 *
 * Snapshot rows record which blob holds the full content at a version.
 * They are the durable record; the journal is only a short rebase window.
 */

use chrono::Utc;
use sqlx::sqlite::SqlitePool;

use super::models::Snapshot;

/// Record a snapshot of `file_id` at `version`, stored at `disk_path`.
pub async fn create(
    pool: &SqlitePool,
    file_id: i64,
    version: i64,
    disk_path: &str,
    hash: &str,
    kind: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO snapshots (file_id, version, disk_path, hash, type, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(file_id)
    .bind(version)
    .bind(disk_path)
    .bind(hash)
    .bind(kind)
    .bind(Utc::now())
    .execute(pool)
    .await?;
    Ok(())
}

/// Fetch one snapshot, scoped to the caller's workspace.
pub async fn fetch(
    pool: &SqlitePool,
    file_id: i64,
    version: i64,
    workspace_id: i64,
) -> Result<Option<Snapshot>, sqlx::Error> {
    sqlx::query_as::<_, Snapshot>(
        r#"
        SELECT s.file_id, s.version, s.disk_path, s.hash, s.type, s.created_at
        FROM snapshots s
        JOIN files f ON f.id = s.file_id
        WHERE s.file_id = ? AND s.version = ? AND f.workspace_id = ?
        "#,
    )
    .bind(file_id)
    .bind(version)
    .bind(workspace_id)
    .fetch_optional(pool)
    .await
}

/// List a file's snapshots, oldest version first.
pub async fn list(
    pool: &SqlitePool,
    file_id: i64,
    workspace_id: i64,
) -> Result<Vec<Snapshot>, sqlx::Error> {
    sqlx::query_as::<_, Snapshot>(
        r#"
        SELECT s.file_id, s.version, s.disk_path, s.hash, s.type, s.created_at
        FROM snapshots s
        JOIN files f ON f.id = s.file_id
        WHERE s.file_id = ? AND f.workspace_id = ?
        ORDER BY s.version ASC
        "#,
    )
    .bind(file_id)
    .bind(workspace_id)
    .fetch_all(pool)
    .await
}

/// List snapshot rows for a file without tenant scoping. Used by deletion,
/// which has already authorized the file.
pub async fn list_for_file(pool: &SqlitePool, file_id: i64) -> Result<Vec<Snapshot>, sqlx::Error> {
    sqlx::query_as::<_, Snapshot>(
        r#"
        SELECT file_id, version, disk_path, hash, type, created_at
        FROM snapshots
        WHERE file_id = ?
        ORDER BY version ASC
        "#,
    )
    .bind(file_id)
    .fetch_all(pool)
    .await
}
