/**
 * File Metadata Queries
 *
 * CRUD over the `files` table. Timestamps are always bound explicitly so
 * every stored value uses the same RFC 3339 encoding.
 */

use chrono::Utc;
use sqlx::sqlite::SqlitePool;

use super::models::File;

/// Fields needed to register a freshly uploaded file.
#[derive(Debug, Clone)]
pub struct NewFile {
    pub disk_path: String,
    pub workspace_path: String,
    pub mime_type: String,
    pub hash: String,
    pub workspace_id: i64,
}

/// Insert a file row at version 0 and return it.
pub async fn create(pool: &SqlitePool, new_file: NewFile) -> Result<File, sqlx::Error> {
    let now = Utc::now();

    sqlx::query_as::<_, File>(
        r#"
        INSERT INTO files (disk_path, workspace_path, mime_type, hash, version, created_at, updated_at, workspace_id)
        VALUES (?, ?, ?, ?, 0, ?, ?, ?)
        RETURNING id, disk_path, workspace_path, mime_type, hash, version, created_at, updated_at, workspace_id
        "#,
    )
    .bind(&new_file.disk_path)
    .bind(&new_file.workspace_path)
    .bind(&new_file.mime_type)
    .bind(&new_file.hash)
    .bind(now)
    .bind(now)
    .bind(new_file.workspace_id)
    .fetch_one(pool)
    .await
}

/// Fetch a file by id.
pub async fn fetch(pool: &SqlitePool, id: i64) -> Result<Option<File>, sqlx::Error> {
    sqlx::query_as::<_, File>(
        r#"
        SELECT id, disk_path, workspace_path, mime_type, hash, version, created_at, updated_at, workspace_id
        FROM files
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// Fetch a file by its tenant-unique `(workspace_id, workspace_path)` pair.
pub async fn fetch_by_workspace_path(
    pool: &SqlitePool,
    workspace_id: i64,
    workspace_path: &str,
) -> Result<Option<File>, sqlx::Error> {
    sqlx::query_as::<_, File>(
        r#"
        SELECT id, disk_path, workspace_path, mime_type, hash, version, created_at, updated_at, workspace_id
        FROM files
        WHERE workspace_id = ? AND workspace_path = ?
        "#,
    )
    .bind(workspace_id)
    .bind(workspace_path)
    .fetch_optional(pool)
    .await
}

/// List every file in a workspace.
pub async fn list_for_workspace(
    pool: &SqlitePool,
    workspace_id: i64,
) -> Result<Vec<File>, sqlx::Error> {
    sqlx::query_as::<_, File>(
        r#"
        SELECT id, disk_path, workspace_path, mime_type, hash, version, created_at, updated_at, workspace_id
        FROM files
        WHERE workspace_id = ?
        ORDER BY workspace_path ASC
        "#,
    )
    .bind(workspace_id)
    .fetch_all(pool)
    .await
}

/// Bump a file's version. Runs inside the journal transaction, so it takes
/// any executor.
pub async fn update_version<'e, E>(executor: E, id: i64, version: i64) -> Result<(), sqlx::Error>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    sqlx::query("UPDATE files SET version = ?, updated_at = ? WHERE id = ?")
        .bind(version)
        .bind(Utc::now())
        .bind(id)
        .execute(executor)
        .await?;
    Ok(())
}

/// Update a file's canonical content hash after a flush.
pub async fn update_hash(pool: &SqlitePool, id: i64, hash: &str) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE files SET hash = ?, updated_at = ? WHERE id = ?")
        .bind(hash)
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Rename: move the file to a new workspace path.
pub async fn update_workspace_path(
    pool: &SqlitePool,
    id: i64,
    workspace_path: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE files SET workspace_path = ?, updated_at = ? WHERE id = ?")
        .bind(workspace_path)
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Delete a file row. Journal and snapshot rows cascade.
pub async fn delete(pool: &SqlitePool, id: i64) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM files WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}
