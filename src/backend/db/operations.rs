/**
 * Operation Journal Queries
 *
 * Append-only log of applied chunk lists keyed by `(file_id, version)`.
 * Appends happen inside the same transaction as the version bump, so the
 * journal can never get ahead of or behind the file row.
 */

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePool;

use super::models::Operation;

/// Append one journal row. `operation` is the JSON-serialized chunk list
/// that was actually applied.
pub async fn append<'e, E>(
    executor: E,
    file_id: i64,
    version: i64,
    operation: &str,
) -> Result<(), sqlx::Error>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO operations (file_id, version, operation, created_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(file_id)
    .bind(version)
    .bind(operation)
    .bind(Utc::now())
    .execute(executor)
    .await?;
    Ok(())
}

/// Fetch journal rows with `version > after_version`, ascending. The join
/// on `files` scopes the read to the caller's workspace.
pub async fn fetch_from_version(
    pool: &SqlitePool,
    file_id: i64,
    after_version: i64,
    workspace_id: i64,
) -> Result<Vec<Operation>, sqlx::Error> {
    sqlx::query_as::<_, Operation>(
        r#"
        SELECT o.file_id, o.version, o.operation, o.created_at
        FROM operations o
        JOIN files f ON o.file_id = f.id
        WHERE o.file_id = ? AND o.version > ? AND f.workspace_id = ?
        ORDER BY o.version ASC
        "#,
    )
    .bind(file_id)
    .bind(after_version)
    .bind(workspace_id)
    .fetch_all(pool)
    .await
}

/// Age out journal rows created before `cutoff`.
pub async fn delete_older_than(
    pool: &SqlitePool,
    cutoff: DateTime<Utc>,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM operations WHERE created_at < ?")
        .bind(cutoff)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
