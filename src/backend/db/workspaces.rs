/**
 * Workspace Queries
 *
 * Workspaces are the tenant boundary. They are provisioned out of band;
 * the server only reads them for login and creates them in tests.
 */

use chrono::Utc;
use sqlx::sqlite::SqlitePool;

use super::models::Workspace;

/// Fetch a workspace by name for login.
pub async fn fetch_by_name(
    pool: &SqlitePool,
    name: &str,
) -> Result<Option<Workspace>, sqlx::Error> {
    sqlx::query_as::<_, Workspace>(
        r#"
        SELECT id, name, password, created_at, updated_at
        FROM workspaces
        WHERE name = ?
        "#,
    )
    .bind(name)
    .fetch_optional(pool)
    .await
}

/// Insert a workspace with an already-hashed password.
pub async fn create(
    pool: &SqlitePool,
    name: &str,
    password_hash: &str,
) -> Result<Workspace, sqlx::Error> {
    let now = Utc::now();

    sqlx::query_as::<_, Workspace>(
        r#"
        INSERT INTO workspaces (name, password, created_at, updated_at)
        VALUES (?, ?, ?, ?)
        RETURNING id, name, password, created_at, updated_at
        "#,
    )
    .bind(name)
    .bind(password_hash)
    .bind(now)
    .bind(now)
    .fetch_one(pool)
    .await
}
