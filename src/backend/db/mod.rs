//! Database Module
//!
//! SQLite persistence for the sync server: workspaces, file metadata, the
//! per-file operation journal and snapshot rows. Queries are grouped per
//! table; everything binds through `sqlx` at runtime.

use std::path::Path;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

/// Row types
pub mod models;

/// File metadata queries
pub mod files;

/// Operation journal queries
pub mod operations;

/// Snapshot queries
pub mod snapshots;

/// Workspace queries
pub mod workspaces;

pub use models::{File, Operation, Snapshot, Workspace};

/// Open (creating if missing) the SQLite database at `path`.
pub async fn connect(path: &Path) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true);

    SqlitePoolOptions::new().connect_with(options).await
}

/// Run pending migrations from the embedded `migrations/` directory.
pub async fn migrate(pool: &SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
