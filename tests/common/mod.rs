//! Common test utilities and helpers
//!
//! Shared fixtures for the integration suites: an in-memory SQLite
//! database with migrations applied, map-backed blob storage, and the
//! assembled sync backend.

#![allow(dead_code)]

use std::sync::Arc;

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tokio_util::sync::CancellationToken;

use syncspace::backend::cache::FileCache;
use syncspace::backend::db::files::{self, NewFile};
use syncspace::backend::db::{workspaces, File, Workspace};
use syncspace::backend::server::state::{AppState, ServerOptions};
use syncspace::backend::storage::{generate_hash, MemoryStorage, Storage};
use syncspace::backend::sync::{SubscriberHub, SyncService};

pub const TEST_JWT_SECRET: &[u8] = b"test-secret";

/// Create a migrated in-memory database. A single connection keeps every
/// query on the same memory instance.
pub async fn create_test_pool() -> SqlitePool {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .expect("invalid sqlite url")
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .expect("failed to open in-memory database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("failed to run migrations");

    pool
}

/// The assembled backend against in-memory storage.
pub struct TestBackend {
    pub pool: SqlitePool,
    pub storage: Arc<MemoryStorage>,
    pub cache: Arc<FileCache>,
    pub hub: Arc<SubscriberHub>,
    pub sync: Arc<SyncService>,
}

impl TestBackend {
    pub async fn new() -> Self {
        let pool = create_test_pool().await;
        create_workspace(&pool, "default", "hunter2").await;
        let storage = Arc::new(MemoryStorage::new());
        let cache = Arc::new(FileCache::new(
            pool.clone(),
            storage.clone() as Arc<dyn Storage>,
        ));
        let hub = Arc::new(SubscriberHub::new());
        let sync = Arc::new(SyncService::new(pool.clone(), cache.clone(), hub.clone()));

        TestBackend {
            pool,
            storage,
            cache,
            hub,
            sync,
        }
    }

    /// Store `content` as a blob and register a text file over it.
    pub async fn create_text_file(
        &self,
        workspace_id: i64,
        workspace_path: &str,
        content: &str,
    ) -> File {
        let disk_path = self
            .storage
            .create_object(content.as_bytes())
            .await
            .expect("failed to store blob");

        files::create(
            &self.pool,
            NewFile {
                disk_path,
                workspace_path: workspace_path.to_string(),
                mime_type: "text/plain; charset=utf-8".to_string(),
                hash: generate_hash(content.as_bytes()),
                workspace_id,
            },
        )
        .await
        .expect("failed to create file row")
    }

    /// Register a non-text file; edits against it must be rejected.
    pub async fn create_binary_file(&self, workspace_id: i64, workspace_path: &str) -> File {
        let content = [0xffu8, 0xd8, 0xff, 0x00];
        let disk_path = self.storage.create_object(&content).await.unwrap();

        files::create(
            &self.pool,
            NewFile {
                disk_path,
                workspace_path: workspace_path.to_string(),
                mime_type: "image/jpeg".to_string(),
                hash: generate_hash(&content),
                workspace_id,
            },
        )
        .await
        .unwrap()
    }

    /// Read a file's canonical blob back as text.
    pub async fn stored_content(&self, file: &File) -> String {
        let bytes = self.storage.read_object(&file.disk_path).await.unwrap();
        String::from_utf8(bytes).unwrap()
    }

    /// Build an `AppState` over this backend for handler-level tests.
    pub fn app_state(&self) -> AppState {
        AppState {
            pool: self.pool.clone(),
            storage: self.storage.clone() as Arc<dyn Storage>,
            cache: self.cache.clone(),
            sync: self.sync.clone(),
            options: Arc::new(test_options()),
            shutdown: CancellationToken::new(),
        }
    }
}

pub fn test_options() -> ServerOptions {
    ServerOptions {
        jwt_secret: TEST_JWT_SECRET.to_vec(),
        max_file_size: 10 << 20,
        min_changes_threshold: 3,
        flush_interval: std::time::Duration::from_secs(60),
        cache_max_age: std::time::Duration::from_secs(3600),
        operation_max_age: std::time::Duration::from_secs(12 * 3600),
    }
}

/// Create a workspace with a bcrypt-hashed password.
pub async fn create_workspace(pool: &SqlitePool, name: &str, password: &str) -> Workspace {
    // minimum cost keeps the suite fast
    let hash = bcrypt::hash(password, 4).unwrap();
    workspaces::create(pool, name, &hash).await.unwrap()
}
