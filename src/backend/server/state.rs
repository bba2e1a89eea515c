/**
 * Application State
 *
 * The central state container handed to every Axum handler. Everything in
 * it is cheaply cloneable: the pool, the shared services and the server
 * cancellation token that background tasks and subscriber write loops
 * observe.
 */

use std::sync::Arc;
use std::time::Duration;

use axum::extract::FromRef;
use sqlx::sqlite::SqlitePool;
use tokio_util::sync::CancellationToken;

use crate::backend::cache::FileCache;
use crate::backend::server::config::Config;
use crate::backend::storage::Storage;
use crate::backend::sync::SyncService;

/// Immutable runtime options derived from [`Config`].
#[derive(Debug, Clone)]
pub struct ServerOptions {
    pub jwt_secret: Vec<u8>,
    pub max_file_size: u64,
    pub min_changes_threshold: i64,
    pub flush_interval: Duration,
    pub cache_max_age: Duration,
    pub operation_max_age: Duration,
}

impl ServerOptions {
    pub fn from_config(config: &Config) -> Self {
        ServerOptions {
            jwt_secret: config.jwt_secret.clone(),
            max_file_size: config.max_file_size,
            min_changes_threshold: config.min_changes_threshold,
            flush_interval: config.flush_interval,
            cache_max_age: config.cache_max_age,
            operation_max_age: config.operation_max_age,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub storage: Arc<dyn Storage>,
    pub cache: Arc<FileCache>,
    pub sync: Arc<SyncService>,
    pub options: Arc<ServerOptions>,
    /// Cancelled once at shutdown; fans out to every background task and
    /// subscriber write loop.
    pub shutdown: CancellationToken,
}

impl FromRef<AppState> for SqlitePool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Arc<FileCache> {
    fn from_ref(state: &AppState) -> Self {
        state.cache.clone()
    }
}

impl FromRef<AppState> for Arc<SyncService> {
    fn from_ref(state: &AppState) -> Self {
        state.sync.clone()
    }
}

impl FromRef<AppState> for Arc<ServerOptions> {
    fn from_ref(state: &AppState) -> Self {
        state.options.clone()
    }
}
