/**
 * Server Initialization
 *
 * Builds the application from a loaded configuration: storage directory,
 * database pool and migrations, the shared cache/hub/coordinator, and the
 * router. The returned state carries the cancellation token the caller
 * uses to wind the server down.
 *
 * Background tasks (flusher, purge) are spawned by the binary so their
 * join handles can be awaited during the shutdown drain.
 */

use std::sync::Arc;

use axum::Router;
use tokio_util::sync::CancellationToken;

use crate::backend::cache::FileCache;
use crate::backend::db;
use crate::backend::error::ServerError;
use crate::backend::routes::create_router;
use crate::backend::server::config::Config;
use crate::backend::server::state::{AppState, ServerOptions};
use crate::backend::storage::{DiskStorage, Storage};
use crate::backend::sync::{SubscriberHub, SyncService};

/// Create the Axum application and its shared state.
pub async fn create_app(config: &Config) -> Result<(Router, AppState), ServerError> {
    tokio::fs::create_dir_all(&config.storage_dir).await?;

    let pool = db::connect(&config.sqlite_filepath).await?;
    db::migrate(&pool).await?;
    tracing::info!("database ready at {}", config.sqlite_filepath.display());

    let storage: Arc<dyn Storage> = Arc::new(DiskStorage::new(&config.storage_dir));
    let cache = Arc::new(FileCache::new(pool.clone(), storage.clone()));
    let hub = Arc::new(SubscriberHub::new());
    let sync = Arc::new(SyncService::new(pool.clone(), cache.clone(), hub));

    let state = AppState {
        pool,
        storage,
        cache,
        sync,
        options: Arc::new(ServerOptions::from_config(config)),
        shutdown: CancellationToken::new(),
    };

    let app = create_router(state.clone());
    Ok((app, state))
}
