/**
 * Write-Behind Flusher
 *
 * Two wall-clock driven background loops:
 *
 * - the change-driven flush walks dirty cache entries every flush interval
 *   and persists those past the change threshold or idle for a full
 *   interval, with one final pass on shutdown;
 * - the purge loop ages journal rows out of retention and evicts cache
 *   entries idle beyond the cache max age (flushing them first).
 *
 * Both observe the server cancellation token at every suspension point.
 */

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use sqlx::sqlite::SqlitePool;
use tokio_util::sync::CancellationToken;

use crate::backend::cache::FileCache;
use crate::backend::db::operations;

/// Cadence of the journal/cache purge.
pub const PURGE_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Change-driven flush loop.
pub async fn run_flush_loop(
    cache: Arc<FileCache>,
    flush_interval: Duration,
    min_changes_threshold: i64,
    shutdown: CancellationToken,
) {
    let mut ticker = tokio::time::interval(flush_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                // the final pass persists everything dirty, thresholds aside
                let flushed = cache.flush_dirty(min_changes_threshold, Duration::ZERO).await;
                tracing::info!(flushed, "final flush pass completed, flusher stopping");
                return;
            }
            _ = ticker.tick() => {
                let flushed = cache.flush_dirty(min_changes_threshold, flush_interval).await;
                if flushed > 0 {
                    tracing::debug!(flushed, "periodic flush pass completed");
                }
            }
        }
    }
}

/// Journal retention and cache eviction loop.
pub async fn run_purge_loop(
    pool: SqlitePool,
    cache: Arc<FileCache>,
    operation_max_age: Duration,
    cache_max_age: Duration,
    shutdown: CancellationToken,
) {
    let mut ticker = tokio::time::interval(PURGE_INTERVAL);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                tracing::info!("purge loop stopping");
                return;
            }
            _ = ticker.tick() => {
                let retention = chrono::Duration::from_std(operation_max_age)
                    .unwrap_or_else(|_| chrono::Duration::hours(12));
                let cutoff = Utc::now() - retention;

                match operations::delete_older_than(&pool, cutoff).await {
                    Ok(deleted) if deleted > 0 => {
                        tracing::debug!(deleted, "aged out old operations");
                    }
                    Ok(_) => {}
                    Err(err) => {
                        tracing::warn!("error while removing old operations: {err}");
                    }
                }

                let evicted = cache.evict_idle(cache_max_age).await;
                if evicted > 0 {
                    tracing::debug!(evicted, "evicted idle files from cache");
                }
            }
        }
    }
}
