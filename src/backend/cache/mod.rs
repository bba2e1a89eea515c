//! File Cache Module
//!
//! In-memory mapping from file id to cached content plus a pending-change
//! counter. The cache is the authoritative copy between flushes: edits are
//! applied here first and written behind to blob storage by the flusher.
//!
//! A single mutex guards the whole map. Holding the guard is what makes a
//! caller the file's one logical writer, so the coordinator keeps it across
//! its rebase/apply/journal sequence.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use sqlx::sqlite::SqlitePool;
use tokio::sync::{Mutex, MutexGuard};

use crate::backend::db::{files, snapshots, File};
use crate::backend::error::ServerError;
use crate::backend::storage::{generate_hash, Storage};

/// A file's metadata row plus its in-memory content.
#[derive(Debug, Clone)]
pub struct CachedFile {
    pub file: File,
    pub content: String,
    /// Applied chunk lists not yet flushed to blob storage.
    pub pending_changes: i64,
}

/// Write-behind cache over all currently edited files.
pub struct FileCache {
    pool: SqlitePool,
    storage: Arc<dyn Storage>,
    entries: Mutex<HashMap<i64, CachedFile>>,
}

impl FileCache {
    pub fn new(pool: SqlitePool, storage: Arc<dyn Storage>) -> Self {
        FileCache {
            pool,
            storage,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Take the cache lock. All mutation of cached files happens under the
    /// returned guard.
    pub async fn lock(&self) -> MutexGuard<'_, HashMap<i64, CachedFile>> {
        self.entries.lock().await
    }

    /// Materialize `file_id` in the cache if it is not there yet and return
    /// the entry. Only `text/*` files can be cached.
    pub async fn load_if_absent<'m>(
        &self,
        entries: &'m mut HashMap<i64, CachedFile>,
        file_id: i64,
    ) -> Result<&'m mut CachedFile, ServerError> {
        match entries.entry(file_id) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(slot) => {
                let file = files::fetch(&self.pool, file_id)
                    .await?
                    .ok_or_else(|| ServerError::not_found("file"))?;

                if !file.mime_type.starts_with("text/") {
                    return Err(ServerError::validation(format!(
                        "file {} is not a text file",
                        file.id
                    )));
                }

                let raw = self.storage.read_object(&file.disk_path).await?;
                let content = String::from_utf8(raw).map_err(|_| {
                    ServerError::validation(format!("file {} is not valid UTF-8", file.id))
                })?;

                tracing::debug!(file_id, "file loaded into cache");
                Ok(slot.insert(CachedFile {
                    file,
                    content,
                    pending_changes: 0,
                }))
            }
        }
    }

    /// Flush one file if it has pending changes. Idempotent: flushing a
    /// clean or uncached file does nothing.
    pub async fn flush(&self, file_id: i64) -> Result<(), ServerError> {
        let mut entries = self.entries.lock().await;
        if let Some(entry) = entries.get_mut(&file_id) {
            self.flush_entry(entry).await?;
        }
        Ok(())
    }

    /// Flush every dirty entry that crossed the change threshold or has
    /// been idle for a full flush interval. Returns how many files were
    /// written. Failures are logged and retried on the next tick.
    pub async fn flush_dirty(&self, min_changes_threshold: i64, flush_interval: Duration) -> usize {
        let max_idle = chrono::Duration::from_std(flush_interval)
            .unwrap_or_else(|_| chrono::Duration::seconds(60));
        let now = Utc::now();

        let mut entries = self.entries.lock().await;
        let mut flushed = 0;

        for entry in entries.values_mut() {
            if entry.pending_changes == 0 {
                continue;
            }

            let idle = now.signed_duration_since(entry.file.updated_at);
            if entry.pending_changes > min_changes_threshold || idle >= max_idle {
                match self.flush_entry(entry).await {
                    Ok(()) => flushed += 1,
                    Err(err) => {
                        tracing::warn!(file_id = entry.file.id, "flush failed: {err}");
                    }
                }
            }
        }

        flushed
    }

    /// Flush and drop entries idle for longer than `cache_max_age`. An
    /// entry whose flush fails stays cached so no pending change is lost.
    pub async fn evict_idle(&self, cache_max_age: Duration) -> usize {
        let max_age = chrono::Duration::from_std(cache_max_age)
            .unwrap_or_else(|_| chrono::Duration::hours(1));
        let now = Utc::now();

        let mut entries = self.entries.lock().await;
        let stale: Vec<i64> = entries
            .iter()
            .filter(|(_, entry)| now.signed_duration_since(entry.file.updated_at) >= max_age)
            .map(|(id, _)| *id)
            .collect();

        let mut evicted = 0;
        for file_id in stale {
            if let Some(entry) = entries.get_mut(&file_id) {
                match self.flush_entry(entry).await {
                    Ok(()) => {
                        entries.remove(&file_id);
                        evicted += 1;
                        tracing::debug!(file_id, "idle file evicted from cache");
                    }
                    Err(err) => {
                        tracing::warn!(file_id, "eviction flush failed: {err}");
                    }
                }
            }
        }

        evicted
    }

    /// Drop an entry without flushing. Used when the file itself is being
    /// deleted.
    pub async fn remove(&self, file_id: i64) {
        self.entries.lock().await.remove(&file_id);
    }

    async fn flush_entry(&self, entry: &mut CachedFile) -> Result<(), ServerError> {
        if entry.pending_changes == 0 {
            return Ok(());
        }

        let content = entry.content.as_bytes();
        self.storage
            .write_object(&entry.file.disk_path, content)
            .await?;

        let hash = generate_hash(content);
        let snapshot_path = self.storage.create_object(content).await?;

        files::update_hash(&self.pool, entry.file.id, &hash).await?;
        snapshots::create(
            &self.pool,
            entry.file.id,
            entry.file.version,
            &snapshot_path,
            &hash,
            "file",
        )
        .await?;

        entry.file.hash = hash;
        entry.pending_changes = 0;

        tracing::debug!(
            file_id = entry.file.id,
            version = entry.file.version,
            "file flushed to storage"
        );
        Ok(())
    }
}
