//! Sync Module
//!
//! The coordination layer around the diff algebra: the per-file
//! single-writer state machine that rebases incoming edits against the
//! journal, applies them to the cached content, assigns versions and fans
//! the result out to workspace peers.
//!
//! Streaming failures are deliberately silent toward the author: a dropped
//! message leaves the client's local version behind the server's, and the
//! client's next edit gets rebased through the same journal path.

use std::sync::Arc;

use chrono::Utc;
use sqlx::sqlite::SqlitePool;

use crate::backend::cache::FileCache;
use crate::backend::db::operations;
use crate::shared::diff::{self, Chunk};
use crate::shared::{ChunkMessage, CursorMessage, EventMessage};

/// Flusher and purge background loops
pub mod flusher;

/// Workspace broadcast hub
pub mod hub;

/// Publish rate limiting
pub mod limiter;

/// Per-connection state
pub mod subscriber;

pub use hub::SubscriberHub;
pub use subscriber::{ConnectionState, Subscriber, SubscriberChannels};

/// The OT coordinator: owns the edit path from decoded frame to broadcast.
pub struct SyncService {
    pool: SqlitePool,
    cache: Arc<FileCache>,
    hub: Arc<SubscriberHub>,
}

impl SyncService {
    pub fn new(pool: SqlitePool, cache: Arc<FileCache>, hub: Arc<SubscriberHub>) -> Self {
        SyncService { pool, cache, hub }
    }

    pub fn hub(&self) -> &Arc<SubscriberHub> {
        &self.hub
    }

    /// Handle an incoming edit.
    ///
    /// Holding the cache lock makes this the file's only writer. The edit
    /// is rebased if it was authored against an older version, applied to
    /// the cached content, journaled together with the version bump in one
    /// transaction, and only then broadcast. Any failure on the way drops
    /// the message: the author's next edit will rebase past the gap.
    pub async fn on_chunk_message(&self, sender: &Subscriber, msg: ChunkMessage) {
        let file_id = msg.header.file_id;

        if msg.chunks.is_empty() {
            tracing::info!(file_id, version = msg.version, "0 chunks, skipping message");
            return;
        }

        let mut entries = self.cache.lock().await;

        let entry = match self.cache.load_if_absent(&mut entries, file_id).await {
            Ok(entry) => entry,
            Err(err) => {
                tracing::warn!(file_id, "error while caching file: {err}");
                return;
            }
        };

        if entry.file.workspace_id != sender.workspace_id {
            tracing::warn!(
                file_id,
                workspace_id = sender.workspace_id,
                "file belongs to another workspace, skipping message"
            );
            return;
        }

        let current_version = entry.file.version;

        // The incoming edit was authored on an older version: walk it
        // forward across every chunk list committed since.
        let chunks = if msg.version < current_version {
            match self
                .rebase(file_id, sender.workspace_id, msg.version, current_version, msg.chunks.clone())
                .await
            {
                Some(chunks) => chunks,
                None => return,
            }
        } else {
            msg.chunks.clone()
        };

        let new_version = current_version + 1;
        let new_content = diff::apply_multiple(&entry.content, &chunks);

        let operation_json = match serde_json::to_string(&chunks) {
            Ok(json) => json,
            Err(err) => {
                tracing::error!(file_id, "error while serializing operation: {err}");
                return;
            }
        };

        // Journal row and version bump commit atomically; the cache entry
        // is only touched after the transaction succeeds, so a failed
        // commit leaves no trace anywhere.
        if let Err(err) = self
            .commit_operation(file_id, new_version, &operation_json)
            .await
        {
            tracing::error!(
                file_id,
                version = new_version,
                "error while storing operation: {err}"
            );
            return;
        }

        entry.content = new_content;
        entry.file.version = new_version;
        entry.file.updated_at = Utc::now();
        entry.pending_changes += 1;

        drop(entries);

        let broadcast = ChunkMessage {
            header: msg.header,
            chunks,
            version: new_version,
        };
        self.hub.broadcast_chunk(sender, broadcast).await;
    }

    /// Relay a create/delete/rename event to workspace peers.
    pub async fn on_event_message(&self, sender: &Subscriber, msg: EventMessage) {
        self.hub.broadcast_event(sender, msg).await;
    }

    /// Relay a cursor update to workspace peers.
    pub async fn on_cursor_message(&self, sender: &Subscriber, msg: CursorMessage) {
        self.hub.broadcast_cursor(sender, msg).await;
    }

    /// Fold `chunks` forward across the journal window `(base_version,
    /// current_version]`. Returns `None` when the history is unusable:
    /// missing rows, a version gap, or an unparsable journal entry.
    async fn rebase(
        &self,
        file_id: i64,
        workspace_id: i64,
        base_version: i64,
        current_version: i64,
        mut chunks: Vec<Chunk>,
    ) -> Option<Vec<Chunk>> {
        let rows = match operations::fetch_from_version(&self.pool, file_id, base_version, workspace_id)
            .await
        {
            Ok(rows) => rows,
            Err(err) => {
                tracing::warn!(
                    file_id,
                    version = base_version,
                    "error while fetching operations, skipping message: {err}"
                );
                return None;
            }
        };

        let mut version = base_version;
        for row in &rows {
            if version + 1 != row.version {
                tracing::warn!(
                    file_id,
                    version = base_version,
                    "missing operation in history to transform, skipping message"
                );
                return None;
            }

            let previous: Vec<Chunk> = match serde_json::from_str(&row.operation) {
                Ok(previous) => previous,
                Err(err) => {
                    tracing::warn!(
                        file_id,
                        version = row.version,
                        "error while parsing operations, skipping message: {err}"
                    );
                    return None;
                }
            };

            chunks = diff::transform_multiple(&previous, &chunks);
            version = row.version;
        }

        // rows aged out of retention leave the tail short
        if version != current_version {
            tracing::warn!(
                file_id,
                version = base_version,
                "operation history incomplete, skipping message"
            );
            return None;
        }

        Some(chunks)
    }

    async fn commit_operation(
        &self,
        file_id: i64,
        version: i64,
        operation_json: &str,
    ) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        operations::append(&mut *tx, file_id, version, operation_json).await?;
        crate::backend::db::files::update_version(&mut *tx, file_id, version).await?;
        tx.commit().await
    }
}
