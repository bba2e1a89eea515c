//! Coordinator integration tests
//!
//! End-to-end scenarios through the OT coordinator: version assignment,
//! rebase against journaled history, broadcast policy, flush triggers and
//! cache eviction. Everything runs against in-memory SQLite and storage.

mod common;

use std::time::Duration;

use common::TestBackend;
use syncspace::backend::db::{files, operations};
use syncspace::backend::sync::flusher;
use syncspace::shared::{Chunk, ChunkMessage, CursorMessage, EventMessage, MessageHeader, MessageType};
use tokio_util::sync::CancellationToken;

fn chunk_message(file_id: i64, version: i64, chunks: Vec<Chunk>) -> ChunkMessage {
    ChunkMessage {
        header: MessageHeader {
            file_id,
            kind: MessageType::Chunk,
        },
        chunks,
        version,
    }
}

#[tokio::test]
async fn basic_insert_bumps_version_and_echoes() {
    let backend = TestBackend::new().await;
    let file = backend.create_text_file(1, "notes/hello.md", "hello!").await;

    let (sender, mut sender_channels) = backend.hub.subscribe(1).await;
    let (peer, mut peer_channels) = backend.hub.subscribe(1).await;
    sender.mark_connected();
    peer.mark_connected();

    let msg = chunk_message(file.id, 0, vec![Chunk::add(5, " world")]);
    backend.sync.on_chunk_message(&sender, msg).await;

    // the sender receives its own echo carrying the authoritative version
    let echo = sender_channels.chunk_rx.recv().await.unwrap();
    assert_eq!(echo.version, 1);
    assert_eq!(echo.chunks, vec![Chunk::add(5, " world")]);

    let relayed = peer_channels.chunk_rx.recv().await.unwrap();
    assert_eq!(relayed, echo);

    let row = files::fetch(&backend.pool, file.id).await.unwrap().unwrap();
    assert_eq!(row.version, 1);

    backend.cache.flush(file.id).await.unwrap();
    assert_eq!(backend.stored_content(&file).await, "hello world!");
}

#[tokio::test]
async fn concurrent_edit_is_rebased_against_history() {
    let backend = TestBackend::new().await;
    let file = backend.create_text_file(1, "notes/foo.md", "foo").await;

    let (client_a, mut channels_a) = backend.hub.subscribe(1).await;
    let (client_b, mut channels_b) = backend.hub.subscribe(1).await;
    client_a.mark_connected();
    client_b.mark_connected();

    // A commits first
    backend
        .sync
        .on_chunk_message(&client_a, chunk_message(file.id, 0, vec![Chunk::add(0, "Hello!")]))
        .await;

    // B still thinks it is at version 0
    backend
        .sync
        .on_chunk_message(&client_b, chunk_message(file.id, 0, vec![Chunk::remove(0, "foo")]))
        .await;

    // both peers see A's edit, then B's edit rebased past it
    for channels in [&mut channels_a, &mut channels_b] {
        let first = channels.chunk_rx.recv().await.unwrap();
        assert_eq!(first.version, 1);

        let second = channels.chunk_rx.recv().await.unwrap();
        assert_eq!(second.version, 2);
        assert_eq!(second.chunks, vec![Chunk::remove(6, "foo")]);
    }

    backend.cache.flush(file.id).await.unwrap();
    assert_eq!(backend.stored_content(&file).await, "Hello!");
}

#[tokio::test]
async fn overlapping_removes_are_stripped() {
    let backend = TestBackend::new().await;
    let file = backend.create_text_file(1, "notes/abc.md", "abcdef").await;

    let (client_a, mut channels_a) = backend.hub.subscribe(1).await;
    let (client_b, _channels_b) = backend.hub.subscribe(1).await;
    client_a.mark_connected();
    client_b.mark_connected();

    backend
        .sync
        .on_chunk_message(&client_a, chunk_message(file.id, 0, vec![Chunk::remove(3, "def")]))
        .await;
    backend
        .sync
        .on_chunk_message(&client_b, chunk_message(file.id, 0, vec![Chunk::remove(2, "cdef")]))
        .await;

    let first = channels_a.chunk_rx.recv().await.unwrap();
    assert_eq!(first.chunks, vec![Chunk::remove(3, "def")]);

    let second = channels_a.chunk_rx.recv().await.unwrap();
    assert_eq!(second.version, 2);
    assert_eq!(second.chunks, vec![Chunk::remove(2, "c")]);

    backend.cache.flush(file.id).await.unwrap();
    assert_eq!(backend.stored_content(&file).await, "ab");
}

#[tokio::test]
async fn empty_chunk_lists_are_dropped() {
    let backend = TestBackend::new().await;
    let file = backend.create_text_file(1, "notes/a.md", "text").await;

    let (sender, mut sender_channels) = backend.hub.subscribe(1).await;
    sender.mark_connected();

    backend
        .sync
        .on_chunk_message(&sender, chunk_message(file.id, 0, vec![]))
        .await;

    assert!(sender_channels.chunk_rx.try_recv().is_err());
    let row = files::fetch(&backend.pool, file.id).await.unwrap().unwrap();
    assert_eq!(row.version, 0);
}

#[tokio::test]
async fn cross_workspace_edits_are_dropped() {
    let backend = TestBackend::new().await;
    let file = backend.create_text_file(1, "notes/a.md", "text").await;

    let (intruder, mut intruder_channels) = backend.hub.subscribe(2).await;
    intruder.mark_connected();

    backend
        .sync
        .on_chunk_message(&intruder, chunk_message(file.id, 0, vec![Chunk::add(0, "x")]))
        .await;

    assert!(intruder_channels.chunk_rx.try_recv().is_err());
    let row = files::fetch(&backend.pool, file.id).await.unwrap().unwrap();
    assert_eq!(row.version, 0);
}

#[tokio::test]
async fn binary_files_are_not_editable() {
    let backend = TestBackend::new().await;
    let file = backend.create_binary_file(1, "images/photo.jpg").await;

    let (sender, mut sender_channels) = backend.hub.subscribe(1).await;
    sender.mark_connected();

    backend
        .sync
        .on_chunk_message(&sender, chunk_message(file.id, 0, vec![Chunk::add(0, "x")]))
        .await;

    assert!(sender_channels.chunk_rx.try_recv().is_err());
}

#[tokio::test]
async fn edit_against_purged_history_is_dropped() {
    let backend = TestBackend::new().await;
    let file = backend.create_text_file(1, "notes/a.md", "base").await;

    let (sender, mut sender_channels) = backend.hub.subscribe(1).await;
    sender.mark_connected();

    backend
        .sync
        .on_chunk_message(&sender, chunk_message(file.id, 0, vec![Chunk::add(4, "!")]))
        .await;
    assert_eq!(sender_channels.chunk_rx.recv().await.unwrap().version, 1);

    // age the whole journal out of retention
    let purged = operations::delete_older_than(&backend.pool, chrono::Utc::now())
        .await
        .unwrap();
    assert_eq!(purged, 1);

    // an edit still based on version 0 can no longer be rebased
    backend
        .sync
        .on_chunk_message(&sender, chunk_message(file.id, 0, vec![Chunk::add(0, "x")]))
        .await;

    assert!(sender_channels.chunk_rx.try_recv().is_err());
    let row = files::fetch(&backend.pool, file.id).await.unwrap().unwrap();
    assert_eq!(row.version, 1);

    // an edit at the current version still goes through
    backend
        .sync
        .on_chunk_message(&sender, chunk_message(file.id, 1, vec![Chunk::add(0, "x")]))
        .await;
    assert_eq!(sender_channels.chunk_rx.recv().await.unwrap().version, 2);
}

#[tokio::test]
async fn journal_versions_are_contiguous() {
    let backend = TestBackend::new().await;
    let file = backend.create_text_file(1, "notes/a.md", "").await;

    let (sender, mut sender_channels) = backend.hub.subscribe(1).await;
    sender.mark_connected();

    for i in 0..5 {
        backend
            .sync
            .on_chunk_message(
                &sender,
                chunk_message(file.id, i, vec![Chunk::add(i, "x")]),
            )
            .await;
        sender_channels.chunk_rx.recv().await.unwrap();
    }

    let rows = operations::fetch_from_version(&backend.pool, file.id, 0, 1)
        .await
        .unwrap();
    let versions: Vec<i64> = rows.iter().map(|row| row.version).collect();
    assert_eq!(versions, vec![1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn event_and_cursor_messages_relay_without_journaling() {
    let backend = TestBackend::new().await;

    let (sender, mut sender_channels) = backend.hub.subscribe(1).await;
    let (peer, mut peer_channels) = backend.hub.subscribe(1).await;
    sender.mark_connected();
    peer.mark_connected();

    let event = EventMessage {
        header: MessageHeader {
            file_id: 7,
            kind: MessageType::Create,
        },
        workspace_path: "notes/new.md".to_string(),
        object_type: "file".to_string(),
    };
    backend.sync.on_event_message(&sender, event.clone()).await;

    let cursor = CursorMessage {
        header: MessageHeader {
            file_id: 7,
            kind: MessageType::Cursor,
        },
        path: "notes/new.md".to_string(),
        label: "alice".to_string(),
        color: "#ff0000".to_string(),
        line: 3,
        ch: 14,
        id: "client-1".to_string(),
    };
    backend.sync.on_cursor_message(&sender, cursor.clone()).await;

    assert_eq!(peer_channels.event_rx.recv().await.unwrap(), event);
    assert_eq!(peer_channels.cursor_rx.recv().await.unwrap(), cursor);

    // the author does not get its own lifecycle or cursor traffic back
    assert!(sender_channels.event_rx.try_recv().is_err());
    assert!(sender_channels.cursor_rx.try_recv().is_err());
}

#[tokio::test]
async fn slow_consumer_is_closed_while_peers_continue() {
    let backend = TestBackend::new().await;
    let file = backend.create_text_file(1, "notes/a.md", "").await;

    let (active, mut active_channels) = backend.hub.subscribe(1).await;
    let (slow, _slow_channels) = backend.hub.subscribe(1).await;
    active.mark_connected();
    slow.mark_connected();

    // the slow subscriber never reads; its queue holds 8 messages
    for i in 0..9 {
        backend
            .sync
            .on_chunk_message(
                &active,
                chunk_message(file.id, i, vec![Chunk::add(i, "x")]),
            )
            .await;
        assert_eq!(active_channels.chunk_rx.recv().await.unwrap().version, i + 1);
    }

    assert!(!slow.is_connected());
    assert!(active.is_connected());
}

#[tokio::test]
async fn replaying_broadcasts_reproduces_server_content() {
    let backend = TestBackend::new().await;
    let base = "The quick brown fox";
    let file = backend.create_text_file(1, "notes/fox.md", base).await;

    let (client_a, mut channels_a) = backend.hub.subscribe(1).await;
    let (client_b, mut channels_b) = backend.hub.subscribe(1).await;
    let (observer, mut observer_channels) = backend.hub.subscribe(1).await;
    client_a.mark_connected();
    client_b.mark_connected();
    observer.mark_connected();

    // interleaved concurrent edits, several authored on stale versions
    let edits = [
        (&client_a, 0, Chunk::add(0, "> ")),
        (&client_b, 0, Chunk::remove(4, "quick ")),
        (&client_a, 1, Chunk::add(19, "!")),
        (&client_b, 2, Chunk::remove(0, "> ")),
    ];
    for (client, version, chunk) in edits {
        backend
            .sync
            .on_chunk_message(client, chunk_message(file.id, version, vec![chunk]))
            .await;
        // drain the author queues so nobody trips the slow-consumer policy
        channels_a.chunk_rx.recv().await.unwrap();
        channels_b.chunk_rx.recv().await.unwrap();
    }

    // replaying the observer's stream from the base reproduces the
    // server's authoritative content
    let mut replayed = base.to_string();
    for _ in 0..4 {
        let msg = observer_channels.chunk_rx.recv().await.unwrap();
        replayed = syncspace::shared::diff::apply_multiple(&replayed, &msg.chunks);
    }

    backend.cache.flush(file.id).await.unwrap();
    assert_eq!(backend.stored_content(&file).await, replayed);
}

#[tokio::test]
async fn flush_trigger_persists_blob_and_snapshot() {
    let backend = TestBackend::new().await;
    let file = backend.create_text_file(1, "notes/a.md", "").await;

    let (sender, mut sender_channels) = backend.hub.subscribe(1).await;
    sender.mark_connected();

    for i in 0..3 {
        backend
            .sync
            .on_chunk_message(
                &sender,
                chunk_message(file.id, i, vec![Chunk::add(i, "x")]),
            )
            .await;
        sender_channels.chunk_rx.recv().await.unwrap();
    }

    // three pending changes cross min_changes_threshold = 2
    let flushed = backend.cache.flush_dirty(2, Duration::from_millis(100)).await;
    assert_eq!(flushed, 1);

    assert_eq!(backend.stored_content(&file).await, "xxx");

    let snapshots = syncspace::backend::db::snapshots::list(&backend.pool, file.id, 1)
        .await
        .unwrap();
    assert_eq!(snapshots.len(), 1);
    assert_eq!(snapshots[0].version, 3);
    assert_eq!(snapshots[0].kind, "file");

    let row = files::fetch(&backend.pool, file.id).await.unwrap().unwrap();
    assert_eq!(row.hash, snapshots[0].hash);

    // pending changes reset: a second pass has nothing to do
    assert_eq!(backend.cache.flush_dirty(2, Duration::from_millis(100)).await, 0);
}

#[tokio::test]
async fn below_threshold_waits_for_idle_interval() {
    let backend = TestBackend::new().await;
    let file = backend.create_text_file(1, "notes/a.md", "").await;

    let (sender, mut sender_channels) = backend.hub.subscribe(1).await;
    sender.mark_connected();

    backend
        .sync
        .on_chunk_message(&sender, chunk_message(file.id, 0, vec![Chunk::add(0, "x")]))
        .await;
    sender_channels.chunk_rx.recv().await.unwrap();

    // one pending change, freshly updated: neither trigger fires
    assert_eq!(backend.cache.flush_dirty(2, Duration::from_secs(3600)).await, 0);

    // a zero idle threshold forces the age-based trigger
    assert_eq!(backend.cache.flush_dirty(2, Duration::ZERO).await, 1);
}

#[tokio::test]
async fn flusher_loop_runs_final_pass_on_shutdown() {
    let backend = TestBackend::new().await;
    let file = backend.create_text_file(1, "notes/a.md", "").await;

    let (sender, mut sender_channels) = backend.hub.subscribe(1).await;
    sender.mark_connected();

    backend
        .sync
        .on_chunk_message(&sender, chunk_message(file.id, 0, vec![Chunk::add(0, "x")]))
        .await;
    sender_channels.chunk_rx.recv().await.unwrap();

    let shutdown = CancellationToken::new();
    let task = tokio::spawn(flusher::run_flush_loop(
        backend.cache.clone(),
        // a long interval: only the shutdown pass can flush this
        Duration::from_secs(3600),
        2,
        shutdown.clone(),
    ));

    shutdown.cancel();
    task.await.unwrap();

    assert_eq!(backend.stored_content(&file).await, "x");
}

#[tokio::test]
async fn idle_entries_are_flushed_and_evicted() {
    let backend = TestBackend::new().await;
    let file = backend.create_text_file(1, "notes/a.md", "seed").await;

    let (sender, mut sender_channels) = backend.hub.subscribe(1).await;
    sender.mark_connected();

    backend
        .sync
        .on_chunk_message(&sender, chunk_message(file.id, 0, vec![Chunk::add(4, "!")]))
        .await;
    sender_channels.chunk_rx.recv().await.unwrap();

    // zero max age makes every entry idle
    assert_eq!(backend.cache.evict_idle(Duration::ZERO).await, 1);
    assert_eq!(backend.stored_content(&file).await, "seed!");

    // the file reloads transparently on the next edit
    backend
        .sync
        .on_chunk_message(&sender, chunk_message(file.id, 1, vec![Chunk::add(5, "?")]))
        .await;
    assert_eq!(sender_channels.chunk_rx.recv().await.unwrap().version, 2);

    backend.cache.flush(file.id).await.unwrap();
    assert_eq!(backend.stored_content(&file).await, "seed!?");
}
