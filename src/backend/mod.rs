//! Backend Module
//!
//! All server-side code for the sync service: the HTTP and streaming
//! surfaces, workspace auth, the write-behind file cache, the OT
//! coordinator with its journal, and the storage ports.
//!
//! # Architecture
//!
//! An edit flows: streaming frame -> `api::ws` read loop -> `sync`
//! coordinator (rebase, apply, journal, version bump) -> `sync::hub`
//! broadcast to workspace peers. The `cache` holds the authoritative
//! content between `sync::flusher` passes, which persist blobs and record
//! snapshots.

/// HTTP endpoints and the streaming upgrade
pub mod api;

/// Workspace authentication
pub mod auth;

/// Write-behind file cache
pub mod cache;

/// SQLite persistence
pub mod db;

/// Error taxonomy
pub mod error;

/// HTTP middleware
pub mod middleware;

/// Router assembly
pub mod routes;

/// Configuration, state and app construction
pub mod server;

/// Blob storage ports
pub mod storage;

/// OT coordination: hub, subscribers, flusher
pub mod sync;
