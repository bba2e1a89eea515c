//! Syncspace - Main Library
//!
//! Syncspace is a multi-tenant real-time collaborative text-editing
//! backend. Clients connected to the same workspace observe identical file
//! contents: concurrent edits are rebased through operational
//! transformation on the server and converge without lost or inverted
//! work.
//!
//! # Overview
//!
//! This library provides:
//! - The chunk diff algebra (compute/apply/transform over code points)
//! - A per-file single-writer coordinator with a versioned operation
//!   journal and periodic snapshots
//! - A write-behind file cache decoupling memory from blob storage
//! - A WebSocket subscriber hub with bounded per-connection queues
//! - An HTTP API for file CRUD, journal access and workspace export
//!
//! # Module Structure
//!
//! - **`shared`** - wire-visible types any client consumes
//! - **`backend`** - the server: API, auth, cache, coordinator, storage

/// Server-side code
pub mod backend;

/// Types shared with clients
pub mod shared;
