//! Blob Storage Module
//!
//! Abstract port to the object store holding file contents and snapshot
//! blobs. The layout is opaque to callers: `create_object` picks the path,
//! everything else addresses blobs by the path it returned.

use async_trait::async_trait;
use sha2::{Digest, Sha256};

/// Disk-backed implementation
pub mod disk;

/// In-memory implementation for tests
pub mod memory;

pub use disk::DiskStorage;
pub use memory::MemoryStorage;

/// Object store port.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Store a new object and return its path.
    async fn create_object(&self, content: &[u8]) -> std::io::Result<String>;

    /// Overwrite an existing object. Fails if the object does not exist.
    async fn write_object(&self, path: &str, content: &[u8]) -> std::io::Result<()>;

    /// Read an object's full content.
    async fn read_object(&self, path: &str) -> std::io::Result<Vec<u8>>;

    /// Delete an object. Deleting a missing object is not an error.
    async fn delete_object(&self, path: &str) -> std::io::Result<()>;
}

/// Hex-encoded SHA-256 of `content`; the canonical content hash recorded
/// on file and snapshot rows.
pub fn generate_hash(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content))
}
