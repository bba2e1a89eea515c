//! Shared Module
//!
//! This module contains the types every sync client consumes: the chunk
//! diff algebra and the JSON frames exchanged on the streaming channel.
//! Everything here is wire-visible; server-only code lives in `backend`.

/// Chunk diff algebra (compute/apply/transform)
pub mod diff;

/// Streaming frame types
pub mod message;

/// Re-export commonly used types for convenience
pub use diff::{Chunk, Operation};
pub use message::{ChunkMessage, CursorMessage, EventMessage, MessageHeader, MessageType};
