//! Routes Module
//!
//! Router assembly for the `/v1` HTTP surface.

/// Router construction
pub mod router;

pub use router::create_router;
