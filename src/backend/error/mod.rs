//! Backend Error Module
//!
//! This module defines error types specific to the sync server.
//! These errors are used in HTTP handlers and can be converted to HTTP
//! responses.
//!
//! # Module Structure
//!
//! - **`types`** - Error type definitions and status mapping
//! - **`conversion`** - Error conversion implementations (IntoResponse)
//!
//! Handlers return `Result<_, ServerError>` and use `?` throughout; the
//! `IntoResponse` impl turns the error into the right status code. Internal
//! failures (database, storage) map to 500 without leaking details to the
//! client; a cross-tenant file access maps to 404, never 403.

/// Error type definitions
pub mod types;

/// Error conversion implementations
pub mod conversion;

// Re-export commonly used types
pub use types::ServerError;
