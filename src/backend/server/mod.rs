//! Server Module
//!
//! Configuration loading, shared application state and app construction.

/// Environment configuration
pub mod config;

/// App construction and background tasks
pub mod init;

/// Shared application state
pub mod state;

pub use config::{Config, ConfigError};
pub use init::create_app;
pub use state::{AppState, ServerOptions};
