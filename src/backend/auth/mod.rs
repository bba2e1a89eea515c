//! Auth Module
//!
//! Workspace authentication: bcrypt-checked login exchanging workspace
//! credentials for a short-lived HMAC-signed token, and the token
//! create/verify primitives used by the HTTP middleware and the streaming
//! upgrade.

/// Token creation and verification
pub mod tokens;

/// Login handler
pub mod handlers;

pub use handlers::{login, LoginResponse, WorkspaceCredentials};
pub use tokens::{create_token, verify_token};
