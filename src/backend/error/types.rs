/**
 * Backend Error Types
 *
 * This module defines the server error taxonomy. Each variant maps to an
 * HTTP status code; the streaming side never surfaces these to the peer
 * and instead drops the offending message and logs.
 */

use axum::http::StatusCode;
use thiserror::Error;

/// Server-side error type used by HTTP handlers and the sync core.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Invalid input: bad path, bad id, malformed body, oversized upload.
    #[error("validation error: {0}")]
    Validation(String),

    /// Missing, invalid or expired credentials.
    #[error("unauthorized")]
    Unauthorized,

    /// The resource does not exist in the caller's workspace. Cross-tenant
    /// lookups land here too, so other tenants' ids stay unobservable.
    #[error("not found: {0}")]
    NotFound(String),

    /// Duplicate `(workspace, path)` on create.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Database failure.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Schema migration failure at startup.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Blob storage failure.
    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// JSON encoding/decoding failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Token signing failure.
    #[error("token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
}

impl ServerError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    /// Map the error to the HTTP status code it is reported as.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Database(_)
            | Self::Migration(_)
            | Self::Storage(_)
            | Self::Serialization(_)
            | Self::Token(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
