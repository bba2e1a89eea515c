//! HTTP API Module
//!
//! The `/v1/api` surface around the sync core: file CRUD, journal and
//! snapshot listings, workspace export, and the streaming upgrade.

use axum::body::Body;
use axum::http::{header, StatusCode};
use axum::response::Response;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::Serialize;
use uuid::Uuid;

use crate::backend::error::ServerError;

/// File CRUD endpoints
pub mod files;

/// Operation journal endpoint
pub mod operations;

/// Snapshot endpoints
pub mod snapshots;

/// Workspace ZIP export
pub mod export;

/// Streaming upgrade and socket loops
pub mod ws;

/// Build a `multipart/mixed` response with a JSON metadata part followed
/// by a content part. Non-text content is base64-encoded and flagged with
/// a `Content-Transfer-Encoding` part header, the same shape uploads use.
pub(crate) fn multipart_mixed_response<T: Serialize>(
    metadata: &T,
    mime_type: &str,
    filename: &str,
    content: &[u8],
) -> Result<Response, ServerError> {
    let boundary = Uuid::new_v4().simple().to_string();
    let metadata_json = serde_json::to_string(metadata)?;
    let is_text = mime_type.starts_with("text/");

    let mut body = String::new();
    body.push_str(&format!("--{boundary}\r\n"));
    body.push_str("Content-Type: application/json\r\n");
    body.push_str("Content-Disposition: form-data; name=\"metadata\"\r\n\r\n");
    body.push_str(&metadata_json);
    body.push_str("\r\n");

    body.push_str(&format!("--{boundary}\r\n"));
    body.push_str(&format!("Content-Type: {mime_type}\r\n"));
    body.push_str(&format!(
        "Content-Disposition: form-data; filename=\"{filename}\"\r\n"
    ));
    if !is_text {
        body.push_str("Content-Transfer-Encoding: base64\r\n");
    }
    body.push_str("\r\n");
    if is_text {
        body.push_str(&String::from_utf8_lossy(content));
    } else {
        body.push_str(&BASE64.encode(content));
    }
    body.push_str(&format!("\r\n--{boundary}--\r\n"));

    Response::builder()
        .status(StatusCode::OK)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/mixed; boundary={boundary}"),
        )
        .body(Body::from(body))
        .map_err(|err| ServerError::Storage(std::io::Error::other(err)))
}
