/**
 * Error Conversion Implementations
 *
 * Converts `ServerError` into an Axum HTTP response. Client-caused errors
 * carry their message in the body; internal errors are logged and reported
 * as a bare status line so storage and database details never leak.
 */

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use super::types::ServerError;

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = match &self {
            ServerError::Validation(message) => message.clone(),
            ServerError::NotFound(what) => format!("not existing {what}"),
            ServerError::Conflict(message) => message.clone(),
            ServerError::Unauthorized => "Unauthorized".to_string(),
            ServerError::Database(_)
            | ServerError::Migration(_)
            | ServerError::Storage(_)
            | ServerError::Serialization(_)
            | ServerError::Token(_) => {
                tracing::error!("internal error: {self}");
                StatusCode::INTERNAL_SERVER_ERROR
                    .canonical_reason()
                    .unwrap_or("internal server error")
                    .to_string()
            }
        };

        (status, body).into_response()
    }
}
