//! Error handling for filedrop-server

use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::formats;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Validation error (bad id, missing file field, ...)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Uploaded file exceeds the size ceiling
    #[error("file {filename:?} exceeds maximum size of {}", size_text(.limit))]
    PayloadTooLarge { filename: String, limit: u64 },

    /// Malformed multipart body
    #[error("Multipart error: {0}")]
    Multipart(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

fn size_text(bytes: &u64) -> String {
    formats::format_size(*bytes)
}

impl Error {
    /// Map an axum multipart failure while reading `filename`
    pub fn from_multipart(err: MultipartError, filename: &str, limit: u64) -> Self {
        match err.status() {
            StatusCode::PAYLOAD_TOO_LARGE => Error::PayloadTooLarge {
                filename: filename.to_string(),
                limit,
            },
            status if status.is_client_error() => Error::Multipart(err.body_text()),
            _ => Error::Internal(format!("read uploaded file: {}", err.body_text())),
        }
    }

    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Error::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Error::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            Error::PayloadTooLarge { .. } => (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE"),
            Error::Multipart(_) => (StatusCode::BAD_REQUEST, "MULTIPART_ERROR"),
            Error::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_code) = self.status_and_code();
        let message = match &self {
            Error::NotFound(msg)
            | Error::Validation(msg)
            | Error::Multipart(msg)
            | Error::Internal(msg) => msg.clone(),
            other => other.to_string(),
        };

        if status.is_server_error() {
            tracing::error!(status = %status, error_code = %error_code, message = %message, "Request error");
        } else if status == StatusCode::NOT_FOUND {
            tracing::debug!(message = %message, "Lookup miss");
        } else {
            tracing::warn!(status = %status, error_code = %error_code, message = %message, "Rejected request");
        }

        let body = Json(json!({
            "error": message,
            "error_code": error_code,
        }));

        (status, body).into_response()
    }
}
