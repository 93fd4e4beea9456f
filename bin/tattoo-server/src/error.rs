//! Unified server error type.
//!
//! The tattoo route renders errors itself (HTML page or JSON, depending on
//! `Accept`) using [`ServerError::status`] and [`ServerError::client_message`].
//! Other handlers return `Result<T, ServerError>` and get the JSON body from
//! the [`IntoResponse`] impl.
//!
//! Internal errors (I/O, templates, task panics) are logged with full detail
//! but only a generic message reaches the caller.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tattoo_core::CoreError;
use thiserror::Error;
use tracing::{error, warn};

/// All errors that can occur while handling a request.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The caller sent an invalid or malformed request.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Propagated from tattoo-core (model call, image decoding, storage).
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The request body exceeded the configured upload limit.
    #[error("payload too large: {0}")]
    PayloadTooLarge(String),

    /// The page template failed to render.
    #[error("template error: {0}")]
    Template(#[from] minijinja::Error),

    /// An unclassified internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ServerError::Core(CoreError::RateLimited { .. }) => StatusCode::TOO_MANY_REQUESTS,
            ServerError::Core(e) if e.is_client_input() => StatusCode::BAD_REQUEST,
            ServerError::Core(e) if e.is_upstream() => StatusCode::BAD_GATEWAY,
            ServerError::Core(_) | ServerError::Template(_) | ServerError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message safe to show the caller. Logs the error as a side effect.
    pub fn client_message(&self) -> String {
        let status = self.status();
        if status.is_server_error() && status != StatusCode::BAD_GATEWAY {
            error!(error = %self, "internal server error");
            "internal server error".to_owned()
        } else {
            warn!(error = %self, status = status.as_u16(), "request failed");
            self.to_string()
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.client_message();
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<tokio::task::JoinError> for ServerError {
    fn from(e: tokio::task::JoinError) -> Self {
        ServerError::Internal(format!("blocking task failed: {e}"))
    }
}

impl From<axum::extract::multipart::MultipartError> for ServerError {
    fn from(e: axum::extract::multipart::MultipartError) -> Self {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ServerError::PayloadTooLarge(e.body_text())
        } else {
            ServerError::BadRequest(format!("failed to read multipart form: {}", e.body_text()))
        }
    }
}
