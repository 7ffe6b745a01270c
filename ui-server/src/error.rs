//! Error types for the UI server.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use invest_common::{DatastackError, VectorError};
use serde_json::json;

/// Errors surfaced by the propagating routes.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Datastack error: {0}")]
    Datastack(#[from] DatastackError),

    #[error("Vector error: {0}")]
    Vector(#[from] VectorError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Shutdown unavailable: {0}")]
    ShutdownUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            Error::ModelNotFound(_) => (StatusCode::NOT_FOUND, "model_not_found"),
            Error::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
            Error::Datastack(_) => (StatusCode::INTERNAL_SERVER_ERROR, "datastack_error"),
            Error::Vector(_) => (StatusCode::INTERNAL_SERVER_ERROR, "vector_error"),
            Error::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "io_error"),
            Error::ShutdownUnavailable(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "shutdown_unavailable")
            }
            Error::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        tracing::error!("{}", self);

        let body = Json(json!({
            "error": {
                "type": error_type,
                "message": self.to_string()
            }
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, Error>;
