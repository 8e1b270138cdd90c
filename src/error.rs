//! Error types for the batch retouch service

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, Error>;

/// All errors the service can produce
///
/// Transform failures are normally absorbed into per-job state by the
/// scheduler; the variants here surface when an HTTP action itself fails
/// (validation, export, lookup).
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration problem (bad address, missing API key, unparseable file)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Remote transform call failed or returned no usable image
    #[error("Transform failed: {0}")]
    Transform(String),

    /// Image decode/re-encode failed during export
    #[error("Image conversion failed: {0}")]
    Codec(String),

    /// Zip archive assembly failed
    #[error("Archive error: {0}")]
    Archive(String),

    /// No job with the requested id in the active batch
    #[error("Job not found: {0}")]
    JobNotFound(String),

    /// Request rejected before any state was touched
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Anything else
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::JobNotFound(_) => StatusCode::NOT_FOUND,
            Error::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Error::Codec(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Error::Transform(_) => StatusCode::BAD_GATEWAY,
            Error::Config(_) | Error::Archive(_) | Error::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(serde_json::json!({
            "error": self.to_string(),
        }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            Error::JobNotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            Error::InvalidRequest("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            Error::Codec("x".into()).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            Error::Internal("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_display_includes_message() {
        let err = Error::Transform("model overloaded".into());
        assert!(err.to_string().contains("model overloaded"));
    }
}
