//! Error types for flora-id
//!
//! Only two failures ever reach a client: a bad image (400) and exhaustion of
//! every identification source (500). Everything else is absorbed inside the
//! pipeline.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::services::{ImageInputError, PipelineError};

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Undecodable image (400)
    #[error("Invalid Image: {0}")]
    InvalidImage(#[from] ImageInputError),

    /// Local and cloud identification both failed (500)
    #[error(transparent)]
    Identification(#[from] PipelineError),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = match &self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::InvalidImage(_) => (StatusCode::BAD_REQUEST, "INVALID_IMAGE"),
            ApiError::Identification(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "IDENTIFICATION_FAILED")
            }
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let bad = ApiError::InvalidImage(ImageInputError::Empty).into_response();
        assert_eq!(bad.status(), StatusCode::BAD_REQUEST);

        let exhausted = ApiError::from(PipelineError::Exhausted).into_response();
        assert_eq!(exhausted.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bad_body = ApiError::BadRequest("missing field `image`".to_string()).into_response();
        assert_eq!(bad_body.status(), StatusCode::BAD_REQUEST);

        let internal = ApiError::Internal("task cancelled".to_string()).into_response();
        assert_eq!(internal.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_exhaustion_message() {
        assert_eq!(
            ApiError::from(PipelineError::Exhausted).to_string(),
            "Identification failed."
        );
    }
}
