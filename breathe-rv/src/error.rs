//! HTTP error mapping for breathe-rv
//!
//! The domain taxonomy lives in breathe-common; this layer assigns status
//! codes and keeps storage detail (paths, identities) out of 5xx bodies.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Path-traversal attempt on content resolution (400)
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Conflict (409) - cross-owner duplicate image
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Scorer collaborator failed or timed out (502)
    #[error("Scorer unavailable: {0}")]
    ScorerUnavailable(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<breathe_common::Error> for ApiError {
    fn from(err: breathe_common::Error) -> Self {
        use breathe_common::Error;

        match err {
            Error::Validation(msg) => ApiError::BadRequest(msg),
            Error::InvalidPath(_) => ApiError::InvalidPath("Invalid filename".to_string()),
            Error::UserNotFound(msg) => ApiError::NotFound(msg),
            Error::NotFound(msg) => ApiError::NotFound(msg),
            Error::DuplicateConflict(msg) => ApiError::Conflict(msg),
            Error::ScorerUnavailable(msg) => ApiError::ScorerUnavailable(msg),
            // Detail was logged at the failure site; the response stays generic
            Error::Persistence(_) | Error::Database(_) => {
                ApiError::Internal("Storage failure".to_string())
            }
            Error::Io(e) => {
                tracing::error!(error = %e, "IO failure");
                ApiError::Internal("IO failure".to_string())
            }
            Error::Config(msg) => ApiError::Internal(msg),
            Error::Internal(e) => {
                tracing::error!(error = %e, "Internal failure");
                ApiError::Internal("Internal error".to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg),
            ApiError::InvalidPath(msg) => (StatusCode::BAD_REQUEST, "INVALID_PATH", msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "DUPLICATE_CONFLICT", msg),
            ApiError::ScorerUnavailable(msg) => {
                (StatusCode::BAD_GATEWAY, "SCORER_UNAVAILABLE", msg)
            }
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
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
    use breathe_common::Error;

    #[test]
    fn taxonomy_maps_to_expected_status_codes() {
        let cases: Vec<(Error, StatusCode)> = vec![
            (Error::Validation("x".into()), StatusCode::BAD_REQUEST),
            (Error::InvalidPath("x".into()), StatusCode::BAD_REQUEST),
            (Error::UserNotFound("x".into()), StatusCode::NOT_FOUND),
            (Error::DuplicateConflict("x".into()), StatusCode::CONFLICT),
            (Error::ScorerUnavailable("x".into()), StatusCode::BAD_GATEWAY),
            (
                Error::Persistence("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            let response = ApiError::from(err).into_response();
            assert_eq!(response.status(), expected);
        }
    }

    #[test]
    fn persistence_detail_is_not_echoed() {
        let err = Error::Persistence("/var/lib/breathe/uploads/secret.jpg".into());
        let api_err = ApiError::from(err);
        assert!(!api_err.to_string().contains("secret.jpg"));
    }
}
