//! Error handling

use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::logic::alerts::AlertError;
use crate::models::RegionFailure;
use crate::providers::ProviderError;
use crate::repository::RepositoryError;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub enum AppError {
    // Auth errors
    TokenInvalid,
    Unauthorized,

    // Resource errors
    NotFound(String),

    // Validation errors
    ValidationError(String),

    // Database errors
    DatabaseError(String),
    StorageTimeout,

    // External service errors
    ExternalServiceError(String),

    // Generic errors
    InternalError(String),
}

impl AppError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::StorageTimeout)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let retryable = self.is_retryable();
        let (status, error_message) = match &self {
            AppError::TokenInvalid => (StatusCode::UNAUTHORIZED, "Invalid token"),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "Authentication required"),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.as_str()),
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg.as_str()),
            AppError::DatabaseError(msg) => {
                tracing::error!("Database error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error occurred")
            }
            AppError::StorageTimeout => {
                tracing::warn!("Storage timed out");
                (StatusCode::SERVICE_UNAVAILABLE, "Storage temporarily unavailable, retry later")
            }
            AppError::ExternalServiceError(msg) => {
                tracing::error!("External service error: {}", msg);
                (StatusCode::BAD_GATEWAY, "External service error")
            }
            AppError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16(),
            "retryable": retryable
        }));

        (status, body).into_response()
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Validation(e) => AppError::ValidationError(e.to_string()),
            RepositoryError::Storage { message } => AppError::DatabaseError(message),
            RepositoryError::Timeout { .. } => AppError::StorageTimeout,
        }
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(_: jsonwebtoken::errors::Error) -> Self {
        AppError::TokenInvalid
    }
}

impl From<ProviderError> for AppError {
    fn from(err: ProviderError) -> Self {
        AppError::ExternalServiceError(err.to_string())
    }
}

impl From<AlertError> for AppError {
    fn from(err: AlertError) -> Self {
        AppError::ValidationError(err.to_string())
    }
}

/// A region whose storage fetch failed, surfaced when no region succeeded
impl From<RegionFailure> for AppError {
    fn from(failure: RegionFailure) -> Self {
        if failure.retryable {
            AppError::StorageTimeout
        } else {
            AppError::DatabaseError(format!("region '{}': {}", failure.region, failure.error))
        }
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        AppError::ValidationError(format!("Invalid multipart body: {}", err.body_text()))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::ValidationError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (AppError::ValidationError("x".into()), StatusCode::BAD_REQUEST),
            (AppError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (AppError::TokenInvalid, StatusCode::UNAUTHORIZED),
            (AppError::StorageTimeout, StatusCode::SERVICE_UNAVAILABLE),
            (AppError::ExternalServiceError("x".into()), StatusCode::BAD_GATEWAY),
            (AppError::DatabaseError("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[test]
    fn test_repository_timeout_is_retryable() {
        let err = AppError::from(RepositoryError::Timeout { after: Duration::from_secs(5) });
        assert!(err.is_retryable());
        assert!(!AppError::from(RepositoryError::storage("down")).is_retryable());
    }

    #[test]
    fn test_region_failure_mapping() {
        let failure = |retryable| RegionFailure {
            region: "Valley".to_string(),
            error: "connection refused".to_string(),
            retryable,
        };
        assert!(matches!(AppError::from(failure(true)), AppError::StorageTimeout));
        match AppError::from(failure(false)) {
            AppError::DatabaseError(msg) => assert!(msg.contains("Valley")),
            other => panic!("unexpected {:?}", other),
        }
    }
}
