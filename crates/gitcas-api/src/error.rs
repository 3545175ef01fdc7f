//! # API Error Types
//!
//! [`AppError`] turns store failures into HTTP responses of the form
//! `{"error": {"code": "…", "message": "…"}}`. Internal details stay in
//! the logs.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use gitcas_store::{SourceError, StoreError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Body of every non-2xx JSON response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Stable code clients can branch on.
    pub code: String,
    pub message: String,
}

/// Handler error. Each variant fixes the status code.
#[derive(Error, Debug)]
pub enum AppError {
    /// 404.
    #[error("{0}")]
    NotFound(String),

    /// Unusable input: bad JSON, bad hash, unsupported source, unnameable content (422).
    #[error("invalid request: {0}")]
    Validation(String),

    /// The source URL could not be downloaded (502).
    #[error("upstream fetch failed: {0}")]
    Upstream(String),

    /// The store cannot take the request right now; retrying may succeed (503).
    #[error("temporarily unavailable: {0}")]
    ServiceUnavailable(String),

    /// Anything else (500). Logged in full, answered generically.
    #[error("internal: {0}")]
    Internal(String),
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::Upstream(_) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR"),
            Self::ServiceUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            Self::Internal(_) => "internal error; see server logs".to_string(),
            other => other.to_string(),
        };

        match &self {
            Self::Internal(_) => tracing::error!(error = %self, "request failed"),
            Self::Upstream(_) => tracing::warn!(error = %self, "source download failed"),
            Self::ServiceUnavailable(_) => tracing::warn!(error = %self, "upload not settled"),
            _ => {}
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };
        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Validation(msg) => Self::Validation(msg),
            StoreError::Source(
                e @ (SourceError::Unsupported(_) | SourceError::InvalidInline(_)),
            ) => Self::Validation(e.to_string()),
            StoreError::Source(
                e @ (SourceError::Http { .. } | SourceError::Status { .. }),
            ) => Self::Upstream(e.to_string()),
            StoreError::Batch(f) => Self::ServiceUnavailable(f.to_string()),
            StoreError::Inactive => Self::ServiceUnavailable("asset store is not active".into()),
            other => Self::Internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gitcas_store::{BatchFailure, BatchStage};

    #[test]
    fn store_validation_is_422() {
        let err = AppError::from(StoreError::Validation("no type".into()));
        assert_eq!(err.status_and_code().0, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn unsupported_source_is_422() {
        let err = AppError::from(StoreError::Source(SourceError::Unsupported("ftp".into())));
        assert_eq!(err.status_and_code().1, "VALIDATION_ERROR");
    }

    #[test]
    fn upstream_status_is_502() {
        let err = AppError::from(StoreError::Source(SourceError::Status {
            url: "https://example.com/a".into(),
            status: 404,
        }));
        assert_eq!(err.status_and_code().0, StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn batch_failure_is_503() {
        let err = AppError::from(StoreError::Batch(BatchFailure::new(BatchStage::Push, "x")));
        assert_eq!(err.status_and_code().0, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn lifecycle_misuse_is_internal() {
        let err = AppError::from(StoreError::AlreadyActive);
        assert_eq!(err.status_and_code().1, "INTERNAL_ERROR");
    }

    #[tokio::test]
    async fn internal_message_is_withheld() {
        use http_body_util::BodyExt;
        let resp = AppError::Internal("db password wrong".into()).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let body: ErrorBody = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.error.message, "internal error; see server logs");
    }
}
