use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::engine::EngineError;

/// Seconds a client should wait before resubmitting to a full queue.
const CAPACITY_RETRY_AFTER_SECS: u64 = 5;

/// Structured error response returned by all endpoints on failure.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Machine-readable error code. One of: `VALIDATION_ERROR`,
    /// `INVALID_SUBMISSION`, `NOT_FOUND`, `CAPACITY_EXCEEDED`, `INTERNAL_ERROR`.
    #[schema(example = "INVALID_SUBMISSION")]
    pub code: &'static str,
    /// Human-readable error description.
    #[schema(example = "Source code must not be empty")]
    pub message: String,
}

/// Application-level error type.
#[derive(Debug)]
pub enum AppError {
    Validation(String),
    InvalidSubmission(String),
    NotFound(String),
    /// Queue full. Contains seconds until a retry is sensible.
    CapacityExceeded {
        retry_after: u64,
    },
    Internal(String),
}

impl AppError {
    fn status_and_body(self) -> (StatusCode, ErrorBody) {
        match self {
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    code: "VALIDATION_ERROR",
                    message: msg,
                },
            ),
            AppError::InvalidSubmission(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    code: "INVALID_SUBMISSION",
                    message: msg,
                },
            ),
            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                ErrorBody {
                    code: "NOT_FOUND",
                    message: msg,
                },
            ),
            AppError::CapacityExceeded { retry_after } => (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorBody {
                    code: "CAPACITY_EXCEEDED",
                    message: format!(
                        "Submission queue is full. Try again in {} seconds",
                        retry_after
                    ),
                },
            ),
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        code: "INTERNAL_ERROR",
                        message: "An unexpected error occurred".into(),
                    },
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let retry_after = if let AppError::CapacityExceeded { retry_after } = &self {
            Some(*retry_after)
        } else {
            None
        };

        let (status, body) = self.status_and_body();

        if let Some(seconds) = retry_after {
            (status, [("Retry-After", seconds.to_string())], Json(body)).into_response()
        } else {
            (status, Json(body)).into_response()
        }
    }
}

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::InvalidSubmission(msg) => AppError::InvalidSubmission(msg),
            EngineError::NotFound(msg) => AppError::NotFound(msg),
            EngineError::CapacityExceeded { capacity } => {
                tracing::warn!(capacity, "Rejecting submission, queue full");
                AppError::CapacityExceeded {
                    retry_after: CAPACITY_RETRY_AFTER_SECS,
                }
            }
            other => AppError::Internal(other.to_string()),
        }
    }
}
