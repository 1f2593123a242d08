use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use grader_core::{ExecutionError, GradingError};
use serde::Serialize;
use tracing::error;

/// Error body returned by every endpoint on failure
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// One of `VALIDATION_ERROR`, `NOT_FOUND`, `NO_TEST_CASES`,
    /// `EXECUTION_ERROR`, `INTERNAL_ERROR`
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug)]
pub enum ApiError {
    Validation(String),
    NotFound(String),
    NoTestCases(String),
    Execution(String),
    Internal(String),
}

impl ApiError {
    fn status_and_body(self) -> (StatusCode, ErrorBody) {
        match self {
            ApiError::Validation(message) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    code: "VALIDATION_ERROR",
                    message,
                },
            ),
            ApiError::NotFound(message) => (
                StatusCode::NOT_FOUND,
                ErrorBody {
                    code: "NOT_FOUND",
                    message,
                },
            ),
            // Content is misconfigured; not the caller's fault
            ApiError::NoTestCases(message) => {
                error!("Grading rejected: {}", message);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        code: "NO_TEST_CASES",
                        message,
                    },
                )
            }
            ApiError::Execution(message) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    code: "EXECUTION_ERROR",
                    message,
                },
            ),
            ApiError::Internal(detail) => {
                error!("Internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        code: "INTERNAL_ERROR",
                        message: "Internal server error".to_string(),
                    },
                )
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        (status, Json(body)).into_response()
    }
}

impl From<GradingError> for ApiError {
    fn from(err: GradingError) -> Self {
        match err {
            GradingError::Validation(msg) => ApiError::Validation(msg),
            GradingError::NotFound(_) => ApiError::NotFound(err.to_string()),
            GradingError::NoTestCases(_) => ApiError::NoTestCases(err.to_string()),
            GradingError::Store(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<ExecutionError> for ApiError {
    fn from(err: ExecutionError) -> Self {
        ApiError::Execution(err.to_string())
    }
}
