//! Response types for the Payroll Engine API.
//!
//! Every failure leaves the API as an [`ApiError`] body with a status code
//! chosen from the engine error's kind.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::ports::StoreError;

/// API error response structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Optional details about the error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    /// Creates a new API error with details.
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: Some(details.into()),
        }
    }

    /// Creates a validation error response.
    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    /// Creates a malformed JSON error response.
    pub fn malformed_json(message: impl Into<String>) -> Self {
        Self::new("MALFORMED_JSON", message)
    }
}

/// API error with HTTP status code.
pub struct ApiErrorResponse {
    /// The HTTP status code.
    pub status: StatusCode,
    /// The error body.
    pub error: ApiError,
}

impl ApiErrorResponse {
    fn new(status: StatusCode, code: &str, error: &EngineError) -> Self {
        Self {
            status,
            error: ApiError::new(code, error.to_string()),
        }
    }
}

impl IntoResponse for ApiErrorResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.error)).into_response()
    }
}

impl From<EngineError> for ApiErrorResponse {
    fn from(error: EngineError) -> Self {
        use StatusCode as S;

        match &error {
            EngineError::ConfigNotFound { .. } | EngineError::ConfigParseError { .. } => {
                Self::new(S::INTERNAL_SERVER_ERROR, "CONFIG_ERROR", &error)
            }
            EngineError::Validation { .. } | EngineError::InvalidPeriod { .. } => {
                Self::new(S::BAD_REQUEST, "VALIDATION_ERROR", &error)
            }
            EngineError::InvalidTransition { entity, .. } => ApiErrorResponse {
                status: S::CONFLICT,
                error: ApiError::with_details(
                    "INVALID_TRANSITION",
                    error.to_string(),
                    format!("The {} is not in a state that allows this operation", entity),
                ),
            },
            EngineError::RunNotCompleted { .. } => {
                Self::new(S::CONFLICT, "RUN_NOT_COMPLETED", &error)
            }
            EngineError::AttendanceNotLocked { .. } => ApiErrorResponse {
                status: S::CONFLICT,
                error: ApiError::with_details(
                    "ATTENDANCE_NOT_LOCKED",
                    error.to_string(),
                    "Lock the period's attendance before running payroll",
                ),
            },
            EngineError::DuplicateRun { existing_run_id, .. } => ApiErrorResponse {
                status: S::CONFLICT,
                error: ApiError::with_details(
                    "DUPLICATE_RUN",
                    error.to_string(),
                    format!("Revert run {} before running the period again", existing_run_id),
                ),
            },
            EngineError::RecordLocked { .. } => Self::new(S::CONFLICT, "RECORD_LOCKED", &error),
            EngineError::MissingSalaryStructure { .. } | EngineError::Calculation { .. } => {
                Self::new(S::UNPROCESSABLE_ENTITY, "CALCULATION_ERROR", &error)
            }
            EngineError::RetriesExhausted { .. } => {
                Self::new(S::SERVICE_UNAVAILABLE, "STORAGE_UNAVAILABLE", &error)
            }
            EngineError::Storage(store) => match store {
                StoreError::NotFound { .. } => Self::new(S::NOT_FOUND, "NOT_FOUND", &error),
                StoreError::Conflict { .. } => Self::new(S::CONFLICT, "CONFLICT", &error),
                StoreError::Transient { .. } => {
                    Self::new(S::SERVICE_UNAVAILABLE, "STORAGE_UNAVAILABLE", &error)
                }
                StoreError::Backend(_) => {
                    Self::new(S::INTERNAL_SERVER_ERROR, "STORAGE_ERROR", &error)
                }
            },
        }
    }
}
