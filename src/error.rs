use crate::schemas::ErrorResponse;
use axum::{
    extract::{multipart::MultipartError, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use axum_valid::{ValidRejection, ValidationRejection};
use compute::ComputeError;
use sea_orm::{DbErr, SqlErr};
use thiserror::Error;
use tracing::error;

/// Errors surfaced to API clients.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("Authentication credentials were not provided or are invalid")]
    Unauthorized,

    #[error("You do not have permission to perform this action")]
    Forbidden,

    #[error("{0}")]
    Validation(String),

    #[error("You have already reviewed this movie!")]
    DuplicateReview,

    #[error("{0}")]
    Integrity(String),

    #[error("{message}")]
    InvalidBody { status: StatusCode, message: String },

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error("Database error: {0}")]
    Database(DbErr),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn not_found(entity: &str, id: i32) -> Self {
        Self::NotFound(format!("{} with ID {}", entity, id))
    }

    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            ApiError::Forbidden => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            ApiError::DuplicateReview => (StatusCode::BAD_REQUEST, "DUPLICATE_REVIEW"),
            ApiError::Integrity(_) => (StatusCode::BAD_REQUEST, "INTEGRITY_ERROR"),
            ApiError::InvalidBody { status, .. } => (*status, "INVALID_BODY"),
            ApiError::PayloadTooLarge(_) => (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE"),
            ApiError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl From<DbErr> for ApiError {
    fn from(err: DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(detail)) => {
                ApiError::Integrity(format!("Unique constraint violated: {}", detail))
            }
            Some(SqlErr::ForeignKeyConstraintViolation(detail)) => {
                ApiError::Integrity(format!("Referenced record does not exist: {}", detail))
            }
            _ => ApiError::Database(err),
        }
    }
}

impl From<ComputeError> for ApiError {
    fn from(err: ComputeError) -> Self {
        match err {
            ComputeError::Database(db_err) => db_err.into(),
            ComputeError::NotFound { entity, id } => ApiError::not_found(entity, id),
            ComputeError::DuplicateReview { .. } => ApiError::DuplicateReview,
            ComputeError::Validation(message) => ApiError::Validation(message),
        }
    }
}

impl From<ValidRejection<JsonRejection>> for ApiError {
    fn from(rejection: ValidRejection<JsonRejection>) -> Self {
        match rejection {
            ValidationRejection::Valid(errors) => ApiError::Validation(errors.to_string()),
            ValidationRejection::Inner(inner) => ApiError::InvalidBody {
                status: inner.status(),
                message: inner.body_text(),
            },
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        match err.status() {
            StatusCode::PAYLOAD_TOO_LARGE => ApiError::PayloadTooLarge(err.body_text()),
            StatusCode::BAD_REQUEST => ApiError::Validation(err.body_text()),
            _ => ApiError::Internal(format!("Failed to read multipart body: {}", err.body_text())),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        // Server-side failures carry details that clients should not see.
        let message = if status.is_server_error() {
            error!("Request failed: {}", self);
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorResponse {
            error: message,
            code: code.to_string(),
            success: false,
        };
        (status, Json(body)).into_response()
    }
}
