// src/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

use crate::{
    codec::CodecError,
    engine::{round::RoundError, session::TransitionError},
    store::StoreError,
};

/// Global Application Error Enum.
/// Centralizes error handling and mapping to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    // 500 Internal Server Error
    InternalServerError(String),

    // 400 Bad Request
    BadRequest(String),

    // 401 Unauthorized
    AuthError(String),

    // 403 Forbidden (quiz owned by another teacher)
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict (duplicate answer, illegal session transition)
    Conflict(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for AppError {}

/// Converts the error into a JSON response with appropriate HTTP status code.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::AuthError(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
        };
        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::from(StoreError::from(err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl From<CodecError> for AppError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::Serialize(msg) => AppError::InternalServerError(msg),
            other => AppError::BadRequest(other.to_string()),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(what) => AppError::Conflict(format!("Duplicate {}", what)),
            StoreError::Missing(what) => AppError::NotFound(format!("Missing {}", what)),
            StoreError::Stale(_) => {
                AppError::Conflict("Phiên chơi vừa thay đổi. Vui lòng tải lại.".to_string())
            }
            StoreError::Backend(msg) => AppError::InternalServerError(msg),
        }
    }
}

impl From<TransitionError> for AppError {
    fn from(err: TransitionError) -> Self {
        match err {
            TransitionError::InvalidState { .. } => AppError::Conflict(err.to_string()),
            TransitionError::NoParticipants | TransitionError::NoQuestions => {
                AppError::BadRequest(err.to_string())
            }
        }
    }
}

impl From<RoundError> for AppError {
    fn from(err: RoundError) -> Self {
        match err {
            RoundError::EmptyAnswer => AppError::BadRequest(err.to_string()),
            RoundError::AlreadyAnswered | RoundError::TimedOut => AppError::Conflict(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(err: impl Into<AppError>) -> StatusCode {
        err.into().into_response().status()
    }

    #[test]
    fn domain_errors_map_to_http_classes() {
        assert_eq!(status(CodecError::CsvTooShort), StatusCode::BAD_REQUEST);
        assert_eq!(status(StoreError::Duplicate("x".into())), StatusCode::CONFLICT);
        assert_eq!(status(StoreError::Stale("game_sessions".into())), StatusCode::CONFLICT);
        assert_eq!(status(StoreError::Backend("down".into())), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(status(TransitionError::NoParticipants), StatusCode::BAD_REQUEST);
        assert_eq!(status(RoundError::AlreadyAnswered), StatusCode::CONFLICT);
        assert_eq!(status(RoundError::EmptyAnswer), StatusCode::BAD_REQUEST);
    }
}
