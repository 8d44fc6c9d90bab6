use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

/// Application-wide error type. Variants split into caller errors (4xx) and
/// dependency failures (5xx); the HTTP mapping lives in [`IntoResponse`].
#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid profile: {0}")]
    InvalidProfile(String),

    #[error("unknown time zone: {0}")]
    InvalidTimezone(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("username already taken")]
    UsernameTaken,

    #[error("no profile stored for this user")]
    ProfileNotFound,

    #[error("record not found")]
    RecordNotFound,

    #[error("no pending entry to confirm")]
    NoPendingEntry,

    #[error("storage error: {0}")]
    Storage(#[source] anyhow::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidProfile(_) | AppError::InvalidTimezone(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidInput(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::InvalidCredentials | AppError::Unauthenticated(_) => {
                StatusCode::UNAUTHORIZED
            }
            AppError::UsernameTaken => StatusCode::CONFLICT,
            AppError::ProfileNotFound | AppError::RecordNotFound | AppError::NoPendingEntry => {
                StatusCode::NOT_FOUND
            }
            AppError::Storage(_) | AppError::Database(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn code(&self) -> &'static str {
        match self {
            AppError::InvalidProfile(_) => "invalid_profile",
            AppError::InvalidTimezone(_) => "invalid_timezone",
            AppError::InvalidInput(_) => "invalid_input",
            AppError::InvalidCredentials => "invalid_credentials",
            AppError::Unauthenticated(_) => "unauthenticated",
            AppError::UsernameTaken => "username_taken",
            AppError::ProfileNotFound => "profile_not_found",
            AppError::RecordNotFound => "record_not_found",
            AppError::NoPendingEntry => "no_pending_entry",
            AppError::Storage(_) => "storage_error",
            AppError::Database(_) => "database_error",
            AppError::Internal(_) => "internal_error",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, code = self.code(), "request failed");
        }
        let body = ErrorBody {
            code: self.code(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caller_errors_map_to_4xx() {
        assert_eq!(
            AppError::InvalidProfile("bad gender".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::InvalidTimezone("Mars/Olympus".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::NoPendingEntry.status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::UsernameTaken.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn dependency_failures_map_to_5xx() {
        assert_eq!(
            AppError::Database(sqlx::Error::PoolClosed).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::Storage(anyhow::anyhow!("bucket gone")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn codes_are_stable() {
        assert_eq!(AppError::NoPendingEntry.code(), "no_pending_entry");
        assert_eq!(AppError::ProfileNotFound.code(), "profile_not_found");
    }
}
