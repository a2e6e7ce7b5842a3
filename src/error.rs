use axum::{
    extract::rejection::{PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::accounts::StoreError;

/// Coarse classification of every failure the API can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Auth,
    Authorization,
    Conflict,
    NotFound,
    Internal,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Please provide all required fields")]
    MissingField,
    #[error("Passwords do not match")]
    PasswordMismatch,
    #[error("Password must be at least 6 characters long")]
    WeakPassword,
    #[error("{0}")]
    Validation(String),
    #[error("User with this email already exists")]
    DuplicateEmail,
    #[error("Please provide email and password")]
    MissingCredentials,
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Your account has been deactivated. Please contact administrator.")]
    AccountDeactivated,
    #[error("{0}")]
    Unauthenticated(&'static str),
    #[error("Token expired. Please login again.")]
    TokenExpired,
    #[error("Access denied. Admin only.")]
    Forbidden,
    #[error("User not found")]
    NotFound,
    #[error("User is already active")]
    AlreadyActive,
    #[error("User is already inactive")]
    AlreadyInactive,
    #[error("You cannot deactivate your own account")]
    SelfDeactivationForbidden,
    #[error("Current password required to set new password")]
    CurrentPasswordRequired,
    #[error("Current password is incorrect")]
    InvalidCurrentPassword,
    // The cause is logged, never rendered.
    #[error("Server error. Please try again later")]
    Internal(anyhow::Error),
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::MissingField
            | ApiError::PasswordMismatch
            | ApiError::WeakPassword
            | ApiError::Validation(_)
            | ApiError::MissingCredentials
            | ApiError::CurrentPasswordRequired
            | ApiError::InvalidCurrentPassword => ErrorKind::Validation,
            ApiError::InvalidCredentials
            | ApiError::AccountDeactivated
            | ApiError::Unauthenticated(_)
            | ApiError::TokenExpired => ErrorKind::Auth,
            ApiError::Forbidden => ErrorKind::Authorization,
            ApiError::DuplicateEmail
            | ApiError::AlreadyActive
            | ApiError::AlreadyInactive
            | ApiError::SelfDeactivationForbidden => ErrorKind::Conflict,
            ApiError::NotFound => ErrorKind::NotFound,
            ApiError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidCredentials
            | ApiError::Unauthenticated(_)
            | ApiError::TokenExpired => StatusCode::UNAUTHORIZED,
            ApiError::AccountDeactivated | ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        ApiError::Internal(e)
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DuplicateEmail => ApiError::DuplicateEmail,
            StoreError::Backend(e) => ApiError::Internal(e),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        warn!(error = %rejection, "rejected query string");
        ApiError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        warn!(error = %rejection, "rejected path parameters");
        ApiError::Validation(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match &self {
            ApiError::Internal(cause) => error!(error = ?cause, "internal error"),
            other => debug!(kind = ?other.kind(), %status, message = %other, "request refused"),
        }
        (
            status,
            Json(json!({
                "success": false,
                "message": self.to_string(),
            })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_error_hides_cause() {
        let err = ApiError::from(anyhow::anyhow!("connection refused on 10.0.0.3"));
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.to_string().contains("10.0.0.3"));
    }

    #[test]
    fn status_codes_follow_taxonomy() {
        assert_eq!(ApiError::WeakPassword.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::DuplicateEmail.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::InvalidCredentials.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::TokenExpired.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::AccountDeactivated.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::Forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::Forbidden.kind(), ErrorKind::Authorization);
        assert_eq!(ApiError::SelfDeactivationForbidden.kind(), ErrorKind::Conflict);
    }

    #[test]
    fn store_duplicate_maps_to_conflict() {
        let err = ApiError::from(StoreError::DuplicateEmail);
        assert!(matches!(err, ApiError::DuplicateEmail));
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }
}
