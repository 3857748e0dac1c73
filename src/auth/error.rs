// Authentication and authorization error types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::fmt;
use tracing::{error, warn};

use crate::auth::models::Role;
use crate::error::ApiError;

/// Authentication and authorization error types
#[derive(Debug)]
pub enum AuthError {
    // Authentication errors
    InvalidCredentials,
    InvalidToken,
    ExpiredToken,
    MissingToken,
    /// Refresh endpoint called without any refresh token
    MissingRefreshToken,
    InvalidResetToken,
    /// Current password did not match on change-password
    IncorrectPassword,
    AccountDisabled,
    /// The user's pastoral is blocked or inactive
    PastoralBlocked(Option<String>),
    /// Lockout by the login attempt monitor
    TooManyAttempts {
        retry_after_secs: u64,
    },
    DatabaseError(sqlx::Error),
    PasswordHashError,
    TokenGenerationError(String),

    // Authorization errors
    /// User lacks required permissions for the operation
    InsufficientPermissions {
        required: Role,
        actual: Role,
    },
    /// CSRF cookie/header pair missing or mismatched
    CsrfMismatch,
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::InvalidCredentials => write!(f, "Invalid email or password"),
            AuthError::InvalidToken => write!(f, "Invalid token"),
            AuthError::ExpiredToken => write!(f, "Token has expired"),
            AuthError::MissingToken => write!(f, "Missing authentication token"),
            AuthError::MissingRefreshToken => write!(f, "Refresh token is required"),
            AuthError::InvalidResetToken => write!(f, "Invalid or expired reset token"),
            AuthError::IncorrectPassword => write!(f, "Current password is incorrect"),
            AuthError::AccountDisabled => write!(f, "Account is disabled"),
            AuthError::PastoralBlocked(reason) => match reason {
                Some(reason) => write!(f, "Pastoral is blocked: {}", reason),
                None => write!(f, "Pastoral is blocked"),
            },
            AuthError::TooManyAttempts { retry_after_secs } => write!(
                f,
                "Too many failed login attempts, try again in {} minutes",
                retry_after_secs.div_ceil(60)
            ),
            AuthError::DatabaseError(e) => write!(f, "Database error: {}", e),
            AuthError::PasswordHashError => write!(f, "Password hashing error"),
            AuthError::TokenGenerationError(msg) => write!(f, "Token generation error: {}", msg),
            AuthError::InsufficientPermissions { required, actual } => write!(
                f,
                "Insufficient permissions: required role '{}', but user has role '{}'",
                required, actual
            ),
            AuthError::CsrfMismatch => write!(f, "Invalid CSRF token"),
        }
    }
}

impl std::error::Error for AuthError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AuthError::DatabaseError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for AuthError {
    fn from(err: sqlx::Error) -> Self {
        AuthError::DatabaseError(err)
    }
}

impl AuthError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AuthError::InvalidToken => StatusCode::UNAUTHORIZED,
            AuthError::ExpiredToken => StatusCode::UNAUTHORIZED,
            AuthError::MissingToken => StatusCode::UNAUTHORIZED,
            AuthError::MissingRefreshToken => StatusCode::BAD_REQUEST,
            AuthError::InvalidResetToken => StatusCode::BAD_REQUEST,
            AuthError::IncorrectPassword => StatusCode::BAD_REQUEST,
            AuthError::AccountDisabled => StatusCode::FORBIDDEN,
            AuthError::PastoralBlocked(_) => StatusCode::FORBIDDEN,
            AuthError::TooManyAttempts { .. } => StatusCode::TOO_MANY_REQUESTS,
            AuthError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AuthError::PasswordHashError => StatusCode::INTERNAL_SERVER_ERROR,
            AuthError::TokenGenerationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AuthError::InsufficientPermissions { .. } => StatusCode::FORBIDDEN,
            AuthError::CsrfMismatch => StatusCode::FORBIDDEN,
        }
    }
}

/// Every auth error is rendered through the central ApiError response shape
impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        let message = err.to_string();
        match err {
            AuthError::InvalidCredentials
            | AuthError::InvalidToken
            | AuthError::ExpiredToken
            | AuthError::MissingToken => ApiError::Unauthorized(message),
            AuthError::MissingRefreshToken
            | AuthError::InvalidResetToken
            | AuthError::IncorrectPassword => {
                ApiError::BadRequest(message)
            }
            AuthError::AccountDisabled | AuthError::PastoralBlocked(_) | AuthError::CsrfMismatch => {
                ApiError::Forbidden(message)
            }
            AuthError::InsufficientPermissions { required, actual } => {
                warn!(
                    "Authorization failed: required role '{}', user has role '{}'",
                    required, actual
                );
                ApiError::Forbidden(format!("Insufficient permissions: required role '{}'", required))
            }
            AuthError::TooManyAttempts { retry_after_secs } => ApiError::TooManyRequests {
                message,
                retry_after_secs: Some(retry_after_secs),
            },
            AuthError::DatabaseError(e) => ApiError::DatabaseError(e),
            AuthError::PasswordHashError => {
                error!("Password hashing error");
                ApiError::InternalError(message)
            }
            AuthError::TokenGenerationError(msg) => ApiError::InternalError(msg),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_match_rendered_response() {
        let cases = vec![
            AuthError::InvalidCredentials,
            AuthError::MissingRefreshToken,
            AuthError::PastoralBlocked(Some("inadimplente".to_string())),
            AuthError::TooManyAttempts { retry_after_secs: 120 },
            AuthError::CsrfMismatch,
            AuthError::InsufficientPermissions {
                required: Role::SuperAdmin,
                actual: Role::PastoralAdmin,
            },
        ];

        for err in cases {
            let expected = err.status_code();
            let response = err.into_response();
            assert_eq!(response.status(), expected);
        }
    }

    #[test]
    fn test_too_many_attempts_message_in_minutes() {
        let err = AuthError::TooManyAttempts { retry_after_secs: 61 };
        assert!(err.to_string().contains("2 minutes"));
    }
}
