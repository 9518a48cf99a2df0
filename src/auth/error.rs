// Authentication error types

use crate::auth::password::PasswordError;
use crate::error::ApiError;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Message shared by every access-guard rejection
pub const UNAUTHENTICATED_MESSAGE: &str = "A valid token is missing.";

/// Authentication and session error types
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Request validation failed")]
    Validation(#[from] validator::ValidationErrors),

    #[error("A username or an email is required")]
    MissingIdentifier,

    #[error("Wrong user and/or password.")]
    InvalidCredentials,

    #[error("Refresh token cookie is missing")]
    MissingRefreshToken,

    /// A refresh token that is no longer in any session list was presented
    #[error("Refresh token reuse detected")]
    ReuseDetected,

    #[error("Refresh token has expired")]
    RefreshTokenExpired,

    #[error("Refresh token is invalid")]
    InvalidRefreshToken,

    #[error("Invalid user.")]
    InvalidUser,

    #[error("A valid token is missing.")]
    Unauthenticated,

    #[error("Username '{0}' is already taken")]
    UsernameTaken(String),

    #[error("Email '{0}' is already registered")]
    EmailTaken(String),

    #[error("There was an error while saving the new user")]
    RegistrationFailed(String),

    #[error("Server could not save the session. Please try logging in again.")]
    SessionNotSaved,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Password hashing error: {0}")]
    PasswordHash(#[from] PasswordError),

    #[error("Token generation error: {0}")]
    TokenGeneration(String),
}

impl AuthError {
    /// Whether the response must also clear the refresh-token cookie
    pub fn clears_refresh_cookie(&self) -> bool {
        matches!(
            self,
            AuthError::ReuseDetected
                | AuthError::RefreshTokenExpired
                | AuthError::InvalidRefreshToken
        )
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Validation(errors) => ApiError::ValidationError(errors),
            AuthError::MissingIdentifier => ApiError::BadRequest(err.to_string()),
            AuthError::RegistrationFailed(detail) => {
                tracing::error!("User insert was not acknowledged: {}", detail);
                ApiError::BadRequest(AuthError::RegistrationFailed(detail).to_string())
            }
            AuthError::InvalidCredentials
            | AuthError::MissingRefreshToken
            | AuthError::Unauthenticated => ApiError::Unauthorized(err.to_string()),
            AuthError::ReuseDetected
            | AuthError::RefreshTokenExpired
            | AuthError::InvalidRefreshToken
            | AuthError::InvalidUser => ApiError::Forbidden(err.to_string()),
            AuthError::UsernameTaken(_) | AuthError::EmailTaken(_) => ApiError::Conflict {
                message: err.to_string(),
            },
            AuthError::SessionNotSaved => ApiError::InternalError {
                public: err.to_string(),
                detail: "session list update changed no rows".to_string(),
            },
            AuthError::Database(e) => ApiError::DatabaseError(e),
            AuthError::PasswordHash(_) | AuthError::TokenGeneration(_) => {
                ApiError::internal(err.to_string())
            }
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
    use axum::http::StatusCode;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (AuthError::MissingIdentifier, StatusCode::BAD_REQUEST),
            (AuthError::RegistrationFailed("x".into()), StatusCode::BAD_REQUEST),
            (AuthError::InvalidCredentials, StatusCode::UNAUTHORIZED),
            (AuthError::MissingRefreshToken, StatusCode::UNAUTHORIZED),
            (AuthError::Unauthenticated, StatusCode::UNAUTHORIZED),
            (AuthError::ReuseDetected, StatusCode::FORBIDDEN),
            (AuthError::RefreshTokenExpired, StatusCode::FORBIDDEN),
            (AuthError::InvalidRefreshToken, StatusCode::FORBIDDEN),
            (AuthError::InvalidUser, StatusCode::FORBIDDEN),
            (AuthError::UsernameTaken("bob".into()), StatusCode::CONFLICT),
            (AuthError::EmailTaken("b@x.com".into()), StatusCode::CONFLICT),
            (AuthError::SessionNotSaved, StatusCode::INTERNAL_SERVER_ERROR),
            (AuthError::TokenGeneration("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, expected) in cases {
            let label = format!("{:?}", err);
            assert_eq!(ApiError::from(err).status_code(), expected, "{}", label);
        }
    }

    #[test]
    fn test_only_refresh_failures_clear_cookie() {
        assert!(AuthError::ReuseDetected.clears_refresh_cookie());
        assert!(AuthError::RefreshTokenExpired.clears_refresh_cookie());
        assert!(AuthError::InvalidRefreshToken.clears_refresh_cookie());
        assert!(!AuthError::InvalidUser.clears_refresh_cookie());
        assert!(!AuthError::MissingRefreshToken.clears_refresh_cookie());
        assert!(!AuthError::InvalidCredentials.clears_refresh_cookie());
    }

    #[test]
    fn test_guard_message() {
        assert_eq!(AuthError::Unauthenticated.to_string(), UNAUTHENTICATED_MESSAGE);
    }
}
