// Authentication data models and DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// User database model
///
/// `sessions` holds the SHA-256 digests of the refresh tokens currently valid for
/// this user, oldest first.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub sessions: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields needed to insert a user; the password is already hashed
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

/// Registration request DTO
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[validate(
        length(min = 3, max = 20, message = "Username must be between 3 and 20 characters"),
        custom(function = "crate::validation::validate_username", message = "Username may only contain letters, digits, '_', '.' and '-'")
    )]
    #[schema(example = "bob")]
    pub username: String,
    #[validate(email(message = "Email must be a valid address"))]
    #[schema(example = "b@x.com")]
    pub email: String,
    #[validate(length(min = 8, max = 128, message = "Password must be between 8 and 128 characters"))]
    #[schema(example = "secret123")]
    pub password: String,
}

/// Registration response DTO
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RegisterResponse {
    pub message: String,
    pub id: Uuid,
}

/// Login request DTO
///
/// Either `username` or `email` identifies the account; when both are sent the
/// email wins.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[schema(example = "bob")]
    pub username: Option<String>,
    #[schema(example = "b@x.com")]
    pub email: Option<String>,
    #[validate(length(min = 1, message = "Password is required"))]
    #[schema(example = "secret123")]
    pub password: String,
}

impl LoginRequest {
    /// The identifier to look the account up by (email preferred)
    pub fn identifier(&self) -> Option<&str> {
        self.email
            .as_deref()
            .or(self.username.as_deref())
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}

/// Login response DTO; the refresh token travels in the cookie
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub access_token: String,
}

/// Refresh response DTO; the rotated refresh token travels in the cookie
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RefreshResponse {
    pub access_token: String,
    pub username: String,
    pub user_id: Uuid,
}

/// Token pair handed back by the auth flow before it is split into body and cookie
#[derive(Debug, Clone)]
pub struct IssuedTokens {
    pub user_id: Uuid,
    pub username: String,
    pub access_token: String,
    pub refresh_token: String,
}
