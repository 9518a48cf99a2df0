// JWT token generation and validation service

use crate::config::AuthConfig;
use chrono::Utc;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// JWT claims structure shared by access and refresh tokens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub username: String,
    pub iat: i64, // issued at timestamp
    pub exp: i64, // expiration timestamp
    pub jti: String,
}

/// Token verification and generation errors
///
/// `Expired` is kept apart from the other failures: an expired token was genuine
/// once, a malformed or forged one never was.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("Token has expired")]
    Expired,

    #[error("Token is malformed")]
    Malformed,

    #[error("Token signature is invalid")]
    BadSignature,

    #[error("Token generation error: {0}")]
    Generation(String),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::InvalidSignature => TokenError::BadSignature,
            _ => TokenError::Malformed,
        }
    }
}

/// One signing key with its lifetime
#[derive(Clone)]
struct SigningKey {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: i64, // in seconds
}

impl SigningKey {
    fn new(secret: &str, ttl: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    fn issue(&self, username: &str) -> Result<String, TokenError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            username: username.to_string(),
            iat: now,
            exp: now + self.ttl,
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Generation(e.to_string()))
    }

    fn verify(&self, token: &str, check_expiry: bool) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = check_expiry;

        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(TokenError::from)
    }
}

/// Token service for JWT operations
///
/// Access and refresh tokens are signed with distinct keys, so one can never be
/// accepted in place of the other.
#[derive(Clone)]
pub struct TokenService {
    access: SigningKey,
    refresh: SigningKey,
}

impl TokenService {
    /// Create a TokenService from the auth configuration
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            access: SigningKey::new(&config.access_token_secret, config.access_token_ttl),
            refresh: SigningKey::new(&config.refresh_token_secret, config.refresh_token_ttl),
        }
    }

    /// Refresh token lifetime in seconds
    pub fn refresh_ttl(&self) -> i64 {
        self.refresh.ttl
    }

    /// Generate a short-lived access token
    pub fn issue_access_token(&self, username: &str) -> Result<String, TokenError> {
        self.access.issue(username)
    }

    /// Generate a long-lived refresh token
    pub fn issue_refresh_token(&self, username: &str) -> Result<String, TokenError> {
        self.refresh.issue(username)
    }

    /// Generate both tokens: (access, refresh)
    pub fn issue_pair(&self, username: &str) -> Result<(String, String), TokenError> {
        let access_token = self.issue_access_token(username)?;
        let refresh_token = self.issue_refresh_token(username)?;
        Ok((access_token, refresh_token))
    }

    /// Verify signature and expiry of an access token
    pub fn verify_access(&self, token: &str) -> Result<Claims, TokenError> {
        self.access.verify(token, true)
    }

    /// Verify signature and expiry of a refresh token
    pub fn verify_refresh(&self, token: &str) -> Result<Claims, TokenError> {
        self.refresh.verify(token, true)
    }

    /// Verify the signature of a refresh token but accept it even when expired
    ///
    /// Used to recover the claimed username from a token that is no longer in any
    /// session list.
    pub fn decode_refresh_ignoring_expiry(&self, token: &str) -> Result<Claims, TokenError> {
        self.refresh.verify(token, false)
    }
}
