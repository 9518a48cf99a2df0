// Session manager: tracks which refresh tokens are currently valid per user

use crate::auth::{error::AuthError, models::User, repository::SessionStore};
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// Hash a token using SHA-256
///
/// Session lists only ever hold digests; the raw refresh token lives in the client
/// cookie alone.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Session manager over a [`SessionStore`]
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
}

impl SessionManager {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    /// Record a freshly issued refresh token for the user
    pub async fn add_session(&self, username: &str, token: &str) -> Result<(), AuthError> {
        match self.store.add_session(username, &hash_token(token)).await {
            Ok(true) => Ok(()),
            Ok(false) => {
                tracing::error!("Session for {} was not saved: no user row changed", username);
                Err(AuthError::SessionNotSaved)
            }
            Err(e) => {
                tracing::error!("Session for {} was not saved: {:?}", username, e);
                Err(AuthError::SessionNotSaved)
            }
        }
    }

    /// Find the user currently holding this refresh token
    pub async fn find_user_by_refresh_token(&self, token: &str) -> Result<Option<User>, AuthError> {
        Ok(self.store.find_user_by_session(&hash_token(token)).await?)
    }

    pub async fn revoke_session(&self, username: &str, token: &str) -> Result<(), AuthError> {
        self.store.revoke_session(username, &hash_token(token)).await?;
        tracing::debug!("Revoked one session of {}", username);
        Ok(())
    }

    pub async fn revoke_all(&self, username: &str) -> Result<(), AuthError> {
        self.store.revoke_all(username).await?;
        tracing::info!("Revoked all sessions of {}", username);
        Ok(())
    }

    /// Remove the token, returning true only to the caller that removed it
    pub async fn consume(&self, username: &str, token: &str) -> Result<bool, AuthError> {
        Ok(self.store.consume_session(username, &hash_token(token)).await?)
    }
}
