// Authentication service - business logic layer

use crate::auth::{
    cookie::CookieSettings,
    error::AuthError,
    models::{IssuedTokens, LoginRequest, NewUser, RegisterRequest, RegisterResponse, User},
    password::PasswordService,
    repository::{CredentialStore, InsertUserError, SessionStore},
    session::SessionManager,
    token::{TokenError, TokenService},
};
use crate::config::AuthConfig;
use std::sync::{Arc, OnceLock};
use tracing::{debug, error, info, warn};
use validator::Validate;

/// Authentication service coordinating all auth operations
#[derive(Clone)]
pub struct AuthService {
    credentials: Arc<dyn CredentialStore>,
    sessions: SessionManager,
    password_service: PasswordService,
    token_service: TokenService,
    cookie: CookieSettings,
    /// Hash verified when a login names no account, created on first use
    dummy_hash: OnceLock<String>,
}

impl AuthService {
    /// Create a new AuthService
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        sessions: Arc<dyn SessionStore>,
        password_service: PasswordService,
        config: &AuthConfig,
    ) -> Self {
        Self {
            credentials,
            sessions: SessionManager::new(sessions),
            password_service,
            token_service: TokenService::new(config),
            cookie: CookieSettings::from(config),
            dummy_hash: OnceLock::new(),
        }
    }

    pub fn cookie_settings(&self) -> &CookieSettings {
        &self.cookie
    }

    pub fn tokens(&self) -> &TokenService {
        &self.token_service
    }

    /// Register a new user
    ///
    /// Username uniqueness is checked before email uniqueness, so a request that
    /// collides on both reports the username.
    pub async fn register(&self, request: RegisterRequest) -> Result<RegisterResponse, AuthError> {
        request.validate()?;

        if self.credentials.username_exists(&request.username).await? {
            return Err(AuthError::UsernameTaken(request.username));
        }
        if self.credentials.email_exists(&request.email).await? {
            return Err(AuthError::EmailTaken(request.email));
        }

        let password_hash = self.password_service.hash_password(&request.password)?;
        let new_user = NewUser {
            username: request.username,
            email: request.email,
            password_hash,
        };

        let id = self
            .credentials
            .create_user(&new_user)
            .await
            .map_err(|e| match e {
                InsertUserError::DuplicateUsername => AuthError::UsernameTaken(new_user.username.clone()),
                InsertUserError::DuplicateEmail => AuthError::EmailTaken(new_user.email.clone()),
                InsertUserError::Database(e) => AuthError::RegistrationFailed(e.to_string()),
            })?;

        info!("Registered user {} ({})", new_user.username, id);
        Ok(RegisterResponse {
            message: format!("New user {} created!", new_user.username),
            id,
        })
    }

    /// Login with username or email
    ///
    /// `presented` is the refresh token from the client's cookie, if any. A cookie
    /// that is not in any session list means the token was already rotated away,
    /// so every session of the account is revoked.
    pub async fn login(
        &self,
        request: LoginRequest,
        presented: Option<&str>,
    ) -> Result<IssuedTokens, AuthError> {
        request.validate()?;
        let identifier = request.identifier().ok_or(AuthError::MissingIdentifier)?;

        if let Some(token) = presented {
            match self.sessions.find_user_by_refresh_token(token).await? {
                Some(owner) => self.sessions.revoke_session(&owner.username, token).await?,
                None => {
                    warn!("Refresh token reuse detected at login for '{}'", identifier);
                    if let Some(user) = self.credentials.find_by_login(identifier).await? {
                        self.sessions.revoke_all(&user.username).await?;
                    }
                    return Err(AuthError::ReuseDetected);
                }
            }
        }

        let Some(user) = self.credentials.find_by_login(identifier).await? else {
            debug!("Login attempt for unknown account '{}'", identifier);
            self.verify_against_dummy(&request.password);
            return Err(AuthError::InvalidCredentials);
        };

        if !self
            .password_service
            .verify_password(&request.password, &user.password_hash)?
        {
            debug!("Wrong password for {}", user.username);
            return Err(AuthError::InvalidCredentials);
        }

        let issued = self.issue_session(&user).await?;
        info!("User {} logged in", user.username);
        Ok(issued)
    }

    /// Exchange a refresh token for a new token pair
    pub async fn refresh(&self, presented: Option<&str>) -> Result<IssuedTokens, AuthError> {
        let token = presented.ok_or(AuthError::MissingRefreshToken)?;

        let Some(user) = self.sessions.find_user_by_refresh_token(token).await? else {
            return match self.token_service.decode_refresh_ignoring_expiry(token) {
                Ok(claims) => {
                    warn!(
                        "Refresh token reuse detected for {}; revoking all sessions",
                        claims.username
                    );
                    self.sessions.revoke_all(&claims.username).await?;
                    Err(AuthError::ReuseDetected)
                }
                Err(e) => {
                    debug!("Unknown refresh token could not be decoded: {}", e);
                    Err(AuthError::InvalidRefreshToken)
                }
            };
        };

        match self.token_service.verify_refresh(token) {
            Ok(claims) if claims.username != user.username => {
                warn!(
                    "Refresh token claims {} but is held by {}",
                    claims.username, user.username
                );
                return Err(AuthError::InvalidUser);
            }
            Ok(_) => {}
            Err(TokenError::Expired) => {
                debug!("Expired refresh token presented by {}", user.username);
                self.sessions.revoke_session(&user.username, token).await?;
                return Err(AuthError::RefreshTokenExpired);
            }
            Err(e) => {
                warn!("Invalid refresh token held by {}: {}", user.username, e);
                self.sessions.revoke_session(&user.username, token).await?;
                return Err(AuthError::InvalidRefreshToken);
            }
        }

        if !self.sessions.consume(&user.username, token).await? {
            warn!(
                "Refresh token of {} was consumed concurrently; revoking all sessions",
                user.username
            );
            self.sessions.revoke_all(&user.username).await?;
            return Err(AuthError::ReuseDetected);
        }

        let issued = self.issue_session(&user).await?;
        debug!("Rotated refresh token for {}", user.username);
        Ok(issued)
    }

    /// Revoke the presented session; never fails outwardly
    pub async fn logout(&self, presented: Option<&str>) {
        let Some(token) = presented else {
            return;
        };

        match self.sessions.find_user_by_refresh_token(token).await {
            Ok(Some(user)) => {
                if let Err(e) = self.sessions.revoke_session(&user.username, token).await {
                    error!("Failed to revoke session at logout: {}", e);
                } else {
                    info!("User {} logged out", user.username);
                }
            }
            Ok(None) => debug!("Logout with a refresh token that holds no session"),
            Err(e) => error!("Failed to look up session at logout: {}", e),
        }
    }

    /// Resolve the user behind an access token
    pub async fn authenticate(&self, access_token: &str) -> Result<User, AuthError> {
        let claims = self.token_service.verify_access(access_token).map_err(|e| {
            debug!("Access token rejected: {}", e);
            AuthError::Unauthenticated
        })?;

        self.credentials
            .find_by_username(&claims.username)
            .await?
            .ok_or_else(|| {
                warn!("Access token names unknown user {}", claims.username);
                AuthError::Unauthenticated
            })
    }

    /// Spend one Argon2 verification so an unknown account answers as slowly as a wrong password
    fn verify_against_dummy(&self, password: &str) {
        let hash = self.dummy_hash.get_or_init(|| {
            self.password_service
                .hash_password("no-such-account")
                .unwrap_or_else(|e| {
                    error!("Could not build the login timing hash: {}", e);
                    String::new()
                })
        });
        if !hash.is_empty() {
            let _ = self.password_service.verify_password(password, hash);
        }
    }

    async fn issue_session(&self, user: &User) -> Result<IssuedTokens, AuthError> {
        let (access_token, refresh_token) = self
            .token_service
            .issue_pair(&user.username)
            .map_err(|e| AuthError::TokenGeneration(e.to_string()))?;

        self.sessions.add_session(&user.username, &refresh_token).await?;

        Ok(IssuedTokens {
            user_id: user.id,
            username: user.username.clone(),
            access_token,
            refresh_token,
        })
    }
}
