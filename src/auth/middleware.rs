// Authentication extractor for protected routes

use crate::auth::{cookie::extract_access_token, error::AuthError, service::AuthService};
use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// The user acting on a protected request
///
/// Handlers receive it as an argument; there is no request-global current user.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub username: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    Arc<AuthService>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = extract_access_token(&parts.headers).ok_or_else(|| {
            debug!("Missing access token for {}", parts.uri.path());
            AuthError::Unauthenticated
        })?;

        let auth = Arc::<AuthService>::from_ref(state);
        let user = auth.authenticate(&token).await?;

        Ok(AuthenticatedUser {
            user_id: user.id,
            username: user.username,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::models::RegisterRequest;
    use crate::testing::{test_auth_config, test_auth_service, MemoryStore};
    use axum::http::{header, Request, StatusCode};
    use axum::response::IntoResponse;
    use chrono::Utc;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use proptest::prelude::*;

    async fn auth_with_bob() -> Arc<AuthService> {
        let service = test_auth_service(Arc::new(MemoryStore::new()), &test_auth_config());
        service
            .register(RegisterRequest {
                username: "bob".into(),
                email: "b@x.com".into(),
                password: "secret123".into(),
            })
            .await
            .unwrap();
        Arc::new(service)
    }

    // Helper to create test parts with Authorization header
    fn create_parts_with_auth(auth_value: &str) -> Parts {
        let req = Request::builder()
            .uri("/")
            .header(header::AUTHORIZATION, auth_value)
            .body(())
            .unwrap();

        let (parts, _) = req.into_parts();
        parts
    }

    // Helper to create test parts without Authorization header
    fn create_parts_without_auth() -> Parts {
        let (parts, _) = Request::builder().uri("/").body(()).unwrap().into_parts();
        parts
    }

    async fn extract(auth: &Arc<AuthService>, mut parts: Parts) -> Result<AuthenticatedUser, AuthError> {
        AuthenticatedUser::from_request_parts(&mut parts, auth).await
    }

    #[tokio::test]
    async fn test_valid_token_is_accepted_with_or_without_bearer() {
        let auth = auth_with_bob().await;
        let token = auth.tokens().issue_access_token("bob").unwrap();

        for value in [format!("Bearer {}", token), token.clone()] {
            let user = extract(&auth, create_parts_with_auth(&value)).await.unwrap();
            assert_eq!(user.username, "bob");
        }
    }

    #[tokio::test]
    async fn test_expired_token_is_rejected() {
        let auth = auth_with_bob().await;
        let config = test_auth_config();

        let claims = crate::auth::token::Claims {
            username: "bob".to_string(),
            iat: Utc::now().timestamp() - 1000,
            exp: Utc::now().timestamp() - 500, // Expired 500 seconds ago
            jti: "expired".to_string(),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.access_token_secret.as_bytes()),
        )
        .unwrap();

        let result = extract(&auth, create_parts_with_auth(&format!("Bearer {}", token))).await;
        assert!(matches!(result, Err(AuthError::Unauthenticated)));
    }

    #[tokio::test]
    async fn test_every_failure_looks_the_same() {
        let auth = auth_with_bob().await;
        let refresh = auth.tokens().issue_refresh_token("bob").unwrap();
        let unknown_user = auth.tokens().issue_access_token("ghost").unwrap();

        let headers = vec![
            "Bearer invalid_token".to_string(),
            "Bearer not.a.valid.jwt".to_string(),
            "Basic dXNlcjpwYXNz".to_string(),
            format!("Bearer {}", refresh),
            format!("Bearer {}", unknown_user),
        ];

        for value in headers {
            let err = extract(&auth, create_parts_with_auth(&value)).await.unwrap_err();
            assert!(matches!(err, AuthError::Unauthenticated), "{}", value);
            assert_eq!(err.into_response().status(), StatusCode::UNAUTHORIZED);
        }

        let missing = extract(&auth, create_parts_without_auth()).await;
        assert!(matches!(missing, Err(AuthError::Unauthenticated)));
    }

    proptest! {
        #[test]
        fn prop_malformed_tokens_rejected(malformed in "[a-zA-Z0-9]{10,50}") {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let result = rt.block_on(async {
                let auth = auth_with_bob().await;
                extract(&auth, create_parts_with_auth(&format!("Bearer {}", malformed))).await
            });

            prop_assert!(result.is_err());
        }
    }
}
