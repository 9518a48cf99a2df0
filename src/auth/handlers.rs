// HTTP handlers for authentication endpoints

use crate::auth::{
    cookie::{cleared_refresh_cookie, extract_refresh_token, refresh_cookie, CookieSettings},
    error::AuthError,
    models::{LoginRequest, LoginResponse, RefreshResponse, RegisterRequest, RegisterResponse},
    service::AuthService,
};
use crate::error::{ApiJson, ErrorResponse};
use axum::{
    extract::State,
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

/// Attach a Set-Cookie header carrying the refresh token
fn with_refresh_cookie(
    settings: &CookieSettings,
    token: &str,
    body: impl IntoResponse,
) -> Result<Response, AuthError> {
    let cookie = refresh_cookie(settings, token)
        .map_err(|e| AuthError::TokenGeneration(format!("refresh token is not a cookie value: {}", e)))?;
    Ok(([(SET_COOKIE, cookie)], body).into_response())
}

/// Turn an auth error into a response, clearing the refresh cookie when asked
fn reject(err: AuthError, clear_cookie: bool, settings: &CookieSettings) -> Response {
    let mut response = err.into_response();
    if clear_cookie {
        response
            .headers_mut()
            .insert(SET_COOKIE, cleared_refresh_cookie(settings));
    }
    response
}

/// Register a new user
#[utoipa::path(
    post,
    path = "/users",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created", body = RegisterResponse),
        (status = 400, description = "Invalid input or user not saved", body = ErrorResponse),
        (status = 409, description = "Username or email already taken", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn register_handler(
    State(auth): State<Arc<AuthService>>,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), AuthError> {
    tracing::debug!("Registering user {}", request.username);
    let created = auth.register(request).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Login with username or email
///
/// The refresh token is returned in the `jwt` cookie, the access token in the body.
#[utoipa::path(
    post,
    path = "/auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in; refresh token set in the jwt cookie", body = LoginResponse),
        (status = 400, description = "Missing identifier or password", body = ErrorResponse),
        (status = 401, description = "Wrong user and/or password", body = ErrorResponse),
        (status = 403, description = "Refresh token reuse detected", body = ErrorResponse),
        (status = 500, description = "Session could not be saved", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login_handler(
    State(auth): State<Arc<AuthService>>,
    headers: HeaderMap,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Response {
    let presented = extract_refresh_token(&headers);

    let result = match auth.login(request, presented.as_deref()).await {
        Ok(issued) => with_refresh_cookie(
            auth.cookie_settings(),
            &issued.refresh_token,
            Json(LoginResponse {
                user_id: issued.user_id,
                access_token: issued.access_token,
            }),
        ),
        Err(err) => Err(err),
    };

    result.unwrap_or_else(|err| {
        let stale_cookie = presented.is_some() && matches!(err, AuthError::InvalidCredentials);
        let clear = err.clears_refresh_cookie() || stale_cookie;
        reject(err, clear, auth.cookie_settings())
    })
}

/// Rotate the refresh token held in the `jwt` cookie
#[utoipa::path(
    get,
    path = "/refresh",
    responses(
        (status = 200, description = "New access token; rotated refresh token set in the jwt cookie", body = RefreshResponse),
        (status = 401, description = "No refresh cookie", body = ErrorResponse),
        (status = 403, description = "Refresh token reused, expired or invalid", body = ErrorResponse),
        (status = 500, description = "Session could not be saved", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn refresh_handler(State(auth): State<Arc<AuthService>>, headers: HeaderMap) -> Response {
    let presented = extract_refresh_token(&headers);

    let result = match auth.refresh(presented.as_deref()).await {
        Ok(issued) => with_refresh_cookie(
            auth.cookie_settings(),
            &issued.refresh_token,
            Json(RefreshResponse {
                access_token: issued.access_token,
                username: issued.username,
                user_id: issued.user_id,
            }),
        ),
        Err(err) => Err(err),
    };

    result.unwrap_or_else(|err| {
        let clear = err.clears_refresh_cookie();
        reject(err, clear, auth.cookie_settings())
    })
}

/// Logout: revoke the presented session and clear the cookie
#[utoipa::path(
    get,
    path = "/logout",
    responses(
        (status = 204, description = "Logged out; jwt cookie cleared")
    ),
    tag = "auth"
)]
pub async fn logout_handler(State(auth): State<Arc<AuthService>>, headers: HeaderMap) -> Response {
    let presented = extract_refresh_token(&headers);
    auth.logout(presented.as_deref()).await;

    (
        StatusCode::NO_CONTENT,
        [(SET_COOKIE, cleared_refresh_cookie(auth.cookie_settings()))],
    )
        .into_response()
}
