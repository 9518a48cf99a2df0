// Refresh-token cookie and Authorization header helpers

use crate::config::AuthConfig;
use axum::http::{
    header::{AUTHORIZATION, COOKIE},
    HeaderMap, HeaderValue,
};
use axum::http::header::InvalidHeaderValue;

pub const REFRESH_COOKIE_NAME: &str = "jwt";

/// Attributes of the refresh-token cookie
#[derive(Debug, Clone, Copy)]
pub struct CookieSettings {
    /// Max-Age in seconds, matches the refresh token lifetime
    pub max_age: i64,
    pub secure: bool,
}

impl From<&AuthConfig> for CookieSettings {
    fn from(config: &AuthConfig) -> Self {
        Self {
            max_age: config.refresh_token_ttl,
            secure: config.cookie_secure,
        }
    }
}

/// Build the `HttpOnly` cookie carrying a refresh token
pub fn refresh_cookie(
    settings: &CookieSettings,
    token: &str,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!(
        "{REFRESH_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        settings.max_age
    );
    if settings.secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

/// Build the cookie that makes the client drop its refresh token
pub fn cleared_refresh_cookie(settings: &CookieSettings) -> HeaderValue {
    if settings.secure {
        HeaderValue::from_static(
            "jwt=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT; Secure",
        )
    } else {
        HeaderValue::from_static(
            "jwt=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT",
        )
    }
}

/// Read the refresh token from the `Cookie` header; an empty value counts as absent
pub fn extract_refresh_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|header| header.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| {
            let (key, val) = pair.trim().split_once('=')?;
            (key.trim() == REFRESH_COOKIE_NAME).then(|| val.trim())
        })
        .find(|val| !val.is_empty())
        .map(str::to_string)
}

/// Read the access token from `Authorization`, with or without a `Bearer ` prefix
pub fn extract_access_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
    let token = value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))
        .unwrap_or(value)
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}
