// Process configuration loaded from the environment (and an optional .env file)

use thiserror::Error;

/// Configuration errors raised while reading the environment
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set in environment")]
    Missing(&'static str),

    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },

    #[error("ACCESS_TOKEN_SECRET and REFRESH_TOKEN_SECRET must be different")]
    SharedSigningKey,
}

/// Runtime configuration for the API server
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub host: String,
    pub port: u16,
    pub auth: AuthConfig,
}

/// Token and cookie settings for the authentication core
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub access_token_secret: String,
    pub refresh_token_secret: String,
    /// Access token lifetime in seconds
    pub access_token_ttl: i64,
    /// Refresh token lifetime in seconds, also used as the cookie Max-Age
    pub refresh_token_ttl: i64,
    /// Adds the `Secure` attribute to the refresh cookie
    pub cookie_secure: bool,
}

impl AuthConfig {
    pub const DEFAULT_ACCESS_TTL: i64 = 900;
    pub const DEFAULT_REFRESH_TTL: i64 = 86_400;

    /// Build an AuthConfig with the default lifetimes
    pub fn new(access_token_secret: &str, refresh_token_secret: &str) -> Self {
        Self {
            access_token_secret: access_token_secret.to_string(),
            refresh_token_secret: refresh_token_secret.to_string(),
            access_token_ttl: Self::DEFAULT_ACCESS_TTL,
            refresh_token_ttl: Self::DEFAULT_REFRESH_TTL,
            cookie_secure: false,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.access_token_secret == self.refresh_token_secret {
            return Err(ConfigError::SharedSigningKey);
        }
        if self.access_token_ttl <= 0 {
            return Err(ConfigError::Invalid {
                name: "ACCESS_TOKEN_TTL_SECS",
                value: self.access_token_ttl.to_string(),
            });
        }
        if self.refresh_token_ttl <= 0 {
            return Err(ConfigError::Invalid {
                name: "REFRESH_TOKEN_TTL_SECS",
                value: self.refresh_token_ttl.to_string(),
            });
        }
        Ok(())
    }
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Call `dotenv::dotenv()` first to pick up a local .env file.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| lookup(name).ok_or(ConfigError::Missing(name));

        let auth = AuthConfig {
            access_token_secret: required("ACCESS_TOKEN_SECRET")?,
            refresh_token_secret: required("REFRESH_TOKEN_SECRET")?,
            access_token_ttl: parse_or(&lookup, "ACCESS_TOKEN_TTL_SECS", AuthConfig::DEFAULT_ACCESS_TTL)?,
            refresh_token_ttl: parse_or(&lookup, "REFRESH_TOKEN_TTL_SECS", AuthConfig::DEFAULT_REFRESH_TTL)?,
            cookie_secure: parse_or(&lookup, "COOKIE_SECURE", false)?,
        };
        auth.validate()?;

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            database_max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 5)?,
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&lookup, "PORT", 8080)?,
            auth,
        })
    }

    /// Socket address string the server binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(name) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    const BASE: &[(&str, &str)] = &[
        ("DATABASE_URL", "postgresql://localhost/quest"),
        ("ACCESS_TOKEN_SECRET", "access"),
        ("REFRESH_TOKEN_SECRET", "refresh"),
    ];

    #[test]
    fn test_defaults_applied() {
        let config = Config::from_lookup(lookup_from(BASE)).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8080);
        assert_eq!(config.database_max_connections, 5);
        assert_eq!(config.auth.access_token_ttl, 900);
        assert_eq!(config.auth.refresh_token_ttl, 86_400);
        assert!(!config.auth.cookie_secure);
        assert_eq!(config.bind_address(), "0.0.0.0:8080");
    }

    #[test]
    fn test_overrides_parsed() {
        let mut pairs = BASE.to_vec();
        pairs.extend_from_slice(&[
            ("PORT", "9000"),
            ("ACCESS_TOKEN_TTL_SECS", "30"),
            ("COOKIE_SECURE", "true"),
        ]);
        let config = Config::from_lookup(lookup_from(&pairs)).unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.auth.access_token_ttl, 30);
        assert!(config.auth.cookie_secure);
    }

    #[test]
    fn test_missing_secret_rejected() {
        let pairs = [("DATABASE_URL", "postgresql://localhost/quest"), ("ACCESS_TOKEN_SECRET", "a")];
        let err = Config::from_lookup(lookup_from(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("REFRESH_TOKEN_SECRET")));
    }

    #[test]
    fn test_shared_signing_key_rejected() {
        let pairs = [
            ("DATABASE_URL", "postgresql://localhost/quest"),
            ("ACCESS_TOKEN_SECRET", "same"),
            ("REFRESH_TOKEN_SECRET", "same"),
        ];
        let err = Config::from_lookup(lookup_from(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::SharedSigningKey));
    }

    #[test]
    fn test_invalid_port_rejected() {
        let mut pairs = BASE.to_vec();
        pairs.push(("PORT", "eighty"));
        let err = Config::from_lookup(lookup_from(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "PORT", .. }));
    }
}
