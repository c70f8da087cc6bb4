//! Application configuration

use std::env;
use std::time::Duration;

use crate::auth::jwt::DEFAULT_EXPIRY_HOURS;

const DEFAULT_PROVIDER_URL: &str = "https://mail.lifecapital.eg";
/// One year; longer session lifetimes are configuration mistakes
const MAX_EXPIRY_HOURS: i64 = 24 * 365;

/// Application configuration loaded from environment variables
#[derive(Clone)]
pub struct Config {
    // Server
    pub bind_address: String,
    /// Browser origin allowed to make credentialed requests, if any
    pub frontend_origin: Option<String>,

    // Database
    pub database_url: String,
    pub database_max_connections: u32,

    // Authentication
    pub jwt_secret: String,
    pub jwt_expiry_hours: i64,

    // OAuth provider
    pub oauth: OAuthConfig,
}

/// OAuth client registration and provider endpoints
#[derive(Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub authorize_url: String,
    pub token_url: String,
    pub userinfo_url: String,
    pub scope: String,
    /// Bound on each outbound provider call
    pub timeout: Duration,
    /// How long a generated `state` stays redeemable
    pub state_ttl: time::Duration,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| -> Result<String, ConfigError> {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(key))
        };
        let optional = |key: &str, default: &str| -> String {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        // Numeric settings must parse and be positive; a typo is fatal, not a silent default
        let positive = |key: &'static str, default: u64| -> Result<u64, ConfigError> {
            match lookup(key).filter(|v| !v.trim().is_empty()) {
                None => Ok(default),
                Some(raw) => match raw.trim().parse::<u64>() {
                    Ok(value) if value > 0 => Ok(value),
                    _ => Err(ConfigError::Invalid(key)),
                },
            }
        };

        let provider_url = optional("OAUTH_PROVIDER_URL", DEFAULT_PROVIDER_URL);
        let provider_url = provider_url.trim_end_matches('/');

        Ok(Self {
            // Server
            bind_address: optional("BIND_ADDRESS", "0.0.0.0:5121"),
            frontend_origin: lookup("FRONTEND_ORIGIN").filter(|v| !v.trim().is_empty()),

            // Database
            database_url: required("DATABASE_URL")?,
            database_max_connections: u32::try_from(positive("DATABASE_MAX_CONNECTIONS", 5)?)
                .map_err(|_| ConfigError::Invalid("DATABASE_MAX_CONNECTIONS"))?,

            // Authentication
            jwt_secret: {
                let secret = required("JWT_SECRET")?;
                // HS256 key must not be guessable
                if secret.len() < 32 {
                    return Err(ConfigError::WeakSecret(
                        "JWT_SECRET must be at least 32 characters",
                    ));
                }
                secret
            },
            jwt_expiry_hours: i64::try_from(positive("JWT_EXPIRY_HOURS", DEFAULT_EXPIRY_HOURS as u64)?)
                .ok()
                .filter(|hours| *hours <= MAX_EXPIRY_HOURS)
                .ok_or(ConfigError::Invalid("JWT_EXPIRY_HOURS"))?,

            // OAuth
            oauth: OAuthConfig {
                client_id: required("OAUTH_CLIENT_ID")?,
                client_secret: required("OAUTH_CLIENT_SECRET")?,
                redirect_uri: required("OAUTH_REDIRECT_URI")?,
                authorize_url: optional(
                    "OAUTH_AUTHORIZE_URL",
                    &format!("{provider_url}/oauth/authorize"),
                ),
                token_url: optional("OAUTH_TOKEN_URL", &format!("{provider_url}/oauth/token")),
                userinfo_url: optional(
                    "OAUTH_USERINFO_URL",
                    &format!("{provider_url}/oauth/userinfo"),
                ),
                scope: optional("OAUTH_SCOPE", "profile email"),
                timeout: Duration::from_secs(positive("OAUTH_TIMEOUT_SECS", 10)?),
                state_ttl: time::Duration::seconds(
                    i64::try_from(positive("OAUTH_STATE_TTL_SECS", 600)?)
                        .map_err(|_| ConfigError::Invalid("OAUTH_STATE_TTL_SECS"))?,
                ),
            },
        })
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("bind_address", &self.bind_address)
            .field("frontend_origin", &self.frontend_origin)
            .field("database_url", &"<redacted>")
            .field("database_max_connections", &self.database_max_connections)
            .field("jwt_secret", &"<redacted>")
            .field("jwt_expiry_hours", &self.jwt_expiry_hours)
            .field("oauth", &self.oauth)
            .finish()
    }
}

impl std::fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("redirect_uri", &self.redirect_uri)
            .field("authorize_url", &self.authorize_url)
            .field("token_url", &self.token_url)
            .field("userinfo_url", &self.userinfo_url)
            .field("scope", &self.scope)
            .field("timeout", &self.timeout)
            .field("state_ttl", &self.state_ttl)
            .finish()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
    #[error("Weak secret: {0}")]
    WeakSecret(&'static str),
    #[error("Environment variable {0} must be a positive integer")]
    Invalid(&'static str),
}
