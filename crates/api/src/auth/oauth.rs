//! OAuth authorization-code exchange against the external identity provider
//!
//! Each step either succeeds or fails the whole exchange; nothing is retried.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::{rngs::OsRng, RngCore};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use url::Url;

use crate::config::OAuthConfig;

/// Profile fields read from the provider's userinfo endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderProfile {
    #[serde(default, alias = "Email")]
    pub email: Option<String>,
    #[serde(default, alias = "Username")]
    pub username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum OAuthError {
    #[error("OAuth provider did not respond in time")]
    Timeout,
    #[error("OAuth provider request failed: {0}")]
    Transport(String),
    #[error("OAuth provider rejected the authorization code ({status})")]
    TokenRejected { status: StatusCode },
    #[error("OAuth provider response had no access_token")]
    MissingAccessToken,
    #[error("OAuth provider rejected the profile request ({status})")]
    ProfileRejected { status: StatusCode },
    #[error("OAuth profile has no usable email")]
    InvalidProfile,
    #[error("Invalid OAuth endpoint URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl From<reqwest::Error> for OAuthError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            OAuthError::Timeout
        } else {
            OAuthError::Transport(err.to_string())
        }
    }
}

/// HTTP client for the provider's authorize, token and userinfo endpoints
#[derive(Clone)]
pub struct OAuthClient {
    http: Client,
    config: OAuthConfig,
}

impl OAuthClient {
    pub fn new(config: OAuthConfig) -> Result<Self, OAuthError> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    /// Provider URL the browser is sent to for consent
    pub fn authorize_url(&self, state: &str) -> Result<Url, OAuthError> {
        let mut url = Url::parse(&self.config.authorize_url)?;
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", &self.config.redirect_uri)
            .append_pair("scope", &self.config.scope)
            .append_pair("state", state);
        Ok(url)
    }

    /// Trade an authorization code for a provider access token
    pub async fn exchange_code(&self, code: &str) -> Result<String, OAuthError> {
        let form = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
        ];

        let response = self
            .http
            .post(&self.config.token_url)
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(status = %status, "OAuth token endpoint rejected code");
            return Err(OAuthError::TokenRejected { status });
        }

        let body: TokenResponse = response.json().await.map_err(|e| {
            tracing::warn!(error = %e, "OAuth token response was not the expected JSON");
            OAuthError::MissingAccessToken
        })?;

        body.access_token
            .filter(|t| !t.is_empty())
            .ok_or(OAuthError::MissingAccessToken)
    }

    /// Fetch the signed-in user's profile with the provider access token
    pub async fn fetch_profile(&self, access_token: &str) -> Result<ProviderProfile, OAuthError> {
        let response = self
            .http
            .get(&self.config.userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(status = %status, "OAuth userinfo endpoint rejected token");
            return Err(OAuthError::ProfileRejected { status });
        }

        response.json().await.map_err(|e| {
            tracing::warn!(error = %e, "OAuth userinfo response was not the expected JSON");
            OAuthError::InvalidProfile
        })
    }
}

/// Local username for a provider email: the part before `@`
pub fn username_from_email(email: &str) -> Option<&str> {
    let email = email.trim();
    let local = match email.split_once('@') {
        Some((local, _domain)) => local,
        None => email,
    };
    Some(local).filter(|l| !l.is_empty())
}

/// Random, URL-safe `state` value for the authorize redirect
pub fn generate_state() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
