//! Signup, login, OAuth and refresh orchestration
//!
//! Handlers stay thin: they parse input, call into [`AuthFlows`], and attach
//! the resulting token as the session cookie.

use std::sync::Arc;

use authgate_shared::{NewUser, OAuthStateStore, Role, StoreError, UserId, UserStore};
use time::OffsetDateTime;
use url::Url;

use super::{
    jwt::{Claims, IssuedToken, JwtManager},
    oauth::{generate_state, username_from_email, OAuthClient},
    password,
};
use crate::error::{ApiError, ApiResult};

/// Fields accepted at signup
#[derive(Debug, Clone, Default)]
pub struct SignupInput {
    pub username: String,
    pub password: String,
    pub email: Option<String>,
    pub phone_number: Option<String>,
}

/// Outcome of a completed delegated login
#[derive(Debug, Clone)]
pub struct OAuthLogin {
    pub username: String,
    pub role: Role,
    pub provisioned: bool,
    pub token: IssuedToken,
}

/// Authentication flows over the injected stores
#[derive(Clone)]
pub struct AuthFlows {
    users: Arc<dyn UserStore>,
    oauth_states: Arc<dyn OAuthStateStore>,
    jwt: JwtManager,
    oauth: OAuthClient,
}

impl AuthFlows {
    pub fn new(
        users: Arc<dyn UserStore>,
        oauth_states: Arc<dyn OAuthStateStore>,
        jwt: JwtManager,
        oauth: OAuthClient,
    ) -> Self {
        Self {
            users,
            oauth_states,
            jwt,
            oauth,
        }
    }

    /// Check a presented session token. Pure and local, no store access.
    pub fn verify(&self, token: &str) -> ApiResult<Claims> {
        Ok(self.jwt.verify(token)?)
    }

    /// Create a password account and sign it in
    pub async fn signup(&self, input: SignupInput) -> ApiResult<(UserId, IssuedToken)> {
        if input.username.trim().is_empty() || input.password.is_empty() {
            return Err(ApiError::Validation(
                "Username and Password are required".to_string(),
            ));
        }

        if self.users.find_by_username(&input.username).await?.is_some() {
            tracing::info!(username = %input.username, "signup: Username already taken");
            return Err(ApiError::Conflict("Username already exists".to_string()));
        }

        let (password_hash, salt) = password::new_credential(&input.password);
        let role = Role::user();

        // A concurrent signup can still win the race; the unique index reports it
        let user_id = self
            .users
            .create_user(NewUser {
                username: input.username.clone(),
                password_hash,
                salt,
                email: input.email.filter(|e| !e.trim().is_empty()),
                phone_number: input.phone_number.filter(|p| !p.trim().is_empty()),
                role: role.clone(),
            })
            .await
            .map_err(|e| match e {
                StoreError::Duplicate => ApiError::Conflict("Username already exists".to_string()),
                other => other.into(),
            })?;

        let token = self.jwt.issue(&input.username, &role)?;
        tracing::info!(user_id = %user_id, username = %input.username, "signup: Account created");

        Ok((user_id, token))
    }

    /// Check a username/password pair and sign the account in.
    ///
    /// Unknown user, OAuth-only account and wrong password all produce the
    /// same `InvalidCredentials`.
    pub async fn login(&self, username: &str, password: &str) -> ApiResult<IssuedToken> {
        if username.is_empty() || password.is_empty() {
            return Err(ApiError::Validation(
                "Username and Password are required".to_string(),
            ));
        }

        let Some(user) = self.users.find_by_username(username).await? else {
            // Spend the same hashing effort as a real check
            let _ = password::verify_password(password, DUMMY_SALT, DUMMY_DIGEST);
            tracing::warn!(username = %username, "login: Unknown user");
            return Err(ApiError::InvalidCredentials);
        };

        let matches = password::verify_password(password, &user.salt, &user.password_hash);
        if !matches || !user.is_password_login_enabled() {
            tracing::warn!(user_id = %user.id, "login: Invalid password");
            return Err(ApiError::InvalidCredentials);
        }

        let token = self.jwt.issue(&user.username, &user.role)?;
        tracing::info!(user_id = %user.id, "login: Password verified");
        Ok(token)
    }

    /// Start a delegated login: remember a fresh `state` and return the
    /// provider URL to redirect the browser to
    pub async fn begin_oauth(&self) -> ApiResult<Url> {
        let state = generate_state();
        let expires_at = OffsetDateTime::now_utc() + self.oauth.config().state_ttl;
        self.oauth_states.save(&state, expires_at).await?;

        Ok(self.oauth.authorize_url(&state)?)
    }

    /// Finish a delegated login from the provider callback parameters
    pub async fn complete_oauth(&self, code: &str, state: &str) -> ApiResult<OAuthLogin> {
        if code.trim().is_empty() || state.trim().is_empty() {
            return Err(ApiError::Validation(
                "Authorization code and state are required".to_string(),
            ));
        }

        // Single use: a replayed or forged state never reaches the provider
        if !self.oauth_states.consume(state).await? {
            tracing::warn!("oauth: Unknown, expired or reused state");
            return Err(ApiError::Validation("Invalid or expired OAuth state".to_string()));
        }

        let access_token = self.oauth.exchange_code(code).await?;
        let profile = self.oauth.fetch_profile(&access_token).await?;

        let email = profile
            .email
            .filter(|e| !e.trim().is_empty())
            .ok_or(ApiError::InvalidProfile)?;
        let username = username_from_email(&email)
            .ok_or(ApiError::InvalidProfile)?
            .to_string();

        let (role, provisioned) = match self.users.find_by_username(&username).await? {
            Some(existing) => (existing.role, false),
            None => {
                let created = self
                    .users
                    .create_user(NewUser::oauth_only(username.clone(), Some(email.clone())))
                    .await;
                match created {
                    Ok(user_id) => {
                        tracing::info!(user_id = %user_id, username = %username, "oauth: Provisioned account");
                        (Role::user(), true)
                    }
                    // Lost a race with a concurrent first login; use the winner's row
                    Err(StoreError::Duplicate) => {
                        let existing = self
                            .users
                            .find_by_username(&username)
                            .await?
                            .ok_or(ApiError::Internal)?;
                        (existing.role, false)
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        };

        let token = self.jwt.issue(&username, &role)?;
        Ok(OAuthLogin {
            username,
            role,
            provisioned,
            token,
        })
    }

    /// Reissue a session for an already-authenticated user, picking up the
    /// role currently stored for them. The new token always expires strictly
    /// after `current_expiry`.
    pub async fn refresh(
        &self,
        username: &str,
        current_expiry: OffsetDateTime,
    ) -> ApiResult<(Role, IssuedToken)> {
        let user = self
            .users
            .find_by_username(username)
            .await?
            .ok_or_else(|| {
                tracing::warn!(username = %username, "refresh: Account no longer exists");
                ApiError::Unauthorized
            })?;

        let token = self
            .jwt
            .reissue(&user.username, &user.role, current_expiry)?;
        Ok((user.role, token))
    }
}

// Fixed inputs for the unknown-user path of `login`
const DUMMY_SALT: &str = "AAAAAAAAAAAAAAAAAAAAAA==";
const DUMMY_DIGEST: &str = "0000000000000000000000000000000000000000000000000000000000000000";
