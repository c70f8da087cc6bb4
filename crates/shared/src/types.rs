//! Common types used across Authgate

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// =============================================================================
// ID Wrappers
// =============================================================================

/// User account ID wrapper (`user_account.id`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct UserId(pub i64);

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Roles
// =============================================================================

/// Account role.
///
/// Roles are an open set of strings; `user` is the default and `admin` is the
/// only privileged value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct Role(String);

impl Role {
    pub const USER: &'static str = "user";
    pub const ADMIN: &'static str = "admin";

    pub fn new(role: impl Into<String>) -> Self {
        Self(role.into())
    }

    pub fn user() -> Self {
        Self(Self::USER.to_string())
    }

    pub fn admin() -> Self {
        Self(Self::ADMIN.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_admin(&self) -> bool {
        self.0 == Self::ADMIN
    }
}

impl Default for Role {
    fn default() -> Self {
        Self::user()
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Role {
    fn from(role: &str) -> Self {
        Self(role.to_string())
    }
}

impl From<String> for Role {
    fn from(role: String) -> Self {
        Self(role)
    }
}

// =============================================================================
// Credentials
// =============================================================================

/// Marker stored in both the password and salt columns of accounts that were
/// provisioned through OAuth. It is not a hex digest, so no submitted
/// password can ever match it.
pub const OAUTH_ONLY_MARKER: &str = "!oauth-only";

/// Full user record as stored in `user_account`
#[derive(Debug, Clone, FromRow)]
pub struct UserRecord {
    pub id: UserId,
    pub username: String,
    /// Hex SHA-256 of `salt ++ password`, or [`OAUTH_ONLY_MARKER`]
    #[sqlx(rename = "password")]
    pub password_hash: String,
    pub salt: String,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub role: Role,
}

impl UserRecord {
    /// Whether this account can authenticate with a password.
    /// OAuth-provisioned accounts cannot until a password is set.
    pub fn is_password_login_enabled(&self) -> bool {
        self.password_hash != OAUTH_ONLY_MARKER && self.salt != OAUTH_ONLY_MARKER
    }

    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            phone_number: self.phone_number.clone(),
            role: self.role.clone(),
        }
    }
}

/// Insert payload for a new account
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub salt: String,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub role: Role,
}

impl NewUser {
    /// Account provisioned from a delegated login, not usable for password login
    pub fn oauth_only(username: impl Into<String>, email: Option<String>) -> Self {
        Self {
            username: username.into(),
            password_hash: OAUTH_ONLY_MARKER.to_string(),
            salt: OAUTH_ONLY_MARKER.to_string(),
            email,
            phone_number: None,
            role: Role::user(),
        }
    }
}

/// New salt and digest, always written together
#[derive(Debug, Clone)]
pub struct PasswordChange {
    pub password_hash: String,
    pub salt: String,
}

/// Profile fields to update. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub password: Option<PasswordChange>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
}

/// Public view of an account (no credential material)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct UserSummary {
    pub id: UserId,
    pub username: String,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub role: Role,
}

/// One page of the user listing
#[derive(Debug, Clone, Serialize)]
pub struct UserPage {
    pub users: Vec<UserSummary>,
    pub page: i64,
    pub limit: i64,
    pub total: i64,
}

/// Page request, normalised to `page >= 1` and `1 <= limit <= MAX_LIMIT`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

impl PageRequest {
    pub const DEFAULT_LIMIT: i64 = 10;
    pub const MAX_LIMIT: i64 = 100;

    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit
                .unwrap_or(Self::DEFAULT_LIMIT)
                .clamp(1, Self::MAX_LIMIT),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}
