//! JWT token generation and validation

use authgate_shared::Role;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

/// Written into every token; not checked on verification
pub const TOKEN_ISSUER: &str = "authgate";
/// Written into every token; not checked on verification
pub const TOKEN_AUDIENCE: &str = "authgate-clients";

/// Default session lifetime
pub const DEFAULT_EXPIRY_HOURS: i64 = 3;

/// Session token claims
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (username)
    pub sub: String,
    /// Role at issuance time
    pub role: String,
    /// JWT ID, unique per token
    pub jti: String,
    /// Issued at
    pub iat: i64,
    /// Expiration
    pub exp: i64,
    pub iss: String,
    pub aud: String,
}

impl Claims {
    pub fn role(&self) -> Role {
        Role::new(self.role.clone())
    }

    pub fn expires_at(&self) -> Result<OffsetDateTime, JwtError> {
        OffsetDateTime::from_unix_timestamp(self.exp).map_err(|_| JwtError::Invalid)
    }
}

/// A freshly signed token and the facts the cookie layer needs about it
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub jti: String,
    pub expires_at: OffsetDateTime,
}

/// JWT manager for token operations
#[derive(Clone)]
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiry: Duration,
}

impl JwtManager {
    /// Create a new JWT manager. The same secret signs and validates.
    pub fn new(secret: &str, expiry_hours: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expiry: Duration::hours(expiry_hours),
        }
    }

    /// Session lifetime in seconds
    pub fn expiry_seconds(&self) -> i64 {
        self.expiry.whole_seconds()
    }

    /// Sign a token for `username` with `role`, expiring one session lifetime from now
    pub fn issue(&self, username: &str, role: &Role) -> Result<IssuedToken, JwtError> {
        self.issue_at(username, role, OffsetDateTime::now_utc())
    }

    /// Same as [`issue`](Self::issue) with an explicit issue time
    pub fn issue_at(
        &self,
        username: &str,
        role: &Role,
        now: OffsetDateTime,
    ) -> Result<IssuedToken, JwtError> {
        self.sign(username, role, now, now + self.expiry)
    }

    /// Replace a session expiring at `previous_expiry`. The new `exp` is one
    /// lifetime from now, and always at least one second past the old one.
    pub fn reissue(
        &self,
        username: &str,
        role: &Role,
        previous_expiry: OffsetDateTime,
    ) -> Result<IssuedToken, JwtError> {
        self.reissue_at(username, role, previous_expiry, OffsetDateTime::now_utc())
    }

    /// Same as [`reissue`](Self::reissue) with an explicit issue time
    pub fn reissue_at(
        &self,
        username: &str,
        role: &Role,
        previous_expiry: OffsetDateTime,
        now: OffsetDateTime,
    ) -> Result<IssuedToken, JwtError> {
        let floor = previous_expiry.replace_nanosecond(0).unwrap_or(previous_expiry) + Duration::SECOND;
        let expires_at = (now + self.expiry).max(floor);
        self.sign(username, role, now, expires_at)
    }

    fn sign(
        &self,
        username: &str,
        role: &Role,
        now: OffsetDateTime,
        expires_at: OffsetDateTime,
    ) -> Result<IssuedToken, JwtError> {
        let jti = Uuid::new_v4().to_string();

        let claims = Claims {
            sub: username.to_string(),
            role: role.as_str().to_string(),
            jti: jti.clone(),
            iat: now.unix_timestamp(),
            exp: expires_at.unix_timestamp(),
            iss: TOKEN_ISSUER.to_string(),
            aud: TOKEN_AUDIENCE.to_string(),
        };

        // Explicit algorithm prevents algorithm confusion attacks
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| JwtError::Encoding(e.to_string()))?;

        Ok(IssuedToken {
            token,
            jti,
            // Claims carry whole seconds; keep the cookie expiry in step with them
            expires_at: expires_at.replace_nanosecond(0).unwrap_or(expires_at),
        })
    }

    /// Validate signature and expiry, returning the embedded claims.
    /// Issuer and audience are not checked.
    pub fn verify(&self, token: &str) -> Result<Claims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
                jsonwebtoken::errors::ErrorKind::InvalidToken => JwtError::Invalid,
                jsonwebtoken::errors::ErrorKind::InvalidSignature => JwtError::Invalid,
                jsonwebtoken::errors::ErrorKind::InvalidAlgorithm => JwtError::Invalid,
                _ => JwtError::Validation(e.to_string()),
            })?;

        // Valid only while now < exp
        if claims.exp <= OffsetDateTime::now_utc().unix_timestamp() {
            return Err(JwtError::Expired);
        }

        Ok(claims)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("Token has expired")]
    Expired,
    #[error("Invalid token")]
    Invalid,
    #[error("Token encoding failed: {0}")]
    Encoding(String),
    #[error("Token validation failed: {0}")]
    Validation(String),
}
