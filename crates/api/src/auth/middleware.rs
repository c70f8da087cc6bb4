//! Request authentication middleware

use authgate_shared::Role;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use time::OffsetDateTime;

use super::cookie;
use crate::{error::ApiError, state::AppState};

/// Identity established from a verified session cookie
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub username: String,
    /// Role claim as issued; may lag the store until the next refresh
    pub role: Role,
    pub jti: String,
    pub expires_at: OffsetDateTime,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

/// Require a valid `AuthToken` cookie and expose the caller as [`AuthUser`]
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = cookie::extract(request.headers()).ok_or_else(|| {
        tracing::debug!(path = %request.uri().path(), "Missing session cookie");
        ApiError::Unauthorized
    })?;

    let claims = state.flows.verify(&token)?;
    let auth_user = AuthUser {
        expires_at: claims.expires_at()?,
        role: claims.role(),
        username: claims.sub,
        jti: claims.jti,
    };

    request.extensions_mut().insert(auth_user);
    Ok(next.run(request).await)
}

/// Require the `admin` role. Must be layered inside [`require_auth`].
pub async fn require_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    let auth_user = request
        .extensions()
        .get::<AuthUser>()
        .ok_or(ApiError::Unauthorized)?;

    if !auth_user.is_admin() {
        tracing::warn!(username = %auth_user.username, "Admin route denied");
        return Err(ApiError::Forbidden);
    }

    Ok(next.run(request).await)
}
