//! Authentication routes

use axum::{
    extract::{Extension, Query, State},
    http::{header::LOCATION, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    auth::{cookie, AuthUser, SignupInput},
    error::{ApiError, ApiResult},
    state::AppState,
};
use authgate_shared::UserId;

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, alias = "phone_number")]
    pub phone_number: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OAuthVerifyQuery {
    pub code: Option<String>,
    pub state: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupResponse {
    pub message: String,
    pub user_id: UserId,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub username: String,
    pub role: String,
}

/// Returned whenever a session is (re)established
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub message: String,
    pub username: String,
    pub role: String,
}

// =============================================================================
// Handlers
// =============================================================================

/// Create an account and sign it in
pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> ApiResult<(HeaderMap, Json<SignupResponse>)> {
    let input = SignupInput {
        username: req.username.unwrap_or_default(),
        password: req.password.unwrap_or_default(),
        email: req.email,
        phone_number: req.phone_number,
    };

    let (user_id, token) = state.flows.signup(input).await?;

    let mut headers = HeaderMap::new();
    cookie::attach(&mut headers, &token)?;

    Ok((
        headers,
        Json(SignupResponse {
            message: "Signup and login successful".to_string(),
            user_id,
        }),
    ))
}

/// Password login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<(HeaderMap, Json<MessageResponse>)> {
    let username = req.username.unwrap_or_default();
    let password = req.password.unwrap_or_default();

    let token = state.flows.login(&username, &password).await?;

    let mut headers = HeaderMap::new();
    cookie::attach(&mut headers, &token)?;

    Ok((
        headers,
        Json(MessageResponse {
            message: "Login successful".to_string(),
        }),
    ))
}

/// Logout: expire the cookie.
/// Note: With stateless JWT, the token itself stays valid until expiry
pub async fn logout(
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<(HeaderMap, Json<MessageResponse>)> {
    tracing::info!(
        username = %auth_user.username,
        jti = %auth_user.jti,
        token_expires_at = %auth_user.expires_at,
        "logout"
    );

    let mut headers = HeaderMap::new();
    cookie::clear(&mut headers)?;

    Ok((
        headers,
        Json(MessageResponse {
            message: "Logged out successfully".to_string(),
        }),
    ))
}

/// Identity from the verified token claims
pub async fn me(Extension(auth_user): Extension<AuthUser>) -> Json<MeResponse> {
    Json(MeResponse {
        username: auth_user.username,
        role: auth_user.role.to_string(),
    })
}

/// Reissue the session cookie with a fresh expiry and the current stored role
pub async fn verify_refresh(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<(HeaderMap, Json<SessionResponse>)> {
    let (role, token) = state
        .flows
        .refresh(&auth_user.username, auth_user.expires_at)
        .await?;

    if role != auth_user.role {
        tracing::info!(
            username = %auth_user.username,
            old_role = %auth_user.role,
            new_role = %role,
            "refresh: Role changed since last token"
        );
    }

    let mut headers = HeaderMap::new();
    cookie::attach(&mut headers, &token)?;

    Ok((
        headers,
        Json(SessionResponse {
            message: "Token refreshed".to_string(),
            username: auth_user.username,
            role: role.to_string(),
        }),
    ))
}

/// Redirect the browser to the provider's consent page
pub async fn oauth_login(State(state): State<AppState>) -> ApiResult<Response> {
    let url = state.flows.begin_oauth().await?;
    let location = HeaderValue::from_str(url.as_str()).map_err(|_| ApiError::Internal)?;

    Ok((StatusCode::FOUND, [(LOCATION, location)]).into_response())
}

/// Provider callback: exchange the code and sign the user in
pub async fn oauth_verify(
    State(state): State<AppState>,
    Query(query): Query<OAuthVerifyQuery>,
) -> ApiResult<(HeaderMap, Json<SessionResponse>)> {
    let code = query.code.unwrap_or_default();
    let oauth_state = query.state.unwrap_or_default();

    let login = state.flows.complete_oauth(&code, &oauth_state).await?;

    let mut headers = HeaderMap::new();
    cookie::attach(&mut headers, &login.token)?;

    Ok((
        headers,
        Json(SessionResponse {
            message: "OAuth login successful".to_string(),
            username: login.username,
            role: login.role.to_string(),
        }),
    ))
}
