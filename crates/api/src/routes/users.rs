//! User management routes

use axum::{
    extract::{Extension, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use authgate_shared::{PageRequest, PasswordChange, ProfileUpdate, Role, UserId, UserPage, UserSummary};

use crate::{
    auth::{password, AuthUser},
    error::{ApiError, ApiResult},
    state::AppState,
};

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteProfileRequest {
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
pub struct ListUsersQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRoleRequest {
    pub user_id: UserId,
    #[serde(default)]
    pub new_role: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct UpdateRoleResponse {
    pub message: String,
    pub user: UserSummary,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// =============================================================================
// Handlers
// =============================================================================

/// Complete or change profile fields for the caller (or any user, for admins)
pub async fn complete_profile(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(req): Json<CompleteProfileRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let target = non_empty(req.username).unwrap_or_else(|| auth_user.username.clone());

    if target != auth_user.username && !auth_user.is_admin() {
        tracing::warn!(
            username = %auth_user.username,
            target = %target,
            "Profile update for another user denied"
        );
        return Err(ApiError::Forbidden);
    }

    let password = match req.password {
        Some(p) if p.is_empty() => {
            return Err(ApiError::Validation("Password cannot be empty".to_string()))
        }
        Some(p) => {
            let (password_hash, salt) = password::new_credential(&p);
            Some(PasswordChange {
                password_hash,
                salt,
            })
        }
        None => None,
    };

    let update = ProfileUpdate {
        password,
        email: non_empty(req.email),
        phone_number: non_empty(req.phone_number),
    };

    if update.password.is_none() && update.email.is_none() && update.phone_number.is_none() {
        return Err(ApiError::Validation("No profile fields supplied".to_string()));
    }

    state.users.update_profile(&target, update).await?;

    tracing::info!(username = %auth_user.username, target = %target, "Profile updated");

    Ok(Json(MessageResponse {
        message: "Profile updated successfully".to_string(),
    }))
}

/// List users a page at a time (admin only)
pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<ListUsersQuery>,
) -> ApiResult<Json<UserPage>> {
    let request = PageRequest::new(query.page, query.limit);
    let page = state.users.list_users(request).await?;

    Ok(Json(page))
}

/// Change a user's role (admin only). Takes effect for that user on their next refresh.
pub async fn update_role(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(req): Json<UpdateRoleRequest>,
) -> ApiResult<Json<UpdateRoleResponse>> {
    let new_role = req.new_role.trim();
    if new_role.is_empty() {
        return Err(ApiError::Validation("newRole is required".to_string()));
    }

    let role = Role::new(new_role);
    state.users.update_role(req.user_id, &role).await?;

    let user = state
        .users
        .find_by_id(req.user_id)
        .await?
        .ok_or(ApiError::NotFound)?;

    tracing::info!(
        admin = %auth_user.username,
        user_id = %req.user_id,
        role = %role,
        "Role updated"
    );

    Ok(Json(UpdateRoleResponse {
        message: "Role updated successfully".to_string(),
        user: user.summary(),
    }))
}
