//! User endpoints
//!
//! Self-service endpoints operate on the identity resolved from the access
//! token. The collection endpoints are the one place the admin role means
//! anything: listing, reading, updating, and deleting arbitrary accounts.
//!
//! # Endpoints
//!
//! - `GET|PUT|DELETE /api/v1/users/me`
//! - `GET /api/v1/users` (admin)
//! - `GET|PUT|DELETE /api/v1/users/:id` (admin)

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{ApiResponse, PageQuery, PaginatedResponse, Pagination},
};
use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::Deserialize;
use taskbox_shared::{
    auth::{middleware::AuthContext, password},
    models::user::{PublicUser, UpdateUser, User},
};
use uuid::Uuid;
use validator::Validate;

/// Update request for both `/me` and the admin path
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateUserRequest {
    /// New username
    #[validate(length(min = 3, max = 64, message = "Username must be 3 to 64 characters"))]
    pub username: Option<String>,

    /// New email address
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    /// New password (checked against the strength policy)
    pub password: Option<String>,
}

fn require_admin(auth: &AuthContext) -> Result<(), ApiError> {
    if !auth.is_admin() {
        return Err(ApiError::Forbidden("Admin access required".to_string()));
    }
    Ok(())
}

/// Applies an update request to a user row, hashing any new password
async fn apply_update(
    state: &AppState,
    user_id: Uuid,
    req: UpdateUserRequest,
) -> ApiResult<PublicUser> {
    req.validate().map_err(ApiError::from_validation)?;

    let password_hash = match req.password {
        Some(ref password) => {
            state
                .config
                .password_policy()
                .validate(password)
                .map_err(|reason| ApiError::invalid_field("password", reason))?;
            Some(password::hash_password(password)?)
        }
        None => None,
    };

    let updated = User::update(
        &state.db,
        user_id,
        UpdateUser {
            username: req.username,
            email: req.email,
            password_hash,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(updated.into())
}

/// Get the current authenticated user
pub async fn get_me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<ApiResponse<PublicUser>>> {
    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(ApiResponse::new(user.into())))
}

/// Update the current authenticated user
pub async fn update_me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<UpdateUserRequest>,
) -> ApiResult<Json<ApiResponse<PublicUser>>> {
    let updated = apply_update(&state, auth.user_id, req).await?;

    tracing::info!(user_id = %auth.user_id, "user updated own profile");

    Ok(Json(ApiResponse::with_message(
        "User updated successfully",
        updated,
    )))
}

/// Delete the current authenticated user and everything they own
pub async fn delete_me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<ApiResponse<()>>> {
    let deleted = User::delete(&state.db, auth.user_id).await?;
    if !deleted {
        return Err(ApiError::NotFound("User not found".to_string()));
    }

    tracing::info!(user_id = %auth.user_id, "user deleted own account");

    Ok(Json(ApiResponse::with_message(
        "User deleted successfully",
        (),
    )))
}

/// List all users (admin only)
pub async fn list_users(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<PaginatedResponse<PublicUser>>> {
    require_admin(&auth)?;

    let pagination = Pagination::from_query(&query);
    let users = User::list(&state.db, pagination.limit(), pagination.offset()).await?;
    let total = User::count(&state.db).await?;

    Ok(Json(PaginatedResponse::new(
        users.into_iter().map(PublicUser::from).collect(),
        pagination.page,
        pagination.per_page,
        total,
    )))
}

/// Get a specific user by ID (admin only)
pub async fn get_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<PublicUser>>> {
    require_admin(&auth)?;

    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(ApiResponse::new(user.into())))
}

/// Update a specific user by ID (admin only)
pub async fn update_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(user_id): Path<Uuid>,
    Json(req): Json<UpdateUserRequest>,
) -> ApiResult<Json<ApiResponse<PublicUser>>> {
    require_admin(&auth)?;

    let updated = apply_update(&state, user_id, req).await?;

    tracing::info!(admin_id = %auth.user_id, user_id = %user_id, "admin updated user");

    Ok(Json(ApiResponse::with_message(
        "User updated successfully",
        updated,
    )))
}

/// Delete a specific user by ID (admin only)
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<()>>> {
    require_admin(&auth)?;

    let deleted = User::delete(&state.db, user_id).await?;
    if !deleted {
        return Err(ApiError::NotFound("User not found".to_string()));
    }

    tracing::info!(admin_id = %auth.user_id, user_id = %user_id, "admin deleted user");

    Ok(Json(ApiResponse::with_message(
        "User deleted successfully",
        (),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskbox_shared::models::user::UserRole;

    #[test]
    fn test_require_admin() {
        let admin = AuthContext::new(Uuid::new_v4(), UserRole::Admin);
        let user = AuthContext::new(Uuid::new_v4(), UserRole::User);

        assert!(require_admin(&admin).is_ok());
        assert!(matches!(
            require_admin(&user).unwrap_err(),
            ApiError::Forbidden(_)
        ));
    }
}
