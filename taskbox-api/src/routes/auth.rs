//! Authentication endpoints
//!
//! # Endpoints
//!
//! - `POST /api/v1/auth/register` - create an account
//! - `POST /api/v1/auth/login` - exchange credentials for a token pair
//! - `POST /api/v1/auth/refresh` - exchange a refresh token for a new pair
//!
//! Refresh tokens are single-use: every issued pair carries a `jti` that is
//! persisted on the user row, and `refresh` only accepts the token whose
//! `jti` is current. Exchanging a refresh token rotates the stored `jti`,
//! killing the token that was just presented.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::ApiResponse,
};
use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use taskbox_shared::{
    auth::{jwt, password},
    models::user::{CreateUser, PublicUser, User, UserRole},
};
use validator::Validate;

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Username, 3 to 64 characters
    #[validate(length(min = 3, max = 64, message = "Username must be 3 to 64 characters"))]
    pub username: String,

    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password (checked against the configured strength policy)
    pub password: String,
}

/// Login request
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Username or email address
    pub identifier: String,

    /// Password
    pub password: String,
}

/// Token pair response, returned by login and refresh
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    /// Signed access token
    pub access_token: String,

    /// Signed refresh token (single-use)
    pub refresh_token: String,

    /// Token type for the Authorization header
    pub token_type: &'static str,

    /// Access token lifetime in seconds
    pub expires_in: i64,
}

/// Refresh request
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    /// Refresh token from a previous login or refresh
    pub refresh_token: String,
}

/// Issues a fresh token pair and records its `jti` as the user's current
/// refresh generation.
async fn issue_and_store_pair(state: &AppState, user: &User) -> ApiResult<TokenResponse> {
    let pair = jwt::issue_token_pair(
        user.id,
        user.role,
        state.config.token_ttl(),
        state.jwt_secret(),
    )
    .map_err(|e| ApiError::InternalError(format!("Token issuance failed: {}", e)))?;

    User::set_refresh_token_id(&state.db, user.id, pair.jti).await?;

    Ok(TokenResponse {
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
        token_type: "bearer",
        expires_in: pair.expires_in,
    })
}

/// Register a new user.
///
/// # Errors
///
/// - `409 Conflict`: username or email already taken
/// - `422 Unprocessable Entity`: validation or password policy failure
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<PublicUser>>)> {
    req.validate().map_err(ApiError::from_validation)?;

    state
        .config
        .password_policy()
        .validate(&req.password)
        .map_err(|reason| ApiError::invalid_field("password", reason))?;

    // Friendly pre-check; the unique constraints still decide races
    if User::identity_exists(&state.db, &req.username, &req.email).await? {
        return Err(ApiError::Conflict(
            "Username or email already exists".to_string(),
        ));
    }

    let password_hash = password::hash_password(&req.password)?;

    let user = User::create(
        &state.db,
        CreateUser {
            username: req.username,
            email: req.email,
            password_hash,
            role: UserRole::User,
        },
    )
    .await?;

    tracing::info!(user_id = %user.id, username = %user.username, "user registered");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            "User registered successfully",
            user.into(),
        )),
    ))
}

/// Authenticate with username or email plus password.
///
/// The not-found and wrong-password branches return the same 401 and both
/// cost one argon2 verification, so neither the body nor the timing says
/// which identifiers exist.
///
/// # Errors
///
/// - `401 Unauthorized`: unknown identifier or wrong password
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<ApiResponse<TokenResponse>>> {
    let user = match User::find_by_identifier(&state.db, &req.identifier).await? {
        Some(user) => user,
        None => {
            password::verify_dummy(&req.password);
            return Err(ApiError::Unauthorized("Invalid credentials".to_string()));
        }
    };

    if !password::verify_password(&req.password, &user.password_hash)? {
        return Err(ApiError::Unauthorized("Invalid credentials".to_string()));
    }

    User::update_last_login(&state.db, user.id).await?;

    let tokens = issue_and_store_pair(&state, &user).await?;

    tracing::info!(user_id = %user.id, "user logged in");

    Ok(Json(ApiResponse::with_message("Login successful", tokens)))
}

/// Exchange a refresh token for a new token pair.
///
/// The presented token must be a valid refresh token AND carry the user's
/// current `jti`; on success a new pair is issued and the old refresh token
/// stops working.
///
/// # Errors
///
/// - `401 Unauthorized`: expired, tampered, wrong-type, or already-used token
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<Json<ApiResponse<TokenResponse>>> {
    let claims = jwt::validate_refresh_token(&req.refresh_token, state.jwt_secret())?;

    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid or expired token".to_string()))?;

    // Rotation check: only the latest issued refresh token is alive
    if user.refresh_token_id != Some(claims.jti) {
        tracing::warn!(user_id = %user.id, "stale refresh token presented");
        return Err(ApiError::Unauthorized("Invalid or expired token".to_string()));
    }

    let tokens = issue_and_store_pair(&state, &user).await?;

    Ok(Json(ApiResponse::new(tokens)))
}
