use axum::{extract::State, http::StatusCode, Json};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::auth::extractor::{AuthUser, RequireAdmin};
use crate::auth::jwt::generate_access_token;
use crate::auth::password::{
    hash_password_blocking, validate_password_strength, verify_password_blocking,
};
use crate::auth::users::{self, NewUser};
use crate::errors::AppError;
use crate::models::user::UserProfile;
use crate::state::AppState;

const INVALID_CREDENTIALS: &str = "Invalid email or password";

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
    pub user: UserProfile,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub mobile: String,
    #[serde(default)]
    pub is_admin: bool,
    pub role: Option<String>,
    pub date_of_joining: Option<NaiveDate>,
}

/// POST /api/v1/auth/login
pub async fn handle_login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let user = users::find_by_email(&state.db, &req.email).await?;

    let password_ok = verify_password_blocking(
        req.password,
        user.as_ref().map(|u| u.password_hash.clone()),
    )
    .await?;

    let user = match user {
        Some(user) if password_ok && user.is_active => user,
        Some(user) => {
            warn!("Login failed for {}", user.email);
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.into()));
        }
        None => {
            warn!("Login failed for unknown email {}", req.email);
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.into()));
        }
    };

    let access_token = generate_access_token(user.id, user.is_admin, &state.jwt)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to sign token: {e}")))?;

    info!("Login successful for {}", user.email);
    Ok(Json(LoginResponse {
        access_token,
        token_type: "Bearer",
        expires_in: state.jwt.expiry_mins * 60,
        user: user.into(),
    }))
}

/// GET /api/v1/auth/me
pub async fn handle_me(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<UserProfile>, AppError> {
    let row = users::find_by_id(&state.db, user.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;
    Ok(Json(row.into()))
}

/// GET /api/v1/users
pub async fn handle_list_users(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<Vec<UserProfile>>, AppError> {
    let rows = users::list_users(&state.db).await?;
    Ok(Json(rows.into_iter().map(UserProfile::from).collect()))
}

/// POST /api/v1/users
pub async fn handle_create_user(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(req): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserProfile>), AppError> {
    if req.email.trim().is_empty() || !req.email.contains('@') {
        return Err(AppError::Validation("A valid email is required".into()));
    }
    if req.username.trim().is_empty() {
        return Err(AppError::Validation("username cannot be empty".into()));
    }
    validate_password_strength(&req.password).map_err(AppError::Validation)?;

    let password_hash = hash_password_blocking(req.password.clone()).await?;

    let row = users::insert_user(
        &state.db,
        NewUser {
            email: &req.email,
            username: &req.username,
            first_name: &req.first_name,
            last_name: &req.last_name,
            mobile: &req.mobile,
            password_hash: &password_hash,
            is_admin: req.is_admin,
            role: req.role.as_deref(),
            date_of_joining: req.date_of_joining,
        },
    )
    .await?;

    info!("User {} created by admin {}", row.email, admin.user_id);
    Ok((StatusCode::CREATED, Json(row.into())))
}
