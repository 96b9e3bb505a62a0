//! Bearer-token extractors for Axum handlers.

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::auth::jwt::validate_token;
use crate::auth::users;
use crate::errors::AppError;
use crate::resumes::store::ResumeScope;
use crate::state::AppState;

/// Caller identity taken from `Authorization: Bearer <token>`. The account is
/// re-read on every request; the admin flag comes from the row, not the token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub is_admin: bool,
}

impl AuthUser {
    /// Admins see every resume, everyone else only their own uploads.
    pub fn resume_scope(&self) -> ResumeScope {
        if self.is_admin {
            ResumeScope::All
        } else {
            ResumeScope::UploadedBy(self.user_id)
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".into()))?;

        let token = header.strip_prefix("Bearer ").ok_or_else(|| {
            AppError::Unauthorized("Invalid Authorization format. Expected: Bearer <token>".into())
        })?;

        let claims = validate_token(token, &state.jwt)
            .map_err(|_| AppError::Unauthorized("Invalid or expired token".into()))?;

        // Deactivation and role changes apply to tokens issued earlier
        let user = users::find_by_id(&state.db, claims.sub)
            .await?
            .filter(|user| user.is_active)
            .ok_or_else(|| AppError::Unauthorized("Account is inactive or no longer exists".into()))?;

        Ok(AuthUser {
            user_id: user.id,
            is_admin: user.is_admin,
        })
    }
}

/// Requires an admin token. Rejects with 403 otherwise.
pub struct RequireAdmin(pub AuthUser);

#[async_trait]
impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_admin {
            return Err(AppError::Forbidden("Admin role required".into()));
        }
        Ok(RequireAdmin(user))
    }
}
