//! User persistence.

use chrono::NaiveDate;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::auth::password::hash_password_blocking;
use crate::config::BootstrapAdmin;
use crate::errors::AppError;
use crate::models::user::UserRow;

pub struct NewUser<'a> {
    pub email: &'a str,
    pub username: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub mobile: &'a str,
    pub password_hash: &'a str,
    pub is_admin: bool,
    pub role: Option<&'a str>,
    pub date_of_joining: Option<NaiveDate>,
}

/// Emails are matched case-insensitively and stored lower-cased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<UserRow>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM users WHERE email = $1")
        .bind(normalize_email(email))
        .fetch_optional(pool)
        .await
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<UserRow>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn list_users(pool: &PgPool) -> Result<Vec<UserRow>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM users ORDER BY email")
        .fetch_all(pool)
        .await
}

/// Inserts a user. Email/username collisions surface as a validation error.
pub async fn insert_user(pool: &PgPool, user: NewUser<'_>) -> Result<UserRow, AppError> {
    let result = sqlx::query_as(
        r#"
        INSERT INTO users
            (email, username, first_name, last_name, mobile, password_hash,
             is_admin, role, date_of_joining)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, COALESCE($9, CURRENT_DATE))
        RETURNING *
        "#,
    )
    .bind(normalize_email(user.email))
    .bind(user.username.trim())
    .bind(user.first_name)
    .bind(user.last_name)
    .bind(user.mobile)
    .bind(user.password_hash)
    .bind(user.is_admin)
    .bind(user.role)
    .bind(user.date_of_joining)
    .fetch_one(pool)
    .await;

    match result {
        Ok(row) => Ok(row),
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(AppError::Validation(
            "A user with this email or username already exists".to_string(),
        )),
        Err(e) => Err(AppError::Database(e)),
    }
}

/// Creates the configured admin account unless it already exists.
pub async fn ensure_bootstrap_admin(pool: &PgPool, admin: &BootstrapAdmin) -> anyhow::Result<()> {
    if find_by_email(pool, &admin.email).await?.is_some() {
        return Ok(());
    }

    let password_hash = hash_password_blocking(admin.password.clone()).await?;
    let email = normalize_email(&admin.email);
    let username = email.split('@').next().unwrap_or(&email).to_string();

    insert_user(
        pool,
        NewUser {
            email: &email,
            username: &username,
            first_name: "",
            last_name: "",
            mobile: "",
            password_hash: &password_hash,
            is_admin: true,
            role: Some("admin"),
            date_of_joining: None,
        },
    )
    .await
    .map_err(|e| anyhow::anyhow!("Failed to create bootstrap admin: {e}"))?;

    info!("Created bootstrap admin {email}");
    Ok(())
}
