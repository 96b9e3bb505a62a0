use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub mobile: String,
    pub password_hash: String,
    pub is_active: bool,
    pub is_admin: bool,
    pub role: Option<String>,
    pub date_of_joining: NaiveDate,
    pub last_day_of_working: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

/// User as exposed over the API (no password hash).
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub mobile: String,
    pub is_active: bool,
    pub is_admin: bool,
    pub role: Option<String>,
    pub date_of_joining: NaiveDate,
    pub last_day_of_working: Option<NaiveDate>,
}

impl From<UserRow> for UserProfile {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            username: row.username,
            first_name: row.first_name,
            last_name: row.last_name,
            mobile: row.mobile,
            is_active: row.is_active,
            is_admin: row.is_admin,
            role: row.role,
            date_of_joining: row.date_of_joining,
            last_day_of_working: row.last_day_of_working,
        }
    }
}
