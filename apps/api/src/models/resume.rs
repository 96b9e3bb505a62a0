use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::parsing::WorkExperience;

/// A stored resume joined with its uploader's email.
#[derive(Debug, Clone, FromRow)]
pub struct ResumeRow {
    pub id: Uuid,
    pub filename: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub linkedin: Option<String>,
    pub github: Option<String>,
    pub skills: Vec<String>,
    pub ug_degree: Option<String>,
    pub ug_college: Option<String>,
    pub ug_year: Option<i32>,
    pub pg_degree: Option<String>,
    pub pg_college: Option<String>,
    pub pg_year: Option<i32>,
    pub total_experience_years: Option<String>,
    pub work_experience: Json<Vec<WorkExperience>>,
    pub s3_key: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub uploaded_by: Option<Uuid>,
    pub uploaded_by_email: Option<String>,
    pub content_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Listing entry for the resume table.
#[derive(Debug, Clone, Serialize)]
pub struct ResumeSummary {
    pub id: Uuid,
    pub filename: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub linkedin: Option<String>,
    pub github: Option<String>,
    pub skills: Vec<String>,
    pub ug_degree: Option<String>,
    pub ug_college: Option<String>,
    pub ug_year: Option<i32>,
    pub pg_degree: Option<String>,
    pub pg_college: Option<String>,
    pub pg_year: Option<i32>,
    pub total_experience_years: Option<String>,
    pub work_experience: Vec<WorkExperience>,
    pub mime_type: String,
    pub size_bytes: i64,
    pub uploaded_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<ResumeRow> for ResumeSummary {
    fn from(row: ResumeRow) -> Self {
        Self {
            id: row.id,
            filename: row.filename,
            name: row.name,
            email: row.email,
            phone: row.phone,
            linkedin: row.linkedin,
            github: row.github,
            skills: row.skills,
            ug_degree: row.ug_degree,
            ug_college: row.ug_college,
            ug_year: row.ug_year,
            pg_degree: row.pg_degree,
            pg_college: row.pg_college,
            pg_year: row.pg_year,
            total_experience_years: row.total_experience_years,
            work_experience: row.work_experience.0,
            mime_type: row.mime_type,
            size_bytes: row.size_bytes,
            uploaded_by: row.uploaded_by_email,
            created_at: row.created_at,
        }
    }
}
