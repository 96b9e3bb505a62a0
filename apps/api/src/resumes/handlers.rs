use axum::{
    extract::{Multipart, Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use crate::auth::extractor::AuthUser;
use crate::errors::AppError;
use crate::models::resume::ResumeSummary;
use crate::resumes::filter::{FilteredResume, SkillFilter};
use crate::resumes::store;
use crate::resumes::suggestions::{suggest_skills, MIN_QUERY_CHARS};
use crate::resumes::upload::{ingest_file, UploadResult, UploadedFile};
use crate::state::AppState;
use crate::storage;

/// Multipart field carrying resume files.
const FILES_FIELD: &str = "resumes";

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub results: Vec<UploadResult>,
}

#[derive(Debug, Serialize)]
pub struct ResumeListResponse {
    pub resumes: Vec<ResumeSummary>,
}

#[derive(Debug, Serialize)]
pub struct FilterResponse {
    pub resumes: Vec<FilteredResume>,
}

#[derive(Debug, Deserialize)]
pub struct SuggestionQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Serialize)]
pub struct SuggestionResponse {
    pub skills: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
enum Disposition {
    Inline,
    Attachment,
}

/// POST /api/v1/resumes/upload
///
/// Files are processed one after another. If the client aborts the request,
/// the remaining files are not processed; files already stored stay stored.
pub async fn handle_upload(
    State(state): State<AppState>,
    user: AuthUser,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let files = read_files(multipart).await?;
    if files.is_empty() {
        return Err(AppError::Validation("No files uploaded".to_string()));
    }

    info!("User {} uploading {} file(s)", user.user_id, files.len());

    let mut results = Vec::with_capacity(files.len());
    for file in files {
        results.push(ingest_file(&state, user.user_id, file).await);
    }

    Ok(Json(UploadResponse { results }))
}

async fn read_files(mut multipart: Multipart) -> Result<Vec<UploadedFile>, AppError> {
    let mut files = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        if field.name() != Some(FILES_FIELD) {
            continue;
        }
        // An empty file input is still submitted, as a part with no filename
        let filename = match field.file_name() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => continue,
        };
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Failed to read {filename}: {e}")))?;
        files.push(UploadedFile {
            filename,
            content_type,
            bytes,
        });
    }
    Ok(files)
}

/// GET /api/v1/resumes
pub async fn handle_list(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<ResumeListResponse>, AppError> {
    let rows = store::list_resumes(&state.db, user.resume_scope()).await?;
    Ok(Json(ResumeListResponse {
        resumes: rows.into_iter().map(ResumeSummary::from).collect(),
    }))
}

/// GET /api/v1/resumes/:id/view
pub async fn handle_view(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    serve_file(&state, &user, id, Disposition::Inline).await
}

/// GET /api/v1/resumes/:id/download
pub async fn handle_download(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    serve_file(&state, &user, id, Disposition::Attachment).await
}

async fn serve_file(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    disposition: Disposition,
) -> Result<Response, AppError> {
    let resume = store::get_resume(&state.db, id)
        .await?
        .filter(|row| user.resume_scope().allows(row))
        .ok_or_else(|| AppError::NotFound("Resume not found".to_string()))?;

    let bytes = storage::get_file(&state.s3, &state.config.s3_bucket, &resume.s3_key).await?;

    let headers = [
        (header::CONTENT_TYPE, resume.mime_type.clone()),
        (
            header::CONTENT_DISPOSITION,
            content_disposition(disposition, &resume.filename),
        ),
    ];
    Ok((headers, bytes).into_response())
}

fn content_disposition(disposition: Disposition, filename: &str) -> String {
    let kind = match disposition {
        Disposition::Inline => "inline",
        Disposition::Attachment => "attachment",
    };
    let safe: String = filename
        .chars()
        .map(|c| if c == '"' || c == '\\' || c.is_control() { '_' } else { c })
        .collect();
    format!("{kind}; filename=\"{safe}\"")
}

/// GET /api/v1/resumes/skill-suggestions?q=
///
/// Suggestions come from every stored resume, not just the caller's.
pub async fn handle_skill_suggestions(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(params): Query<SuggestionQuery>,
) -> Json<SuggestionResponse> {
    if params.q.trim().chars().count() < MIN_QUERY_CHARS {
        return Json(SuggestionResponse { skills: vec![] });
    }

    let skills = match store::all_skill_lists(&state.db).await {
        Ok(lists) => suggest_skills(&lists, &params.q),
        Err(e) => {
            error!("Error getting skill suggestions: {e}");
            vec![]
        }
    };
    Json(SuggestionResponse { skills })
}

/// POST /api/v1/resumes/filter
pub async fn handle_filter(
    State(state): State<AppState>,
    user: AuthUser,
    Json(filter): Json<SkillFilter>,
) -> Result<Json<FilterResponse>, AppError> {
    let rows = store::list_resumes(&state.db, user.resume_scope()).await?;
    Ok(Json(FilterResponse {
        resumes: filter.apply(rows),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_disposition_escapes_filename() {
        assert_eq!(
            content_disposition(Disposition::Inline, "cv.pdf"),
            "inline; filename=\"cv.pdf\""
        );
        assert_eq!(
            content_disposition(Disposition::Attachment, "my \"best\" cv.pdf"),
            "attachment; filename=\"my _best_ cv.pdf\""
        );
    }
}
