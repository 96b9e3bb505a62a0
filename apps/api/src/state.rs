use std::sync::Arc;

use aws_sdk_s3::Client as S3Client;
use sqlx::PgPool;

use crate::auth::jwt::JwtConfig;
use crate::config::Config;
use crate::parsing::parser::ResumeParser;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub s3: S3Client,
    pub config: Config,
    /// Extract-only when no Gemini keys are configured.
    pub parser: Arc<ResumeParser>,
    pub jwt: JwtConfig,
}
