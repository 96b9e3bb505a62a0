mod auth;
mod config;
mod db;
mod errors;
mod extraction;
mod llm_client;
mod models;
mod parsing;
mod resumes;
mod routes;
mod state;
mod storage;

use anyhow::Result;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::auth::jwt::JwtConfig;
use crate::auth::users::ensure_bootstrap_admin;
use crate::config::Config;
use crate::db::create_pool;
use crate::llm_client::key_pool::KeyPool;
use crate::llm_client::{CompletionBackend, GeminiClient};
use crate::parsing::parser::ResumeParser;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting resume parser API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL (runs migrations)
    let db = create_pool(&config.database_url).await?;

    if let Some(admin) = &config.bootstrap_admin {
        ensure_bootstrap_admin(&db, admin).await?;
        info!("Bootstrap admin ready: {}", admin.email);
    }

    // Initialize S3 / MinIO
    let s3 = build_s3_client(&config).await;
    info!("S3 client initialized (bucket: {})", config.s3_bucket);

    // Initialize LLM backend; without keys the parser only extracts text
    let backend: Option<Arc<dyn CompletionBackend>> = if config.gemini_api_keys.is_empty() {
        None
    } else {
        let pool = Arc::new(KeyPool::new(
            config.gemini_api_keys.clone(),
            config.llm_limits,
        ));
        let client = GeminiClient::new(pool.clone(), config.gemini_model.clone())?;
        info!(
            "LLM client initialized (model: {}, keys: {})",
            client.model(),
            pool.len()
        );
        Some(Arc::new(client))
    };
    let parser = Arc::new(ResumeParser::new(backend));
    info!(
        "Resume parser ready (backend: {})",
        parser.backend_name().unwrap_or("none")
    );

    let jwt = JwtConfig {
        secret: config.jwt_secret.clone(),
        expiry_mins: config.jwt_expiry_mins,
    };

    // Build app state
    let state = AppState {
        db,
        s3,
        config: config.clone(),
        parser,
        jwt,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "resume-parser-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    aws_sdk_s3::Client::new(&s3_config)
}
