pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::auth::handlers as auth;
use crate::resumes::handlers as resumes;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let upload_limit = DefaultBodyLimit::max(state.config.max_upload_bytes);

    Router::new()
        .route("/health", get(health::health_handler))
        // Auth
        .route("/api/v1/auth/login", post(auth::handle_login))
        .route("/api/v1/auth/me", get(auth::handle_me))
        .route(
            "/api/v1/users",
            get(auth::handle_list_users).post(auth::handle_create_user),
        )
        // Resumes
        .route("/api/v1/resumes", get(resumes::handle_list))
        .route(
            "/api/v1/resumes/upload",
            post(resumes::handle_upload).layer(upload_limit),
        )
        .route(
            "/api/v1/resumes/skill-suggestions",
            get(resumes::handle_skill_suggestions),
        )
        .route("/api/v1/resumes/filter", post(resumes::handle_filter))
        .route("/api/v1/resumes/:id/view", get(resumes::handle_view))
        .route("/api/v1/resumes/:id/download", get(resumes::handle_download))
        .with_state(state)
}
