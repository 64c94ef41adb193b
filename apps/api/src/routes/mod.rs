pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::state::AppState;
use crate::tailoring::handlers;

/// Multipart framing and the posting fields on top of the resume itself.
const FORM_OVERHEAD_BYTES: usize = 256 * 1024;

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_resume_bytes + FORM_OVERHEAD_BYTES;

    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/api/v1/requirements",
            post(handlers::handle_extract_requirements),
        )
        .route("/api/v1/tailor", post(handlers::handle_tailor))
        .route(
            "/api/v1/tailor/upload",
            post(handlers::handle_tailor_upload),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
