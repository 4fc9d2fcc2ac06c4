use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::AppState;

/// Room for multipart boundaries and headers on top of the file itself, so
/// oversize files still reach validation.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn create_router(state: Arc<AppState>) -> Router {
    let upload_limit = usize::try_from(state.config.max_upload_size)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD);

    Router::new()
        // Resumes
        .route(
            "/resumes",
            get(handlers::list_resumes)
                .post(handlers::upload_resume)
                .layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/resumes/watch", get(handlers::watch_resumes))
        .route("/resumes/:id/download", get(handlers::download_resume))
        .route("/resumes/:id", delete(handlers::delete_resume))
        // Internal
        .route("/_internal/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
