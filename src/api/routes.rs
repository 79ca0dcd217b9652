use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;

use super::handlers::{
    delete_url, health_check, list_urls, popular_urls, recent_uploads, search_urls, stats,
    upload_file, AppState,
};

/// Slack on top of the configured max so the handler, not the body-limit
/// layer, decides oversized uploads and answers with the 413 envelope.
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

pub fn create_api_router(state: Arc<AppState>) -> Router {
    let body_limit = state.config.upload.max_file_size as usize + MULTIPART_OVERHEAD;

    Router::new()
        .route(
            "/upload",
            post(upload_file).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/urls", get(list_urls))
        .route("/urls/recent", get(recent_uploads))
        .route("/urls/popular", get(popular_urls))
        .route("/urls/search", get(search_urls))
        .route("/urls/{code}", delete(delete_url))
        .route("/stats", get(stats))
        .route("/health", get(health_check))
        .with_state(state)
}
