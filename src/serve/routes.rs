use axum::{routing::get, Router};
use std::sync::Arc;

use crate::api::AppState;

use super::handlers::{serve_direct, serve_short_code};

pub fn create_serve_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/file/{filename}", get(serve_direct))
        .route("/{code}", get(serve_short_code))
        .with_state(state)
}
