pub mod api;
pub mod config;
pub mod humanize;
pub mod models;
pub mod serve;
pub mod shortcode;
pub mod storage;

use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use api::AppState;
use config::Config;
use storage::Storage;

/// Build the full application router: management API plus the file-serving
/// routes, sharing one state. The `/{code}` catch-all is merged last so the
/// static API paths win.
pub fn create_router(storage: Arc<dyn Storage>, config: Config) -> Router {
    let state = Arc::new(AppState { storage, config });

    api::create_api_router(Arc::clone(&state))
        .merge(serve::create_serve_router(state))
        .layer(CorsLayer::permissive())
}
