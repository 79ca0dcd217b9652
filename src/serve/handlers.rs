use axum::{
    body::Body,
    extract::{Path, State},
    http::header,
    response::IntoResponse,
};
use std::path::Path as FsPath;
use std::sync::Arc;

use crate::api::{ApiError, AppState};
use crate::shortcode;

/// Resolve a short code: look up the record, make sure the bytes are still
/// on disk, bump the access counter, and stream the file with its stored
/// content type.
pub async fn serve_short_code(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    if !shortcode::is_valid_code(&code) {
        return Err(ApiError::InvalidCode);
    }

    let record = state
        .storage
        .find_by_code(&code)
        .await?
        .ok_or(ApiError::NotFound)?;

    let path = FsPath::new(&state.config.upload.dir).join(&record.filename);
    let data = tokio::fs::read(&path).await.map_err(|err| {
        tracing::warn!(short_code = %code, file = %record.filename, error = %err, "backing file unreadable");
        ApiError::FileMissing
    })?;

    if let Err(err) = state.storage.increment_access(&code).await {
        tracing::warn!(short_code = %code, error = %err, "failed to record access");
    }

    Ok((
        [(header::CONTENT_TYPE, record.mimetype)],
        Body::from(data),
    ))
}

/// Serve a file by its stored on-disk name. Skips the store entirely, so
/// access counts are untouched; content type comes from the extension.
pub async fn serve_direct(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    // Generated names never contain separators; anything else is not ours.
    if filename.contains(['/', '\\']) || filename.contains("..") {
        return Err(ApiError::FileMissing);
    }

    let path = FsPath::new(&state.config.upload.dir).join(&filename);
    let data = tokio::fs::read(&path)
        .await
        .map_err(|_| ApiError::FileMissing)?;

    let mimetype = mime_guess::from_path(&filename)
        .first_or_octet_stream()
        .to_string();

    Ok(([(header::CONTENT_TYPE, mimetype)], Body::from(data)))
}
