use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use std::path::Path as FsPath;
use std::sync::Arc;

use super::error::ApiError;
use super::response::{ApiResponse, Pagination};
use crate::config::Config;
use crate::humanize::format_bytes;
use crate::models::NewUrlRecord;
use crate::shortcode;
use crate::storage::{Storage, StorageError};

pub struct AppState {
    pub storage: Arc<dyn Storage>,
    pub config: Config,
}

impl AppState {
    /// Base for the short/direct URLs in upload responses: the configured
    /// public base when set, otherwise the request's Host header.
    fn base_url(&self, headers: &HeaderMap) -> String {
        if let Some(base) = &self.config.server.public_base_url {
            return base.clone();
        }

        let host = headers
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .map(|h| h.to_string())
            .unwrap_or_else(|| {
                format!("{}:{}", self.config.server.host, self.config.server.port)
            });

        format!("http://{host}")
    }
}

#[derive(Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_list_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_list_limit() -> i64 {
    100
}

#[derive(Deserialize)]
pub struct LimitQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    10
}

#[derive(Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: Option<String>,
}

const SEARCH_LIMIT: i64 = 100;

/// Extension of the uploaded name, dot included, or empty when there is none.
fn file_extension(original_name: &str) -> String {
    FsPath::new(original_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{ext}"))
        .unwrap_or_default()
}

/// Upload a file and allocate a short code for it
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse>), ApiError> {
    let mut upload = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("multipart read failed: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let original_name = field.file_name().unwrap_or("upload").to_string();
        let mimetype = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::Internal(anyhow::anyhow!("multipart read failed: {e}")))?;

        upload = Some((original_name, mimetype, data));
        break;
    }

    let (original_name, mimetype, data) = upload.ok_or(ApiError::MissingFile)?;

    let max = state.config.upload.max_file_size;
    if data.len() as u64 > max {
        return Err(ApiError::FileTooLarge { max });
    }

    let code = shortcode::generate_unique(
        state.storage.as_ref(),
        state.config.upload.short_code_length,
    )
    .await?;

    let ext = file_extension(&original_name);
    let millis = chrono::Utc::now().timestamp_millis();
    let filename = format!("{millis}-{code}{ext}");

    let upload_dir = FsPath::new(&state.config.upload.dir);
    tokio::fs::write(upload_dir.join(&filename), &data)
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("failed to write upload: {e}")))?;

    let mut new_record = NewUrlRecord {
        short_code: code,
        filename,
        original_name,
        size: data.len() as i64,
        mimetype,
    };

    let record = match state.storage.insert(&new_record).await {
        Ok(record) => record,
        Err(StorageError::Conflict) => {
            // Lost the race between the uniqueness pre-check and the insert.
            // One retry with a fresh extended code; the file moves with it.
            let code = shortcode::generate(8);
            let filename = format!("{}-{}{}", millis, code, file_extension(&new_record.original_name));

            tokio::fs::rename(
                upload_dir.join(&new_record.filename),
                upload_dir.join(&filename),
            )
            .await
            .map_err(|e| ApiError::Internal(anyhow::anyhow!("failed to rename upload: {e}")))?;

            new_record.short_code = code;
            new_record.filename = filename;

            state
                .storage
                .insert(&new_record)
                .await
                .map_err(|e| ApiError::Internal(anyhow::anyhow!("insert failed after retry: {e}")))?
        }
        Err(StorageError::Other(e)) => return Err(ApiError::Internal(e)),
    };

    let base = state.base_url(&headers);
    let short_url = format!("{base}/{}", record.short_code);
    let direct_url = format!("{base}/file/{}", record.filename);
    tracing::info!(
        short_code = %record.short_code,
        size = record.size,
        "file uploaded"
    );

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok_with_message(
            "File uploaded successfully",
            json!({
                "shortCode": record.short_code,
                "shortUrl": short_url,
                "directUrl": direct_url,
                "filename": record.filename,
                "originalName": record.original_name,
                "size": record.size,
                "sizeFormatted": format_bytes(record.size as u64),
                "mimetype": record.mimetype,
            }),
        )),
    ))
}

/// Paged listing of all uploads, newest first
pub async fn list_urls(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ApiResponse>, ApiError> {
    let records = state.storage.list(query.limit, query.offset).await?;
    let total = state.storage.count().await?;

    Ok(Json(
        ApiResponse::ok(serde_json::to_value(&records).map_err(anyhow::Error::from)?)
            .with_pagination(Pagination::new(query.limit, query.offset, total)),
    ))
}

/// Most recently uploaded files
pub async fn recent_uploads(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<ApiResponse>, ApiError> {
    let records = state.storage.recent(query.limit).await?;
    let count = records.len();

    Ok(Json(
        ApiResponse::ok(serde_json::to_value(&records).map_err(anyhow::Error::from)?)
            .with_meta(json!({ "count": count })),
    ))
}

/// Most accessed files; never includes untouched records
pub async fn popular_urls(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<ApiResponse>, ApiError> {
    let records = state.storage.most_accessed(query.limit).await?;
    let count = records.len();

    Ok(Json(
        ApiResponse::ok(serde_json::to_value(&records).map_err(anyhow::Error::from)?)
            .with_meta(json!({ "count": count })),
    ))
}

/// Substring search over original filenames
pub async fn search_urls(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<ApiResponse>, ApiError> {
    let q = query
        .q
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or(ApiError::MissingQuery)?;

    let records = state.storage.search(q, SEARCH_LIMIT).await?;
    let count = records.len();

    Ok(Json(
        ApiResponse::ok(serde_json::to_value(&records).map_err(anyhow::Error::from)?)
            .with_meta(json!({ "query": q, "count": count })),
    ))
}

/// Delete a mapping and best-effort remove its backing file
pub async fn delete_url(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<Json<ApiResponse>, ApiError> {
    let record = state
        .storage
        .find_by_code(&code)
        .await?
        .ok_or(ApiError::NotFound)?;

    if !state.storage.delete(&code).await? {
        return Err(ApiError::NotFound);
    }

    // The record is gone either way; a failed unlink only leaves an orphan.
    let path = FsPath::new(&state.config.upload.dir).join(&record.filename);
    if let Err(err) = tokio::fs::remove_file(&path).await {
        tracing::warn!(
            short_code = %code,
            file = %record.filename,
            error = %err,
            "failed to remove backing file"
        );
    }

    Ok(Json(ApiResponse::ok_with_message(
        "URL deleted successfully",
        json!({
            "shortCode": record.short_code,
            "originalName": record.original_name,
        }),
    )))
}

/// Aggregate stats from the store plus a live scan of the upload directory
pub async fn stats(State(state): State<Arc<AppState>>) -> Result<Json<ApiResponse>, ApiError> {
    let store = state.storage.aggregate_stats().await?;

    let mut file_count: u64 = 0;
    let mut disk_bytes: u64 = 0;
    match tokio::fs::read_dir(&state.config.upload.dir).await {
        Ok(mut entries) => loop {
            match entries.next_entry().await {
                Ok(Some(entry)) => match entry.metadata().await {
                    Ok(meta) if meta.is_file() => {
                        file_count += 1;
                        disk_bytes += meta.len();
                    }
                    Ok(_) => {}
                    Err(err) => {
                        tracing::debug!(entry = ?entry.path(), error = %err, "skipping unreadable entry");
                    }
                },
                Ok(None) => break,
                Err(err) => {
                    tracing::debug!(error = %err, "upload directory scan stopped early");
                    break;
                }
            }
        },
        Err(err) => {
            tracing::debug!(dir = %state.config.upload.dir, error = %err, "upload directory not readable");
        }
    }

    Ok(Json(ApiResponse::ok(json!({
        "totalUrls": store.count,
        "totalSize": format_bytes(store.total_size as u64),
        "totalAccesses": store.total_access,
        "avgFileSize": format_bytes(store.average_size as u64),
        "storage": {
            "fileCount": file_count,
            "totalSize": format_bytes(disk_bytes),
        },
        "config": {
            "maxFileSize": format_bytes(state.config.upload.max_file_size),
            "uploadDir": state.config.upload.dir.as_str(),
            "shortCodeLength": state.config.upload.short_code_length,
        },
    }))))
}

/// Liveness plus feature flags
pub async fn health_check() -> Json<ApiResponse> {
    Json(ApiResponse::ok_with_message(
        "OK",
        json!({
            "service": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
            "features": {
                "upload": true,
                "search": true,
                "stats": true,
            },
        }),
    ))
}
