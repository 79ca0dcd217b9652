use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use super::response::ApiResponse;
use crate::humanize::format_bytes;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("no file was uploaded")]
    MissingFile,

    #[error("file exceeds the maximum allowed size")]
    FileTooLarge { max: u64 },

    #[error("search query is required")]
    MissingQuery,

    #[error("invalid short code")]
    InvalidCode,

    #[error("short code not found")]
    NotFound,

    #[error("file is no longer available")]
    FileMissing,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingFile | ApiError::MissingQuery => StatusCode::BAD_REQUEST,
            ApiError::FileTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::InvalidCode | ApiError::NotFound | ApiError::FileMissing => {
                StatusCode::NOT_FOUND
            }
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::MissingFile => "MISSING_FILE",
            ApiError::FileTooLarge { .. } => "FILE_TOO_LARGE",
            ApiError::MissingQuery => "MISSING_QUERY",
            ApiError::InvalidCode => "INVALID_CODE",
            ApiError::NotFound => "NOT_FOUND",
            ApiError::FileMissing => "FILE_NOT_FOUND",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Detail stays in the log; the client gets a generic message.
        let message = match &self {
            ApiError::Internal(err) => {
                tracing::error!(error = %err, "request failed");
                "Internal server error".to_string()
            }
            ApiError::FileTooLarge { max } => {
                format!("file exceeds the maximum size of {}", format_bytes(*max))
            }
            other => other.to_string(),
        };

        (
            self.status(),
            Json(ApiResponse::error(self.code(), message)),
        )
            .into_response()
    }
}
