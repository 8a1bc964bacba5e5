use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Failures that abort a single ticket render. No partial document is
/// returned for any of them.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to encode code image: {0}")]
    CodeEncode(String),

    #[error("failed to load font asset {path}: {reason}")]
    AssetLoad { path: String, reason: String },

    #[error("failed to decode embedded image: {0}")]
    Image(String),

    #[error("failed to write PDF: {0}")]
    Serialization(String),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to save {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to set up object store client for bucket {bucket}: {reason}")]
    Client { bucket: String, reason: String },

    #[error("upload of {key} to bucket {bucket} failed: {reason}")]
    Upload {
        bucket: String,
        key: String,
        reason: String,
    },
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("worker failed: {0}")]
    Worker(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            other => {
                tracing::error!("Internal Server Error: {}", other);
                (StatusCode::INTERNAL_SERVER_ERROR, "Failed to generate PDF".to_string())
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
