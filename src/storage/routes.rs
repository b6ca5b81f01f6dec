//! Storage routes

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{presign_download, presign_upload};

pub fn storage_routes() -> Router {
    Router::new()
        .route("/api/storage/presigned-url/upload", post(presign_upload))
        .route("/api/storage/presigned-url/download", get(presign_download))
}
