//! Storage request/response models

use serde::{Deserialize, Serialize};

/// POST /api/storage/presigned-url/upload
#[derive(Debug, Deserialize)]
pub struct PresignUploadRequest {
    /// Top-level key prefix, either "users" or "personas"
    pub category: String,
    pub filename: String,
}

#[derive(Debug, Serialize)]
pub struct PresignUploadResponse {
    pub upload_url: String,
    pub object_key: String,
    pub expires_in_seconds: u64,
}

/// GET /api/storage/presigned-url/download
#[derive(Debug, Deserialize)]
pub struct PresignDownloadQuery {
    pub object_key: String,
}

#[derive(Debug, Serialize)]
pub struct PresignDownloadResponse {
    pub download_url: String,
    pub expires_in_seconds: u64,
}
