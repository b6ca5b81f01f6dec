//! Presigned URL handlers
//!
//! Clients upload and download object bytes against S3 directly; the API
//! only hands out short-lived URLs scoped to a single object key.

use axum::extract::{Extension, Json, Query};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use super::models::{
    PresignDownloadQuery, PresignDownloadResponse, PresignUploadRequest, PresignUploadResponse,
};
use crate::auth::AuthedUser;
use crate::common::{ApiError, AppState};
use crate::services::s3::S3Error;

const UPLOAD_URL_TTL_SECONDS: u64 = 600;
const DOWNLOAD_URL_TTL_SECONDS: u64 = 3600;

const ALLOWED_CATEGORIES: &[&str] = &["users", "personas"];

fn map_s3_error(err: S3Error) -> ApiError {
    match err {
        S3Error::NotConfigured => {
            ApiError::ServiceUnavailable("object storage not configured".to_string())
        }
        S3Error::OperationFailed(msg) => ApiError::InternalServer(msg),
    }
}

/// POST /api/storage/presigned-url/upload
pub async fn presign_upload(
    Extension(state): Extension<Arc<AppState>>,
    authed: AuthedUser,
    Json(payload): Json<PresignUploadRequest>,
) -> Result<Json<PresignUploadResponse>, ApiError> {
    if !ALLOWED_CATEGORIES.contains(&payload.category.as_str()) {
        return Err(ApiError::ValidationError(
            "category must be one of: users, personas".to_string(),
        ));
    }

    let filename = payload.filename.trim();
    if filename.is_empty() || filename.len() > 255 {
        return Err(ApiError::ValidationError(
            "filename must be between 1 and 255 characters".to_string(),
        ));
    }

    // Random prefix so repeated uploads of the same filename never collide
    let object_key = format!(
        "{}/{}_{}",
        payload.category,
        uuid::Uuid::new_v4(),
        urlencoding::encode(filename)
    );

    let upload_url = state
        .s3
        .presign_upload(&object_key, Duration::from_secs(UPLOAD_URL_TTL_SECONDS))
        .await
        .map_err(map_s3_error)?;

    info!(user_id = %authed.id, object_key = %object_key, "Presigned upload URL issued");

    Ok(Json(PresignUploadResponse {
        upload_url,
        object_key,
        expires_in_seconds: UPLOAD_URL_TTL_SECONDS,
    }))
}

/// GET /api/storage/presigned-url/download
pub async fn presign_download(
    Extension(state): Extension<Arc<AppState>>,
    _authed: AuthedUser,
    Query(query): Query<PresignDownloadQuery>,
) -> Result<Json<PresignDownloadResponse>, ApiError> {
    let object_key = query.object_key.trim();
    if object_key.is_empty() || object_key.contains("..") {
        return Err(ApiError::ValidationError(
            "object_key is invalid".to_string(),
        ));
    }

    let download_url = state
        .s3
        .presign_download(object_key, Duration::from_secs(DOWNLOAD_URL_TTL_SECONDS))
        .await
        .map_err(map_s3_error)?;

    Ok(Json(PresignDownloadResponse {
        download_url,
        expires_in_seconds: DOWNLOAD_URL_TTL_SECONDS,
    }))
}
