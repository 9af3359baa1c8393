//! Site image uploads

use crate::core::error::{AppError, UploadError};
use crate::core::extractors::{CurrentUser, QueryString};
use crate::core::upload::{
    UploadedFile, ensure_allowed_type, ensure_relative_path, read_upload_form, sanitize_filename,
    sanitize_folder,
};
use crate::server::host::AppState;
use axum::{
    Json,
    extract::{Multipart, State},
    http::StatusCode,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

const FILE_FIELD: &str = "file";
const FOLDER_FIELD: &str = "folder";
const DEFAULT_FOLDER: &str = "uploads";

pub const IMAGE_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/webp",
    "image/avif",
    "image/svg+xml",
];

#[derive(Debug, Serialize)]
pub struct UploadedImage {
    pub bucket: String,
    pub path: String,
    pub url: String,
    pub content_type: String,
    pub size: usize,
}

#[derive(Debug, Deserialize)]
pub struct RemoveQuery {
    pub path: String,
}

/// Check type, size and, for raster formats, the file signature
pub fn validate_image(file: &UploadedFile, max_bytes: usize) -> Result<String, UploadError> {
    if file.size() > max_bytes {
        return Err(UploadError::TooLarge {
            size: file.size(),
            limit: max_bytes,
        });
    }
    let mime = ensure_allowed_type(file, IMAGE_TYPES)?;
    let bytes = file.bytes.as_slice();
    let matches = match mime.as_str() {
        "image/jpeg" => bytes.starts_with(&[0xFF, 0xD8, 0xFF]),
        "image/png" => bytes.starts_with(b"\x89PNG\r\n\x1a\n"),
        "image/gif" => bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a"),
        "image/webp" => bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP",
        _ => true,
    };
    if matches {
        Ok(mime)
    } else {
        Err(UploadError::ContentMismatch(mime))
    }
}

/// `POST /uploads`: multipart `file` plus an optional `folder`
pub async fn upload_image(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    multipart: Multipart,
) -> Result<(StatusCode, Json<UploadedImage>), AppError> {
    let max_bytes = state.config.uploads.max_image_bytes;
    let mut form = read_upload_form(multipart, FILE_FIELD, max_bytes).await?;
    let file = form.require_file(FILE_FIELD)?;
    let content_type = validate_image(&file, max_bytes)?;

    let folder = sanitize_folder(
        form.fields.get(FOLDER_FIELD).map(String::as_str).unwrap_or_default(),
        DEFAULT_FOLDER,
    );
    ensure_relative_path(&folder)?;

    let path = format!(
        "{}/{}_{}",
        folder,
        Utc::now().timestamp_millis(),
        sanitize_filename(&file.filename, "image")
    );
    let bucket = state.config.storage.images_bucket.clone();
    let size = file.size();
    let stored = state
        .objects
        .upload(&bucket, &path, file.bytes, &content_type)
        .await?;

    tracing::info!(%bucket, %path, size, caller = %caller.principal(), "image uploaded");
    Ok((
        StatusCode::CREATED,
        Json(UploadedImage {
            bucket: stored.bucket,
            path: stored.path,
            url: stored.public_url,
            content_type,
            size,
        }),
    ))
}

/// `DELETE /uploads?path=...`
pub async fn remove_image(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    QueryString(query): QueryString<RemoveQuery>,
) -> Result<StatusCode, AppError> {
    ensure_relative_path(&query.path)?;
    let bucket = &state.config.storage.images_bucket;
    state
        .objects
        .remove(bucket, std::slice::from_ref(&query.path))
        .await?;
    tracing::info!(%bucket, path = %query.path, caller = %caller.principal(), "image removed");
    Ok(StatusCode::NO_CONTENT)
}
