//! Multipart reading and file checks shared by upload endpoints

use crate::core::error::{AppError, UploadError};
use axum::extract::Multipart;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

static UNSAFE_FILENAME_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9._-]+").expect("static regex"));

const MAX_FILENAME_LEN: usize = 100;

/// Combined size of the text fields accepted next to an uploaded file
pub const MAX_TEXT_FIELD_BYTES: usize = 64 * 1024;

/// A file read from a multipart body
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Client-side name as sent
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Declared content type without parameters, lowercased
    pub fn mime(&self) -> Option<String> {
        self.content_type
            .as_deref()
            .map(|ct| ct.split(';').next().unwrap_or(ct).trim().to_ascii_lowercase())
    }
}

/// The file part plus any plain text fields of a form
#[derive(Debug, Default)]
pub struct UploadForm {
    pub file: Option<UploadedFile>,
    pub fields: HashMap<String, String>,
}

impl UploadForm {
    pub fn require_file(&mut self, field: &str) -> Result<UploadedFile, UploadError> {
        self.file
            .take()
            .ok_or_else(|| UploadError::MissingField(field.to_string()))
    }
}

/// Read a multipart body, stopping as soon as the file exceeds `max_bytes`
///
/// Upload routes run without axum's body limit, so this is what bounds the
/// request: one file of at most `max_bytes` plus [`MAX_TEXT_FIELD_BYTES`] of
/// text fields.
pub async fn read_upload_form(
    mut multipart: Multipart,
    file_field: &str,
    max_bytes: usize,
) -> Result<UploadForm, AppError> {
    let mut form = UploadForm::default();
    let mut text_bytes = 0;

    while let Some(mut field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        if name == file_field {
            if form.file.is_some() {
                return Err(UploadError::Multipart(format!("more than one '{}' field", name)).into());
            }
            let filename = field.file_name().unwrap_or("upload").to_string();
            let content_type = field.content_type().map(str::to_string);
            let mut bytes = Vec::new();
            while let Some(chunk) = field.chunk().await? {
                if bytes.len() + chunk.len() > max_bytes {
                    return Err(UploadError::TooLarge {
                        size: bytes.len() + chunk.len(),
                        limit: max_bytes,
                    }
                    .into());
                }
                bytes.extend_from_slice(&chunk);
            }
            form.file = Some(UploadedFile {
                filename,
                content_type,
                bytes,
            });
        } else {
            let mut bytes = Vec::new();
            while let Some(chunk) = field.chunk().await? {
                text_bytes += chunk.len();
                if text_bytes > MAX_TEXT_FIELD_BYTES {
                    return Err(UploadError::TooLarge {
                        size: text_bytes,
                        limit: MAX_TEXT_FIELD_BYTES,
                    }
                    .into());
                }
                bytes.extend_from_slice(&chunk);
            }
            if !name.is_empty() {
                let value = String::from_utf8(bytes).map_err(|_| {
                    UploadError::Multipart(format!("field '{}' is not valid UTF-8", name))
                })?;
                form.fields.insert(name, value);
            }
        }
    }

    Ok(form)
}

/// Check the declared media type against an allow-list
pub fn ensure_allowed_type(file: &UploadedFile, allowed: &[&str]) -> Result<String, UploadError> {
    let mime = file.mime().unwrap_or_default();
    if allowed.contains(&mime.as_str()) {
        Ok(mime)
    } else {
        Err(UploadError::UnsupportedType {
            content_type: if mime.is_empty() {
                "unknown".to_string()
            } else {
                mime
            },
            allowed: allowed.iter().map(|s| s.to_string()).collect(),
        })
    }
}

/// Make a client folder safe to use as a storage path prefix
///
/// Every segment is cleaned like a file name; segments left empty, such as
/// `..`, are dropped.
pub fn sanitize_folder(folder: &str, fallback: &str) -> String {
    let segments: Vec<String> = folder
        .split(['/', '\\'])
        .map(|segment| {
            UNSAFE_FILENAME_CHARS
                .replace_all(segment, "_")
                .trim_matches(|c| c == '.' || c == '_')
                .to_string()
        })
        .filter(|segment| !segment.is_empty())
        .collect();
    if segments.is_empty() {
        fallback.to_string()
    } else {
        segments.join("/")
    }
}

/// Make a client file name safe to use as the last storage path segment
pub fn sanitize_filename(name: &str, fallback: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned = UNSAFE_FILENAME_CHARS.replace_all(base, "_");
    let cleaned = cleaned.trim_matches(|c| c == '.' || c == '_');
    if cleaned.is_empty() {
        return fallback.to_string();
    }
    let mut out: String = cleaned.chars().take(MAX_FILENAME_LEN).collect();
    if out.starts_with('-') {
        out.insert(0, '_');
    }
    out
}

/// Reject paths that could escape a folder or address a bucket root
pub fn ensure_relative_path(path: &str) -> Result<(), UploadError> {
    let invalid = path.is_empty()
        || path.starts_with('/')
        || path.contains('\\')
        || path.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..");
    if invalid {
        Err(UploadError::InvalidPath(path.to_string()))
    } else {
        Ok(())
    }
}
