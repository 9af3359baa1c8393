//! Typed error handling for the back-office API
//!
//! Every handler returns `Result<_, AppError>`. Each error category maps to an
//! HTTP status and a stable error code so the admin UI can branch on failures
//! without parsing messages.
//!
//! # Error Categories
//!
//! - [`EntityError`]: record lookups and referential checks
//! - [`ValidationError`]: malformed or invalid input
//! - [`AuthError`]: authentication and authorization failures
//! - [`StorageError`]: database and object storage backends
//! - [`UploadError`]: multipart upload checks (size, media type)
//! - [`BillingError`]: installment scheduling and status transitions
//! - [`ConfigError`]: configuration loading
//!
//! # Example
//!
//! ```rust,ignore
//! async fn load_bill(state: &AppState, id: Uuid) -> Result<Bill, AppError> {
//!     state
//!         .bills
//!         .get(&id)
//!         .await?
//!         .ok_or_else(|| EntityError::not_found("bill", id).into())
//! }
//! ```

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::collections::BTreeMap;
use uuid::Uuid;

/// The main error type of the service
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Entity(#[from] EntityError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error(transparent)]
    Billing(#[from] BillingError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Should not happen in normal operation
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Human-readable error message
    pub error: String,
    /// Error code for programmatic handling
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl AppError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Entity(e) => e.status_code(),
            AppError::Validation(e) => e.status_code(),
            AppError::Auth(e) => e.status_code(),
            AppError::Storage(e) => e.status_code(),
            AppError::Upload(e) => e.status_code(),
            AppError::Billing(e) => e.status_code(),
            AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Entity(e) => e.error_code(),
            AppError::Validation(e) => e.error_code(),
            AppError::Auth(e) => e.error_code(),
            AppError::Storage(e) => e.error_code(),
            AppError::Upload(e) => e.error_code(),
            AppError::Billing(e) => e.error_code(),
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            error: self.to_string(),
            code: self.error_code().to_string(),
            details: self.details(),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            AppError::Entity(EntityError::NotFound { entity_type, id }) => {
                Some(serde_json::json!({
                    "entity_type": entity_type,
                    "id": id.to_string()
                }))
            }
            AppError::Validation(ValidationError::Fields(fields)) => {
                Some(serde_json::json!({ "fields": fields }))
            }
            AppError::Upload(UploadError::TooLarge { limit, .. }) => {
                Some(serde_json::json!({ "limit_bytes": limit }))
            }
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.error_code(), error = %self, "request failed");
        } else {
            tracing::debug!(code = self.error_code(), error = %self, "request rejected");
        }
        (status, Json(self.to_response())).into_response()
    }
}

// =============================================================================
// Entity Errors
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum EntityError {
    #[error("{entity_type} with id '{id}' not found")]
    NotFound { entity_type: String, id: Uuid },

    /// A unique key is already taken
    #[error("{entity_type} with {field} '{value}' already exists")]
    AlreadyExists {
        entity_type: String,
        field: String,
        value: String,
    },

    /// The record is still referenced by other records
    #[error("{entity_type} '{id}' is still referenced by {count} {referenced_by}")]
    InUse {
        entity_type: String,
        id: Uuid,
        referenced_by: String,
        count: usize,
    },

    /// The child record does not belong to the parent in the path
    #[error("{child} '{child_id}' does not belong to {parent} '{parent_id}'")]
    Mismatch {
        child: String,
        child_id: Uuid,
        parent: String,
        parent_id: Uuid,
    },
}

impl EntityError {
    pub fn not_found(entity_type: &str, id: Uuid) -> Self {
        EntityError::NotFound {
            entity_type: entity_type.to_string(),
            id,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            EntityError::NotFound { .. } | EntityError::Mismatch { .. } => StatusCode::NOT_FOUND,
            EntityError::AlreadyExists { .. } | EntityError::InUse { .. } => StatusCode::CONFLICT,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            EntityError::NotFound { .. } => "ENTITY_NOT_FOUND",
            EntityError::AlreadyExists { .. } => "ENTITY_ALREADY_EXISTS",
            EntityError::InUse { .. } => "ENTITY_IN_USE",
            EntityError::Mismatch { .. } => "ENTITY_MISMATCH",
        }
    }
}

// =============================================================================
// Validation Errors
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid field '{field}': {message}")]
    Field { field: String, message: String },

    /// Field name -> messages
    #[error("Validation failed for {} field(s)", .0.len())]
    Fields(BTreeMap<String, Vec<String>>),

    #[error("Invalid request body: {0}")]
    MalformedBody(String),

    #[error("Invalid query parameter '{name}': {message}")]
    Query { name: String, message: String },

    #[error("Invalid path parameter: {0}")]
    Path(String),

    #[error("Request body is too large: {0}")]
    BodyTooLarge(String),
}

impl ValidationError {
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        ValidationError::Field {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ValidationError::MalformedBody(_)
            | ValidationError::Query { .. }
            | ValidationError::Path(_) => StatusCode::BAD_REQUEST,
            ValidationError::BodyTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ValidationError::Field { .. } | ValidationError::Fields(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ValidationError::Field { .. } | ValidationError::Fields(_) => "VALIDATION_ERROR",
            ValidationError::MalformedBody(_) => "MALFORMED_BODY",
            ValidationError::Query { .. } => "INVALID_QUERY",
            ValidationError::Path(_) => "INVALID_PATH",
            ValidationError::BodyTooLarge(_) => "BODY_TOO_LARGE",
        }
    }
}

impl From<validator::ValidationErrors> for ValidationError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let fields = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let messages = errs
                    .iter()
                    .map(|e| {
                        e.message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| e.code.to_string())
                    })
                    .collect();
                (field.to_string(), messages)
            })
            .collect();
        ValidationError::Fields(fields)
    }
}

// =============================================================================
// Auth Errors
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Missing access token")]
    MissingToken,

    #[error("Invalid or expired token: {0}")]
    InvalidToken(String),

    #[error("Session refresh failed: {0}")]
    RefreshFailed(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingToken | AuthError::InvalidToken(_) | AuthError::RefreshFailed(_) => {
                StatusCode::UNAUTHORIZED
            }
            AuthError::Forbidden(_) => StatusCode::FORBIDDEN,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingToken => "MISSING_TOKEN",
            AuthError::InvalidToken(_) => "INVALID_TOKEN",
            AuthError::RefreshFailed(_) => "REFRESH_FAILED",
            AuthError::Forbidden(_) => "FORBIDDEN",
        }
    }
}

// =============================================================================
// Storage Errors
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The backend answered with an error
    #[error("{backend} returned {status}: {message}")]
    Upstream {
        backend: String,
        status: u16,
        message: String,
    },

    /// The backend could not be reached
    #[error("{backend} is unavailable: {message}")]
    Unavailable { backend: String, message: String },

    #[error("Failed to decode {backend} response: {message}")]
    Decode { backend: String, message: String },

    #[error("Record '{id}' not found in table '{table}'")]
    MissingRow { table: String, id: Uuid },

    #[error("Storage object '{path}' not found in bucket '{bucket}'")]
    MissingObject { bucket: String, path: String },

    #[error("Storage lock poisoned: {0}")]
    Poisoned(String),
}

impl StorageError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            StorageError::Upstream { .. } | StorageError::Decode { .. } => StatusCode::BAD_GATEWAY,
            StorageError::Unavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            StorageError::MissingRow { .. } | StorageError::MissingObject { .. } => {
                StatusCode::NOT_FOUND
            }
            StorageError::Poisoned(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            StorageError::Upstream { .. } => "UPSTREAM_ERROR",
            StorageError::Unavailable { .. } => "UPSTREAM_UNAVAILABLE",
            StorageError::Decode { .. } => "UPSTREAM_DECODE_ERROR",
            StorageError::MissingRow { .. } => "ROW_NOT_FOUND",
            StorageError::MissingObject { .. } => "OBJECT_NOT_FOUND",
            StorageError::Poisoned(_) => "STORAGE_ERROR",
        }
    }
}

// =============================================================================
// Upload Errors
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Missing multipart field '{0}'")]
    MissingField(String),

    #[error("File is {size} bytes, the limit is {limit} bytes")]
    TooLarge { size: usize, limit: usize },

    #[error("Unsupported media type '{content_type}', expected one of: {}", .allowed.join(", "))]
    UnsupportedType {
        content_type: String,
        allowed: Vec<String>,
    },

    #[error("File content does not match its declared type '{0}'")]
    ContentMismatch(String),

    #[error("Invalid multipart body: {0}")]
    Multipart(String),

    #[error("Invalid storage path '{0}'")]
    InvalidPath(String),
}

impl UploadError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            UploadError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            UploadError::UnsupportedType { .. } | UploadError::ContentMismatch(_) => {
                StatusCode::UNSUPPORTED_MEDIA_TYPE
            }
            UploadError::MissingField(_)
            | UploadError::Multipart(_)
            | UploadError::InvalidPath(_) => StatusCode::BAD_REQUEST,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            UploadError::MissingField(_) => "UPLOAD_MISSING_FILE",
            UploadError::TooLarge { .. } => "UPLOAD_TOO_LARGE",
            UploadError::UnsupportedType { .. } => "UPLOAD_UNSUPPORTED_TYPE",
            UploadError::ContentMismatch(_) => "UPLOAD_CONTENT_MISMATCH",
            UploadError::Multipart(_) => "UPLOAD_MULTIPART_ERROR",
            UploadError::InvalidPath(_) => "UPLOAD_INVALID_PATH",
        }
    }
}

// =============================================================================
// Billing Errors
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum BillingError {
    #[error("Installment count must be between 1 and {max}, got {count}")]
    InvalidInstallmentCount { count: u32, max: u32 },

    #[error("Amount must be greater than zero")]
    NonPositiveAmount,

    #[error("Interval must be at least one day when there is more than one installment")]
    InvalidInterval,

    #[error("Due date out of range for installment {number}")]
    DueDateOverflow { number: u32 },

    #[error("Cannot move {entity} from '{from}' to '{to}'")]
    InvalidTransition {
        entity: &'static str,
        from: String,
        to: String,
    },

    #[error("Installment {installment_id} has no receipt")]
    NoReceipt { installment_id: Uuid },
}

impl BillingError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            BillingError::InvalidTransition { .. } => StatusCode::CONFLICT,
            BillingError::NoReceipt { .. } => StatusCode::NOT_FOUND,
            _ => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            BillingError::InvalidInstallmentCount { .. } => "INVALID_INSTALLMENT_COUNT",
            BillingError::NonPositiveAmount => "NON_POSITIVE_AMOUNT",
            BillingError::InvalidInterval => "INVALID_INTERVAL",
            BillingError::DueDateOverflow { .. } => "DUE_DATE_OVERFLOW",
            BillingError::InvalidTransition { .. } => "INVALID_STATUS_TRANSITION",
            BillingError::NoReceipt { .. } => "RECEIPT_NOT_FOUND",
        }
    }
}

// =============================================================================
// Config Errors
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {message}")]
    Io { path: String, message: String },

    #[error("Failed to parse config file '{path}': {message}")]
    Parse { path: String, message: String },

    #[error("Missing required setting '{field}' (set one of: {})", .env.join(", "))]
    Missing { field: String, env: Vec<String> },

    #[error("Invalid value '{value}' for setting '{field}'")]
    InvalidValue { field: String, value: String },

    #[error("Failed to build {component}: {message}")]
    Init { component: String, message: String },
}

// =============================================================================
// Conversions from external errors
// =============================================================================

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(format!("JSON error: {}", err))
    }
}

impl From<tera::Error> for AppError {
    fn from(err: tera::Error) -> Self {
        AppError::Internal(format!("Template error: {}", err))
    }
}

impl From<axum::extract::multipart::MultipartError> for AppError {
    fn from(err: axum::extract::multipart::MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return AppError::Validation(ValidationError::BodyTooLarge(err.body_text()));
        }
        AppError::Upload(UploadError::Multipart(err.body_text()))
    }
}

impl From<axum::extract::rejection::JsonRejection> for AppError {
    fn from(rejection: axum::extract::rejection::JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ValidationError::BodyTooLarge(rejection.body_text()).into()
        } else {
            ValidationError::MalformedBody(rejection.body_text()).into()
        }
    }
}

impl From<axum::extract::rejection::PathRejection> for AppError {
    fn from(rejection: axum::extract::rejection::PathRejection) -> Self {
        AppError::Validation(ValidationError::Path(rejection.body_text()))
    }
}

impl From<axum::extract::rejection::QueryRejection> for AppError {
    fn from(rejection: axum::extract::rejection::QueryRejection) -> Self {
        AppError::Validation(ValidationError::Query {
            name: "query".to_string(),
            message: rejection.body_text(),
        })
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.into())
    }
}
