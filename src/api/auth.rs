//! Session endpoints

use crate::core::auth::{AuthContext, Session};
use crate::core::error::AppError;
use crate::core::extractors::{CurrentUser, ValidatedJson};
use crate::server::host::AppState;
use axum::{Json, extract::State};
use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct RefreshRequest {
    #[validate(length(min = 1, message = "refresh_token is required"))]
    pub refresh_token: String,
}

/// Exchange a refresh token for a new session
pub async fn refresh_session(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<RefreshRequest>,
) -> Result<Json<Session>, AppError> {
    let session = state.auth.refresh_session(&request.refresh_token).await?;
    tracing::debug!("session refreshed");
    Ok(Json(session))
}

/// The caller as resolved from its token
pub async fn me(CurrentUser(caller): CurrentUser) -> Json<AuthContext> {
    Json(caller)
}
