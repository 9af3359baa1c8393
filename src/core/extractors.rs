//! Axum extractors for authenticated callers and validated payloads

use crate::core::auth::{AuthContext, AuthPolicy, extract_token};
use crate::core::error::{AppError, AuthError};
use crate::server::host::AppState;
use axum::{
    Json,
    extract::{FromRequest, FromRequestParts, Request},
    http::request::Parts,
};
use serde::de::DeserializeOwned;
use validator::Validate;

/// The authenticated back-office caller
///
/// Rejects with 401 when no token is present or the auth provider does not
/// accept it, and with 403 when the caller lacks the configured admin role.
///
/// # Usage
///
/// ```rust,ignore
/// pub async fn delete_bill(
///     State(state): State<AppState>,
///     CurrentUser(caller): CurrentUser,
///     Path(id): Path<Uuid>,
/// ) -> Result<StatusCode, AppError> {
///     tracing::info!(caller = %caller.principal(), %id, "deleting bill");
///     ...
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentUser(pub AuthContext);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = extract_token(&parts.headers, &state.config.auth.session_cookie)
            .ok_or(AuthError::MissingToken)?;
        let context = state.authenticate(&token).await?;

        let policy = AuthPolicy::back_office(state.config.auth.admin_role.as_deref());
        if !policy.check(&context) {
            tracing::warn!(caller = %context.principal(), "caller lacks the back-office role");
            return Err(AuthError::Forbidden("back-office role required".to_string()).into());
        }
        Ok(CurrentUser(context))
    }
}

/// URL path parameters; a malformed value is a 400 in the JSON error format
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct Path<T>(pub T);

/// Query string parameters; a malformed value is a 400 in the JSON error format
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct QueryString<T>(pub T);

/// JSON body deserialized and checked with `validator`
///
/// Malformed JSON is a 400, field validation failures are a 422 listing
/// every invalid field.
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(payload) = Json::<T>::from_request(req, state).await?;
        payload.validate()?;
        Ok(ValidatedJson(payload))
    }
}
