//! Notification HTTP handlers

use super::model::{Notification, NotificationInput};
use crate::core::error::AppError;
use crate::core::extractors::{CurrentUser, QueryString, ValidatedJson};
use crate::core::query::{ListParams, PaginatedResponse, Query, SortDirection};
use crate::server::host::AppState;
use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use chrono::Utc;

pub async fn list_notifications(
    State(state): State<AppState>,
    _caller: CurrentUser,
    QueryString(params): QueryString<ListParams>,
) -> Result<Json<PaginatedResponse<Notification>>, AppError> {
    let query = Query::new();
    let total = state.tables.notifications.count(&query).await?;
    let query = query
        .order_by("created_at", SortDirection::Desc)
        .paginate(&params);
    let notifications = state.tables.notifications.list(&query).await?;
    Ok(Json(PaginatedResponse::new(notifications, &params, total)))
}

/// Push a notification and record the outcome
///
/// A delivery failure is stored on the row rather than failing the request.
pub async fn create_notification(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    ValidatedJson(input): ValidatedJson<NotificationInput>,
) -> Result<(StatusCode, Json<Notification>), AppError> {
    let mut notification =
        Notification::new(input, &state.config.push.default_audience, caller.user_id());

    if !state.notifier.is_enabled() {
        notification.mark_failed("push notifications are not configured");
    } else {
        match state.notifier.send(&notification.message()).await {
            Ok(()) => notification.mark_sent(Utc::now()),
            Err(e) => {
                tracing::warn!(title = %notification.title, error = %e, "push delivery failed");
                notification.mark_failed(e.to_string());
            }
        }
    }

    let notification = state.tables.notifications.insert(notification).await?;
    tracing::info!(
        notification_id = %notification.id,
        sent = notification.sent,
        caller = %caller.principal(),
        "notification recorded"
    );
    Ok((StatusCode::CREATED, Json(notification)))
}
