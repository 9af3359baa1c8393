//! Entity descriptor for Notification

use super::handlers::{create_notification, list_notifications};
use crate::server::entity_registry::EntityDescriptor;
use crate::server::host::AppState;
use axum::{Router, routing::get};

pub struct NotificationDescriptor;

impl EntityDescriptor for NotificationDescriptor {
    fn entity_type(&self) -> &str {
        "notification"
    }

    fn plural(&self) -> &str {
        "notifications"
    }

    fn build_routes(&self) -> Router<AppState> {
        Router::new().route(
            "/notifications",
            get(list_notifications).post(create_notification),
        )
    }
}
