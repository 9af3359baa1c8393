//! Push notification log

use crate::entities::blank_as_none;
use crate::impl_record;
use crate::notify::PushMessage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// A push notification and its delivery outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub url: Option<String>,
    pub audience: String,
    #[serde(default)]
    pub sent: bool,
    #[serde(default)]
    pub sent_at: Option<DateTime<Utc>>,
    /// Delivery failure, if any
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl_record!(Notification, "notifications", "notification");

/// Payload of `POST /notifications`
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NotificationInput {
    #[validate(length(min = 1, max = 120, message = "title is required"))]
    pub title: String,
    #[validate(length(min = 1, max = 500, message = "body is required"))]
    pub body: String,
    #[serde(default, deserialize_with = "blank_as_none")]
    #[validate(length(max = 500))]
    pub url: Option<String>,
    /// Defaults to the configured audience
    #[serde(default, deserialize_with = "blank_as_none")]
    #[validate(length(max = 100))]
    pub audience: Option<String>,
}

impl Notification {
    pub fn new(input: NotificationInput, default_audience: &str, created_by: Option<Uuid>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: input.title,
            body: input.body,
            url: input.url,
            audience: input
                .audience
                .unwrap_or_else(|| default_audience.to_string()),
            sent: false,
            sent_at: None,
            error: None,
            created_by,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn message(&self) -> PushMessage {
        PushMessage {
            title: self.title.clone(),
            body: self.body.clone(),
            url: self.url.clone(),
            audience: self.audience.clone(),
        }
    }

    pub fn mark_sent(&mut self, at: DateTime<Utc>) {
        self.sent = true;
        self.sent_at = Some(at);
        self.error = None;
    }

    pub fn mark_failed(&mut self, error: impl Into<String>) {
        self.sent = false;
        self.sent_at = None;
        self.error = Some(error.into());
    }
}
