//! Push notifications
//!
//! A [`PushNotifier`] delivers a message to an audience of admin devices.
//! Manual notifications come from `POST /notifications`; automatic ones are
//! produced by the [`dispatcher`] from domain events.

pub mod dispatcher;
pub mod http;

pub use dispatcher::{NotificationDispatcher, message_for};
pub use http::HttpPushNotifier;

use crate::core::error::StorageError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

/// A message ready to be pushed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushMessage {
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub url: Option<String>,
    pub audience: String,
}

#[async_trait]
pub trait PushNotifier: Send + Sync {
    async fn send(&self, message: &PushMessage) -> Result<(), StorageError>;

    /// Whether messages actually leave the process
    fn is_enabled(&self) -> bool {
        true
    }
}

/// Notifier used when no push provider is configured
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

#[async_trait]
impl PushNotifier for NoopNotifier {
    async fn send(&self, message: &PushMessage) -> Result<(), StorageError> {
        tracing::debug!(title = %message.title, audience = %message.audience, "push disabled, message dropped");
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        false
    }
}

/// Keeps every message it is asked to send
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<PushMessage>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<PushMessage> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl PushNotifier for RecordingNotifier {
    async fn send(&self, message: &PushMessage) -> Result<(), StorageError> {
        self.sent
            .lock()
            .map_err(|e| StorageError::Poisoned(e.to_string()))?
            .push(message.clone());
        Ok(())
    }
}
