//! Push delivery over a web-push provider's REST API

use super::{PushMessage, PushNotifier};
use crate::config::PushConfig;
use crate::core::error::{ConfigError, StorageError};
use crate::storage::supabase::{ensure_success, send};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::time::Duration;

const BACKEND: &str = "push";

pub struct HttpPushNotifier {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    app_id: Option<String>,
}

impl HttpPushNotifier {
    /// `None` when no endpoint is configured
    pub fn from_config(config: &PushConfig) -> Result<Option<Self>, ConfigError> {
        let Some(endpoint) = config.endpoint.clone() else {
            return Ok(None);
        };
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ConfigError::Init {
                component: "push http client".to_string(),
                message: e.to_string(),
            })?;
        Ok(Some(Self {
            http,
            endpoint,
            api_key: config.api_key.clone(),
            app_id: config.app_id.clone(),
        }))
    }

    /// Provider request body
    pub fn payload(&self, message: &PushMessage) -> Value {
        let mut payload = json!({
            "headings": { "en": message.title },
            "contents": { "en": message.body },
            "included_segments": [message.audience],
        });
        if let Some(app_id) = &self.app_id {
            payload["app_id"] = json!(app_id);
        }
        if let Some(url) = &message.url {
            payload["url"] = json!(url);
        }
        payload
    }
}

#[async_trait]
impl PushNotifier for HttpPushNotifier {
    async fn send(&self, message: &PushMessage) -> Result<(), StorageError> {
        let mut request = self.http.post(&self.endpoint).json(&self.payload(message));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        ensure_success(BACKEND, send(BACKEND, request).await?).await?;
        tracing::info!(title = %message.title, audience = %message.audience, "push sent");
        Ok(())
    }
}
