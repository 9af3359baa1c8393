//! Supabase backends: PostgREST tables, Storage objects and GoTrue auth
//!
//! All three share one [`SupabaseClient`], which owns the HTTP connection pool
//! and the API keys.

pub mod auth;
pub mod objects;
pub mod postgrest;

pub use auth::SupabaseAuthProvider;
pub use objects::SupabaseObjectStore;
pub use postgrest::PostgrestDataService;

use crate::config::SupabaseConfig;
use crate::core::error::{ConfigError, StorageError};
use reqwest::{RequestBuilder, Response};
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Shared HTTP client for one Supabase project
#[derive(Clone)]
pub struct SupabaseClient {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
    /// Key used for table and storage access (service role when configured)
    api_key: String,
    service_role_key: Option<String>,
}

impl SupabaseClient {
    pub fn from_config(config: &SupabaseConfig) -> Result<Self, ConfigError> {
        let base_url = config.url.clone().ok_or_else(|| ConfigError::Missing {
            field: "supabase.url".to_string(),
            env: vec!["SUPABASE_URL".to_string()],
        })?;
        let anon_key = config
            .anon_key
            .clone()
            .or_else(|| config.service_role_key.clone())
            .ok_or_else(|| ConfigError::Missing {
                field: "supabase.anon_key".to_string(),
                env: vec!["SUPABASE_ANON_KEY".to_string()],
            })?;
        let api_key = config
            .service_role_key
            .clone()
            .unwrap_or_else(|| anon_key.clone());

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(
                config.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            ))
            .build()
            .map_err(|e| ConfigError::Init {
                component: "supabase http client".to_string(),
                message: e.to_string(),
            })?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key,
            api_key,
            service_role_key: config.service_role_key.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn service_role_key(&self) -> Option<&str> {
        self.service_role_key.as_deref()
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Attach the project key used for data and storage calls
    pub(crate) fn with_api_key(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    /// Attach the anon key plus a user's bearer token
    pub(crate) fn with_user_token(&self, request: RequestBuilder, token: &str) -> RequestBuilder {
        request.header("apikey", &self.anon_key).bearer_auth(token)
    }

    pub(crate) fn with_anon_key(&self, request: RequestBuilder) -> RequestBuilder {
        request.header("apikey", &self.anon_key)
    }
}

/// Send a request, mapping transport failures
pub(crate) async fn send(backend: &str, request: RequestBuilder) -> Result<Response, StorageError> {
    request.send().await.map_err(|e| {
        tracing::warn!(backend, error = %e, "request to backend failed");
        StorageError::Unavailable {
            backend: backend.to_string(),
            message: e.to_string(),
        }
    })
}

/// Turn a non-success response into an upstream error
pub(crate) async fn ensure_success(backend: &str, response: Response) -> Result<Response, StorageError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = upstream_message(&body);
    tracing::warn!(backend, status = status.as_u16(), %message, "backend returned an error");
    Err(StorageError::Upstream {
        backend: backend.to_string(),
        status: status.as_u16(),
        message,
    })
}

pub(crate) async fn decode<T: serde::de::DeserializeOwned>(
    backend: &str,
    response: Response,
) -> Result<T, StorageError> {
    response.json().await.map_err(|e| StorageError::Decode {
        backend: backend.to_string(),
        message: e.to_string(),
    })
}

/// Best-effort message from an error body (`message`, `error_description`, `error` or raw text)
pub(crate) fn upstream_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|json| {
            ["message", "error_description", "msg", "error"]
                .iter()
                .find_map(|key| json.get(*key).and_then(|v| v.as_str()).map(str::to_string))
        })
        .unwrap_or_else(|| {
            if body.is_empty() {
                "empty response".to_string()
            } else {
                body.chars().take(500).collect()
            }
        })
}
