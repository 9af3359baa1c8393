//! Token verification and session refresh through GoTrue (`/auth/v1`)

use super::{SupabaseClient, upstream_message};
use crate::core::auth::{AuthContext, AuthProvider, Session};
use crate::core::error::AuthError;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

#[derive(Clone)]
pub struct SupabaseAuthProvider {
    client: SupabaseClient,
}

impl SupabaseAuthProvider {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }
}

/// The part of a GoTrue user we care about
#[derive(Debug, Deserialize)]
pub struct GoTrueUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub app_metadata: Value,
}

impl GoTrueUser {
    /// Roles from `app_metadata.role`, `app_metadata.roles` and the JWT role
    pub fn roles(&self) -> Vec<String> {
        let mut roles = Vec::new();
        if let Some(role) = self.app_metadata.get("role").and_then(Value::as_str) {
            roles.push(role.to_string());
        }
        if let Some(list) = self.app_metadata.get("roles").and_then(Value::as_array) {
            roles.extend(list.iter().filter_map(Value::as_str).map(str::to_string));
        }
        if let Some(role) = &self.role {
            roles.push(role.clone());
        }
        roles.sort();
        roles.dedup();
        roles
    }

    pub fn into_context(self) -> AuthContext {
        let roles = self.roles();
        AuthContext::User {
            user_id: self.id,
            email: self.email,
            roles,
        }
    }
}

#[async_trait]
impl AuthProvider for SupabaseAuthProvider {
    async fn authenticate(&self, token: &str) -> Result<AuthContext, AuthError> {
        let request = self
            .client
            .with_user_token(self.client.http().get(self.client.url("/auth/v1/user")), token);
        let response = request.send().await.map_err(|e| {
            tracing::warn!(error = %e, "auth service unreachable");
            AuthError::InvalidToken(format!("auth service unreachable: {}", e))
        })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            tracing::debug!(status, "token rejected by auth service");
            return Err(AuthError::InvalidToken(upstream_message(&body)));
        }

        let user: GoTrueUser = response
            .json()
            .await
            .map_err(|e| AuthError::InvalidToken(format!("unexpected user payload: {}", e)))?;
        Ok(user.into_context())
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, AuthError> {
        let url = self.client.url("/auth/v1/token?grant_type=refresh_token");
        let request = self
            .client
            .with_anon_key(self.client.http().post(url))
            .json(&json!({ "refresh_token": refresh_token }));
        let response = request
            .send()
            .await
            .map_err(|e| AuthError::RefreshFailed(format!("auth service unreachable: {}", e)))?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::RefreshFailed(upstream_message(&body)));
        }

        response
            .json()
            .await
            .map_err(|e| AuthError::RefreshFailed(format!("unexpected session payload: {}", e)))
    }
}
