//! Authentication and authorization
//!
//! Tokens are never verified locally: an [`AuthProvider`] asks the
//! backend-as-a-service who the bearer is. A missing or rejected token is
//! always a 401, there is no fallback identity.

use crate::core::error::AuthError;
use async_trait::async_trait;
use axum::http::HeaderMap;
use axum::http::header::{AUTHORIZATION, COOKIE};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

/// Authorization context derived from a request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuthContext {
    /// A signed-in back-office user
    User {
        user_id: Uuid,
        email: Option<String>,
        roles: Vec<String>,
    },

    /// A caller holding the service-role key (schedulers, scripts)
    Service { service_name: String },

    Anonymous,
}

impl AuthContext {
    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            AuthContext::User { user_id, .. } => Some(*user_id),
            _ => None,
        }
    }

    pub fn is_service(&self) -> bool {
        matches!(self, AuthContext::Service { .. })
    }

    pub fn has_role(&self, role: &str) -> bool {
        match self {
            AuthContext::User { roles, .. } => roles.iter().any(|r| r == role),
            _ => false,
        }
    }

    /// Short label for logs
    pub fn principal(&self) -> String {
        match self {
            AuthContext::User { user_id, .. } => user_id.to_string(),
            AuthContext::Service { service_name } => format!("service:{}", service_name),
            AuthContext::Anonymous => "anonymous".to_string(),
        }
    }
}

/// Authorization policy for an operation
#[derive(Debug, Clone)]
pub enum AuthPolicy {
    Public,

    /// Any authenticated user or service
    Authenticated,

    /// User must have one of these roles
    HasRole(Vec<String>),

    ServiceOnly,

    /// Combination of policies (OR)
    Or(Vec<AuthPolicy>),
}

impl AuthPolicy {
    pub fn check(&self, context: &AuthContext) -> bool {
        match self {
            AuthPolicy::Public => true,
            AuthPolicy::Authenticated => !matches!(context, AuthContext::Anonymous),
            AuthPolicy::HasRole(required) => required.iter().any(|r| context.has_role(r)),
            AuthPolicy::ServiceOnly => context.is_service(),
            AuthPolicy::Or(policies) => policies.iter().any(|p| p.check(context)),
        }
    }

    /// Policy guarding the back-office routes
    ///
    /// Without an admin role every authenticated caller is let in; with one,
    /// users need the role and service callers always pass.
    pub fn back_office(admin_role: Option<&str>) -> Self {
        match admin_role {
            Some(role) => AuthPolicy::Or(vec![
                AuthPolicy::HasRole(vec![role.to_string()]),
                AuthPolicy::ServiceOnly,
            ]),
            None => AuthPolicy::Authenticated,
        }
    }
}

/// A session as returned by the auth backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub user: Option<serde_json::Value>,
}

/// Resolves tokens to identities
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Verify an access token and return who it belongs to
    async fn authenticate(&self, token: &str) -> Result<AuthContext, AuthError>;

    /// Exchange a refresh token for a new session
    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, AuthError>;
}

/// Pull the access token from `Authorization: Bearer` or the session cookie
pub fn extract_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| {
            let (scheme, token) = v.trim().split_once(' ')?;
            scheme.eq_ignore_ascii_case("bearer").then(|| token.trim())
        })
        .filter(|t| !t.is_empty());

    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == cookie_name && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

/// Token table provider for tests and local development
///
/// Knows only the tokens it was given; everything else is rejected.
#[derive(Clone, Default)]
pub struct StaticAuthProvider {
    tokens: Arc<RwLock<HashMap<String, AuthContext>>>,
    refresh_tokens: Arc<RwLock<HashMap<String, Session>>>,
}

impl StaticAuthProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(self, token: &str, context: AuthContext) -> Self {
        if let Ok(mut tokens) = self.tokens.write() {
            tokens.insert(token.to_string(), context);
        }
        self
    }

    pub fn with_refresh_token(self, refresh_token: &str, session: Session) -> Self {
        if let Ok(mut sessions) = self.refresh_tokens.write() {
            sessions.insert(refresh_token.to_string(), session);
        }
        self
    }
}

#[async_trait]
impl AuthProvider for StaticAuthProvider {
    async fn authenticate(&self, token: &str) -> Result<AuthContext, AuthError> {
        let tokens = self
            .tokens
            .read()
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;
        tokens
            .get(token)
            .cloned()
            .ok_or_else(|| AuthError::InvalidToken("unknown token".to_string()))
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, AuthError> {
        let sessions = self
            .refresh_tokens
            .read()
            .map_err(|e| AuthError::RefreshFailed(e.to_string()))?;
        sessions
            .get(refresh_token)
            .cloned()
            .ok_or_else(|| AuthError::RefreshFailed("unknown refresh token".to_string()))
    }
}
