//! Configuration loading and management
//!
//! Settings come from an optional YAML file and are then overridden by
//! environment variables. Backend URL and keys accept the several variable
//! names the frontend tooling uses, first match wins.

use crate::core::auth::AuthContext;
use crate::core::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use uuid::Uuid;

pub const CONFIG_PATH_ENV: &str = "BACKOFFICE_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config/backoffice.yaml";

const SUPABASE_URL_VARS: &[&str] = &["SUPABASE_URL", "VITE_SUPABASE_URL", "NEXT_PUBLIC_SUPABASE_URL"];
const SUPABASE_ANON_KEY_VARS: &[&str] = &[
    "SUPABASE_ANON_KEY",
    "VITE_SUPABASE_ANON_KEY",
    "NEXT_PUBLIC_SUPABASE_ANON_KEY",
];
const SUPABASE_SERVICE_KEY_VARS: &[&str] = &["SUPABASE_SERVICE_ROLE_KEY", "SUPABASE_SERVICE_KEY"];

/// Which persistence backend the server talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Supabase,
    /// Process-local storage, lost on restart
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub backend: BackendKind,
    pub server: ServerConfig,
    pub supabase: SupabaseConfig,
    pub storage: StorageConfig,
    pub uploads: UploadConfig,
    pub auth: AuthConfig,
    pub billing: BillingConfig,
    pub site: SiteConfig,
    pub sitemap: SitemapConfig,
    pub push: PushConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origins; empty allows any origin
    pub cors_origins: Vec<String>,
    /// Body limit of every route except the file uploads
    pub max_body_bytes: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SupabaseConfig {
    pub url: Option<String>,
    pub anon_key: Option<String>,
    pub service_role_key: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub receipts_bucket: String,
    pub images_bucket: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub max_receipt_bytes: usize,
    pub max_image_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Role users need for the back office; `None` admits any signed-in user
    pub admin_role: Option<String>,
    pub session_cookie: String,
    /// Fixed tokens accepted by the in-memory backend
    pub static_tokens: Vec<StaticToken>,
}

/// A token known to the in-memory backend's auth provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticToken {
    pub token: String,
    pub user_id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
}

impl StaticToken {
    pub fn context(&self) -> AuthContext {
        AuthContext::User {
            user_id: self.user_id,
            email: self.email.clone(),
            roles: self.roles.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BillingConfig {
    pub default_interval_days: u32,
    pub max_installments: u32,
}

/// A page listed in the sitemap regardless of database content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticPage {
    pub path: String,
    #[serde(default = "default_changefreq")]
    pub changefreq: String,
    #[serde(default = "default_priority")]
    pub priority: f32,
}

fn default_changefreq() -> String {
    "monthly".to_string()
}

fn default_priority() -> f32 {
    0.5
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Public origin of the marketing site, without trailing slash
    pub base_url: String,
    pub name: String,
    pub default_title: String,
    pub default_description: String,
    pub static_pages: Vec<StaticPage>,
}

impl SiteConfig {
    /// Absolute URL of a site path
    pub fn url(&self, path: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        if path.starts_with('/') {
            format!("{}{}", base, path)
        } else {
            format!("{}/{}", base, path)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SitemapConfig {
    pub fetch_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PushConfig {
    /// Provider endpoint; push is disabled when unset
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub app_id: Option<String>,
    pub default_audience: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Supabase,
            server: ServerConfig::default(),
            supabase: SupabaseConfig::default(),
            storage: StorageConfig::default(),
            uploads: UploadConfig::default(),
            auth: AuthConfig::default(),
            billing: BillingConfig::default(),
            site: SiteConfig::default(),
            sitemap: SitemapConfig::default(),
            push: PushConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            cors_origins: Vec::new(),
            max_body_bytes: 1024 * 1024,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            receipts_bucket: "receipts".to_string(),
            images_bucket: "images".to_string(),
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_receipt_bytes: 10 * 1024 * 1024,
            max_image_bytes: 50 * 1024 * 1024,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            admin_role: None,
            session_cookie: "sb-access-token".to_string(),
            static_tokens: Vec::new(),
        }
    }
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            default_interval_days: 30,
            max_installments: 120,
        }
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5173".to_string(),
            name: "Automação Industrial".to_string(),
            default_title: "Automação Industrial".to_string(),
            default_description: "Industrial automation projects, panels and maintenance"
                .to_string(),
            static_pages: vec![
                StaticPage {
                    path: "/".to_string(),
                    changefreq: "weekly".to_string(),
                    priority: 1.0,
                },
                StaticPage {
                    path: "/services".to_string(),
                    changefreq: "monthly".to_string(),
                    priority: 0.8,
                },
                StaticPage {
                    path: "/about".to_string(),
                    changefreq: "monthly".to_string(),
                    priority: 0.6,
                },
                StaticPage {
                    path: "/contact".to_string(),
                    changefreq: "yearly".to_string(),
                    priority: 0.6,
                },
            ],
        }
    }
}

impl Default for SitemapConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_ms: 5_000,
        }
    }
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            app_id: None,
            default_audience: "admins".to_string(),
        }
    }
}

impl AppConfig {
    /// Load from the file named by `BACKOFFICE_CONFIG` (or the default path
    /// when it exists), then apply process environment overrides
    pub fn load() -> Result<Self, ConfigError> {
        let explicit = std::env::var(CONFIG_PATH_ENV).ok();
        let path = explicit.as_deref().unwrap_or(DEFAULT_CONFIG_PATH);

        let config = if explicit.is_some() || Path::new(path).exists() {
            Self::from_yaml_file(path)?
        } else {
            Self::default()
        };

        let config = config.with_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_string(),
            message: e.to_string(),
        })?;
        Self::from_yaml_str(&content).map_err(|e| match e {
            ConfigError::Parse { message, .. } => ConfigError::Parse {
                path: path.to_string(),
                message,
            },
            other => other,
        })
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::Parse {
            path: "<inline>".to_string(),
            message: e.to_string(),
        })
    }

    /// Apply overrides from an environment lookup
    pub fn with_env<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let first = |names: &[&str]| {
            names
                .iter()
                .find_map(|name| lookup(name).filter(|v| !v.trim().is_empty()))
        };

        if let Some(backend) = lookup("BACKOFFICE_BACKEND") {
            self.backend = match backend.as_str() {
                "supabase" => BackendKind::Supabase,
                "memory" => BackendKind::Memory,
                other => {
                    return Err(ConfigError::InvalidValue {
                        field: "backend".to_string(),
                        value: other.to_string(),
                    });
                }
            };
        }
        if let Some(url) = first(SUPABASE_URL_VARS) {
            self.supabase.url = Some(url);
        }
        if let Some(key) = first(SUPABASE_ANON_KEY_VARS) {
            self.supabase.anon_key = Some(key);
        }
        if let Some(key) = first(SUPABASE_SERVICE_KEY_VARS) {
            self.supabase.service_role_key = Some(key);
        }
        if let Some(host) = lookup("HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("PORT") {
            self.server.port = port.parse().map_err(|_| ConfigError::InvalidValue {
                field: "server.port".to_string(),
                value: port.clone(),
            })?;
        }
        if let Some(origins) = lookup("CORS_ORIGINS") {
            self.server.cors_origins = origins
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
        }
        if let Some(base_url) = first(&["SITE_URL", "VITE_SITE_URL"]) {
            self.site.base_url = base_url;
        }
        if let Some(role) = lookup("ADMIN_ROLE") {
            self.auth.admin_role = Some(role).filter(|r| !r.is_empty());
        }
        if let Some(endpoint) = lookup("PUSH_ENDPOINT") {
            self.push.endpoint = Some(endpoint);
        }
        if let Some(key) = lookup("PUSH_API_KEY") {
            self.push.api_key = Some(key);
        }
        if let Some(app_id) = lookup("PUSH_APP_ID") {
            self.push.app_id = Some(app_id);
        }
        Ok(self)
    }

    /// Check cross-field requirements
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backend == BackendKind::Supabase {
            if self.supabase.url.is_none() {
                return Err(ConfigError::Missing {
                    field: "supabase.url".to_string(),
                    env: SUPABASE_URL_VARS.iter().map(|s| s.to_string()).collect(),
                });
            }
            if self.supabase.anon_key.is_none() && self.supabase.service_role_key.is_none() {
                return Err(ConfigError::Missing {
                    field: "supabase.anon_key".to_string(),
                    env: SUPABASE_ANON_KEY_VARS
                        .iter()
                        .chain(SUPABASE_SERVICE_KEY_VARS)
                        .map(|s| s.to_string())
                        .collect(),
                });
            }
        }
        if self.billing.max_installments == 0 {
            return Err(ConfigError::InvalidValue {
                field: "billing.max_installments".to_string(),
                value: "0".to_string(),
            });
        }
        Ok(())
    }

    /// `host:port` to bind
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn sitemap_timeout(&self) -> Duration {
        Duration::from_millis(self.sitemap.fetch_timeout_ms)
    }

    /// Absolute URL of a site path
    pub fn site_url(&self, path: &str) -> String {
        self.site.url(path)
    }

    /// Configuration for tests: in-memory backend, small limits stay default
    pub fn for_tests() -> Self {
        Self {
            backend: BackendKind::Memory,
            site: SiteConfig {
                base_url: "https://example.com".to_string(),
                ..SiteConfig::default()
            },
            ..Self::default()
        }
    }
}
