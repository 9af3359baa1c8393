//! Server host: the shared service container
//!
//! Every handler receives an [`AppState`] (an `Arc<ServerHost>`) holding the
//! configuration and one trait object per external seam. The in-memory and
//! Supabase backends plug in behind the same traits.

use crate::config::{AppConfig, BackendKind};
use crate::core::auth::{AuthContext, AuthProvider, StaticAuthProvider};
use crate::core::error::{AuthError, ConfigError};
use crate::core::events::EventBus;
use crate::core::service::{DataService, ObjectStore};
use crate::entities::bill::{Bill, Installment};
use crate::entities::client::Client;
use crate::entities::notification::Notification;
use crate::entities::quotation::Quotation;
use crate::entities::seo::SeoSetting;
use crate::notify::{HttpPushNotifier, NoopNotifier, PushNotifier};
use crate::storage::{
    InMemoryDataService, InMemoryObjectStore, PostgrestDataService, SupabaseAuthProvider,
    SupabaseClient, SupabaseObjectStore,
};
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tera::Tera;

/// State shared by all handlers
pub type AppState = Arc<ServerHost>;

/// One data service per backend table
#[derive(Clone)]
pub struct Tables {
    pub clients: Arc<dyn DataService<Client>>,
    pub bills: Arc<dyn DataService<Bill>>,
    pub installments: Arc<dyn DataService<Installment>>,
    pub quotations: Arc<dyn DataService<Quotation>>,
    pub seo: Arc<dyn DataService<SeoSetting>>,
    pub notifications: Arc<dyn DataService<Notification>>,
}

impl Tables {
    pub fn in_memory() -> Self {
        Self {
            clients: Arc::new(InMemoryDataService::<Client>::new()),
            bills: Arc::new(InMemoryDataService::<Bill>::new()),
            installments: Arc::new(InMemoryDataService::<Installment>::new()),
            quotations: Arc::new(InMemoryDataService::<Quotation>::new()),
            seo: Arc::new(InMemoryDataService::<SeoSetting>::new()),
            notifications: Arc::new(InMemoryDataService::<Notification>::new()),
        }
    }

    pub fn postgrest(client: &SupabaseClient) -> Self {
        Self {
            clients: Arc::new(PostgrestDataService::<Client>::new(client.clone())),
            bills: Arc::new(PostgrestDataService::<Bill>::new(client.clone())),
            installments: Arc::new(PostgrestDataService::<Installment>::new(client.clone())),
            quotations: Arc::new(PostgrestDataService::<Quotation>::new(client.clone())),
            seo: Arc::new(PostgrestDataService::<SeoSetting>::new(client.clone())),
            notifications: Arc::new(PostgrestDataService::<Notification>::new(client.clone())),
        }
    }
}

/// The external seams chosen for a configuration
pub struct Backends {
    pub tables: Tables,
    pub objects: Arc<dyn ObjectStore>,
    pub auth: Arc<dyn AuthProvider>,
    pub notifier: Arc<dyn PushNotifier>,
}

impl Backends {
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        let notifier: Arc<dyn PushNotifier> = match HttpPushNotifier::from_config(&config.push)? {
            Some(notifier) => Arc::new(notifier),
            None => Arc::new(NoopNotifier),
        };

        match config.backend {
            BackendKind::Supabase => {
                let client = SupabaseClient::from_config(&config.supabase)?;
                tracing::info!(url = client.base_url(), "using supabase backend");
                Ok(Self {
                    tables: Tables::postgrest(&client),
                    objects: Arc::new(SupabaseObjectStore::new(client.clone())),
                    auth: Arc::new(SupabaseAuthProvider::new(client)),
                    notifier,
                })
            }
            BackendKind::Memory => {
                tracing::warn!("using in-memory backend, data is lost on restart");
                let auth = config
                    .auth
                    .static_tokens
                    .iter()
                    .fold(StaticAuthProvider::new(), |provider, entry| {
                        provider.with_token(&entry.token, entry.context())
                    });
                Ok(Self {
                    tables: Tables::in_memory(),
                    objects: Arc::new(InMemoryObjectStore::default()),
                    auth: Arc::new(auth),
                    notifier,
                })
            }
        }
    }
}

/// Host context containing all service state
pub struct ServerHost {
    pub config: Arc<AppConfig>,
    pub auth: Arc<dyn AuthProvider>,
    pub tables: Tables,
    pub objects: Arc<dyn ObjectStore>,
    pub notifier: Arc<dyn PushNotifier>,
    pub events: EventBus,
    pub templates: Arc<Tera>,
}

impl ServerHost {
    /// Resolve a bearer token to a caller
    ///
    /// The service-role key is accepted as a service identity; any other
    /// token goes to the auth provider.
    pub async fn authenticate(&self, token: &str) -> Result<AuthContext, AuthError> {
        let is_service_key = self
            .config
            .supabase
            .service_role_key
            .as_deref()
            .is_some_and(|key| matches_service_key(key, token));
        if is_service_key {
            return Ok(AuthContext::Service {
                service_name: "service_role".to_string(),
            });
        }
        self.auth.authenticate(token).await
    }
}

/// Constant-time comparison against the service-role key
fn matches_service_key(key: &str, token: &str) -> bool {
    !key.is_empty() && bool::from(key.as_bytes().ct_eq(token.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::site::templates;
    use uuid::Uuid;

    fn host(config: AppConfig, auth: StaticAuthProvider) -> ServerHost {
        ServerHost {
            config: Arc::new(config),
            auth: Arc::new(auth),
            tables: Tables::in_memory(),
            objects: Arc::new(InMemoryObjectStore::default()),
            notifier: Arc::new(NoopNotifier),
            events: EventBus::default(),
            templates: Arc::new(templates::build().unwrap()),
        }
    }

    #[tokio::test]
    async fn test_service_role_key_yields_service_context() {
        let mut config = AppConfig::for_tests();
        config.supabase.service_role_key = Some("service-secret".to_string());
        let host = host(config, StaticAuthProvider::new());

        let context = host.authenticate("service-secret").await.unwrap();
        assert!(context.is_service());
        assert!(host.authenticate("other").await.is_err());
    }

    #[test]
    fn test_matches_service_key() {
        assert!(matches_service_key("service-secret", "service-secret"));
        assert!(!matches_service_key("service-secret", "service-secreT"));
        assert!(!matches_service_key("service-secret", "service"));
        assert!(!matches_service_key("service-secret", "service-secret-and-more"));
        assert!(!matches_service_key("", ""));
    }

    #[tokio::test]
    async fn test_user_tokens_go_to_provider() {
        let user = AuthContext::User {
            user_id: Uuid::new_v4(),
            email: None,
            roles: vec![],
        };
        let host = host(
            AppConfig::for_tests(),
            StaticAuthProvider::new().with_token("user-token", user.clone()),
        );
        assert_eq!(host.authenticate("user-token").await.unwrap(), user);
    }

    #[test]
    fn test_memory_backends_from_config() {
        let backends = Backends::from_config(&AppConfig::for_tests()).unwrap();
        assert!(!backends.notifier.is_enabled());
    }
}
