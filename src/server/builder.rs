//! ServerBuilder for fluent API to build the HTTP server

use super::entity_registry::EntityRegistry;
use super::host::{AppState, Backends, ServerHost, Tables};
use super::router::build_router;
use crate::config::AppConfig;
use crate::core::auth::AuthProvider;
use crate::core::events::EventBus;
use crate::core::service::ObjectStore;
use crate::entities;
use crate::notify::{NotificationDispatcher, PushNotifier};
use crate::site::templates;
use anyhow::Result;
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;

const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// Builder for the back-office server
///
/// Seams that are not set explicitly come from the configuration's backend.
///
/// # Example
///
/// ```ignore
/// let app = ServerBuilder::new()
///     .with_config(AppConfig::load()?)
///     .build()?;
/// ```
pub struct ServerBuilder {
    config: Option<AppConfig>,
    tables: Option<Tables>,
    objects: Option<Arc<dyn ObjectStore>>,
    auth: Option<Arc<dyn AuthProvider>>,
    notifier: Option<Arc<dyn PushNotifier>>,
    entity_registry: EntityRegistry,
    custom_routes: Vec<Router<AppState>>,
    event_capacity: usize,
    dispatch_notifications: bool,
}

impl ServerBuilder {
    /// Create a builder with every entity registered
    pub fn new() -> Self {
        let mut entity_registry = EntityRegistry::new();
        entities::register_all(&mut entity_registry);
        Self {
            config: None,
            tables: None,
            objects: None,
            auth: None,
            notifier: None,
            entity_registry,
            custom_routes: Vec::new(),
            event_capacity: DEFAULT_EVENT_CAPACITY,
            dispatch_notifications: true,
        }
    }

    /// Set the configuration (required)
    pub fn with_config(mut self, config: AppConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn with_tables(mut self, tables: Tables) -> Self {
        self.tables = Some(tables);
        self
    }

    pub fn with_object_store(mut self, objects: impl ObjectStore + 'static) -> Self {
        self.objects = Some(Arc::new(objects));
        self
    }

    pub fn with_auth_provider(mut self, auth: impl AuthProvider + 'static) -> Self {
        self.auth = Some(Arc::new(auth));
        self
    }

    pub fn with_notifier(mut self, notifier: impl PushNotifier + 'static) -> Self {
        self.notifier = Some(Arc::new(notifier));
        self
    }

    /// Add routes that are not entity CRUD (webhooks, jobs)
    pub fn with_custom_routes(mut self, routes: Router<AppState>) -> Self {
        self.custom_routes.push(routes);
        self
    }

    /// Buffer size of the domain event channel
    pub fn with_event_bus(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// Whether `build` starts the push dispatcher (on by default)
    pub fn with_notification_dispatch(mut self, enabled: bool) -> Self {
        self.dispatch_notifications = enabled;
        self
    }

    /// Build the shared service container
    pub fn build_host(&mut self) -> Result<ServerHost> {
        let config = self
            .config
            .take()
            .ok_or_else(|| anyhow::anyhow!("AppConfig is required. Call .with_config()"))?;
        config.validate()?;

        let defaults = Backends::from_config(&config)?;
        let host = ServerHost {
            auth: self.auth.take().unwrap_or(defaults.auth),
            tables: self.tables.take().unwrap_or(defaults.tables),
            objects: self.objects.take().unwrap_or(defaults.objects),
            notifier: self.notifier.take().unwrap_or(defaults.notifier),
            events: EventBus::new(self.event_capacity),
            templates: Arc::new(templates::build()?),
            config: Arc::new(config),
        };
        Ok(host)
    }

    /// Build the router; starts the notification dispatcher when a push
    /// provider is configured
    pub fn build(mut self) -> Result<Router> {
        let host = Arc::new(self.build_host()?);

        if self.dispatch_notifications && host.notifier.is_enabled() {
            NotificationDispatcher::new(
                host.notifier.clone(),
                host.config.push.default_audience.clone(),
            )
            .spawn(&host.events);
            tracing::info!("push notification dispatcher started");
        }

        let custom_routes = std::mem::take(&mut self.custom_routes);
        Ok(build_router(host, &self.entity_registry, custom_routes))
    }

    /// Serve on the configured address until SIGTERM or Ctrl+C
    pub async fn serve(mut self) -> Result<()> {
        let addr = self
            .config
            .as_ref()
            .map(AppConfig::bind_address)
            .ok_or_else(|| anyhow::anyhow!("AppConfig is required. Call .with_config()"))?;
        for prefix in self.entity_registry.route_prefixes() {
            tracing::debug!(%prefix, "entity routes registered");
        }

        let app = self.build()?;
        let listener = TcpListener::bind(&addr).await?;
        tracing::info!("Server listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Wait for shutdown signal (SIGTERM or Ctrl+C)
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal, initiating graceful shutdown...");
        },
    }
}
