//! Router assembly: health routes, entity and API routes, middleware

use super::entity_registry::EntityRegistry;
use super::host::AppState;
use crate::config::ServerConfig;
use crate::{api, site};
use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header},
    routing::get,
};
use serde_json::{Value, json};
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the complete application router
///
/// Routes:
/// - `/health`, `/healthz`
/// - every registered entity's routes
/// - `/auth/*`, `/dashboard`, `/uploads`
/// - `/sitemap.xml`, `/og-image`
/// - custom routes
pub fn build_router(
    host: AppState,
    registry: &EntityRegistry,
    custom_routes: Vec<Router<AppState>>,
) -> Router {
    let mut app = health_routes()
        .merge(registry.build_routes())
        .merge(api::routes())
        .merge(site::routes());

    for custom in custom_routes {
        app = app.merge(custom);
    }

    // Upload routes lift this limit and bound the body while reading it
    let body_limit = host.config.server.max_body_bytes;

    app.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(cors_layer(&host.config.server))
            .layer(DefaultBodyLimit::max(body_limit)),
    )
    .with_state(host)
}

/// CORS for the admin UI; no configured origins means any origin
pub fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    if config.cors_origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
}

fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/healthz", get(health_check))
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
