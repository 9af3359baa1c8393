//! Entity descriptor for SeoSetting

use super::handlers::{delete_seo, get_page_seo, list_seo, upsert_seo};
use crate::server::entity_registry::EntityDescriptor;
use crate::server::host::AppState;
use axum::{
    Router,
    routing::{delete, get},
};

pub struct SeoDescriptor;

impl EntityDescriptor for SeoDescriptor {
    fn entity_type(&self) -> &str {
        "seo_setting"
    }

    fn plural(&self) -> &str {
        "seo"
    }

    fn build_routes(&self) -> Router<AppState> {
        // Reads are public, the site fetches them without a session
        Router::new()
            .route("/seo", get(list_seo).put(upsert_seo))
            .route("/seo/page", get(get_page_seo))
            .route("/seo/{id}", delete(delete_seo))
    }
}
