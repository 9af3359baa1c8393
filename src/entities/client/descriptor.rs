//! Entity descriptor for Client

use super::handlers::{create_client, delete_client, get_client, list_clients, update_client};
use crate::server::entity_registry::EntityDescriptor;
use crate::server::host::AppState;
use axum::{Router, routing::get};

/// Descriptor for the Client entity
pub struct ClientDescriptor;

impl EntityDescriptor for ClientDescriptor {
    fn entity_type(&self) -> &str {
        "client"
    }

    fn plural(&self) -> &str {
        "clients"
    }

    fn build_routes(&self) -> Router<AppState> {
        Router::new()
            .route("/clients", get(list_clients).post(create_client))
            .route(
                "/clients/{id}",
                get(get_client).put(update_client).delete(delete_client),
            )
    }
}
