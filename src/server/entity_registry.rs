//! Entity registry for managing entity descriptors and their routes

use crate::server::host::AppState;
use axum::Router;
use std::collections::BTreeMap;

/// Trait that describes how to build routes for an entity
///
/// Each entity (client, bill, quotation, ...) implements this trait to
/// provide its routes. Routes are built against the shared [`AppState`].
pub trait EntityDescriptor: Send + Sync {
    /// The entity type name (singular, e.g., "bill")
    fn entity_type(&self) -> &str;

    /// The plural form used as the route prefix (e.g., "bills")
    fn plural(&self) -> &str;

    /// Build the routes of this entity
    fn build_routes(&self) -> Router<AppState>;
}

/// Registry for all entities in the application
#[derive(Default)]
pub struct EntityRegistry {
    descriptors: BTreeMap<String, Box<dyn EntityDescriptor>>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entity descriptor
    ///
    /// The entity type name is the key; registering it again replaces it.
    pub fn register(&mut self, descriptor: Box<dyn EntityDescriptor>) {
        let entity_type = descriptor.entity_type().to_string();
        self.descriptors.insert(entity_type, descriptor);
    }

    /// Merge all registered entity routes into one router
    pub fn build_routes(&self) -> Router<AppState> {
        self.descriptors
            .values()
            .fold(Router::new(), |router, descriptor| {
                router.merge(descriptor.build_routes())
            })
    }

    /// Registered entity types, sorted
    pub fn entity_types(&self) -> Vec<&str> {
        self.descriptors.keys().map(|s| s.as_str()).collect()
    }

    /// Route prefixes of the registered entities, sorted by entity type
    pub fn route_prefixes(&self) -> Vec<String> {
        self.descriptors
            .values()
            .map(|d| format!("/{}", d.plural()))
            .collect()
    }
}
