//! HTTP server: service container, entity registry, router and builder
//!
//! ```text
//! ServerBuilder ──▶ ServerHost (AppState) ──▶ build_router() ──▶ axum::Router
//!                        ▲
//!   EntityRegistry ──────┘ routes of every entity descriptor
//! ```

pub mod builder;
pub mod entity_registry;
pub mod host;
pub mod router;

pub use builder::ServerBuilder;
pub use entity_registry::{EntityDescriptor, EntityRegistry};
pub use host::{AppState, Backends, ServerHost, Tables};
pub use router::build_router;
