//! Core module containing fundamental traits and types of the service

pub mod auth;
pub mod error;
pub mod events;
pub mod extractors;
pub mod money;
pub mod query;
pub mod record;
pub mod service;
pub mod upload;

pub use auth::{AuthContext, AuthPolicy, AuthProvider, StaticAuthProvider};
pub use error::AppError;
pub use events::{DomainEvent, EventBus};
pub use extractors::{CurrentUser, ValidatedJson};
pub use money::Money;
pub use query::{ListParams, PaginatedResponse, Query, SortDirection};
pub use record::Record;
pub use service::{DataService, LIST_PAGE_SIZE, ObjectStore, StoredObject};
