//! # Automation back office
//!
//! HTTP JSON API behind the admin area of an industrial automation company's
//! website: clients, bills split into installments with payment receipts,
//! quotations, SEO metadata and push notifications. It also serves the public
//! `sitemap.xml` and Open Graph images.
//!
//! Persistence, authentication and file storage live in a hosted Supabase
//! project; every seam has an in-memory implementation for tests and local
//! runs.
//!
//! ## Layout
//!
//! - [`billing`]: installment schedules, status state machine, receipts
//! - [`entities`]: one module per resource (model, handlers, routes)
//! - [`api`]: dashboard, uploads and session routes
//! - [`site`]: sitemap and Open Graph rendering
//! - [`storage`]: in-memory and Supabase backends
//! - [`notify`]: push notifications
//! - [`server`]: service container, router and builder
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use backoffice::prelude::*;
//!
//! let app = ServerBuilder::new()
//!     .with_config(AppConfig::load()?)
//!     .build()?;
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, app).await?;
//! ```

pub mod api;
pub mod billing;
pub mod config;
pub mod core;
pub mod entities;
pub mod notify;
pub mod server;
pub mod site;
pub mod storage;

/// Re-exports of commonly used types and traits
pub mod prelude {
    pub use crate::billing::{BillType, Status};
    pub use crate::config::{AppConfig, BackendKind};
    pub use crate::core::{
        AppError, AuthContext, AuthProvider, DataService, DomainEvent, EventBus, Money,
        ObjectStore, Query, Record, StaticAuthProvider,
    };
    pub use crate::entities::bill::{Bill, Installment};
    pub use crate::entities::client::Client;
    pub use crate::entities::quotation::{Quotation, QuotationStatus};
    pub use crate::notify::{PushMessage, PushNotifier};
    pub use crate::server::{AppState, ServerBuilder, Tables};
    pub use crate::storage::{InMemoryDataService, InMemoryObjectStore};
}
