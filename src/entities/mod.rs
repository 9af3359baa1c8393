//! Back-office entities
//!
//! Each entity module follows the same layout: `model` (record and payload
//! types), `handlers` (axum handlers) and `descriptor` (route registration).

pub mod bill;
pub mod client;
pub mod notification;
pub mod quotation;
pub mod seo;

use crate::server::entity_registry::EntityRegistry;
use serde::{Deserialize, Deserializer};

/// Register every entity's routes
pub fn register_all(registry: &mut EntityRegistry) {
    registry.register(Box::new(client::ClientDescriptor));
    registry.register(Box::new(bill::BillDescriptor));
    registry.register(Box::new(quotation::QuotationDescriptor));
    registry.register(Box::new(seo::SeoDescriptor));
    registry.register(Box::new(notification::NotificationDescriptor));
}

/// Deserialize an optional string, turning blank values into `None`
pub fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty()))
}
