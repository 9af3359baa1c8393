//! Record trait shared by every table-backed type

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

/// A row of a backend table.
///
/// Records are plain serde structs; the storage layer moves them to and from
/// JSON, so the serialized field names are the column names.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Table name in the backend (e.g., "bill_installments")
    const TABLE: &'static str;

    /// Singular name used in errors and logs (e.g., "installment")
    const ENTITY: &'static str;

    fn id(&self) -> Uuid;

    /// Set the last modification timestamp
    fn touch(&mut self, at: DateTime<Utc>);
}

/// Implement [`Record`] for a struct with `id` and `updated_at` fields
#[macro_export]
macro_rules! impl_record {
    ($type:ty, $table:literal, $entity:literal) => {
        impl $crate::core::record::Record for $type {
            const TABLE: &'static str = $table;
            const ENTITY: &'static str = $entity;

            fn id(&self) -> ::uuid::Uuid {
                self.id
            }

            fn touch(&mut self, at: ::chrono::DateTime<::chrono::Utc>) {
                self.updated_at = at;
            }
        }
    };
}
