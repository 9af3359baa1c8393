//! Service traits for data and object storage
//!
//! Handlers only see these traits; the in-memory and Supabase backends both
//! implement them.

use crate::core::error::StorageError;
use crate::core::query::{Query, SortDirection};
use crate::core::record::Record;
use async_trait::async_trait;
use uuid::Uuid;

/// Rows requested per page by [`DataService::list_all`]
pub const LIST_PAGE_SIZE: usize = 1000;

/// CRUD access to one table
#[async_trait]
pub trait DataService<T: Record>: Send + Sync {
    async fn insert(&self, record: T) -> Result<T, StorageError>;

    /// Insert several rows in one request
    async fn insert_many(&self, records: Vec<T>) -> Result<Vec<T>, StorageError>;

    async fn get(&self, id: &Uuid) -> Result<Option<T>, StorageError>;

    async fn list(&self, query: &Query) -> Result<Vec<T>, StorageError>;

    /// Number of rows matching the query filters (window ignored)
    async fn count(&self, query: &Query) -> Result<usize, StorageError>;

    /// Replace a row; fails with `MissingRow` when it does not exist
    async fn update(&self, id: &Uuid, record: T) -> Result<T, StorageError>;

    async fn delete(&self, id: &Uuid) -> Result<(), StorageError>;

    /// Delete every row matching the query filters, returning how many went
    async fn delete_where(&self, query: &Query) -> Result<usize, StorageError>;

    /// Every row matching the query filters, fetched page by page
    ///
    /// A backend may return fewer rows than requested (PostgREST caps each
    /// response at `db-max-rows`), so paging ends on the first empty page
    /// rather than on a short one. Rows are ordered by `id` last so pages
    /// do not overlap.
    async fn list_all(&self, query: &Query) -> Result<Vec<T>, StorageError> {
        let mut query = Query {
            limit: None,
            offset: 0,
            ..query.clone()
        };
        if !query.order.iter().any(|(field, _)| field == "id") {
            query = query.order_by("id", SortDirection::Asc);
        }

        let mut rows = Vec::new();
        loop {
            let page = self
                .list(&query.clone().offset(rows.len()).limit(LIST_PAGE_SIZE))
                .await?;
            if page.is_empty() {
                return Ok(rows);
            }
            rows.extend(page);
        }
    }
}

/// Result of an object upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub bucket: String,
    pub path: String,
    pub public_url: String,
}

/// Object storage (buckets of files addressed by path)
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<StoredObject, StorageError>;

    /// Remove objects; missing paths are ignored
    async fn remove(&self, bucket: &str, paths: &[String]) -> Result<(), StorageError>;

    fn public_url(&self, bucket: &str, path: &str) -> String;
}
