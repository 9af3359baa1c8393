//! Supabase Storage buckets (`/storage/v1/object`)

use super::{SupabaseClient, ensure_success, send};
use crate::core::error::StorageError;
use crate::core::service::{ObjectStore, StoredObject};
use async_trait::async_trait;
use serde_json::json;

const BACKEND: &str = "storage";

#[derive(Clone)]
pub struct SupabaseObjectStore {
    client: SupabaseClient,
}

impl SupabaseObjectStore {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObjectStore for SupabaseObjectStore {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<StoredObject, StorageError> {
        let size = bytes.len();
        let url = self
            .client
            .url(&format!("/storage/v1/object/{}/{}", bucket, path));
        let request = self
            .client
            .with_api_key(self.client.http().post(url))
            .header("content-type", content_type)
            .header("x-upsert", "true")
            .body(bytes);
        ensure_success(BACKEND, send(BACKEND, request).await?).await?;
        tracing::info!(bucket, path, size, "object uploaded");

        Ok(StoredObject {
            bucket: bucket.to_string(),
            path: path.to_string(),
            public_url: self.public_url(bucket, path),
        })
    }

    async fn remove(&self, bucket: &str, paths: &[String]) -> Result<(), StorageError> {
        if paths.is_empty() {
            return Ok(());
        }
        let url = self.client.url(&format!("/storage/v1/object/{}", bucket));
        let request = self
            .client
            .with_api_key(self.client.http().delete(url))
            .json(&json!({ "prefixes": paths }));
        ensure_success(BACKEND, send(BACKEND, request).await?).await?;
        tracing::info!(bucket, count = paths.len(), "objects removed");
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        self.client
            .url(&format!("/storage/v1/object/public/{}/{}", bucket, path))
    }
}
