//! In-memory implementations of the storage seams for testing and development

use crate::core::error::StorageError;
use crate::core::query::{Filter, FilterOp, Query, SortDirection};
use crate::core::record::Record;
use crate::core::service::{DataService, ObjectStore, StoredObject};
use async_trait::async_trait;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64};
use std::sync::atomic::Ordering as AtomicOrdering;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

fn poisoned<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Poisoned(e.to_string())
}

/// In-memory table
///
/// Rows are kept as records plus their JSON form so filters see the same
/// column names as PostgREST would. Uses RwLock for thread-safe access.
/// Clones share the same rows.
pub struct InMemoryDataService<T: Record> {
    rows: Arc<RwLock<HashMap<Uuid, (u64, T)>>>,
    sequence: Arc<AtomicU64>,
    fail_writes: Arc<AtomicBool>,
    max_rows: Option<usize>,
}

impl<T: Record> Clone for InMemoryDataService<T> {
    fn clone(&self) -> Self {
        Self {
            rows: self.rows.clone(),
            sequence: self.sequence.clone(),
            fail_writes: self.fail_writes.clone(),
            max_rows: self.max_rows,
        }
    }
}

impl<T: Record> Default for InMemoryDataService<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Record> InMemoryDataService<T> {
    pub fn new() -> Self {
        Self {
            rows: Arc::new(RwLock::new(HashMap::new())),
            sequence: Arc::new(AtomicU64::new(0)),
            fail_writes: Arc::new(AtomicBool::new(false)),
            max_rows: None,
        }
    }

    /// Cap every `list` response like PostgREST's `db-max-rows`
    pub fn with_max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = Some(max_rows);
        self
    }

    /// Make every insert and update fail with an upstream error
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, AtomicOrdering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.rows.read().map(|rows| rows.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_writable(&self) -> Result<(), StorageError> {
        if self.fail_writes.load(AtomicOrdering::SeqCst) {
            return Err(StorageError::Upstream {
                backend: "memory".to_string(),
                status: 500,
                message: format!("writes to '{}' are disabled", T::TABLE),
            });
        }
        Ok(())
    }

    fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, AtomicOrdering::SeqCst)
    }

    /// Matching rows in insertion order, before sorting and windowing
    fn matching(&self, query: &Query) -> Result<Vec<(u64, Value, T)>, StorageError> {
        let rows = self.rows.read().map_err(poisoned)?;
        let mut matched = Vec::new();
        for (seq, record) in rows.values() {
            let json = serde_json::to_value(record).map_err(|e| StorageError::Decode {
                backend: "memory".to_string(),
                message: e.to_string(),
            })?;
            if query.filters.iter().all(|f| matches_filter(&json, f)) {
                matched.push((*seq, json, record.clone()));
            }
        }
        matched.sort_by_key(|(seq, _, _)| *seq);
        Ok(matched)
    }
}

#[async_trait]
impl<T: Record> DataService<T> for InMemoryDataService<T> {
    async fn insert(&self, record: T) -> Result<T, StorageError> {
        self.check_writable()?;
        let seq = self.next_sequence();
        let mut rows = self.rows.write().map_err(poisoned)?;
        rows.insert(record.id(), (seq, record.clone()));
        Ok(record)
    }

    async fn insert_many(&self, records: Vec<T>) -> Result<Vec<T>, StorageError> {
        self.check_writable()?;
        let mut rows = self.rows.write().map_err(poisoned)?;
        for record in &records {
            let seq = self.next_sequence();
            rows.insert(record.id(), (seq, record.clone()));
        }
        Ok(records)
    }

    async fn get(&self, id: &Uuid) -> Result<Option<T>, StorageError> {
        let rows = self.rows.read().map_err(poisoned)?;
        Ok(rows.get(id).map(|(_, record)| record.clone()))
    }

    async fn list(&self, query: &Query) -> Result<Vec<T>, StorageError> {
        let mut matched = self.matching(query)?;

        // Stable sort, applied last key first so the first key dominates
        for (field, direction) in query.order.iter().rev() {
            matched.sort_by(|(_, a, _), (_, b, _)| {
                let ordering = compare_values(
                    a.get(field).unwrap_or(&Value::Null),
                    b.get(field).unwrap_or(&Value::Null),
                );
                match direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                }
            });
        }

        let limit = match (query.limit, self.max_rows) {
            (Some(limit), Some(max)) => limit.min(max),
            (limit, max) => limit.or(max).unwrap_or(usize::MAX),
        };
        Ok(matched
            .into_iter()
            .skip(query.offset)
            .take(limit)
            .map(|(_, _, r)| r)
            .collect())
    }

    async fn count(&self, query: &Query) -> Result<usize, StorageError> {
        Ok(self.matching(query)?.len())
    }

    async fn update(&self, id: &Uuid, record: T) -> Result<T, StorageError> {
        self.check_writable()?;
        let mut rows = self.rows.write().map_err(poisoned)?;
        let entry = rows.get_mut(id).ok_or_else(|| StorageError::MissingRow {
            table: T::TABLE.to_string(),
            id: *id,
        })?;
        entry.1 = record.clone();
        Ok(record)
    }

    async fn delete(&self, id: &Uuid) -> Result<(), StorageError> {
        let mut rows = self.rows.write().map_err(poisoned)?;
        rows.remove(id);
        Ok(())
    }

    async fn delete_where(&self, query: &Query) -> Result<usize, StorageError> {
        let ids: Vec<Uuid> = self
            .matching(&query.without_window())?
            .into_iter()
            .map(|(_, _, record)| record.id())
            .collect();
        let mut rows = self.rows.write().map_err(poisoned)?;
        for id in &ids {
            rows.remove(id);
        }
        Ok(ids.len())
    }
}

fn matches_filter(row: &Value, filter: &Filter) -> bool {
    let actual = row.get(&filter.field).unwrap_or(&Value::Null);
    match filter.op {
        FilterOp::Eq => values_equal(actual, &filter.value),
        FilterOp::Neq => !actual.is_null() && !values_equal(actual, &filter.value),
        FilterOp::Gt => !actual.is_null() && compare_values(actual, &filter.value).is_gt(),
        FilterOp::Gte => !actual.is_null() && compare_values(actual, &filter.value).is_ge(),
        FilterOp::Lt => !actual.is_null() && compare_values(actual, &filter.value).is_lt(),
        FilterOp::Lte => !actual.is_null() && compare_values(actual, &filter.value).is_le(),
        FilterOp::ILike => match (actual.as_str(), filter.value.as_str()) {
            (Some(text), Some(pattern)) => ilike(text, pattern),
            _ => false,
        },
        FilterOp::In => filter
            .value
            .as_array()
            .is_some_and(|candidates| candidates.iter().any(|c| values_equal(actual, c))),
        FilterOp::IsNull => {
            let want_null = filter.value.as_bool().unwrap_or(true);
            actual.is_null() == want_null
        }
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

/// Nulls sort last; numbers numerically; strings lexically (ISO dates included)
fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Greater,
        (_, Value::Null) => Ordering::Less,
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => a.to_string().cmp(&b.to_string()),
    }
}

/// Case-insensitive match where `*` stands for any run of characters
fn ilike(text: &str, pattern: &str) -> bool {
    let text = text.to_lowercase();
    let pattern = pattern.to_lowercase();
    let parts: Vec<&str> = pattern.split('*').collect();

    if parts.len() == 1 {
        return text == pattern;
    }

    let first = parts[0];
    let last = parts[parts.len() - 1];
    if !text.starts_with(first) || !text[first.len()..].ends_with(last) {
        return false;
    }

    let mut rest = &text[first.len()..text.len() - last.len()];
    for part in &parts[1..parts.len() - 1] {
        match rest.find(part) {
            Some(pos) => rest = &rest[pos + part.len()..],
            None => return false,
        }
    }
    true
}

#[derive(Debug, Clone)]
struct MemoryObject {
    bytes: Vec<u8>,
    content_type: String,
}

/// In-memory object store
///
/// Public URLs mimic the Supabase layout under a fixed base so that
/// handlers and tests see realistic values.
#[derive(Clone)]
pub struct InMemoryObjectStore {
    base_url: String,
    objects: Arc<RwLock<HashMap<(String, String), MemoryObject>>>,
    fail_removals: Arc<AtomicBool>,
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new("http://localhost:54321")
    }
}

impl InMemoryObjectStore {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            objects: Arc::new(RwLock::new(HashMap::new())),
            fail_removals: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Make every removal fail with an upstream error
    pub fn fail_removals(&self, fail: bool) {
        self.fail_removals.store(fail, AtomicOrdering::SeqCst);
    }

    pub fn contains(&self, bucket: &str, path: &str) -> bool {
        self.objects
            .read()
            .map(|objects| objects.contains_key(&(bucket.to_string(), path.to_string())))
            .unwrap_or(false)
    }

    /// Stored bytes and content type of an object
    pub fn object(&self, bucket: &str, path: &str) -> Option<(Vec<u8>, String)> {
        let objects = self.objects.read().ok()?;
        objects
            .get(&(bucket.to_string(), path.to_string()))
            .map(|o| (o.bytes.clone(), o.content_type.clone()))
    }

    /// Paths stored in a bucket, sorted
    pub fn paths(&self, bucket: &str) -> Vec<String> {
        let mut paths: Vec<String> = self
            .objects
            .read()
            .map(|objects| {
                objects
                    .keys()
                    .filter(|(b, _)| b == bucket)
                    .map(|(_, p)| p.clone())
                    .collect()
            })
            .unwrap_or_default();
        paths.sort();
        paths
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<StoredObject, StorageError> {
        let mut objects = self.objects.write().map_err(poisoned)?;
        objects.insert(
            (bucket.to_string(), path.to_string()),
            MemoryObject {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(StoredObject {
            bucket: bucket.to_string(),
            path: path.to_string(),
            public_url: self.public_url(bucket, path),
        })
    }

    async fn remove(&self, bucket: &str, paths: &[String]) -> Result<(), StorageError> {
        if self.fail_removals.load(AtomicOrdering::SeqCst) {
            return Err(StorageError::Unavailable {
                backend: "memory".to_string(),
                message: "object removal disabled".to_string(),
            });
        }
        let mut objects = self.objects.write().map_err(poisoned)?;
        for path in paths {
            objects.remove(&(bucket.to_string(), path.clone()));
        }
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url, bucket, path
        )
    }
}
