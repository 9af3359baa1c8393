//! Table access through PostgREST (`/rest/v1/{table}`)

use super::{SupabaseClient, decode, ensure_success, send};
use crate::core::error::StorageError;
use crate::core::query::{Filter, FilterOp, Query, SortDirection};
use crate::core::record::Record;
use crate::core::service::DataService;
use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use std::marker::PhantomData;
use uuid::Uuid;

const BACKEND: &str = "postgrest";

/// [`DataService`] over one PostgREST table
pub struct PostgrestDataService<T: Record> {
    client: SupabaseClient,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Record> Clone for PostgrestDataService<T> {
    fn clone(&self) -> Self {
        Self::new(self.client.clone())
    }
}

impl<T: Record> PostgrestDataService<T> {
    pub fn new(client: SupabaseClient) -> Self {
        Self {
            client,
            _marker: PhantomData,
        }
    }

    fn request(&self, method: Method) -> reqwest::RequestBuilder {
        let url = self.client.url(&format!("/rest/v1/{}", T::TABLE));
        self.client
            .with_api_key(self.client.http().request(method, url))
    }

    fn by_id(id: &Uuid) -> Vec<(String, String)> {
        vec![("id".to_string(), format!("eq.{}", id))]
    }
}

#[async_trait]
impl<T: Record> DataService<T> for PostgrestDataService<T> {
    async fn insert(&self, record: T) -> Result<T, StorageError> {
        let mut rows = self.insert_many(vec![record]).await?;
        rows.pop().ok_or_else(|| StorageError::Decode {
            backend: BACKEND.to_string(),
            message: format!("insert into '{}' returned no row", T::TABLE),
        })
    }

    async fn insert_many(&self, records: Vec<T>) -> Result<Vec<T>, StorageError> {
        if records.is_empty() {
            return Ok(Vec::new());
        }
        tracing::debug!(table = T::TABLE, rows = records.len(), "inserting rows");
        let request = self
            .request(Method::POST)
            .header("Prefer", "return=representation")
            .json(&records);
        let response = ensure_success(BACKEND, send(BACKEND, request).await?).await?;
        decode(BACKEND, response).await
    }

    async fn get(&self, id: &Uuid) -> Result<Option<T>, StorageError> {
        let mut params = Self::by_id(id);
        params.push(("select".to_string(), "*".to_string()));
        params.push(("limit".to_string(), "1".to_string()));
        let request = self.request(Method::GET).query(&params);
        let response = ensure_success(BACKEND, send(BACKEND, request).await?).await?;
        let mut rows: Vec<T> = decode(BACKEND, response).await?;
        Ok(rows.pop())
    }

    async fn list(&self, query: &Query) -> Result<Vec<T>, StorageError> {
        let mut params = vec![("select".to_string(), "*".to_string())];
        params.extend(query_params(query));
        let request = self.request(Method::GET).query(&params);
        let response = ensure_success(BACKEND, send(BACKEND, request).await?).await?;
        decode(BACKEND, response).await
    }

    async fn count(&self, query: &Query) -> Result<usize, StorageError> {
        let mut params = vec![("select".to_string(), "id".to_string())];
        params.extend(query_params(&query.without_window()));
        let request = self
            .request(Method::HEAD)
            .header("Prefer", "count=exact")
            .query(&params);
        let response = ensure_success(BACKEND, send(BACKEND, request).await?).await?;
        response
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range_total)
            .ok_or_else(|| StorageError::Decode {
                backend: BACKEND.to_string(),
                message: "missing or invalid Content-Range header".to_string(),
            })
    }

    async fn update(&self, id: &Uuid, record: T) -> Result<T, StorageError> {
        let request = self
            .request(Method::PATCH)
            .header("Prefer", "return=representation")
            .query(&Self::by_id(id))
            .json(&record);
        let response = ensure_success(BACKEND, send(BACKEND, request).await?).await?;
        let mut rows: Vec<T> = decode(BACKEND, response).await?;
        rows.pop().ok_or_else(|| StorageError::MissingRow {
            table: T::TABLE.to_string(),
            id: *id,
        })
    }

    async fn delete(&self, id: &Uuid) -> Result<(), StorageError> {
        let request = self.request(Method::DELETE).query(&Self::by_id(id));
        ensure_success(BACKEND, send(BACKEND, request).await?).await?;
        Ok(())
    }

    async fn delete_where(&self, query: &Query) -> Result<usize, StorageError> {
        let mut params = vec![("select".to_string(), "id".to_string())];
        params.extend(query_params(&query.without_window()));
        let request = self
            .request(Method::DELETE)
            .header("Prefer", "return=representation")
            .query(&params);
        let response = ensure_success(BACKEND, send(BACKEND, request).await?).await?;
        let rows: Vec<Value> = decode(BACKEND, response).await?;
        tracing::debug!(table = T::TABLE, rows = rows.len(), "deleted rows");
        Ok(rows.len())
    }
}

/// Query-string pairs for filters, ordering and window
pub fn query_params(query: &Query) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = query
        .filters
        .iter()
        .map(|f| (f.field.clone(), filter_value(f)))
        .collect();

    if !query.order.is_empty() {
        let order = query
            .order
            .iter()
            .map(|(field, direction)| match direction {
                SortDirection::Asc => format!("{}.asc", field),
                SortDirection::Desc => format!("{}.desc.nullslast", field),
            })
            .collect::<Vec<_>>()
            .join(",");
        params.push(("order".to_string(), order));
    }
    if let Some(limit) = query.limit {
        params.push(("limit".to_string(), limit.to_string()));
    }
    if query.offset > 0 {
        params.push(("offset".to_string(), query.offset.to_string()));
    }
    params
}

fn filter_value(filter: &Filter) -> String {
    match filter.op {
        FilterOp::IsNull => {
            if filter.value.as_bool().unwrap_or(true) {
                "is.null".to_string()
            } else {
                "not.is.null".to_string()
            }
        }
        FilterOp::In => {
            let items = filter
                .value
                .as_array()
                .map(|values| values.iter().map(in_list_item).collect::<Vec<_>>())
                .unwrap_or_default();
            format!("in.({})", items.join(","))
        }
        op => format!("{}.{}", op.as_str(), scalar(&filter.value)),
    }
}

fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

/// Items of `in.(...)` are quoted when they contain reserved characters
fn in_list_item(value: &Value) -> String {
    let raw = scalar(value);
    if raw.contains([',', '(', ')', '"', ' ']) {
        format!("\"{}\"", raw.replace('"', "\\\""))
    } else {
        raw
    }
}

/// Total from `Content-Range: 0-24/573` or `*/0`
pub fn parse_content_range_total(header: &str) -> Option<usize> {
    header.rsplit_once('/')?.1.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::query::ListParams;

    fn pairs(query: &Query) -> Vec<(String, String)> {
        query_params(query)
    }

    fn pair(key: &str, value: &str) -> (String, String) {
        (key.to_string(), value.to_string())
    }

    #[test]
    fn test_filters_to_query_string() {
        let bill_id = Uuid::nil();
        let query = Query::new()
            .eq("bill_id", bill_id)
            .eq("status", "pending")
            .lt("due_date", "2026-03-01")
            .order_by("installment_number", SortDirection::Asc);
        assert_eq!(
            pairs(&query),
            vec![
                pair("bill_id", &format!("eq.{}", bill_id)),
                pair("status", "eq.pending"),
                pair("due_date", "lt.2026-03-01"),
                pair("order", "installment_number.asc"),
            ]
        );
    }

    #[test]
    fn test_special_operators() {
        let query = Query::new()
            .contains("name", "acme")
            .is_in("status", &["pending", "overdue"])
            .filter("receipt_path", FilterOp::IsNull, false);
        assert_eq!(
            pairs(&query),
            vec![
                pair("name", "ilike.*acme*"),
                pair("status", "in.(pending,overdue)"),
                pair("receipt_path", "not.is.null"),
            ]
        );
    }

    #[test]
    fn test_in_list_quotes_reserved_characters() {
        let query = Query::new().is_in("client_name", &["Acme, Inc", "Beta"]);
        assert_eq!(pairs(&query)[0].1, "in.(\"Acme, Inc\",Beta)");
    }

    #[test]
    fn test_window_params() {
        let params = ListParams {
            page: 2,
            limit: 25,
            sort: Some("created_at:desc".to_string()),
        };
        let query = Query::new().paginate(&params);
        assert_eq!(
            pairs(&query),
            vec![
                pair("order", "created_at.desc.nullslast"),
                pair("limit", "25"),
                pair("offset", "25"),
            ]
        );
    }

    #[test]
    fn test_parse_content_range() {
        assert_eq!(parse_content_range_total("0-24/573"), Some(573));
        assert_eq!(parse_content_range_total("*/0"), Some(0));
        assert_eq!(parse_content_range_total("0-24/*"), None);
    }
}
