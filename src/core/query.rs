//! Query building, pagination parameters and paginated responses

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Comparison operator of a [`Filter`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    /// Case-insensitive pattern, `*` matches any run of characters
    ILike,
    /// Value is a JSON array of candidates
    In,
    IsNull,
}

impl FilterOp {
    /// PostgREST operator keyword
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOp::Eq => "eq",
            FilterOp::Neq => "neq",
            FilterOp::Gt => "gt",
            FilterOp::Gte => "gte",
            FilterOp::Lt => "lt",
            FilterOp::Lte => "lte",
            FilterOp::ILike => "ilike",
            FilterOp::In => "in",
            FilterOp::IsNull => "is",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

/// Backend-agnostic description of a table read
///
/// # Example
/// ```rust,ignore
/// let query = Query::new()
///     .eq("bill_id", bill.id)
///     .order_by("installment_number", SortDirection::Asc);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order: Vec<(String, SortDirection)>,
    pub limit: Option<usize>,
    pub offset: usize,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, field: &str, op: FilterOp, value: impl Serialize) -> Self {
        self.filters.push(Filter {
            field: field.to_string(),
            op,
            value: serde_json::to_value(value).unwrap_or(Value::Null),
        });
        self
    }

    pub fn eq(self, field: &str, value: impl Serialize) -> Self {
        self.filter(field, FilterOp::Eq, value)
    }

    pub fn lt(self, field: &str, value: impl Serialize) -> Self {
        self.filter(field, FilterOp::Lt, value)
    }

    pub fn lte(self, field: &str, value: impl Serialize) -> Self {
        self.filter(field, FilterOp::Lte, value)
    }

    pub fn gte(self, field: &str, value: impl Serialize) -> Self {
        self.filter(field, FilterOp::Gte, value)
    }

    pub fn is_in<V: Serialize>(self, field: &str, values: &[V]) -> Self {
        self.filter(field, FilterOp::In, values)
    }

    /// Case-insensitive substring search
    pub fn contains(self, field: &str, needle: &str) -> Self {
        self.filter(field, FilterOp::ILike, format!("*{}*", needle))
    }

    pub fn order_by(mut self, field: &str, direction: SortDirection) -> Self {
        self.order.push((field.to_string(), direction));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Same filters, no ordering or window (used for counts)
    pub fn without_window(&self) -> Self {
        Self {
            filters: self.filters.clone(),
            order: Vec::new(),
            limit: None,
            offset: 0,
        }
    }

    /// Apply page/limit/sort from list parameters
    pub fn paginate(mut self, params: &ListParams) -> Self {
        if let Some((field, direction)) = params.sort_order() {
            self.order.insert(0, (field, direction));
        }
        self.limit = Some(params.limit());
        self.offset = (params.page() - 1) * params.limit();
        self
    }
}

/// Pagination and sorting parameters of list endpoints
///
/// ```text
/// GET /bills?page=2&limit=10&sort=created_at:desc
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ListParams {
    /// Page number (starts at 1)
    #[serde(default = "default_page")]
    pub page: usize,

    #[serde(default = "default_limit")]
    pub limit: usize,

    /// `field:asc` or `field:desc`
    pub sort: Option<String>,
}

fn default_page() -> usize {
    1
}

fn default_limit() -> usize {
    20
}

impl ListParams {
    pub fn page(&self) -> usize {
        self.page.max(1)
    }

    pub fn limit(&self) -> usize {
        self.limit.clamp(1, 100)
    }

    /// Parsed sort expression; field names are restricted to `[a-z_]`
    pub fn sort_order(&self) -> Option<(String, SortDirection)> {
        let sort = self.sort.as_deref()?.trim();
        let (field, direction) = match sort.split_once(':') {
            Some((f, "desc")) => (f, SortDirection::Desc),
            Some((f, _)) => (f, SortDirection::Asc),
            None => (sort, SortDirection::Asc),
        };
        if field.is_empty() || !field.chars().all(|c| c.is_ascii_lowercase() || c == '_') {
            return None;
        }
        Some((field.to_string(), direction))
    }
}

/// Paginated response structure
#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub pagination: PaginationMeta,
}

impl<T> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, params: &ListParams, total: usize) -> Self {
        Self {
            data,
            pagination: PaginationMeta::new(params.page(), params.limit(), total),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PaginationMeta {
    pub page: usize,
    pub limit: usize,
    /// Total number of items (after filters)
    pub total: usize,
    pub total_pages: usize,
    pub has_next: bool,
    pub has_prev: bool,
}

impl PaginationMeta {
    pub fn new(page: usize, limit: usize, total: usize) -> Self {
        let limit = limit.max(1);
        let page = page.max(1);
        let total_pages = if total == 0 { 0 } else { total.div_ceil(limit) };
        let start = (page - 1) * limit;

        Self {
            page,
            limit,
            total,
            total_pages,
            has_next: start + limit < total,
            has_prev: page > 1,
        }
    }
}
