use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::entities::error::BackendError;
use crate::domain::entities::query::FetchRange;
use crate::domain::entities::row::Row;

#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    All,
    Columns(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, Value),
    In(String, Vec<Value>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub column: String,
    pub ascending: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectRequest {
    pub projection: Projection,
    pub filters: Vec<Filter>,
    pub order: Option<OrderBy>,
    pub range: Option<FetchRange>,
    pub limit: Option<i64>,
    pub count_exact: bool,
}

impl Default for SelectRequest {
    fn default() -> Self {
        Self {
            projection: Projection::All,
            filters: Vec::new(),
            order: None,
            range: None,
            limit: None,
            count_exact: false,
        }
    }
}

impl SelectRequest {
    pub fn columns(mut self, columns: &[&str]) -> Self {
        self.projection = Projection::Columns(columns.iter().map(|c| c.to_string()).collect());
        self
    }

    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Eq(column.to_string(), value.into()));
        self
    }

    pub fn any_of(mut self, column: &str, values: Vec<Value>) -> Self {
        self.filters.push(Filter::In(column.to_string(), values));
        self
    }

    pub fn order_desc(mut self, column: &str) -> Self {
        self.order = Some(OrderBy {
            column: column.to_string(),
            ascending: false,
        });
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectResponse {
    pub rows: Vec<Row>,
    pub count: Option<i64>,
}

/// Arguments of the server-side full-text search procedure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub table_name: String,
    pub query_text: String,
    pub excluded_columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    pub result: Vec<Row>,
    pub total_count: i64,
}

/// Remote collection protocol. Every call may fail with a normalised error.
pub trait CollectionBackend: Send + Sync {
    fn select(&self, collection: &str, request: &SelectRequest)
        -> Result<SelectResponse, BackendError>;
    fn search(&self, request: &SearchRequest) -> Result<SearchResponse, BackendError>;
    fn insert(&self, collection: &str, row: &Row) -> Result<Vec<Row>, BackendError>;
    fn update(
        &self,
        collection: &str,
        id_column: &str,
        id: &Value,
        patch: &Row,
    ) -> Result<Vec<Row>, BackendError>;
    fn delete(
        &self,
        collection: &str,
        id_column: &str,
        ids: &[Value],
    ) -> Result<Vec<Row>, BackendError>;
}

/// Object storage for uploaded files.
pub trait ObjectStore: Send + Sync {
    fn put(&self, path: &str, bytes: &[u8], content_type: &str) -> Result<String, BackendError>;
    fn public_url(&self, path: &str) -> String;
}
