use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::domain::entities::error::{BackendError, ROW_NOT_FOUND, UNKNOWN_ERROR};
use crate::domain::entities::query::{FetchRange, PageResult, TableQuery};
use crate::domain::entities::row::{Row, DEFAULT_ID_COLUMN};
use crate::usecase::ports::backend::{
    CollectionBackend, OrderBy, Projection, SearchRequest, SelectRequest,
};
use crate::usecase::ports::notifier::{Notification, Notifier};

pub const DEFAULT_ORDER_COLUMN: &str = "created_at";

/// How one collection is read and mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionConfig {
    pub name: String,
    pub excluded_columns: Vec<String>,
    pub id_column: String,
    pub order_by: String,
}

impl CollectionConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            excluded_columns: Vec::new(),
            id_column: DEFAULT_ID_COLUMN.to_string(),
            order_by: DEFAULT_ORDER_COLUMN.to_string(),
        }
    }

    pub fn excluding(mut self, columns: &[&str]) -> Self {
        self.excluded_columns = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn with_id_column(mut self, id_column: impl Into<String>) -> Self {
        self.id_column = id_column.into();
        self
    }

    pub fn with_order_by(mut self, order_by: impl Into<String>) -> Self {
        self.order_by = order_by.into();
        self
    }

    pub fn is_excluded(&self, column: &str) -> bool {
        self.excluded_columns.iter().any(|excluded| excluded == column)
    }
}

/// Fetched pages keyed by collection, then by query string.
#[derive(Debug, Default)]
pub struct QueryCache {
    entries: Mutex<HashMap<String, HashMap<String, PageResult>>>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_entries<T>(
        &self,
        f: impl FnOnce(&mut HashMap<String, HashMap<String, PageResult>>) -> T,
    ) -> T {
        match self.entries.lock() {
            Ok(mut entries) => f(&mut entries),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }

    pub fn get(&self, collection: &str, key: &str) -> Option<PageResult> {
        self.with_entries(|entries| {
            entries
                .get(collection)
                .and_then(|pages| pages.get(key))
                .cloned()
        })
    }

    pub fn put(&self, collection: &str, key: &str, page: PageResult) {
        self.with_entries(|entries| {
            entries
                .entry(collection.to_string())
                .or_default()
                .insert(key.to_string(), page);
        });
    }

    /// Drops every cached query of `collection`.
    pub fn invalidate(&self, collection: &str) {
        let dropped =
            self.with_entries(|entries| entries.remove(collection).map(|pages| pages.len()));
        if let Some(count) = dropped {
            log::debug!("invalidated {count} cached queries of {collection}");
        }
    }

    pub fn len(&self, collection: &str) -> usize {
        self.with_entries(|entries| entries.get(collection).map_or(0, HashMap::len))
    }

    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mutation {
    Create,
    Update,
    Delete,
}

impl Mutation {
    fn success_message(self) -> &'static str {
        match self {
            Mutation::Create => "Successfully created record",
            Mutation::Update => "Successfully updated record",
            Mutation::Delete => "Successfully deleted record",
        }
    }

    fn fallback_error(self) -> &'static str {
        match self {
            Mutation::Create => "Unable to create data",
            Mutation::Update => "Unable to update data",
            Mutation::Delete => "Unable to delete data",
        }
    }
}

/// Paged reads and pessimistic mutations against named collections.
pub struct CrudService {
    backend: Arc<dyn CollectionBackend>,
    notifier: Arc<dyn Notifier>,
    cache: Arc<QueryCache>,
}

impl CrudService {
    pub fn new(
        backend: Arc<dyn CollectionBackend>,
        notifier: Arc<dyn Notifier>,
        cache: Arc<QueryCache>,
    ) -> Self {
        Self {
            backend,
            notifier,
            cache,
        }
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    /// Cached page for `query`, fetched from the backend on a miss.
    pub fn fetch(
        &self,
        config: &CollectionConfig,
        query: &TableQuery,
    ) -> Result<PageResult, BackendError> {
        let key = query.to_query_string();
        if let Some(hit) = self.cache.get(&config.name, &key) {
            log::debug!("cache hit for {} [{key}]", config.name);
            return Ok(hit);
        }
        let page = self.fetch_uncached(config, query)?;
        self.cache.put(&config.name, &key, page.clone());
        Ok(page)
    }

    pub fn fetch_uncached(
        &self,
        config: &CollectionConfig,
        query: &TableQuery,
    ) -> Result<PageResult, BackendError> {
        if let Some(term) = query.search_term() {
            log::debug!("searching {} for {term:?}", config.name);
            let response = self.backend.search(&SearchRequest {
                table_name: config.name.clone(),
                query_text: term.to_string(),
                excluded_columns: config.excluded_columns.clone(),
            })?;
            return Ok(PageResult {
                count: response.total_count,
                rows: response.result,
            });
        }

        let sample = self.backend.select(
            &config.name,
            &SelectRequest {
                range: Some(FetchRange { from: 0, to: 0 }),
                ..SelectRequest::default()
            },
        )?;
        let projection = match sample.rows.first() {
            Some(first) => Projection::Columns(
                first
                    .keys()
                    .filter(|key| !config.is_excluded(key))
                    .cloned()
                    .collect(),
            ),
            None => Projection::All,
        };

        let range = query.range();
        log::debug!(
            "fetching {} rows {}..={} ordered by {} desc",
            config.name,
            range.from,
            range.to,
            config.order_by
        );
        let response = self.backend.select(
            &config.name,
            &SelectRequest {
                projection,
                range: Some(range),
                order: Some(OrderBy {
                    column: config.order_by.clone(),
                    ascending: false,
                }),
                count_exact: true,
                ..SelectRequest::default()
            },
        )?;

        Ok(PageResult {
            count: response.count.unwrap_or(response.rows.len() as i64),
            rows: response.rows,
        })
    }

    pub fn create(&self, config: &CollectionConfig, payload: &Row) -> Result<Row, BackendError> {
        let result = self
            .backend
            .insert(&config.name, payload)
            .and_then(|rows| {
                rows.into_iter()
                    .next()
                    .ok_or_else(|| BackendError::new(UNKNOWN_ERROR, "insert returned no rows"))
            });
        self.settle(config, Mutation::Create, result)
    }

    pub fn update(
        &self,
        config: &CollectionConfig,
        id: &Value,
        patch: &Row,
    ) -> Result<Row, BackendError> {
        let mut patch = patch.clone();
        patch.remove(&config.id_column);
        let result = self
            .backend
            .update(&config.name, &config.id_column, id, &patch)
            .and_then(|rows| {
                rows.into_iter().next().ok_or_else(|| {
                    BackendError::new(
                        ROW_NOT_FOUND,
                        format!("no row with {} = {id}", config.id_column),
                    )
                })
            });
        self.settle(config, Mutation::Update, result)
    }

    pub fn delete(
        &self,
        config: &CollectionConfig,
        ids: &[Value],
    ) -> Result<Vec<Row>, BackendError> {
        let result = self.backend.delete(&config.name, &config.id_column, ids);
        self.settle(config, Mutation::Delete, result)
    }

    fn settle<T>(
        &self,
        config: &CollectionConfig,
        mutation: Mutation,
        result: Result<T, BackendError>,
    ) -> Result<T, BackendError> {
        match &result {
            Ok(_) => {
                log::info!("{mutation:?} on {} succeeded", config.name);
                self.cache.invalidate(&config.name);
                self.notifier
                    .notify(Notification::success(mutation.success_message()));
            }
            Err(err) => {
                log::warn!("{mutation:?} on {} failed: {err}", config.name);
                let message = if err.message.trim().is_empty() {
                    mutation.fallback_error().to_string()
                } else {
                    err.message.clone()
                };
                self.notifier.notify(Notification::error(message));
            }
        }
        result
    }
}
