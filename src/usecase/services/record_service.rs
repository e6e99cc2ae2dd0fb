use std::sync::Arc;

use serde_json::Value;

use crate::domain::entities::error::{BackendError, ROW_NOT_FOUND, UNKNOWN_ERROR};
use crate::domain::entities::row::{Row, DEFAULT_ID_COLUMN};
use crate::usecase::ports::backend::{CollectionBackend, SelectRequest};
use crate::usecase::ports::notifier::{Notification, Notifier};
use crate::usecase::services::crud_service::QueryCache;

/// Whole-collection client for lookups and one-off record actions.
pub struct RecordService {
    collection: String,
    backend: Arc<dyn CollectionBackend>,
    notifier: Arc<dyn Notifier>,
    cache: Arc<QueryCache>,
}

impl RecordService {
    pub fn new(
        collection: impl Into<String>,
        backend: Arc<dyn CollectionBackend>,
        notifier: Arc<dyn Notifier>,
        cache: Arc<QueryCache>,
    ) -> Self {
        Self {
            collection: collection.into(),
            backend,
            notifier,
            cache,
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Every row matching all `filters` by equality.
    pub fn fetch_all(&self, filters: &[(&str, Value)]) -> Result<Vec<Row>, BackendError> {
        let request = filters
            .iter()
            .fold(SelectRequest::default(), |request, (column, value)| {
                request.eq(column, value.clone())
            });
        Ok(self.backend.select(&self.collection, &request)?.rows)
    }

    /// Exactly one row where `column` equals `value`.
    pub fn fetch_one(&self, column: &str, value: impl Into<Value>) -> Result<Row, BackendError> {
        let value = value.into();
        let mut rows = self
            .backend
            .select(&self.collection, &SelectRequest::default().eq(column, value.clone()))?
            .rows;
        match rows.len() {
            1 => Ok(rows.remove(0)),
            0 => {
                log::warn!("no {} row with {column} = {value}", self.collection);
                Err(BackendError::new(
                    ROW_NOT_FOUND,
                    format!("No {} row with {column} = {value}", self.collection),
                ))
            }
            n => Err(BackendError::new(
                ROW_NOT_FOUND,
                format!("Expected one {} row with {column} = {value}, found {n}", self.collection),
            )),
        }
    }

    pub fn create(&self, payload: &Row) -> Result<Row, BackendError> {
        let result = self.backend.insert(&self.collection, payload).and_then(|rows| {
            rows.into_iter()
                .next()
                .ok_or_else(|| BackendError::new(UNKNOWN_ERROR, "insert returned no rows"))
        });
        self.settle(result, "Created successfully", "Failed to create")
    }

    pub fn update(&self, id: impl Into<Value>, patch: &Row) -> Result<Row, BackendError> {
        let id = id.into();
        let mut patch = patch.clone();
        patch.remove(DEFAULT_ID_COLUMN);
        let result = self
            .backend
            .update(&self.collection, DEFAULT_ID_COLUMN, &id, &patch)
            .and_then(|rows| {
                rows.into_iter().next().ok_or_else(|| {
                    BackendError::new(
                        ROW_NOT_FOUND,
                        format!("No {} row with id {id}", self.collection),
                    )
                })
            });
        self.settle(result, "Updated successfully", "Failed to update")
    }

    pub fn delete(&self, id: impl Into<Value>) -> Result<(), BackendError> {
        let result = self
            .backend
            .delete(&self.collection, DEFAULT_ID_COLUMN, &[id.into()])
            .map(|_| ());
        self.settle(result, "Deleted successfully", "Failed to delete")
    }

    fn settle<T>(
        &self,
        result: Result<T, BackendError>,
        success: &str,
        failure: &str,
    ) -> Result<T, BackendError> {
        match &result {
            Ok(_) => {
                self.cache.invalidate(&self.collection);
                self.notifier.notify(Notification::success(success));
            }
            Err(err) => {
                log::warn!("{} mutation failed: {err}", self.collection);
                let message = if err.message.trim().is_empty() {
                    failure.to_string()
                } else {
                    err.message.clone()
                };
                self.notifier.notify(Notification::error(message));
            }
        }
        result
    }
}
