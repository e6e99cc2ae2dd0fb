use std::path::{Path, PathBuf};

use anyhow::Result;
use serde_json::Value;

use crate::domain::entities::error::BackendError;
use crate::domain::entities::row::Row;
use crate::infra::sqlite::queries::{
    delete_rows, insert_row, insert_rows, list_collections, search_rows, select_rows, update_rows,
};
use crate::infra::sqlite::schema::init_db;
use crate::usecase::ports::backend::{
    CollectionBackend, SearchRequest, SearchResponse, SelectRequest, SelectResponse,
};

/// Collection backend over a local SQLite file.
pub struct SqliteBackend {
    pub db_path: PathBuf,
}

impl SqliteBackend {
    pub fn open(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        init_db(&db_path)?;
        log::info!("sqlite backend at {}", db_path.display());
        Ok(Self { db_path })
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn insert_many(&self, collection: &str, rows: &[Row]) -> Result<usize> {
        insert_rows(&self.db_path, collection, rows)
    }

    pub fn collections(&self) -> Result<Vec<(String, i64)>> {
        list_collections(&self.db_path)
    }
}

impl CollectionBackend for SqliteBackend {
    fn select(
        &self,
        collection: &str,
        request: &SelectRequest,
    ) -> Result<SelectResponse, BackendError> {
        let (rows, total) = select_rows(&self.db_path, collection, request)?;
        Ok(SelectResponse {
            rows,
            count: request.count_exact.then_some(total),
        })
    }

    fn search(&self, request: &SearchRequest) -> Result<SearchResponse, BackendError> {
        let (result, total_count) = search_rows(&self.db_path, request)?;
        Ok(SearchResponse {
            result,
            total_count,
        })
    }

    fn insert(&self, collection: &str, row: &Row) -> Result<Vec<Row>, BackendError> {
        Ok(vec![insert_row(&self.db_path, collection, row)?])
    }

    fn update(
        &self,
        collection: &str,
        id_column: &str,
        id: &Value,
        patch: &Row,
    ) -> Result<Vec<Row>, BackendError> {
        Ok(update_rows(&self.db_path, collection, id_column, id, patch)?)
    }

    fn delete(
        &self,
        collection: &str,
        id_column: &str,
        ids: &[Value],
    ) -> Result<Vec<Row>, BackendError> {
        Ok(delete_rows(&self.db_path, collection, id_column, ids)?)
    }
}
