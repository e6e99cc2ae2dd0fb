use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;

use crate::infra::import::csv::{collection_name, import_csv_to_sqlite, ImportResult};
use crate::usecase::services::crud_service::QueryCache;

/// Seeds collections from CSV files.
pub struct ImportService {
    db_path: PathBuf,
    cache: Arc<QueryCache>,
}

impl ImportService {
    pub fn new(db_path: PathBuf, cache: Arc<QueryCache>) -> Self {
        Self { db_path, cache }
    }

    /// Appends every record of `path` to `collection`, or to the collection
    /// named after the file stem.
    pub fn import_csv(&self, path: &Path, collection: Option<&str>) -> Result<ImportResult> {
        let collection = collection
            .map(str::to_string)
            .unwrap_or_else(|| collection_name(path));
        let result = import_csv_to_sqlite(&self.db_path, &collection, path)?;
        self.cache.invalidate(&collection);
        log::info!(
            "imported {} rows into {} from {}",
            result.row_count,
            result.collection,
            path.display()
        );
        Ok(result)
    }
}
