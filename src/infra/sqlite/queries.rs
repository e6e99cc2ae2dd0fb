use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::{SecondsFormat, Utc};
use rusqlite::{params, OptionalExtension, Transaction};
use serde_json::Value;
use uuid::Uuid;

use crate::domain::entities::row::{
    compare_values, row_identity, value_to_text, values_match, Row, DEFAULT_ID_COLUMN,
};
use crate::infra::sqlite::schema::open_connection;
use crate::usecase::ports::backend::{Filter, Projection, SearchRequest, SelectRequest};

const CREATED_AT: &str = "created_at";

#[derive(Debug, Clone)]
struct StoredRow {
    row_id: String,
    position: i64,
    created_at: String,
    data: Row,
}

impl StoredRow {
    fn sort_value(&self, column: &str) -> Option<Value> {
        match self.data.get(column) {
            Some(value) => Some(value.clone()),
            None if column == CREATED_AT => Some(Value::String(self.created_at.clone())),
            None => None,
        }
    }
}

fn now_stamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn decode_row(collection: &str, row_id: &str, data: &str) -> Result<Row> {
    match serde_json::from_str::<Value>(data)
        .with_context(|| format!("corrupt json in {collection}/{row_id}"))?
    {
        Value::Object(row) => Ok(row),
        other => bail!("{collection}/{row_id} holds {other} instead of an object"),
    }
}

fn encode_row(row: &Row) -> Result<String> {
    serde_json::to_string(row).context("failed to encode row")
}

fn load_rows(conn: &rusqlite::Connection, collection: &str) -> Result<Vec<StoredRow>> {
    let mut stmt = conn
        .prepare(
            "SELECT row_id, position, data, created_at
             FROM collection_row
             WHERE collection = ?1
             ORDER BY position ASC",
        )
        .context("failed to prepare row query")?;

    let row_iter = stmt
        .query_map([collection], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })
        .context("failed to query rows")?;

    let mut rows = Vec::new();
    for item in row_iter {
        let (row_id, position, data, created_at) = item.context("failed to read row")?;
        rows.push(StoredRow {
            data: decode_row(collection, &row_id, &data)?,
            row_id,
            position,
            created_at,
        });
    }
    Ok(rows)
}

fn matches_filter(row: &Row, filter: &Filter) -> bool {
    match filter {
        Filter::Eq(column, expected) => row
            .get(column)
            .is_some_and(|actual| values_match(actual, expected)),
        Filter::In(column, candidates) => row.get(column).is_some_and(|actual| {
            candidates
                .iter()
                .any(|candidate| values_match(actual, candidate))
        }),
    }
}

fn project(row: Row, projection: &Projection) -> Row {
    match projection {
        Projection::All => row,
        Projection::Columns(columns) => columns
            .iter()
            .filter_map(|column| row.get(column).map(|value| (column.clone(), value.clone())))
            .collect(),
    }
}

/// Filters, orders, counts and slices one collection. Returns the page and
/// the number of matching rows before slicing.
pub fn select_rows(
    db_path: &Path,
    collection: &str,
    request: &SelectRequest,
) -> Result<(Vec<Row>, i64)> {
    let conn = open_connection(db_path)?;
    let mut rows: Vec<StoredRow> = load_rows(&conn, collection)?
        .into_iter()
        .filter(|stored| request.filters.iter().all(|f| matches_filter(&stored.data, f)))
        .collect();
    let total = rows.len() as i64;

    if let Some(order) = &request.order {
        rows.sort_by(|a, b| {
            let ordering = compare_values(
                a.sort_value(&order.column).as_ref(),
                b.sort_value(&order.column).as_ref(),
            )
            .then(a.position.cmp(&b.position));
            if order.ascending {
                ordering
            } else {
                ordering.reverse()
            }
        });
    }

    let (start, mut end) = match request.range {
        Some(range) if range.from >= 0 && range.to >= range.from => {
            (range.from as usize, range.to as usize + 1)
        }
        Some(_) => (0, 0),
        None => (0, rows.len()),
    };
    if let Some(limit) = request.limit {
        end = end.min(start.saturating_add(limit.max(0) as usize));
    }
    let page = rows
        .into_iter()
        .skip(start)
        .take(end.saturating_sub(start))
        .map(|stored| project(stored.data, &request.projection))
        .collect();
    Ok((page, total))
}

/// Case-insensitive substring match over every non-excluded column.
pub fn search_rows(db_path: &Path, request: &SearchRequest) -> Result<(Vec<Row>, i64)> {
    let conn = open_connection(db_path)?;
    let needle = request.query_text.trim().to_lowercase();
    let excluded = |key: &str| request.excluded_columns.iter().any(|c| c == key);

    let mut found: Vec<StoredRow> = load_rows(&conn, &request.table_name)?
        .into_iter()
        .filter(|stored| {
            stored.data.iter().any(|(key, value)| {
                !excluded(key) && value_to_text(value).to_lowercase().contains(&needle)
            })
        })
        .collect();
    found.sort_by(|a, b| b.position.cmp(&a.position));

    let rows: Vec<Row> = found
        .into_iter()
        .map(|stored| {
            stored
                .data
                .into_iter()
                .filter(|(key, _)| !excluded(key))
                .collect()
        })
        .collect();
    let total = rows.len() as i64;
    Ok((rows, total))
}

fn next_position(tx: &Transaction<'_>, collection: &str) -> Result<i64> {
    let max: Option<i64> = tx
        .query_row(
            "SELECT MAX(position) FROM collection_row WHERE collection = ?1",
            [collection],
            |row| row.get(0),
        )
        .optional()
        .context("failed to read max position")?
        .flatten();
    Ok(max.map_or(0, |max| max + 1))
}

fn insert_in_tx(tx: &Transaction<'_>, collection: &str, row: &Row) -> Result<Row> {
    let mut row = row.clone();
    let row_id = match row_identity(&row, DEFAULT_ID_COLUMN) {
        Some(id) => id,
        None => {
            let id = Uuid::new_v4().to_string();
            let mut with_id = Row::new();
            with_id.insert(DEFAULT_ID_COLUMN.to_string(), Value::String(id.clone()));
            for (key, value) in std::mem::take(&mut row) {
                if key != DEFAULT_ID_COLUMN {
                    with_id.insert(key, value);
                }
            }
            row = with_id;
            id
        }
    };
    let position = next_position(tx, collection)?;
    tx.execute(
        "INSERT INTO collection_row(collection, row_id, position, data, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![collection, row_id, position, encode_row(&row)?, now_stamp()],
    )
    .with_context(|| format!("failed to insert row into {collection}"))?;
    Ok(row)
}

/// Inserts one row, assigning a UUID `id` when the payload has none.
pub fn insert_row(db_path: &Path, collection: &str, row: &Row) -> Result<Row> {
    let mut conn = open_connection(db_path)?;
    let tx = conn.transaction().context("failed to start transaction")?;
    let stored = insert_in_tx(&tx, collection, row)?;
    tx.commit().context("failed to commit insert")?;
    Ok(stored)
}

/// Bulk insert used by imports; all rows or none.
pub fn insert_rows(db_path: &Path, collection: &str, rows: &[Row]) -> Result<usize> {
    let mut conn = open_connection(db_path)?;
    let tx = conn.transaction().context("failed to start import transaction")?;
    for row in rows {
        insert_in_tx(&tx, collection, row)?;
    }
    tx.commit().context("failed to commit import transaction")?;
    Ok(rows.len())
}

/// Merges `patch` into every row whose `id_column` equals `id`.
pub fn update_rows(
    db_path: &Path,
    collection: &str,
    id_column: &str,
    id: &Value,
    patch: &Row,
) -> Result<Vec<Row>> {
    let mut conn = open_connection(db_path)?;
    let targets: Vec<StoredRow> = load_rows(&conn, collection)?
        .into_iter()
        .filter(|stored| {
            matches_filter(&stored.data, &Filter::Eq(id_column.to_string(), id.clone()))
        })
        .collect();

    let tx = conn.transaction().context("failed to start update transaction")?;
    let mut updated = Vec::with_capacity(targets.len());
    {
        let mut stmt = tx
            .prepare(
                "UPDATE collection_row SET row_id = ?1, data = ?2
                 WHERE collection = ?3 AND row_id = ?4",
            )
            .context("failed to prepare row update")?;
        for stored in targets {
            let mut row = stored.data;
            for (key, value) in patch {
                row.insert(key.clone(), value.clone());
            }
            let row_id = row_identity(&row, DEFAULT_ID_COLUMN).unwrap_or(stored.row_id.clone());
            stmt.execute(params![row_id, encode_row(&row)?, collection, stored.row_id])
                .with_context(|| format!("failed to update {collection}/{}", stored.row_id))?;
            updated.push(row);
        }
    }
    tx.commit().context("failed to commit update")?;
    Ok(updated)
}

/// Deletes rows whose `id_column` is any of `ids`; returns what was removed.
pub fn delete_rows(
    db_path: &Path,
    collection: &str,
    id_column: &str,
    ids: &[Value],
) -> Result<Vec<Row>> {
    let mut conn = open_connection(db_path)?;
    let filter = Filter::In(id_column.to_string(), ids.to_vec());
    let targets: Vec<StoredRow> = load_rows(&conn, collection)?
        .into_iter()
        .filter(|stored| matches_filter(&stored.data, &filter))
        .collect();

    let tx = conn.transaction().context("failed to start delete transaction")?;
    {
        let mut stmt = tx
            .prepare("DELETE FROM collection_row WHERE collection = ?1 AND row_id = ?2")
            .context("failed to prepare row delete")?;
        for stored in &targets {
            stmt.execute(params![collection, stored.row_id])
                .with_context(|| format!("failed to delete {collection}/{}", stored.row_id))?;
        }
    }
    tx.commit().context("failed to commit delete")?;
    Ok(targets.into_iter().map(|stored| stored.data).collect())
}

/// Collection names with their row counts, alphabetical.
pub fn list_collections(db_path: &Path) -> Result<Vec<(String, i64)>> {
    let conn = open_connection(db_path)?;
    let mut stmt = conn
        .prepare(
            "SELECT collection, COUNT(*)
             FROM collection_row
             GROUP BY collection
             ORDER BY collection ASC",
        )
        .context("failed to prepare collection list")?;
    let iter = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))
        .context("failed to list collections")?;
    let mut collections = Vec::new();
    for item in iter {
        collections.push(item.context("failed to read collection")?);
    }
    Ok(collections)
}
