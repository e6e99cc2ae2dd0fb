use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::{Number, Value};

use crate::domain::entities::row::Row;
use crate::infra::sqlite::queries::insert_rows;
use crate::infra::sqlite::schema::init_db;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportResult {
    pub collection: String,
    pub row_count: usize,
}

/// Text cell to the JSON value a hosted backend would have returned.
pub fn cell_value(text: &str) -> Value {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }
    match trimmed {
        "true" | "TRUE" | "True" => return Value::Bool(true),
        "false" | "FALSE" | "False" => return Value::Bool(false),
        _ => {}
    }
    let leading_zero = trimmed.len() > 1 && trimmed.starts_with('0') && !trimmed.starts_with("0.");
    if !leading_zero {
        if let Ok(int) = trimmed.parse::<i64>() {
            return Value::Number(int.into());
        }
        if let Some(number) = trimmed.parse::<f64>().ok().and_then(Number::from_f64) {
            return Value::Number(number);
        }
    }
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        if let Ok(json) = serde_json::from_str::<Value>(trimmed) {
            return json;
        }
    }
    Value::String(text.to_string())
}

pub fn read_rows<R: Read>(reader: R) -> Result<Vec<Row>> {
    let mut reader = csv::Reader::from_reader(reader);
    let headers = reader.headers().context("failed to read csv headers")?.clone();
    if headers.is_empty() {
        anyhow::bail!("csv header is required")
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.context("failed to parse csv record")?;
        let row: Row = headers
            .iter()
            .enumerate()
            .map(|(idx, header)| (header.to_string(), cell_value(record.get(idx).unwrap_or(""))))
            .collect();
        rows.push(row);
    }
    Ok(rows)
}

/// Collection name for a file: its stem, or `collection` when unusable.
pub fn collection_name(csv_path: &Path) -> String {
    csv_path
        .file_stem()
        .and_then(|name| name.to_str())
        .filter(|name| !name.is_empty())
        .unwrap_or("collection")
        .to_string()
}

pub fn import_csv_to_sqlite(
    db_path: &Path,
    collection: &str,
    csv_path: &Path,
) -> Result<ImportResult> {
    init_db(db_path)?;
    let file = std::fs::File::open(csv_path)
        .with_context(|| format!("failed to open csv: {}", csv_path.display()))?;
    let rows = read_rows(file)
        .with_context(|| format!("failed to read csv: {}", csv_path.display()))?;
    let row_count = insert_rows(db_path, collection, &rows)?;
    Ok(ImportResult {
        collection: collection.to_string(),
        row_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn cells_keep_their_shape() {
        assert_eq!(cell_value(""), Value::Null);
        assert_eq!(cell_value("42"), json!(42));
        assert_eq!(cell_value("0.15"), json!(0.15));
        assert_eq!(cell_value("09876"), json!("09876"));
        assert_eq!(cell_value("TRUE"), json!(true));
        assert_eq!(cell_value("[\"a\",\"b\"]"), json!(["a", "b"]));
        assert_eq!(cell_value("Acme Corp"), json!("Acme Corp"));
    }

    #[test]
    fn reads_rows_in_header_order() {
        let data = "name,amount,active\nBasic,49900,true\nPro,,false\n";
        let rows = read_rows(data.as_bytes()).expect("should parse csv");
        assert_eq!(rows.len(), 2);
        let keys: Vec<_> = rows[0].keys().cloned().collect();
        assert_eq!(keys, vec!["name", "amount", "active"]);
        assert_eq!(rows[1].get("amount"), Some(&Value::Null));
    }
}
