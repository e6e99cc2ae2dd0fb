use std::cmp::Ordering;

use serde_json::{Map, Value};

/// A row keyed by column name, insertion ordered.
pub type Row = Map<String, Value>;

pub const DEFAULT_ID_COLUMN: &str = "id";

pub fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(text)) => text.is_empty(),
        _ => false,
    }
}

/// String form used for display and identity: strings unquoted, others as JSON.
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => number.to_string(),
        other => other.to_string(),
    }
}

pub fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().replace(',', "").parse::<f64>().ok(),
        _ => None,
    }
}

pub fn row_str<'a>(row: &'a Row, key: &str) -> Option<&'a str> {
    row.get(key).and_then(Value::as_str)
}

/// Nulls sort after values; numbers numerically, everything else as
/// case-insensitive text.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => match (a, b) {
            (Value::Number(_), Value::Number(_)) => value_as_f64(a)
                .partial_cmp(&value_as_f64(b))
                .unwrap_or(Ordering::Equal),
            (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
            _ => value_to_text(a).to_lowercase().cmp(&value_to_text(b).to_lowercase()),
        },
    }
}

/// Equality that tolerates `4` vs `"4"` across the JSON boundary.
pub fn values_match(a: &Value, b: &Value) -> bool {
    a == b || (!a.is_null() && !b.is_null() && value_to_text(a) == value_to_text(b))
}

/// Identity of a row as a string, `None` when the id column is missing or null.
pub fn row_identity(row: &Row, id_column: &str) -> Option<String> {
    match row.get(id_column) {
        None | Some(Value::Null) => None,
        Some(value) => {
            let text = value_to_text(value);
            if text.is_empty() {
                None
            } else {
                Some(text)
            }
        }
    }
}
