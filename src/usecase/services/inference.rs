use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::domain::entities::column::{CellType, ColumnDescriptor};
use crate::domain::entities::row::Row;

/// Rows inspected per snapshot.
pub const SAMPLE_SIZE: usize = 10;

static HTML_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)</?[a-z][\s\S]*>").expect("valid html tag regex"));
static HTML_ELEMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<(p|div|span|h[1-6]|ul|ol|li|a|br|strong|em|b|i|img|table|tr|td|th)[\s>/]")
        .expect("valid html element regex")
});
static EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));
static PHONE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[\s\-()]?[\d\s\-()]{7,}$").expect("valid phone regex"));
static HEX_COLOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^#([A-Fa-f0-9]{6}|[A-Fa-f0-9]{3})$").expect("valid hex color regex")
});
static CLOCK_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{2}:\d{2}").expect("valid clock regex"));
static CODE_PUNCTUATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[{}();]").expect("valid code regex"));
static IMAGE_EXTENSION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\.(jpg|jpeg|png|gif|svg|webp)$").expect("valid image extension regex")
});
static FILE_EXTENSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\.\w{2,4}$").expect("valid file extension regex"));

/// One descriptor per distinct key of the first `SAMPLE_SIZE` rows.
pub fn generate_columns(rows: &[Row]) -> Vec<ColumnDescriptor> {
    let sample = &rows[..rows.len().min(SAMPLE_SIZE)];

    let mut keys: Vec<&str> = Vec::new();
    for row in sample {
        for key in row.keys() {
            if !keys.contains(&key.as_str()) {
                keys.push(key);
            }
        }
    }

    keys.into_iter()
        .map(|key| {
            let values: Vec<&Value> = sample.iter().filter_map(|row| row.get(key)).collect();
            ColumnDescriptor::new(key, detect_cell_type(key, &values))
        })
        .collect()
}

pub fn detect_cell_type(key: &str, samples: &[&Value]) -> CellType {
    let non_null: Vec<&Value> = samples.iter().copied().filter(|v| !v.is_null()).collect();
    if non_null.is_empty() {
        return CellType::Text;
    }

    let lower_key = key.to_lowercase();
    if let Some(cell_type) = type_from_key(&lower_key, &non_null) {
        return cell_type;
    }
    type_from_values(&lower_key, &non_null)
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}

fn type_from_key(key: &str, values: &[&Value]) -> Option<CellType> {
    let cell_type = if key.contains("email") {
        CellType::Email
    } else if contains_any(key, &["phone", "mobile", "tel"]) {
        CellType::Phone
    } else if key == "url" || contains_any(key, &["link", "website"]) {
        CellType::Link
    } else if contains_any(key, &["avatar", "profile_image", "profile_pic", "photo"]) {
        CellType::Avatar
    } else if contains_any(key, &["image", "img", "picture", "cover"]) {
        CellType::Image
    } else if contains_any(key, &["color", "colour"]) {
        CellType::Color
    } else if key.contains("status") {
        CellType::Status
    } else if contains_any(key, &["category", "type", "group"]) {
        CellType::Category
    } else if contains_any(key, &["badge", "label"]) {
        CellType::Badge
    } else if contains_any(key, &["progress", "completion"]) {
        CellType::Progress
    } else if contains_any(key, &["rating", "score", "stars"]) {
        CellType::Rating
    } else if contains_any(key, &["tags", "keywords"]) {
        CellType::Tags
    } else if contains_any(key, &["price", "cost", "amount", "salary"]) {
        CellType::Currency
    } else if contains_any(key, &["percentage", "percent", "rate"]) {
        CellType::Percentage
    } else if contains_any(key, &["created_at", "updated_at", "timestamp"]) {
        CellType::Datetime
    } else if key.contains("date") && key.contains("time") {
        CellType::Datetime
    } else if key.contains("time") {
        CellType::Time
    } else if key.contains("date") {
        CellType::Date
    } else if contains_any(key, &["file", "attachment", "document", "pdf"]) {
        CellType::File
    } else if contains_any(key, &["content", "description", "body", "html", "rich"])
        && values
            .iter()
            .any(|v| v.as_str().is_some_and(|text| HTML_TAG.is_match(text)))
    {
        CellType::RichText
    } else {
        return None;
    };
    Some(cell_type)
}

fn type_from_values(key: &str, values: &[&Value]) -> CellType {
    match values[0] {
        Value::Bool(_) => CellType::Boolean,
        Value::Number(_) => {
            let numbers: Vec<f64> = values.iter().filter_map(|v| v.as_f64()).collect();
            let all_within = |lo: f64, hi: f64| numbers.iter().all(|n| *n >= lo && *n <= hi);
            if all_within(0.0, 1.0) {
                CellType::Percentage
            } else if all_within(0.0, 100.0) && key.contains("percent") {
                CellType::Percentage
            } else if all_within(0.0, 5.0) && key.contains("rating") {
                CellType::Rating
            } else if all_within(0.0, 100.0) && key.contains("progress") {
                CellType::Progress
            } else {
                CellType::Number
            }
        }
        Value::String(text) => type_from_text(text),
        Value::Object(_) | Value::Array(_) => CellType::Json,
        Value::Null => CellType::Text,
    }
}

fn type_from_text(text: &str) -> CellType {
    if HTML_TAG.is_match(text) && HTML_ELEMENT.is_match(text) {
        return CellType::RichText;
    }
    if EMAIL.is_match(text) {
        return CellType::Email;
    }

    let parsed_date = parse_temporal(text);
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    if parsed_date.is_none() && PHONE.is_match(&compact) {
        return CellType::Phone;
    }
    if text.starts_with("http://") || text.starts_with("https://") || text.starts_with("www.") {
        return CellType::Link;
    }
    if HEX_COLOR.is_match(text) || text.starts_with("rgb(") || text.starts_with("hsl(") {
        return CellType::Color;
    }
    if parsed_date.is_some() {
        if (text.contains(':') && text.contains(' ')) || text.contains('T') || text.contains('Z')
        {
            return CellType::Datetime;
        }
        if CLOCK_PREFIX.is_match(text) {
            return CellType::Time;
        }
        return CellType::Date;
    }
    let looks_structured = (text.starts_with('{') && text.ends_with('}'))
        || (text.starts_with('[') && text.ends_with(']'));
    if looks_structured && serde_json::from_str::<Value>(text).is_ok() {
        return CellType::Json;
    }
    if CODE_PUNCTUATION.is_match(text) && text.chars().count() > 10 {
        return CellType::Code;
    }
    if IMAGE_EXTENSION.is_match(text) {
        return CellType::Image;
    }
    if FILE_EXTENSION.is_match(text) {
        return CellType::File;
    }
    CellType::Text
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Temporal {
    DateTime(NaiveDateTime),
    Date(NaiveDate),
    Time(NaiveTime),
}

/// Accepts RFC 3339, common ISO-like datetime/date layouts and bare clock times.
pub fn parse_temporal(text: &str) -> Option<Temporal> {
    let text = text.trim();
    if text.is_empty() || !text.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(Temporal::DateTime(parsed.naive_utc()));
    }
    const DATETIME_LAYOUTS: [&str; 6] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%d %H:%M:%S%.f%#z",
        "%Y/%m/%d %H:%M:%S",
    ];
    for layout in DATETIME_LAYOUTS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(text, layout) {
            return Some(Temporal::DateTime(parsed));
        }
    }
    if let Ok(parsed) = DateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Some(Temporal::DateTime(parsed.naive_utc()));
    }
    for layout in ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"] {
        if let Ok(parsed) = NaiveDate::parse_from_str(text, layout) {
            return Some(Temporal::Date(parsed));
        }
    }
    for layout in ["%H:%M:%S", "%H:%M"] {
        if let Ok(parsed) = NaiveTime::parse_from_str(text, layout) {
            return Some(Temporal::Time(parsed));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn detect(key: &str, values: &[Value]) -> CellType {
        let refs: Vec<&Value> = values.iter().collect();
        detect_cell_type(key, &refs)
    }

    #[test]
    fn created_at_resolves_to_datetime() {
        assert_eq!(
            detect("created_at", &[json!("2024-01-05T10:00:00Z")]),
            CellType::Datetime
        );
    }

    #[test]
    fn discount_rate_resolves_to_percentage() {
        assert_eq!(
            detect("discount_rate", &[json!(0.1), json!(0.25), json!(0.5)]),
            CellType::Percentage
        );
    }

    #[test]
    fn key_heuristics_win_over_value_shape() {
        assert_eq!(detect("status", &[json!("123"), json!("456")]), CellType::Status);
        assert_eq!(detect("contact_email", &[json!(42)]), CellType::Email);
        assert_eq!(detect("unit_price", &[json!(0.5)]), CellType::Currency);
    }

    #[test]
    fn key_name_date_rules() {
        assert_eq!(detect("release_date", &[json!("x")]), CellType::Date);
        assert_eq!(detect("start_time", &[json!("x")]), CellType::Time);
        assert_eq!(detect("date_time_sent", &[json!("x")]), CellType::Datetime);
        assert_eq!(detect("report_pdf", &[json!("x")]), CellType::File);
    }

    #[test]
    fn rich_text_key_needs_html_sample() {
        assert_eq!(
            detect("description", &[json!("<p>Hello</p>")]),
            CellType::RichText
        );
        assert_eq!(detect("description", &[json!("plain words")]), CellType::Text);
    }

    #[test]
    fn all_null_samples_default_to_text() {
        assert_eq!(detect("email", &[Value::Null, Value::Null]), CellType::Text);
    }

    #[test]
    fn numeric_value_shapes() {
        assert_eq!(detect("views", &[json!(10), json!(2000)]), CellType::Number);
        assert_eq!(detect("views", &[json!(1), json!(0)]), CellType::Percentage);
        assert_eq!(detect("is_live", &[json!(true)]), CellType::Boolean);
    }

    #[test]
    fn string_value_shapes() {
        assert_eq!(detect("contact", &[json!("a@b.io")]), CellType::Email);
        assert_eq!(detect("contact", &[json!("+91 98765 43210")]), CellType::Phone);
        assert_eq!(detect("homepage", &[json!("https://x.io")]), CellType::Link);
        assert_eq!(detect("accent", &[json!("#ffaa00")]), CellType::Color);
        assert_eq!(detect("sent", &[json!("2024-01-05")]), CellType::Date);
        assert_eq!(detect("sent", &[json!("2024-01-05 10:00:00")]), CellType::Datetime);
        assert_eq!(detect("meta", &[json!("{\"a\":1}")]), CellType::Json);
        assert_eq!(detect("meta", &[json!({"a": 1})]), CellType::Json);
        assert_eq!(detect("aliases", &[json!(["x", "y"])]), CellType::Json);
        assert_eq!(detect("snippet", &[json!("fn main() { run(); }")]), CellType::Code);
        assert_eq!(detect("asset", &[json!("banner.png")]), CellType::Image);
        assert_eq!(detect("asset", &[json!("terms.docx")]), CellType::File);
        assert_eq!(detect("name", &[json!("Asha")]), CellType::Text);
    }

    #[test]
    fn generate_columns_covers_each_key_once() {
        let rows: Vec<Row> = vec![
            json!({"id": "a1", "title": "Launch", "created_at": "2024-01-05T10:00:00Z"}),
            json!({"id": "a2", "title": "Funding", "is_featured": true}),
        ]
        .into_iter()
        .filter_map(|v| v.as_object().cloned())
        .collect();

        let columns = generate_columns(&rows);
        let keys: Vec<&str> = columns.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(keys, vec!["id", "title", "created_at", "is_featured"]);
        assert_eq!(columns[2].header, "Created At");
        assert_eq!(columns[2].cell_type, CellType::Datetime);
        assert_eq!(columns[3].cell_type, CellType::Boolean);
        assert_eq!(columns[3].min_width, 80);
    }

    #[test]
    fn empty_sample_generates_no_columns() {
        assert!(generate_columns(&[]).is_empty());
    }
}
