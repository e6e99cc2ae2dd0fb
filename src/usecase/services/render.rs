use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use url::form_urlencoded;

use crate::domain::entities::column::{CellType, ColumnDescriptor};
use crate::domain::entities::row::{is_blank, row_str, value_as_f64, value_to_text, Row};
use crate::usecase::services::inference::{parse_temporal, Temporal};

pub const PLACEHOLDER: &str = "—";
const RICH_TEXT_LIMIT: usize = 100;
const JSON_PREVIEW_LIMIT: usize = 40;

static MARKUP: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid markup regex"));
static IMAGE_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\.(jpg|jpeg|png|gif|webp|svg)(\?.*)?$").expect("valid image path regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Positive,
    Pending,
    Negative,
    Neutral,
    Accent,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShareLinks {
    pub url: String,
    pub title: String,
    pub summary: String,
}

impl ShareLinks {
    pub fn embed_code(&self) -> String {
        format!(
            "<iframe src=\"{}\" width=\"100%\" height=\"600\" frameborder=\"0\" scrolling=\"auto\" title=\"{}\"></iframe>",
            self.url,
            self.title.replace('"', "&quot;")
        )
    }

    pub fn facebook(&self) -> String {
        share_link("https://www.facebook.com/sharer/sharer.php", &[("u", self.url.as_str())])
    }

    pub fn twitter(&self) -> String {
        share_link(
            "https://twitter.com/intent/tweet",
            &[("url", self.url.as_str()), ("text", self.title.as_str())],
        )
    }

    pub fn linkedin(&self) -> String {
        share_link(
            "https://www.linkedin.com/sharing/share-offsite/",
            &[("url", self.url.as_str())],
        )
    }
}

fn share_link(endpoint: &str, params: &[(&str, &str)]) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params)
        .finish();
    format!("{endpoint}?{query}")
}

/// Renderer output, independent of the widget toolkit.
#[derive(Debug, Clone, PartialEq)]
pub enum CellView {
    Placeholder,
    Text(String),
    Number(String),
    Currency(String),
    Percentage { ratio: f64, label: String },
    Date(String),
    DateTime { date: String, time: String },
    Time(String),
    Boolean { value: bool, label: &'static str },
    Badge { label: String, tone: Tone },
    Status { label: String, tone: Tone },
    Tags { first: String, overflow: usize, all: Vec<String> },
    Draft,
    RichText { excerpt: String, title: String },
    Image { src: String, alt: String },
    Avatar { src: Option<String>, initials: String, name: String, subtitle: Option<String> },
    File { name: String, extension: String, url: String },
    Link { href: String, label: String },
    Email { href: String, label: String },
    Phone { href: String, label: String },
    Progress { percent: f64 },
    Rating { value: f64, label: String },
    Json { preview: String, pretty: String },
    Code(String),
    Color { hex: String, label: String },
    Share(ShareLinks),
}

impl CellView {
    /// Flat text used for titles, filters and exports.
    pub fn plain_text(&self) -> String {
        match self {
            CellView::Placeholder => PLACEHOLDER.to_string(),
            CellView::Text(text)
            | CellView::Number(text)
            | CellView::Currency(text)
            | CellView::Date(text)
            | CellView::Time(text)
            | CellView::Code(text) => text.clone(),
            CellView::Percentage { label, .. }
            | CellView::Badge { label, .. }
            | CellView::Status { label, .. }
            | CellView::Link { label, .. }
            | CellView::Email { label, .. }
            | CellView::Phone { label, .. }
            | CellView::Rating { label, .. }
            | CellView::Color { label, .. } => label.clone(),
            CellView::DateTime { date, time } => format!("{date} {time}"),
            CellView::Boolean { label, .. } => label.to_string(),
            CellView::Tags { all, .. } => all.join(", "),
            CellView::Draft => "Draft".to_string(),
            CellView::RichText { title, .. } => title.clone(),
            CellView::Image { src, .. } => src.clone(),
            CellView::Avatar { name, .. } => name.clone(),
            CellView::File { name, .. } => name.clone(),
            CellView::Progress { percent } => format!("{percent:.0}%"),
            CellView::Json { preview, .. } => preview.clone(),
            CellView::Share(links) => links.url.clone(),
        }
    }
}

pub type CellCallback = Arc<dyn Fn(&Value, &Row) -> CellView + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grouping {
    /// 12,34,567
    Indian,
    /// 1,234,567
    Western,
}

impl Grouping {
    pub fn for_locale(locale: &str) -> Self {
        if locale.eq_ignore_ascii_case("en-IN") || locale.ends_with("-IN") {
            Grouping::Indian
        } else {
            Grouping::Western
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrencyFormat {
    pub code: String,
    pub locale: String,
}

impl Default for CurrencyFormat {
    fn default() -> Self {
        Self::new("INR", "en-IN")
    }
}

impl CurrencyFormat {
    pub fn new(code: impl Into<String>, locale: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            locale: locale.into(),
        }
    }

    pub fn symbol(&self) -> String {
        match self.code.to_ascii_uppercase().as_str() {
            "INR" => "₹".to_string(),
            "USD" => "$".to_string(),
            "EUR" => "€".to_string(),
            "GBP" => "£".to_string(),
            "JPY" => "¥".to_string(),
            other => format!("{other} "),
        }
    }

    /// Amounts are stored in minor units and shown rounded to whole major units.
    pub fn format_minor(&self, minor: f64) -> String {
        let major = (minor / 100.0).round();
        let sign = if major < 0.0 { "-" } else { "" };
        let digits = group_digits(major.abs() as u64, Grouping::for_locale(&self.locale));
        format!("{sign}{}{digits}", self.symbol())
    }
}

pub fn group_digits(value: u64, grouping: Grouping) -> String {
    let raw = value.to_string();
    if raw.len() <= 3 {
        return raw;
    }
    let (head, tail) = raw.split_at(raw.len() - 3);
    let step = match grouping {
        Grouping::Indian => 2,
        Grouping::Western => 3,
    };

    let mut groups: Vec<&str> = Vec::new();
    let mut end = head.len();
    while end > 0 {
        let start = end.saturating_sub(step);
        groups.push(&head[start..end]);
        end = start;
    }
    groups.reverse();
    format!("{},{tail}", groups.join(","))
}

pub fn format_number_with_commas(value: f64, decimals: usize, grouping: Grouping) -> String {
    if !value.is_finite() {
        return String::new();
    }
    let fixed = format!("{:.*}", decimals, value.abs());
    let (integer, fraction) = match fixed.split_once('.') {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (fixed.as_str(), None),
    };
    let grouped = group_digits(integer.parse::<u64>().unwrap_or(0), grouping);
    let sign = if value < 0.0 && fixed.chars().any(|c| c != '0' && c != '.') {
        "-"
    } else {
        ""
    };
    match fraction {
        Some(fraction) => format!("{sign}{grouped}.{fraction}"),
        None => format!("{sign}{grouped}"),
    }
}

/// Grouped with at most three fraction digits, trailing zeros dropped.
pub fn format_number(value: f64, grouping: Grouping) -> String {
    let mut text = format_number_with_commas(value, 3, grouping);
    if text.contains('.') {
        while text.ends_with('0') {
            text.pop();
        }
        if text.ends_with('.') {
            text.pop();
        }
    }
    text
}

fn status_tone(status: &str) -> Tone {
    const POSITIVE: [&str; 6] = ["active", "success", "completed", "done", "approved", "published"];
    const PENDING: [&str; 4] = ["pending", "warning", "process", "open"];
    const NEGATIVE: [&str; 3] = ["error", "failed", "inactive"];

    let lower = status.to_lowercase();
    let mentions = |keywords: &[&str]| keywords.iter().any(|keyword| lower.contains(keyword));
    if mentions(&POSITIVE) {
        Tone::Positive
    } else if mentions(&PENDING) {
        Tone::Pending
    } else if mentions(&NEGATIVE) {
        Tone::Negative
    } else {
        Tone::Neutral
    }
}

pub fn strip_html(html: &str) -> String {
    let without_tags = MARKUP.replace_all(html, "");
    without_tags
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
        .trim()
        .to_string()
}

fn truncate_chars(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let cut: String = text.chars().take(limit).collect();
    format!("{cut}...")
}

pub fn initials(name: &str) -> String {
    name.split_whitespace()
        .filter_map(|word| word.chars().next())
        .flat_map(char::to_uppercase)
        .take(2)
        .collect()
}

fn is_draft(row: &Row) -> bool {
    row_str(row, "status") == Some("draft")
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => matches!(text.to_lowercase().as_str(), "true" | "yes" | "1"),
        _ => false,
    }
}

fn tag_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .map(value_to_text)
            .filter(|tag| !tag.trim().is_empty())
            .collect(),
        Value::String(text) => text
            .split(',')
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .map(str::to_string)
            .collect(),
        other => vec![value_to_text(other)],
    }
}

fn file_view(path: &str, alt: &str) -> CellView {
    if IMAGE_PATH.is_match(path) {
        return CellView::Image {
            src: path.to_string(),
            alt: alt.to_string(),
        };
    }
    let name = path
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty())
        .unwrap_or(path)
        .split('?')
        .next()
        .unwrap_or(path)
        .to_string();
    let extension = name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_uppercase())
        .unwrap_or_else(|| "FILE".to_string());
    CellView::File {
        name,
        extension,
        url: path.to_string(),
    }
}

fn temporal_view(cell_type: CellType, text: &str) -> CellView {
    let Some(parsed) = parse_temporal(text) else {
        return CellView::Placeholder;
    };
    let (date, time) = match parsed {
        Temporal::DateTime(at) => (Some(at.date()), Some(at.time())),
        Temporal::Date(day) => (Some(day), None),
        Temporal::Time(clock) => (None, Some(clock)),
    };
    let date_label = date.map(|day| day.format("%b %d, %Y").to_string());
    let time_label = time.map(|clock| clock.format("%I:%M %p").to_string());

    match (cell_type, date_label, time_label) {
        (CellType::Time, _, Some(time)) => CellView::Time(time),
        (CellType::Datetime, Some(date), Some(time)) => CellView::DateTime { date, time },
        (_, Some(date), _) => CellView::Date(date),
        (_, None, Some(time)) => CellView::Time(time),
        _ => CellView::Placeholder,
    }
}

/// Maps a column's cell type to its presentation. Total over every type.
#[derive(Clone, Default)]
pub struct RendererRegistry {
    currency: CurrencyFormat,
    callbacks: HashMap<String, CellCallback>,
}

impl fmt::Debug for RendererRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RendererRegistry")
            .field("currency", &self.currency)
            .field("callbacks", &self.callbacks.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl RendererRegistry {
    pub fn new(currency: CurrencyFormat) -> Self {
        Self {
            currency,
            callbacks: HashMap::new(),
        }
    }

    /// Registers the renderer used by a `custom` or `share` column.
    pub fn register(&mut self, column: impl Into<String>, callback: CellCallback) {
        self.callbacks.insert(column.into(), callback);
    }

    pub fn with(mut self, column: impl Into<String>, callback: CellCallback) -> Self {
        self.register(column, callback);
        self
    }

    pub fn currency(&self) -> &CurrencyFormat {
        &self.currency
    }

    pub fn render(&self, column: &ColumnDescriptor, row: &Row) -> CellView {
        self.render_value(column, row.get(&column.key), row)
    }

    pub fn render_value(
        &self,
        column: &ColumnDescriptor,
        value: Option<&Value>,
        row: &Row,
    ) -> CellView {
        if matches!(column.cell_type, CellType::Custom | CellType::Share) {
            if let Some(callback) = self.callbacks.get(&column.key) {
                return callback(value.unwrap_or(&Value::Null), row);
            }
        }

        let value = match value {
            Some(value) if !is_blank(Some(value)) => value,
            _ => return CellView::Placeholder,
        };
        let text = value_to_text(value);
        let grouping = Grouping::for_locale(&self.currency.locale);

        match column.cell_type {
            CellType::Text | CellType::Options | CellType::Custom | CellType::Share => {
                CellView::Text(text)
            }
            CellType::Number => match value {
                Value::Number(number) => {
                    CellView::Number(format_number(number.as_f64().unwrap_or(0.0), grouping))
                }
                _ => CellView::Number(text),
            },
            CellType::Currency => match value_as_f64(value) {
                Some(minor) => CellView::Currency(self.currency.format_minor(minor)),
                None => CellView::Text(text),
            },
            CellType::Percentage => match value_as_f64(value) {
                Some(ratio) => CellView::Percentage {
                    ratio: ratio.clamp(0.0, 1.0),
                    label: format!("{:.1}%", ratio * 100.0),
                },
                None => CellView::Text(text),
            },
            CellType::Date | CellType::Datetime | CellType::Time => {
                temporal_view(column.cell_type, &text)
            }
            CellType::Boolean => {
                let flag = truthy(value);
                CellView::Boolean {
                    value: flag,
                    label: if flag { "Yes" } else { "No" },
                }
            }
            CellType::Status => CellView::Status {
                tone: status_tone(&text),
                label: text,
            },
            CellType::Badge => CellView::Badge {
                label: text,
                tone: Tone::Accent,
            },
            CellType::Category => CellView::Badge {
                label: text,
                tone: Tone::Neutral,
            },
            CellType::Tags => {
                if is_draft(row) {
                    return CellView::Draft;
                }
                let all = tag_list(value);
                match all.first() {
                    Some(first) => CellView::Tags {
                        first: first.clone(),
                        overflow: all.len() - 1,
                        all,
                    },
                    None => CellView::Placeholder,
                }
            }
            CellType::RichText => {
                let plain = strip_html(&text);
                if plain.is_empty() {
                    return CellView::Placeholder;
                }
                CellView::RichText {
                    excerpt: truncate_chars(&plain, RICH_TEXT_LIMIT),
                    title: plain,
                }
            }
            CellType::Image | CellType::File => file_view(&text, &column.header),
            CellType::Avatar => {
                let name = row_str(row, "name")
                    .filter(|name| !name.trim().is_empty())
                    .unwrap_or("User")
                    .to_string();
                CellView::Avatar {
                    src: Some(text),
                    initials: initials(&name),
                    subtitle: row_str(row, "email").map(str::to_string),
                    name,
                }
            }
            CellType::Link => {
                let href = if text.starts_with("http://") || text.starts_with("https://") {
                    text.clone()
                } else {
                    format!("https://{text}")
                };
                let label = text
                    .trim_start_matches("https://")
                    .trim_start_matches("http://")
                    .to_string();
                CellView::Link { href, label }
            }
            CellType::Email => CellView::Email {
                href: format!("mailto:{text}"),
                label: text,
            },
            CellType::Phone => CellView::Phone {
                href: format!("tel:{text}"),
                label: text,
            },
            CellType::Progress => CellView::Progress {
                percent: value_as_f64(value).unwrap_or(0.0).clamp(0.0, 100.0),
            },
            CellType::Rating => {
                let rating = value_as_f64(value).unwrap_or(0.0).clamp(0.0, 5.0);
                CellView::Rating {
                    value: rating,
                    label: format!("{rating:.1}"),
                }
            }
            CellType::Json => {
                let parsed = match value {
                    Value::String(raw) => {
                        serde_json::from_str::<Value>(raw).unwrap_or_else(|_| value.clone())
                    }
                    other => other.clone(),
                };
                let pretty =
                    serde_json::to_string_pretty(&parsed).unwrap_or_else(|_| parsed.to_string());
                CellView::Json {
                    preview: truncate_chars(&parsed.to_string(), JSON_PREVIEW_LIMIT),
                    pretty,
                }
            }
            CellType::Code => CellView::Code(text),
            CellType::Color => {
                let hex = if text.trim().is_empty() {
                    "#000000".to_string()
                } else {
                    text
                };
                CellView::Color {
                    label: hex.to_uppercase(),
                    hex,
                }
            }
        }
    }
}

/// Share actions for published rows pointing at `<base>/newsroom/<slug>`.
pub fn share_renderer(base_url: &str) -> CellCallback {
    let base = base_url.trim_end_matches('/').to_string();
    Arc::new(move |_value: &Value, row: &Row| {
        if is_draft(row) {
            return CellView::Draft;
        }
        let slug = row_str(row, "slug").unwrap_or_default();
        let title = row_str(row, "title")
            .filter(|title| !title.is_empty())
            .unwrap_or("Content");
        let summary = row_str(row, "summary")
            .filter(|summary| !summary.is_empty())
            .or_else(|| row_str(row, "description"))
            .unwrap_or_default();
        CellView::Share(ShareLinks {
            url: format!("{base}/newsroom/{slug}"),
            title: title.to_string(),
            summary: summary.to_string(),
        })
    })
}
