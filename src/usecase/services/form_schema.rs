use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::domain::entities::column::{
    find_override, CellType, ColumnDescriptor, ColumnOverride, InputType, SelectOption,
};
use crate::domain::entities::error::FieldError;
use crate::domain::entities::row::{is_blank, value_as_f64, value_to_text, Row};
use crate::usecase::services::inference::{parse_temporal, Temporal};

static HEX_COLOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#[0-9A-Fa-f]{6}$").expect("valid color regex"));
static SLUG_STRIP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9_\s-]").expect("valid slug strip regex"));
static SLUG_SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid slug regex"));
static SLUG_DASHES: Lazy<Regex> = Lazy::new(|| Regex::new(r"-+").expect("valid slug regex"));

pub const DEFAULT_SLUG_SOURCE: &str = "title";

/// Shape a field value must have before it is submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    String,
    Number,
    Boolean,
    StringList,
    Color,
    Any,
}

impl ValueKind {
    fn for_cell(cell_type: CellType) -> Self {
        match cell_type {
            CellType::Number | CellType::Currency | CellType::Percentage | CellType::Rating => {
                ValueKind::Number
            }
            CellType::Boolean => ValueKind::Boolean,
            CellType::Tags => ValueKind::StringList,
            CellType::Json => ValueKind::Any,
            CellType::Color => ValueKind::Color,
            _ => ValueKind::String,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldSchema {
    pub key: String,
    pub label: String,
    pub kind: ValueKind,
    pub required: bool,
}

impl FieldSchema {
    /// Coerces `value` into the field's kind. `Ok(None)` drops an absent optional field.
    fn check(&self, value: Option<&Value>) -> Result<Option<Value>, String> {
        if is_blank(value) {
            if self.required {
                return Err(format!("{} is required", self.label));
            }
            return Ok(match (self.kind, value) {
                (ValueKind::String, Some(present)) => Some(present.clone()),
                (_, Some(_)) => Some(Value::Null),
                (_, None) => None,
            });
        }
        let Some(value) = value else {
            return Ok(None);
        };

        let coerced = match self.kind {
            ValueKind::Any => value.clone(),
            ValueKind::String => match value {
                Value::String(_) => value.clone(),
                Value::Number(_) | Value::Bool(_) => Value::String(value_to_text(value)),
                _ => return Err(format!("{} must be text", self.label)),
            },
            ValueKind::Number => match value {
                Value::Bool(flag) => Value::from(u8::from(*flag)),
                Value::String(text) if text.trim().is_empty() => Value::from(0),
                other => match value_as_f64(other).and_then(serde_json::Number::from_f64) {
                    Some(number) => Value::Number(normalize_number(number)),
                    None => return Err(format!("{} must be a number", self.label)),
                },
            },
            ValueKind::Boolean => match value {
                Value::Bool(_) => value.clone(),
                Value::String(text) if text == "true" => Value::Bool(true),
                Value::String(text) if text == "false" => Value::Bool(false),
                _ => return Err(format!("{} must be true or false", self.label)),
            },
            ValueKind::StringList => match value {
                Value::Array(items) if items.iter().all(Value::is_string) => value.clone(),
                _ => return Err(format!("{} must be a list of text", self.label)),
            },
            ValueKind::Color => match value {
                Value::String(text) if HEX_COLOR.is_match(text) => value.clone(),
                _ => return Err(format!("{} must be a hex color like #1A2B3C", self.label)),
            },
        };

        if self.required && matches!(&coerced, Value::String(text) if text.trim().is_empty()) {
            return Err(format!("{} is required", self.label));
        }
        Ok(Some(coerced))
    }
}

fn normalize_number(number: serde_json::Number) -> serde_json::Number {
    match number.as_f64() {
        Some(float) if float.fract() == 0.0 && float.abs() < i64::MAX as f64 => {
            serde_json::Number::from(float as i64)
        }
        _ => number,
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValidationSchema {
    pub fields: Vec<FieldSchema>,
}

impl ValidationSchema {
    /// Returns the coerced payload, or every field error at once.
    pub fn validate(&self, values: &Row) -> Result<Row, Vec<FieldError>> {
        let mut payload = Row::new();
        let mut errors = Vec::new();
        for field in &self.fields {
            match field.check(values.get(&field.key)) {
                Ok(Some(value)) => {
                    payload.insert(field.key.clone(), value);
                }
                Ok(None) => {}
                Err(message) => errors.push(FieldError::new(&field.key, message)),
            }
        }
        if errors.is_empty() {
            Ok(payload)
        } else {
            Err(errors)
        }
    }
}

/// The user a form is filled in for. Its field is locked to `id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActingUser {
    pub field: String,
    pub id: String,
}

impl ActingUser {
    pub fn new(field: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            id: id.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormField {
    pub key: String,
    pub label: String,
    pub cell_type: CellType,
    pub input_type: InputType,
    pub placeholder: String,
    pub options: Vec<SelectOption>,
    pub required: bool,
    pub read_only: bool,
    pub default_value: Value,
    pub slug_source: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FormSchema {
    pub validation: ValidationSchema,
    pub fields: Vec<FormField>,
}

impl FormSchema {
    /// Starting values: the row's non-null value when editing, else the field default.
    pub fn initial_values(&self, row: Option<&Row>) -> Row {
        self.fields
            .iter()
            .map(|field| {
                let existing = row
                    .and_then(|row| row.get(&field.key))
                    .filter(|value| !value.is_null());
                let value = match existing {
                    Some(value) if field.input_type == InputType::Date => {
                        Value::String(date_for_edit(value))
                    }
                    Some(value) => value.clone(),
                    None => field.default_value.clone(),
                };
                (field.key.clone(), value)
            })
            .collect()
    }

    pub fn field(&self, key: &str) -> Option<&FormField> {
        self.fields.iter().find(|field| field.key == key)
    }

    pub fn validate(&self, values: &Row) -> Result<Row, Vec<FieldError>> {
        self.validation.validate(values)
    }
}

fn input_for(cell_type: CellType, has_options: bool) -> InputType {
    if has_options {
        return InputType::Select;
    }
    match cell_type {
        CellType::RichText => InputType::RichText,
        CellType::Email => InputType::Email,
        CellType::Number | CellType::Currency | CellType::Percentage | CellType::Rating => {
            InputType::Number
        }
        CellType::Boolean => InputType::Checkbox,
        CellType::Date | CellType::Datetime | CellType::Time => InputType::Date,
        CellType::Tags => InputType::Chips,
        CellType::Json | CellType::Code => InputType::Textarea,
        _ => InputType::Text,
    }
}

fn default_for(cell_type: CellType, options: &[SelectOption]) -> Value {
    if let Some(first) = options.first() {
        return first.value.clone();
    }
    match ValueKind::for_cell(cell_type) {
        ValueKind::Boolean => Value::Bool(false),
        ValueKind::Number => Value::from(0),
        ValueKind::StringList => Value::Array(Vec::new()),
        _ => Value::String(String::new()),
    }
}

/// Builds the validation schema and the input list from one per-column resolution.
pub fn generate_form(
    columns: &[ColumnDescriptor],
    required: &[String],
    overrides: &[ColumnOverride],
    acting_user: Option<&ActingUser>,
) -> FormSchema {
    let mut schema = FormSchema::default();

    for column in columns {
        let column_override = find_override(overrides, &column.key);
        let cell_type = column_override
            .and_then(|item| item.cell_type)
            .unwrap_or(column.cell_type);
        let options = column_override
            .and_then(|item| item.options.clone())
            .unwrap_or_default();
        let has_options = column_override.is_some_and(|item| item.options.is_some());
        let input_type = column_override
            .and_then(|item| item.input_type)
            .unwrap_or_else(|| input_for(cell_type, has_options));
        let is_required = required.iter().any(|key| key == &column.key);

        let kind = if has_options {
            ValueKind::String
        } else {
            ValueKind::for_cell(cell_type)
        };
        schema.validation.fields.push(FieldSchema {
            key: column.key.clone(),
            label: column.header.clone(),
            kind,
            required: is_required,
        });

        let acting = acting_user.filter(|user| user.field == column.key);
        let default_value = match acting {
            Some(user) => Value::String(user.id.clone()),
            None => default_for(cell_type, &options),
        };
        schema.fields.push(FormField {
            key: column.key.clone(),
            label: column.header.clone(),
            cell_type,
            input_type,
            placeholder: format!("Enter {}...", column.header.to_lowercase()),
            options,
            required: is_required,
            read_only: acting.is_some(),
            default_value,
            slug_source: (input_type == InputType::Slug).then(|| DEFAULT_SLUG_SOURCE.to_string()),
        });
    }

    schema
}

/// Stored date or timestamp to the `YYYY-MM-DD` an editor shows.
pub fn date_for_edit(value: &Value) -> String {
    let text = value_to_text(value);
    match parse_temporal(&text) {
        Some(Temporal::DateTime(at)) => at.date().format("%Y-%m-%d").to_string(),
        Some(Temporal::Date(day)) => day.format("%Y-%m-%d").to_string(),
        _ => String::new(),
    }
}

/// Editor date back to the stored midnight timestamp; empty stays empty.
pub fn date_from_edit(text: &str) -> Value {
    let text = text.trim();
    if text.is_empty() {
        return Value::String(String::new());
    }
    Value::String(format!("{text}T00:00:00"))
}

pub fn generate_slug(text: &str) -> String {
    let lowered = text.to_lowercase();
    let stripped = SLUG_STRIP.replace_all(lowered.trim(), "");
    let dashed = SLUG_SPACES.replace_all(&stripped, "-");
    SLUG_DASHES.replace_all(&dashed, "-").into_owned()
}

/// Tag entry: space commits, backspace on an empty buffer pops.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChipInput {
    pub chips: Vec<String>,
    pub buffer: String,
}

impl ChipInput {
    pub fn from_value(value: &Value) -> Self {
        let chips = match value {
            Value::Array(items) => items.iter().map(value_to_text).collect(),
            _ => Vec::new(),
        };
        Self {
            chips,
            buffer: String::new(),
        }
    }

    /// Feeds the raw input text; a trailing space commits the buffer.
    pub fn input(&mut self, text: &str) {
        if text.ends_with(' ') {
            self.buffer = text.to_string();
            self.commit();
        } else {
            self.buffer = text.to_string();
        }
    }

    pub fn commit(&mut self) {
        let item = self.buffer.trim().to_string();
        if !item.is_empty() && !self.chips.contains(&item) {
            self.chips.push(item);
        }
        self.buffer.clear();
    }

    pub fn backspace(&mut self) {
        if self.buffer.is_empty() {
            self.chips.pop();
        }
    }

    pub fn remove(&mut self, chip: &str) {
        self.chips.retain(|item| item != chip);
    }

    pub fn to_value(&self) -> Value {
        Value::Array(self.chips.iter().cloned().map(Value::String).collect())
    }
}
