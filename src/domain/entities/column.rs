use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Presentation category of a column. Closed set, one per column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CellType {
    Text,
    Number,
    Currency,
    Percentage,
    Date,
    Datetime,
    Time,
    Boolean,
    Badge,
    Status,
    Avatar,
    Image,
    Link,
    Email,
    Phone,
    Progress,
    Rating,
    Tags,
    Json,
    Code,
    Color,
    File,
    Share,
    Category,
    Options,
    RichText,
    Custom,
}

impl CellType {
    pub const ALL: [CellType; 27] = [
        CellType::Text,
        CellType::Number,
        CellType::Currency,
        CellType::Percentage,
        CellType::Date,
        CellType::Datetime,
        CellType::Time,
        CellType::Boolean,
        CellType::Badge,
        CellType::Status,
        CellType::Avatar,
        CellType::Image,
        CellType::Link,
        CellType::Email,
        CellType::Phone,
        CellType::Progress,
        CellType::Rating,
        CellType::Tags,
        CellType::Json,
        CellType::Code,
        CellType::Color,
        CellType::File,
        CellType::Share,
        CellType::Category,
        CellType::Options,
        CellType::RichText,
        CellType::Custom,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CellType::Text => "text",
            CellType::Number => "number",
            CellType::Currency => "currency",
            CellType::Percentage => "percentage",
            CellType::Date => "date",
            CellType::Datetime => "datetime",
            CellType::Time => "time",
            CellType::Boolean => "boolean",
            CellType::Badge => "badge",
            CellType::Status => "status",
            CellType::Avatar => "avatar",
            CellType::Image => "image",
            CellType::Link => "link",
            CellType::Email => "email",
            CellType::Phone => "phone",
            CellType::Progress => "progress",
            CellType::Rating => "rating",
            CellType::Tags => "tags",
            CellType::Json => "json",
            CellType::Code => "code",
            CellType::Color => "color",
            CellType::File => "file",
            CellType::Share => "share",
            CellType::Category => "category",
            CellType::Options => "options",
            CellType::RichText => "rich-text",
            CellType::Custom => "custom",
        }
    }

    /// Unknown names fall back to `Text` instead of failing.
    pub fn parse_lossy(name: &str) -> CellType {
        name.parse().unwrap_or(CellType::Text)
    }

    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            CellType::Number | CellType::Currency | CellType::Percentage | CellType::Rating
        )
    }
}

impl fmt::Display for CellType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCellType(pub String);

impl fmt::Display for UnknownCellType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown cell type: {}", self.0)
    }
}

impl std::error::Error for UnknownCellType {}

impl FromStr for CellType {
    type Err = UnknownCellType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        CellType::ALL
            .iter()
            .copied()
            .find(|cell_type| cell_type.as_str() == needle)
            .ok_or_else(|| UnknownCellType(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub key: String,
    pub header: String,
    pub cell_type: CellType,
    pub sortable: bool,
    pub filterable: bool,
    pub min_width: u32,
}

impl ColumnDescriptor {
    pub fn new(key: impl Into<String>, cell_type: CellType) -> Self {
        let key = key.into();
        Self {
            header: header_from_key(&key),
            min_width: min_width_for(cell_type),
            filterable: filterable_for(cell_type),
            sortable: true,
            cell_type,
            key,
        }
    }
}

/// `press_release_id` -> `Press Release Id`
pub fn header_from_key(key: &str) -> String {
    key.replace('_', " ")
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn filterable_for(cell_type: CellType) -> bool {
    !matches!(
        cell_type,
        CellType::Image | CellType::Avatar | CellType::Json | CellType::Code
    )
}

fn min_width_for(cell_type: CellType) -> u32 {
    match cell_type {
        CellType::Boolean => 80,
        CellType::Avatar | CellType::Image => 60,
        _ => 100,
    }
}

/// Widget used to edit a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InputType {
    Text,
    Password,
    Email,
    Number,
    Textarea,
    Checkbox,
    Select,
    Date,
    Otp,
    Combobox,
    Chips,
    RichText,
    ImageUpload,
    ImageUrl,
    Slug,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectOption {
    pub label: String,
    pub value: Value,
}

impl SelectOption {
    pub fn new(label: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// Integrator-supplied column configuration; wins over inference.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ColumnOverride {
    pub column_name: String,
    #[serde(default)]
    pub input_type: Option<InputType>,
    #[serde(default)]
    pub cell_type: Option<CellType>,
    #[serde(default)]
    pub options: Option<Vec<SelectOption>>,
}

impl ColumnOverride {
    pub fn new(column_name: impl Into<String>) -> Self {
        Self {
            column_name: column_name.into(),
            ..Self::default()
        }
    }

    pub fn input(mut self, input_type: InputType) -> Self {
        self.input_type = Some(input_type);
        self
    }

    pub fn cell(mut self, cell_type: CellType) -> Self {
        self.cell_type = Some(cell_type);
        self
    }

    pub fn options(mut self, options: Vec<SelectOption>) -> Self {
        self.options = Some(options);
        self
    }
}

pub fn find_override<'a>(
    overrides: &'a [ColumnOverride],
    column: &str,
) -> Option<&'a ColumnOverride> {
    overrides.iter().find(|item| item.column_name == column)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_type_names_round_trip() {
        for cell_type in CellType::ALL {
            assert_eq!(cell_type.to_string().parse::<CellType>(), Ok(cell_type));
        }
        assert_eq!(" Rich-Text ".parse::<CellType>(), Ok(CellType::RichText));
        assert!("sparkline".parse::<CellType>().is_err());
        assert_eq!(CellType::parse_lossy("sparkline"), CellType::Text);
    }

    #[test]
    fn headers_are_title_cased() {
        assert_eq!(header_from_key("press_release_id"), "Press Release Id");
        assert_eq!(header_from_key("email"), "Email");
    }

    #[test]
    fn media_columns_are_narrow_and_unfiltered() {
        let avatar = ColumnDescriptor::new("profile_pic", CellType::Avatar);
        assert_eq!(avatar.min_width, 60);
        assert!(!avatar.filterable);
        assert!(ColumnDescriptor::new("amount", CellType::Currency).filterable);
        assert!(CellType::Rating.is_numeric());
        assert!(!CellType::Tags.is_numeric());
    }
}
