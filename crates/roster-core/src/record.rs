use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Label used when a stored snapshot carries no `lastUpdated` value.
pub const UNKNOWN_TIMESTAMP_LABEL: &str = "Không rõ";

/// Display-only ordinal of a roster row. Spreadsheets and stored documents may carry
/// either numbers or free text in this column, so both are preserved as-is.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum SequenceNumber {
    Number(i64),
    Decimal(f64),
    Text(String),
}

impl SequenceNumber {
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value as f64),
            Self::Decimal(value) => Some(*value),
            Self::Text(_) => None,
        }
    }

    /// Total order: numbers first, compared by value, then text compared lexically.
    ///
    /// Integers and decimals share one `f64` scale so mixed columns stay transitive.
    #[must_use]
    pub fn natural_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Text(left), Self::Text(right)) => left.cmp(right),
            (Self::Text(_), _) => Ordering::Greater,
            (_, Self::Text(_)) => Ordering::Less,
            _ => match (self.as_f64(), other.as_f64()) {
                (Some(left), Some(right)) => left.total_cmp(&right),
                _ => Ordering::Equal,
            },
        }
    }
}

impl Default for SequenceNumber {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl Display for SequenceNumber {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(value) => write!(f, "{value}"),
            Self::Decimal(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
        }
    }
}

/// The seven positional columns of a roster row, in spreadsheet order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RecordField {
    SequenceNumber,
    FullName,
    Unit,
    ParentUnit,
    DateOfBirth,
    Phone,
    Status,
}

impl RecordField {
    pub const ALL: [Self; 7] = [
        Self::SequenceNumber,
        Self::FullName,
        Self::Unit,
        Self::ParentUnit,
        Self::DateOfBirth,
        Self::Phone,
        Self::Status,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SequenceNumber => "sequence_number",
            Self::FullName => "full_name",
            Self::Unit => "unit",
            Self::ParentUnit => "parent_unit",
            Self::DateOfBirth => "date_of_birth",
            Self::Phone => "phone",
            Self::Status => "status",
        }
    }

    /// Accepts both the snake_case names and the document wire names (`stt`, `fullName`, ...).
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "sequence_number" | "stt" => Some(Self::SequenceNumber),
            "full_name" | "fullName" => Some(Self::FullName),
            "unit" => Some(Self::Unit),
            "parent_unit" | "parentUnit" => Some(Self::ParentUnit),
            "date_of_birth" | "dob" => Some(Self::DateOfBirth),
            "phone" => Some(Self::Phone),
            "status" => Some(Self::Status),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Record {
    #[serde(rename = "stt")]
    pub sequence_number: SequenceNumber,
    #[serde(rename = "fullName")]
    pub full_name: String,
    pub unit: String,
    #[serde(rename = "parentUnit")]
    pub parent_unit: String,
    #[serde(rename = "dob")]
    pub date_of_birth: String,
    pub phone: String,
    pub status: String,
}

impl Record {
    /// A record is kept only when it carries a name.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.full_name.is_empty()
    }

    /// Rendered value of one field, as shown to viewers and matched by search.
    #[must_use]
    pub fn display_value(&self, field: RecordField) -> Cow<'_, str> {
        match field {
            RecordField::SequenceNumber => Cow::Owned(self.sequence_number.to_string()),
            RecordField::FullName => Cow::Borrowed(&self.full_name),
            RecordField::Unit => Cow::Borrowed(&self.unit),
            RecordField::ParentUnit => Cow::Borrowed(&self.parent_unit),
            RecordField::DateOfBirth => Cow::Borrowed(&self.date_of_birth),
            RecordField::Phone => Cow::Borrowed(&self.phone),
            RecordField::Status => Cow::Borrowed(&self.status),
        }
    }

    /// Natural ordering of two records on a single field.
    #[must_use]
    pub fn cmp_by(&self, other: &Self, field: RecordField) -> Ordering {
        match field {
            RecordField::SequenceNumber => self.sequence_number.natural_cmp(&other.sequence_number),
            _ => self.display_value(field).cmp(&other.display_value(field)),
        }
    }

    /// Decode one record from a stored document entry, tolerating missing or
    /// mistyped fields. Returns `None` when the entry is not an object.
    #[must_use]
    pub fn from_document_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        Some(Self {
            sequence_number: sequence_field(object.get("stt")),
            full_name: text_field(object, "fullName"),
            unit: text_field(object, "unit"),
            parent_unit: text_field(object, "parentUnit"),
            date_of_birth: text_field(object, "dob"),
            phone: text_field(object, "phone"),
            status: text_field(object, "status"),
        })
    }
}

/// The single persisted roster document: every record plus the publish label.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Snapshot {
    #[serde(rename = "data")]
    pub records: Vec<Record>,
    #[serde(rename = "lastUpdated")]
    pub last_updated: String,
}

impl Snapshot {
    #[must_use]
    pub fn new(records: Vec<Record>, last_updated: impl Into<String>) -> Self {
        Self { records, last_updated: last_updated.into() }
    }

    /// Decode a stored `{ data, lastUpdated }` document.
    ///
    /// A `data` member that is missing or not an array yields no records, and a missing
    /// or empty `lastUpdated` yields [`UNKNOWN_TIMESTAMP_LABEL`].
    #[must_use]
    pub fn from_document(document: &Value) -> Self {
        let records = document
            .get("data")
            .and_then(Value::as_array)
            .map(|entries| entries.iter().filter_map(Record::from_document_value).collect())
            .unwrap_or_default();
        let last_updated = match document.get("lastUpdated") {
            Some(Value::String(label)) if !label.is_empty() => label.clone(),
            _ => UNKNOWN_TIMESTAMP_LABEL.to_string(),
        };
        Self { records, last_updated }
    }
}

fn text_field(object: &Map<String, Value>, key: &str) -> String {
    match object.get(key) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(value)) => value.clone(),
        Some(other) => other.to_string(),
    }
}

fn sequence_field(value: Option<&Value>) -> SequenceNumber {
    match value {
        Some(Value::Number(number)) => match number.as_i64() {
            Some(integer) => SequenceNumber::Number(integer),
            None => number.as_f64().map_or_else(
                || SequenceNumber::Text(number.to_string()),
                SequenceNumber::Decimal,
            ),
        },
        Some(Value::String(text)) => SequenceNumber::Text(text.clone()),
        Some(Value::Bool(flag)) => SequenceNumber::Text(flag.to_string()),
        _ => SequenceNumber::default(),
    }
}
