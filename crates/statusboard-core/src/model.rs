//! Core data model
//!
//! Defines the types that flow through the pipeline:
//! - [`RawRecord`] / [`RawField`]: upstream items with typed field lists
//! - [`FlatRow`]: ordered key → string mapping produced by extraction
//! - [`NormalizedRow`] / [`Table`]: the canonical row model
//! - [`Column`]: the seven canonical columns, their keys and display labels

use crate::error::ExtractError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Flat key → string mapping, in upstream field order
pub type FlatRow = IndexMap<String, String>;

/// Key under which the record title is stored in a [`FlatRow`]
pub const TITLE_KEY: &str = "titel";

/// Key under which the upstream identifier is stored in a [`FlatRow`]
pub const ITEM_ID_KEY: &str = "item_id";

/// The seven canonical, text-bearing columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    /// Customer / project name
    Title,
    /// Advisor name (may carry an email annotation)
    Advisor,
    /// Web designer name (may carry an email annotation)
    Designer,
    /// Workflow status text
    Status,
    /// Free-text comment, may start with a date
    Comment,
    /// Responsible party ("who has the ball")
    Owner,
    /// Staging site URL
    StagingLink,
}

impl Column {
    /// All canonical columns in display order
    pub const ALL: [Column; 7] = [
        Column::Title,
        Column::Advisor,
        Column::Designer,
        Column::Status,
        Column::Comment,
        Column::Owner,
        Column::StagingLink,
    ];

    /// Canonical upstream key
    #[inline]
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Column::Title => TITLE_KEY,
            Column::Advisor => "radgiver",
            Column::Designer => "webdesigner",
            Column::Status => "status",
            Column::Comment => "kommentarer",
            Column::Owner => "hvemharbolden",
            Column::StagingLink => "stagingsite",
        }
    }

    /// Display label for table headers
    #[inline]
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Column::Title => "Kundenavn",
            Column::Advisor => "Rådgiver",
            Column::Designer => "Designer",
            Column::Status => "Status",
            Column::Comment => "Kommentar",
            Column::Owner => "Hvem har bolden",
            Column::StagingLink => "Staging site",
        }
    }

    /// Look up a column by canonical key
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.key() == key)
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Declared type of an upstream field
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// Plain text
    Text,
    /// Number (treated like text)
    Number,
    /// Single-choice category
    Category,
    /// Contact / person reference
    Contact,
    /// Date or date range
    Date,
    /// Relation to another upstream item
    App,
    /// Link with a url container
    Link,
    /// Embedded link or file
    Embed,
    /// Any other tag, handled like plain text
    Other(String),
}

impl FieldType {
    /// Parse an upstream type tag
    #[must_use]
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "text" => Self::Text,
            "number" => Self::Number,
            "category" => Self::Category,
            "contact" => Self::Contact,
            "date" => Self::Date,
            "app" => Self::App,
            "link" => Self::Link,
            "embed" => Self::Embed,
            other => Self::Other(other.to_string()),
        }
    }

    /// Upstream tag for this type
    #[must_use]
    pub fn as_tag(&self) -> &str {
        match self {
            Self::Text => "text",
            Self::Number => "number",
            Self::Category => "category",
            Self::Contact => "contact",
            Self::Date => "date",
            Self::App => "app",
            Self::Link => "link",
            Self::Embed => "embed",
            Self::Other(tag) => tag,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}

#[derive(Debug, Deserialize)]
struct WireField {
    #[serde(default)]
    external_id: String,
    #[serde(default, rename = "type")]
    field_type: String,
    #[serde(default)]
    values: Vec<Value>,
}

/// One typed field of an upstream record
#[derive(Debug, Clone, PartialEq)]
pub struct RawField {
    /// Stable field key (`external_id`)
    pub key: String,
    /// Declared type
    pub field_type: FieldType,
    /// Values; only the first is consulted
    pub values: Vec<Value>,
}

impl RawField {
    /// Create a field
    #[must_use]
    pub fn new(key: impl Into<String>, field_type: FieldType, values: Vec<Value>) -> Self {
        Self {
            key: key.into(),
            field_type,
            values,
        }
    }

    /// Parse a field entry from upstream JSON
    ///
    /// # Errors
    /// `ExtractError::MalformedField` if the entry is not an object or has
    /// no key.
    pub fn from_value(value: &Value) -> Result<Self, ExtractError> {
        let wire: WireField = serde_json::from_value(value.clone())
            .map_err(|e| ExtractError::MalformedField(e.to_string()))?;
        if wire.external_id.is_empty() {
            return Err(ExtractError::MalformedField("missing external_id".into()));
        }
        Ok(Self {
            key: wire.external_id,
            field_type: FieldType::from_tag(&wire.field_type),
            values: wire.values,
        })
    }

    /// First value, if any
    #[inline]
    #[must_use]
    pub fn first(&self) -> Option<&Value> {
        self.values.first()
    }
}

/// Upstream item: title, identifier and typed fields
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawRecord {
    /// Item title
    pub title: String,
    /// Upstream identifier
    pub item_id: Option<String>,
    /// Typed fields in upstream order
    pub fields: Vec<RawField>,
}

impl RawRecord {
    /// Parse an item from upstream JSON
    ///
    /// Malformed field entries are skipped; they normalize to empty strings
    /// later on.
    ///
    /// # Errors
    /// `ExtractError::NotAnObject` if `value` is not a JSON object.
    pub fn from_value(value: &Value) -> Result<Self, ExtractError> {
        let obj = value.as_object().ok_or(ExtractError::NotAnObject)?;

        let title = match obj.get("title") {
            Some(Value::String(s)) => s.clone(),
            None | Some(Value::Null) => String::new(),
            Some(other) => other.to_string(),
        };
        let item_id = match obj.get("item_id") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
        };

        let mut fields = Vec::new();
        if let Some(Value::Array(entries)) = obj.get("fields") {
            for entry in entries {
                match RawField::from_value(entry) {
                    Ok(field) => fields.push(field),
                    Err(e) => tracing::debug!(error = %e, "skipping malformed field entry"),
                }
            }
        }

        Ok(Self {
            title,
            item_id,
            fields,
        })
    }
}

/// Ownership highlight category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Highlight {
    /// No match
    #[default]
    None,
    /// Responsible party is the advisor
    OwnerIsAdvisor,
    /// Responsible party is the designer
    OwnerIsDesigner,
}

/// Canonical row
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NormalizedRow {
    /// Upstream identifier (not searchable)
    pub item_id: Option<String>,
    /// Customer / project name
    pub title: String,
    /// Advisor name
    pub advisor: String,
    /// Designer name
    pub designer: String,
    /// Status text
    pub status: String,
    /// Free-text comment
    pub comment: String,
    /// Responsible party
    pub owner: String,
    /// Staging site URL (raw)
    pub staging_link: String,
    /// Derived staleness flag
    pub stale: bool,
    /// Derived highlight category
    pub highlight: Highlight,
    /// Non-canonical upstream columns
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub extra: IndexMap<String, String>,
}

impl NormalizedRow {
    /// Value of a canonical column
    #[must_use]
    pub fn get(&self, column: Column) -> &str {
        match column {
            Column::Title => &self.title,
            Column::Advisor => &self.advisor,
            Column::Designer => &self.designer,
            Column::Status => &self.status,
            Column::Comment => &self.comment,
            Column::Owner => &self.owner,
            Column::StagingLink => &self.staging_link,
        }
    }

    /// Mutable slot of a canonical column
    pub fn slot_mut(&mut self, column: Column) -> &mut String {
        match column {
            Column::Title => &mut self.title,
            Column::Advisor => &mut self.advisor,
            Column::Designer => &mut self.designer,
            Column::Status => &mut self.status,
            Column::Comment => &mut self.comment,
            Column::Owner => &mut self.owner,
            Column::StagingLink => &mut self.staging_link,
        }
    }

    /// Convert back into a flat row with canonical keys
    #[must_use]
    pub fn to_flat_row(&self) -> FlatRow {
        let mut row = FlatRow::new();
        if let Some(id) = &self.item_id {
            row.insert(ITEM_ID_KEY.to_string(), id.clone());
        }
        for column in Column::ALL {
            row.insert(column.key().to_string(), self.get(column).to_string());
        }
        for (k, v) in &self.extra {
            row.insert(k.clone(), v.clone());
        }
        row
    }
}

/// Normalized table
///
/// The column set is fixed ([`Column::ALL`]) regardless of row count, so an
/// empty table still exposes every canonical column.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Table {
    rows: Vec<NormalizedRow>,
}

impl Table {
    /// Create empty table
    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create from rows
    #[inline]
    #[must_use]
    pub fn from_rows(rows: Vec<NormalizedRow>) -> Self {
        Self { rows }
    }

    /// Canonical columns
    #[inline]
    #[must_use]
    pub fn columns(&self) -> &'static [Column] {
        &Column::ALL
    }

    /// Rows
    #[inline]
    #[must_use]
    pub fn rows(&self) -> &[NormalizedRow] {
        &self.rows
    }

    /// Take ownership of rows
    #[inline]
    #[must_use]
    pub fn into_rows(self) -> Vec<NormalizedRow> {
        self.rows
    }

    /// Number of rows
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True if the table has no rows
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Iterate rows
    pub fn iter(&self) -> std::slice::Iter<'_, NormalizedRow> {
        self.rows.iter()
    }

    /// Copy of the rows matching `predicate`
    #[must_use]
    pub fn retain_cloned<F>(&self, mut predicate: F) -> Self
    where
        F: FnMut(&NormalizedRow) -> bool,
    {
        Self {
            rows: self.rows.iter().filter(|r| predicate(r)).cloned().collect(),
        }
    }

    /// Flat rows with canonical keys, suitable for re-normalization
    #[must_use]
    pub fn to_flat_rows(&self) -> Vec<FlatRow> {
        self.rows.iter().map(NormalizedRow::to_flat_row).collect()
    }
}

impl<'a> IntoIterator for &'a Table {
    type Item = &'a NormalizedRow;
    type IntoIter = std::slice::Iter<'a, NormalizedRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

impl FromStr for Column {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_key(s).ok_or_else(|| format!("unknown column: {s}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn column_keys_roundtrip() {
        for column in Column::ALL {
            assert_eq!(Column::from_key(column.key()), Some(column));
        }
        assert_eq!(Column::from_key("item_id"), None);
    }

    #[test]
    fn field_type_unknown_tag_preserved() {
        assert_eq!(FieldType::from_tag("embed"), FieldType::Embed);
        assert_eq!(
            FieldType::from_tag("calculation"),
            FieldType::Other("calculation".into())
        );
        assert_eq!(FieldType::from_tag("calculation").as_tag(), "calculation");
    }

    #[test]
    fn raw_record_parses_item() {
        let item = json!({
            "title": "Bageriet ApS",
            "item_id": 1001,
            "fields": [
                {"external_id": "status", "type": "category",
                 "values": [{"value": {"text": "Web: Online"}}]},
                "garbage",
                {"type": "text", "values": []}
            ]
        });

        let record = RawRecord::from_value(&item).unwrap();
        assert_eq!(record.title, "Bageriet ApS");
        assert_eq!(record.item_id.as_deref(), Some("1001"));
        assert_eq!(record.fields.len(), 1);
        assert_eq!(record.fields[0].key, "status");
        assert_eq!(record.fields[0].field_type, FieldType::Category);
    }

    #[test]
    fn raw_record_rejects_non_object() {
        assert_eq!(
            RawRecord::from_value(&json!([1, 2])),
            Err(ExtractError::NotAnObject)
        );
    }

    #[test]
    fn empty_table_exposes_all_columns() {
        let table = Table::empty();
        assert!(table.is_empty());
        assert_eq!(table.columns().len(), 7);
    }

    #[test]
    fn to_flat_row_uses_canonical_keys() {
        let row = NormalizedRow {
            item_id: Some("9".into()),
            title: "A".into(),
            staging_link: "http://x".into(),
            ..Default::default()
        };
        let flat = row.to_flat_row();
        assert_eq!(flat.get("item_id").map(String::as_str), Some("9"));
        assert_eq!(flat.get("titel").map(String::as_str), Some("A"));
        assert_eq!(flat.get("stagingsite").map(String::as_str), Some("http://x"));
        assert_eq!(flat.len(), 8);
    }
}
