//! Report data model: one [`KeyEntry`] per traversed key.

use crate::error::Result;
use crate::value::ValueType;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Read;

/// Display name used for a key's unnamed (default) value.
pub const DEFAULT_VALUE_NAME: &str = "(Default)";

/// Prefix of the single entry recorded when an MRU list cannot be decoded.
pub const MRU_ERROR_PREFIX: &str = "Error parsing RecentDocs: ";

/// Report-safe rendering of one value.
///
/// Hex strings, natural string forms and `[ERROR: ...]` placeholders are
/// all [`Rendered::Text`]; only REG_DWORD values are [`Rendered::Integer`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Rendered {
    /// 32-bit little-endian integer.
    Integer(u32),
    /// Any textual rendering.
    Text(String),
}

impl Rendered {
    /// Builds the placeholder recorded for a value that failed to decode.
    pub fn error(reason: impl fmt::Display) -> Self {
        Rendered::Text(error_placeholder(reason))
    }

    /// Returns true if this is an error placeholder.
    pub fn is_error(&self) -> bool {
        matches!(self, Rendered::Text(text) if text.starts_with("[ERROR: "))
    }
}

impl fmt::Display for Rendered {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rendered::Integer(n) => write!(f, "{}", n),
            Rendered::Text(text) => f.write_str(text),
        }
    }
}

/// Formats the inline diagnostic for a failed item.
pub fn error_placeholder(reason: impl fmt::Display) -> String {
    format!("[ERROR: {}]", reason)
}

/// One normalized value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedValue {
    /// Value name, or [`DEFAULT_VALUE_NAME`] for the unnamed value.
    pub display_name: String,
    /// Registry type the value was stored with.
    pub value_type: ValueType,
    /// Rendered payload.
    pub rendered: Rendered,
}

/// One decoded slot of an MRU list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MruEntry {
    /// Slot index taken from the MRUListEx array.
    pub index: u32,
    /// Text of the slot value up to its first null character.
    pub label: String,
}

/// An item of a key's recent documents list.
///
/// Serialized as a single string, `"<index>. <label>"` for entries and the
/// error text otherwise; parsing the string back yields the same item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RecentDoc {
    /// A decoded MRU slot.
    Entry(MruEntry),
    /// The MRU list could not be decoded.
    Error(String),
}

impl fmt::Display for RecentDoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecentDoc::Entry(entry) => write!(f, "{}. {}", entry.index, entry.label),
            RecentDoc::Error(message) => f.write_str(message),
        }
    }
}

impl From<RecentDoc> for String {
    fn from(doc: RecentDoc) -> Self {
        doc.to_string()
    }
}

impl From<String> for RecentDoc {
    fn from(text: String) -> Self {
        let entry = text.split_once(". ").and_then(|(index, label)| {
            let index = index.parse::<u32>().ok()?;
            Some(MruEntry {
                index,
                label: label.to_string(),
            })
        });
        match entry {
            Some(entry) => RecentDoc::Entry(entry),
            None => RecentDoc::Error(text),
        }
    }
}

/// Everything recorded for one key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEntry {
    /// Fully qualified key path.
    pub path: String,
    /// Last write time; `None` when it could not be read.
    pub timestamp: Option<DateTime<Utc>>,
    /// Rendered values keyed by display name, in source order.
    pub values: IndexMap<String, Rendered>,
    /// Decoded MRU list; present only for RecentDocs-pattern keys.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recent_docs: Option<Vec<RecentDoc>>,
    /// Key-level failures, as `[ERROR: ...]` placeholders.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    /// Registry type of each value, keyed like `values`. Not part of the
    /// JSON form, so it is empty after [`Report::from_json`].
    #[serde(skip)]
    pub value_types: IndexMap<String, ValueType>,
}

impl KeyEntry {
    /// Creates an entry with no values.
    pub fn new(path: impl Into<String>, timestamp: Option<DateTime<Utc>>) -> Self {
        Self {
            path: path.into(),
            timestamp,
            values: IndexMap::new(),
            recent_docs: None,
            errors: Vec::new(),
            value_types: IndexMap::new(),
        }
    }

    /// Records a normalized value. A repeated display name keeps its
    /// original position and takes the newer rendering.
    pub fn insert_value(&mut self, value: NormalizedValue) {
        self.value_types.insert(value.display_name.clone(), value.value_type);
        self.values.insert(value.display_name, value.rendered);
    }

    /// Registry type recorded for a value, if known.
    pub fn value_type(&self, name: &str) -> Option<ValueType> {
        self.value_types.get(name).copied()
    }

    /// Returns true if any key-level failure was recorded.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// The ordered result of one walk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    entries: Vec<KeyEntry>,
    key_count: usize,
}

impl Report {
    /// Builds a report from entries in traversal order.
    pub fn from_entries(entries: Vec<KeyEntry>) -> Self {
        let key_count = entries.len();
        Self { entries, key_count }
    }

    /// Entries in traversal order.
    pub fn entries(&self) -> &[KeyEntry] {
        &self.entries
    }

    /// Total keys visited, including keys recorded with errors.
    pub fn key_count(&self) -> usize {
        self.key_count
    }

    /// Finds the entry for an exact key path.
    pub fn find(&self, path: &str) -> Option<&KeyEntry> {
        self.entries.iter().find(|entry| entry.path == path)
    }

    /// Reads back a report rendered in JSON format.
    pub fn from_json<R: Read>(reader: R) -> Result<Self> {
        let entries: Vec<KeyEntry> = serde_json::from_reader(reader)?;
        Ok(Self::from_entries(entries))
    }

    /// Consumes the report, returning its entries.
    pub fn into_entries(self) -> Vec<KeyEntry> {
        self.entries
    }
}
