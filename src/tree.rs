//! The key-tree abstraction consumed by the walker.
//!
//! [`TreeKey`] and [`RawValue`] describe what the analysis needs from a
//! hive parser: paths, timestamps, ordered values and ordered subkeys.
//! Every accessor is fallible so that a damaged key or value can be
//! reported in place without aborting the rest of the walk.
//!
//! [`crate::hive::HiveKey`] implements the traits over a real hive file;
//! [`MemoryKey`] implements them over an owned in-memory tree.

use crate::error::{AnalyzerError, Result};
use crate::value::ValueType;
use chrono::{DateTime, Utc};

/// A typed value record as yielded by a key-tree source.
pub trait RawValue {
    /// Value name; empty for the key's default value.
    fn name(&self) -> &str;

    /// REG_* type of the payload.
    fn value_type(&self) -> ValueType;

    /// Raw payload bytes.
    fn data(&self) -> Result<Vec<u8>>;
}

/// A key in a registry key tree.
pub trait TreeKey: Sized {
    /// Value record type yielded by [`TreeKey::values`].
    type Value: RawValue;

    /// Fully qualified path from the tree root to this key.
    fn path(&self) -> Result<String>;

    /// Last write time of the key.
    fn timestamp(&self) -> Result<DateTime<Utc>>;

    /// Values in the order the source stores them.
    fn values(&self) -> Result<Vec<Self::Value>>;

    /// Subkeys in the order the source stores them.
    fn subkeys(&self) -> Result<Vec<Self>>;
}

/// Closed classification the value normalizer dispatches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeTag {
    /// REG_BINARY: rendered as hex.
    Binary,
    /// REG_DWORD: rendered as an unsigned integer.
    Integer32,
    /// Everything else: rendered through its natural string form.
    Other,
}

impl From<ValueType> for TypeTag {
    fn from(value_type: ValueType) -> Self {
        match value_type {
            ValueType::Binary => TypeTag::Binary,
            ValueType::Dword => TypeTag::Integer32,
            _ => TypeTag::Other,
        }
    }
}

/// Owned value for [`MemoryKey`] trees.
#[derive(Debug, Clone)]
pub struct MemoryValue {
    name: String,
    value_type: ValueType,
    data: std::result::Result<Vec<u8>, String>,
}

impl MemoryValue {
    /// Creates a value with an arbitrary type and payload.
    pub fn new(name: impl Into<String>, value_type: ValueType, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            value_type,
            data: Ok(data.into()),
        }
    }

    /// REG_BINARY value.
    pub fn binary(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self::new(name, ValueType::Binary, data)
    }

    /// REG_DWORD value.
    pub fn dword(name: impl Into<String>, value: u32) -> Self {
        Self::new(name, ValueType::Dword, value.to_le_bytes())
    }

    /// REG_SZ value, stored as null-terminated UTF-16LE.
    pub fn string(name: impl Into<String>, text: &str) -> Self {
        Self::new(name, ValueType::String, utf16_le_bytes(text, true))
    }

    /// A value whose payload cannot be read.
    pub fn unreadable(name: impl Into<String>, value_type: ValueType, reason: &str) -> Self {
        Self {
            name: name.into(),
            value_type,
            data: Err(reason.to_string()),
        }
    }
}

impl RawValue for MemoryValue {
    fn name(&self) -> &str {
        &self.name
    }

    fn value_type(&self) -> ValueType {
        self.value_type
    }

    fn data(&self) -> Result<Vec<u8>> {
        self.data.clone().map_err(AnalyzerError::from_source)
    }
}

/// Owned in-memory key tree.
///
/// Paths are maintained automatically: a subkey added with
/// [`MemoryKey::with_subkey`] gets `<parent path>\<name>`.
///
/// ```rust
/// use hive_report::tree::{MemoryKey, MemoryValue, TreeKey};
///
/// let root = MemoryKey::new("ROOT").with_subkey(
///     MemoryKey::new("Software").with_value(MemoryValue::dword("Count", 3)),
/// );
/// let software = &root.subkeys().unwrap()[0];
/// assert_eq!(software.path().unwrap(), "ROOT\\Software");
/// ```
#[derive(Debug, Clone)]
pub struct MemoryKey {
    name: String,
    path: std::result::Result<String, String>,
    timestamp: std::result::Result<DateTime<Utc>, String>,
    values: std::result::Result<Vec<MemoryValue>, String>,
    subkeys: std::result::Result<Vec<MemoryKey>, String>,
}

impl MemoryKey {
    /// Creates a key with no values or subkeys, last written at the Unix epoch.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            path: Ok(name.clone()),
            name,
            timestamp: Ok(DateTime::<Utc>::default()),
            values: Ok(Vec::new()),
            subkeys: Ok(Vec::new()),
        }
    }

    /// Sets the last write time.
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Ok(timestamp);
        self
    }

    /// Appends a value.
    pub fn with_value(mut self, value: MemoryValue) -> Self {
        if let Ok(values) = &mut self.values {
            values.push(value);
        }
        self
    }

    /// Appends a subkey, re-rooting its path under this key.
    pub fn with_subkey(mut self, mut subkey: MemoryKey) -> Self {
        if let Ok(parent) = &self.path {
            subkey.reparent(parent);
        }
        if let Ok(subkeys) = &mut self.subkeys {
            subkeys.push(subkey);
        }
        self
    }

    /// Makes [`TreeKey::path`] fail with `reason`.
    pub fn fail_path(mut self, reason: &str) -> Self {
        self.path = Err(reason.to_string());
        self
    }

    /// Makes [`TreeKey::timestamp`] fail with `reason`.
    pub fn fail_timestamp(mut self, reason: &str) -> Self {
        self.timestamp = Err(reason.to_string());
        self
    }

    /// Makes [`TreeKey::values`] fail with `reason`.
    pub fn fail_values(mut self, reason: &str) -> Self {
        self.values = Err(reason.to_string());
        self
    }

    /// Makes [`TreeKey::subkeys`] fail with `reason`.
    pub fn fail_subkeys(mut self, reason: &str) -> Self {
        self.subkeys = Err(reason.to_string());
        self
    }

    fn reparent(&mut self, parent_path: &str) {
        if self.path.is_ok() {
            self.path = Ok(format!("{}\\{}", parent_path, self.name));
        }
        if let (Ok(path), Ok(subkeys)) = (&self.path, &mut self.subkeys) {
            for subkey in subkeys {
                subkey.reparent(path);
            }
        }
    }
}

impl TreeKey for MemoryKey {
    type Value = MemoryValue;

    fn path(&self) -> Result<String> {
        self.path.clone().map_err(AnalyzerError::from_source)
    }

    fn timestamp(&self) -> Result<DateTime<Utc>> {
        self.timestamp.clone().map_err(AnalyzerError::from_source)
    }

    fn values(&self) -> Result<Vec<MemoryValue>> {
        self.values.clone().map_err(AnalyzerError::from_source)
    }

    fn subkeys(&self) -> Result<Vec<MemoryKey>> {
        self.subkeys.clone().map_err(AnalyzerError::from_source)
    }
}

/// Encodes `text` as UTF-16LE, optionally with a null terminator.
pub fn utf16_le_bytes(text: &str, terminate: bool) -> Vec<u8> {
    let mut bytes: Vec<u8> = text.encode_utf16().flat_map(u16::to_le_bytes).collect();
    if terminate {
        bytes.extend_from_slice(&[0, 0]);
    }
    bytes
}
