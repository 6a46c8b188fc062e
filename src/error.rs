//! Error types for hive reading, analysis and report generation.
//!
//! Only [`AnalyzerError`] values produced while opening a hive or resolving
//! its root key abort an analysis. Everything raised below that level is
//! turned into inline diagnostic text by the walker.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for analyzer operations.
pub type Result<T> = std::result::Result<T, AnalyzerError>;

/// Errors that can occur while reading a hive or producing a report.
#[derive(Error, Debug)]
pub enum AnalyzerError {
    /// I/O error while reading a hive or writing a report.
    #[error("I/O failure: {0}")]
    Io(#[from] io::Error),

    /// Invalid magic signature in a header or cell.
    #[error("Bad signature {found:?}, expected {expected:?}")]
    InvalidSignature {
        /// Signature that was required.
        expected: Vec<u8>,
        /// Bytes actually present.
        found: Vec<u8>,
    },

    /// Hive structure does not match the regf layout.
    #[error("Malformed hive: {0}")]
    InvalidFormat(String),

    /// Cell offset points outside the hive data.
    #[error("Cell offset {offset:#x} lies outside the hive ({hive_size:#x} bytes)")]
    InvalidOffset {
        /// Offending cell offset (relative to the first hbin).
        offset: u32,
        /// Size of the hive data.
        hive_size: usize,
    },

    /// Cell size field is corrupt.
    #[error("Cell at {offset:#x} has unusable size {size}")]
    InvalidCellSize {
        /// Raw size value.
        size: i32,
        /// Cell offset.
        offset: u32,
    },

    /// Data ended before a structure was complete.
    #[error("Record at {offset:#x} is truncated: needs {expected} bytes, has {actual}")]
    TruncatedData {
        /// Offset of the structure being read.
        offset: u32,
        /// Bytes required.
        expected: usize,
        /// Bytes available.
        actual: usize,
    },

    /// Unknown subkey list signature.
    #[error("Unknown subkey list signature {list_type:?}")]
    InvalidSubkeyList {
        /// The two signature bytes found.
        list_type: [u8; 2],
    },

    /// UTF-16 text could not be decoded.
    #[error("Malformed UTF-16 text in record at {offset:#x}")]
    InvalidUtf16 {
        /// Offset of the string data.
        offset: u32,
    },

    /// Hive is smaller than a base block.
    #[error("Hive is {size} bytes, smaller than a {minimum}-byte base block")]
    HiveTooSmall {
        /// Actual size.
        size: usize,
        /// Required minimum.
        minimum: usize,
    },

    /// A value payload does not have the size its type requires.
    #[error("{type_name} payload must be exactly {expected} bytes, got {actual}")]
    PayloadSize {
        /// REG_* name of the value type.
        type_name: String,
        /// Required length.
        expected: usize,
        /// Actual length.
        actual: usize,
    },

    /// Key timestamp is outside the representable range.
    #[error("Invalid key timestamp: FILETIME {0:#x} is out of range")]
    InvalidTimestamp(u64),

    /// A key-tree source could not provide the requested data.
    #[error("{0}")]
    Source(String),

    /// JSON encoding or decoding failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Requested output format is not supported.
    #[error("Unsupported output format '{0}' (expected 'text' or 'json')")]
    UnsupportedFormat(String),

    /// Input hive file does not exist.
    #[error("File '{}' not found", .0.display())]
    InputNotFound(PathBuf),
}

impl AnalyzerError {
    /// Creates an invalid signature error from the expected and found bytes.
    pub fn invalid_signature(expected: &[u8], found: &[u8]) -> Self {
        Self::InvalidSignature {
            expected: expected.to_vec(),
            found: found.to_vec(),
        }
    }

    /// Creates an invalid offset error.
    pub fn invalid_offset(offset: u32, hive_size: usize) -> Self {
        Self::InvalidOffset { offset, hive_size }
    }

    /// Creates an invalid cell size error.
    pub fn invalid_cell_size(size: i32, offset: u32) -> Self {
        Self::InvalidCellSize { size, offset }
    }

    /// Creates a truncation error.
    pub fn truncated(offset: u32, expected: usize, actual: usize) -> Self {
        Self::TruncatedData {
            offset,
            expected,
            actual,
        }
    }

    /// Creates a source error from any displayable message.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use hive_report::AnalyzerError;
    /// let err = AnalyzerError::from_source("value list unreadable");
    /// assert_eq!(err.to_string(), "value list unreadable");
    /// ```
    pub fn from_source(message: impl Into<String>) -> Self {
        Self::Source(message.into())
    }

    /// Returns true for errors raised by configuration checks, before any
    /// hive data has been touched.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            AnalyzerError::UnsupportedFormat(_) | AnalyzerError::InputNotFound(_)
        )
    }
}
