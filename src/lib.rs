//! # Registry Hive Report
//!
//! Walks every key of a Windows registry hive and produces a report of key
//! paths, last write times and values, with RecentDocs MRU lists decoded
//! into their most-recently-used order.
//!
//! ## Architecture
//!
//! 1. **Hive access** ([`hive`]): memory-mapped, read-only regf reader
//!    exposing keys through the [`tree::TreeKey`] trait
//! 2. **Normalization** ([`normalize`]): one raw value in, one
//!    report-safe rendering out
//! 3. **MRU decoding** ([`mru`]): `MRUListEx` order plus slot values
//! 4. **Walking** ([`walker`]): pre-order traversal into a [`Report`]
//! 5. **Rendering** ([`render`]): text or JSON output
//!
//! Failures below the root key never abort a walk. They are recorded as
//! `[ERROR: ...]` placeholders on the value or key they belong to.
//!
//! ## Example
//!
//! ```no_run
//! use hive_report::render::{render_to_string, ReportFormat};
//! use hive_report::walker::{analyze_file, Progress};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let report = analyze_file("NTUSER.DAT", Progress::Silent)?;
//! for entry in report.entries() {
//!     if let Some(docs) = &entry.recent_docs {
//!         println!("{}: {} recent documents", entry.path, docs.len());
//!     }
//! }
//! let text = render_to_string(&report, ReportFormat::Text)?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod header;
pub mod hive;
pub mod key;
pub mod mru;
pub mod normalize;
pub mod render;
pub mod report;
pub mod search;
pub mod session;
pub mod subkey_list;
pub mod tree;
pub mod utils;
pub mod value;
pub mod walker;

// Re-export main types for convenience
pub use error::{AnalyzerError, Result};
pub use header::BaseBlock;
pub use hive::{Hive, HiveKey, HiveValue};
pub use render::ReportFormat;
pub use report::{KeyEntry, MruEntry, NormalizedValue, RecentDoc, Rendered, Report};
pub use tree::{RawValue, TreeKey};
pub use value::{ValueData, ValueType};
pub use walker::{analyze_file, HiveWalker, Progress};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
