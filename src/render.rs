//! Text and JSON report output.

use crate::error::{AnalyzerError, Result};
use crate::report::{KeyEntry, Report};
use chrono::{DateTime, SecondsFormat, Utc};
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::info;

/// Output format of a report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ReportFormat {
    /// Human-readable key blocks.
    #[default]
    Text,
    /// Pretty-printed JSON array of key entries.
    Json,
}

impl ReportFormat {
    /// File extension appended to the output base name.
    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Text => "txt",
            ReportFormat::Json => "json",
        }
    }
}

impl FromStr for ReportFormat {
    type Err = AnalyzerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(ReportFormat::Text),
            "json" => Ok(ReportFormat::Json),
            _ => Err(AnalyzerError::UnsupportedFormat(s.to_string())),
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportFormat::Text => f.write_str("text"),
            ReportFormat::Json => f.write_str("json"),
        }
    }
}

/// Writes `report` to `sink` in the given format.
pub fn render<W: Write>(report: &Report, format: ReportFormat, sink: &mut W) -> Result<()> {
    match format {
        ReportFormat::Text => render_text(report, sink),
        ReportFormat::Json => render_json(report, sink),
    }
}

/// Renders `report` into a string.
pub fn render_to_string(report: &Report, format: ReportFormat) -> Result<String> {
    let mut buffer = Vec::new();
    render(report, format, &mut buffer)?;
    // Both renderers only emit UTF-8
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

/// Report file path for an output base name: `<base>.<ext>`.
///
/// The extension is appended, never substituted, so dots already in the
/// base name are kept.
pub fn output_path(base: impl AsRef<Path>, format: ReportFormat) -> PathBuf {
    let mut path = base.as_ref().as_os_str().to_owned();
    path.push(".");
    path.push(format.extension());
    PathBuf::from(path)
}

/// Writes `report` to [`output_path`] and returns the path written.
pub fn write_report(report: &Report, format: ReportFormat, base: impl AsRef<Path>) -> Result<PathBuf> {
    let path = output_path(base, format);

    let mut writer = BufWriter::new(File::create(&path)?);
    render(report, format, &mut writer)?;
    writer.flush()?;

    info!(path = %path.display(), %format, keys = report.key_count(), "Report written");
    Ok(path)
}

fn render_text<W: Write>(report: &Report, sink: &mut W) -> Result<()> {
    for entry in report.entries() {
        write_key_block(entry, sink)?;
    }
    writeln!(sink)?;
    writeln!(sink, "[Summary] Total keys processed: {}", report.key_count())?;
    Ok(())
}

fn write_key_block<W: Write>(entry: &KeyEntry, sink: &mut W) -> Result<()> {
    let timestamp = entry
        .timestamp
        .map(|ts| ts.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_else(|| "unknown".to_string());

    writeln!(sink)?;
    writeln!(sink, "[Key] {} ({})", entry.path, timestamp)?;
    for (name, rendered) in &entry.values {
        writeln!(sink, "  {}: {}", name, rendered)?;
    }
    for error in &entry.errors {
        writeln!(sink, "  [Key Error] {}", error)?;
    }
    if let Some(docs) = &entry.recent_docs {
        writeln!(sink, "Recent Documents:")?;
        for doc in docs {
            writeln!(sink, "  {}", doc)?;
        }
    }
    Ok(())
}

/// Writes the on-screen layout used by interactive sessions.
///
/// Unlike the text report, each value line carries its registry type
/// (`  - Name (REG_SZ): data`) and a decoded MRU list is headed by the
/// key's last write time.
pub fn render_interactive<W: Write>(report: &Report, sink: &mut W) -> Result<()> {
    for entry in report.entries() {
        write_interactive_block(entry, sink)?;
    }
    writeln!(sink)?;
    writeln!(sink, "[Summary] Total keys processed: {}", report.key_count())?;
    Ok(())
}

/// [`render_interactive`] into a string.
pub fn render_interactive_to_string(report: &Report) -> Result<String> {
    let mut buffer = Vec::new();
    render_interactive(report, &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

fn interactive_time(timestamp: Option<DateTime<Utc>>) -> String {
    timestamp
        .map(|ts| ts.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn write_interactive_block<W: Write>(entry: &KeyEntry, sink: &mut W) -> Result<()> {
    let timestamp = interactive_time(entry.timestamp);
    writeln!(sink, "[Key] {} (LastWrite: {})", entry.path, timestamp)?;

    if let Some(docs) = entry.recent_docs.as_ref().filter(|docs| !docs.is_empty()) {
        writeln!(sink, "[RecentDocs Decoded]")?;
        writeln!(sink, "LastWrite Time: {}", timestamp)?;
        for doc in docs {
            writeln!(sink, "  {}", doc)?;
        }
        writeln!(sink)?;
    }

    for (name, rendered) in &entry.values {
        match entry.value_type(name) {
            Some(value_type) => writeln!(sink, "  - {} ({}): {}", name, value_type.name(), rendered)?,
            None => writeln!(sink, "  - {}: {}", name, rendered)?,
        }
    }
    for error in &entry.errors {
        writeln!(sink, "  [Key Error] {}", error)?;
    }
    writeln!(sink)?;
    Ok(())
}

fn render_json<W: Write>(report: &Report, sink: &mut W) -> Result<()> {
    serde_json::to_writer_pretty(&mut *sink, report.entries())?;
    writeln!(sink)?;
    Ok(())
}

/// Paths of the key blocks in a text report, in order.
pub fn text_key_paths(text: &str) -> Vec<&str> {
    text.lines()
        .filter_map(|line| line.strip_prefix("[Key] "))
        .map(|rest| rest.rsplit_once(" (").map_or(rest, |(path, _)| path))
        .collect()
}
