//! Run configuration for one analysis.

use crate::error::{AnalyzerError, Result};
use crate::render::{self, ReportFormat};
use std::path::{Path, PathBuf};

/// Default output base name; the format's extension is appended.
pub const DEFAULT_OUTPUT_BASE: &str = "output";

/// Keys between verbose progress lines.
pub const VERBOSE_INTERVAL: usize = 1000;

/// Settings for one command-line analysis run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Hive file to analyze.
    pub input: PathBuf,
    /// Output path without extension.
    pub output_base: PathBuf,
    /// Report format.
    pub format: ReportFormat,
    /// Print periodic progress.
    pub verbose: bool,
}

impl RunConfig {
    /// Creates a configuration with default output settings.
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output_base: PathBuf::from(DEFAULT_OUTPUT_BASE),
            format: ReportFormat::default(),
            verbose: false,
        }
    }

    /// Checks the configuration before any hive data is read.
    ///
    /// # Errors
    ///
    /// [`AnalyzerError::InputNotFound`] if the input file does not exist.
    pub fn validate(&self) -> Result<()> {
        if !self.input.exists() {
            return Err(AnalyzerError::InputNotFound(self.input.clone()));
        }
        Ok(())
    }

    /// Path the report will be written to.
    pub fn output_path(&self) -> PathBuf {
        render::output_path(&self.output_base, self.format)
    }

    /// Input path.
    pub fn input(&self) -> &Path {
        &self.input
    }
}
