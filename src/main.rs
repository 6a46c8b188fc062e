//! hive-report CLI
//!
//! Walks a registry hive and writes a text or JSON report of every key.

use clap::Parser;
use hive_report::config::{RunConfig, VERBOSE_INTERVAL};
use hive_report::render::{write_report, ReportFormat};
use hive_report::walker::{analyze_file, Progress};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Registry hive analyzer
///
/// Records every key with its last write time and values, and decodes
/// RecentDocs MRU lists.
#[derive(Parser)]
#[command(name = "hive-report")]
#[command(version)]
#[command(about = "Registry hive analyzer", long_about = None)]
struct Cli {
    /// Path to registry hive file (.hiv, .dat)
    file: PathBuf,

    /// Output file name (without extension)
    #[arg(short, long, default_value = "output")]
    output: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    format: ReportFormat,

    /// Show processing progress
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries progress and the final status line
    let default_level = if cli.verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = RunConfig {
        input: cli.file,
        output_base: cli.output,
        format: cli.format,
        verbose: cli.verbose,
    };
    if let Err(e) = config.validate() {
        println!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    let progress = if config.verbose {
        Progress::count(|processed| {
            if processed % VERBOSE_INTERVAL == 0 {
                println!("Processed {} keys...", processed);
            }
        })
    } else {
        Progress::Silent
    };

    let report = match analyze_file(config.input(), progress) {
        Ok(report) => report,
        Err(e) => {
            println!("Analysis failed: {}", e);
            return ExitCode::SUCCESS;
        }
    };

    match write_report(&report, config.format, &config.output_base) {
        Ok(path) => {
            println!("\nAnalysis complete! Results saved to {}", path.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            println!("Failed to write report to {}: {}", config.output_path().display(), e);
            ExitCode::FAILURE
        }
    }
}
