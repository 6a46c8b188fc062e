//! Rendering, re-reading and searching reports.

mod common;

use common::{build_hive, sample_user_hive};
use hive_report::render::{
    render, render_interactive_to_string, render_to_string, text_key_paths, write_report, ReportFormat,
};
use hive_report::search::find_matches;
use hive_report::session::{needs_confirmation, AnalysisSession, SessionEvent};
use hive_report::tree::{MemoryKey, MemoryValue};
use hive_report::walker::HiveWalker;
use hive_report::{AnalyzerError, Hive, Report};
use std::collections::BTreeSet;
use std::path::PathBuf;

fn sample_report() -> Report {
    let hive = Hive::from_vec(build_hive(&sample_user_hive())).unwrap();
    HiveWalker::new().walk(hive.root_key().unwrap())
}

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("hive-report-{}-{}", name, std::process::id()))
}

#[test]
fn test_json_round_trip() {
    let report = sample_report();
    let json = render_to_string(&report, ReportFormat::Json).unwrap();
    let back = Report::from_json(json.as_bytes()).unwrap();

    assert_eq!(back.key_count(), report.key_count());
    for (original, reread) in report.entries().iter().zip(back.entries()) {
        assert_eq!(reread.path, original.path);
        assert_eq!(reread.timestamp, original.timestamp);
        assert_eq!(reread.values, original.values);
        assert_eq!(reread.recent_docs, original.recent_docs);
        assert_eq!(reread.errors, original.errors);
    }
}

#[test]
fn test_empty_recent_docs_stays_distinguishable() {
    let root = MemoryKey::new("ROOT")
        .with_subkey(MemoryKey::new("RecentDocs"))
        .with_subkey(MemoryKey::new("Other"));
    let report = HiveWalker::new().walk(root);

    let json = render_to_string(&report, ReportFormat::Json).unwrap();
    let back = Report::from_json(json.as_bytes()).unwrap();
    assert_eq!(back.find("ROOT\\RecentDocs").unwrap().recent_docs, Some(vec![]));
    assert_eq!(back.find("ROOT\\Other").unwrap().recent_docs, None);
}

#[test]
fn test_json_field_order() {
    let report = sample_report();
    let json = render_to_string(&report, ReportFormat::Json).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    let docs = value
        .as_array()
        .unwrap()
        .iter()
        .find(|e| e["path"] == "ROOT\\Software\\Explorer\\RecentDocs")
        .unwrap();
    assert_eq!(docs["recent_docs"][0], "1. notes.txt");

    let path = json.find("\"path\"").unwrap();
    let timestamp = json.find("\"timestamp\"").unwrap();
    let values = json.find("\"values\"").unwrap();
    assert!(path < timestamp && timestamp < values);
}

#[test]
fn test_text_and_json_report_same_keys() {
    let report = sample_report();
    let text = render_to_string(&report, ReportFormat::Text).unwrap();
    let json = render_to_string(&report, ReportFormat::Json).unwrap();

    let from_text: BTreeSet<_> = text_key_paths(&text).into_iter().map(str::to_string).collect();
    let from_json: BTreeSet<_> = Report::from_json(json.as_bytes())
        .unwrap()
        .into_entries()
        .into_iter()
        .map(|e| e.path)
        .collect();
    assert_eq!(from_text, from_json);
    assert!(text.ends_with("[Summary] Total keys processed: 8\n"));
}

#[test]
fn test_text_contains_recent_documents_block() {
    let text = render_to_string(&sample_report(), ReportFormat::Text).unwrap();
    assert!(text.contains("[Key] ROOT\\Software\\Explorer\\RecentDocs (2021-01-01T00:00:00Z)\n"));
    assert!(text.contains("Recent Documents:\n  1. notes.txt\n  0. budget.xlsx\n"));
    assert!(text.contains("  Count: 42\n"));
    assert!(text.contains("  [Key Error] [ERROR: Failed to read subkeys: "));
}

#[test]
fn test_unsupported_format() {
    let err = "xml".parse::<ReportFormat>().unwrap_err();
    assert!(matches!(err, AnalyzerError::UnsupportedFormat(ref f) if f == "xml"));
    assert!(err.is_configuration());
    assert_eq!(
        err.to_string(),
        "Unsupported output format 'xml' (expected 'text' or 'json')"
    );
}

#[test]
fn test_write_both_formats() {
    let report = sample_report();
    let base = temp_path("output");
    for format in [ReportFormat::Text, ReportFormat::Json] {
        let path = write_report(&report, format, &base).unwrap();
        let mut expected = Vec::new();
        render(&report, format, &mut expected).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), expected);
        std::fs::remove_file(path).unwrap();
    }
}

#[test]
fn test_search_rendered_text() {
    let report = HiveWalker::new().walk(
        MemoryKey::new("ROOT")
            .with_subkey(MemoryKey::new("Software").with_value(MemoryValue::string("Vendor", "SOFTWARE Inc"))),
    );
    let text = render_to_string(&report, ReportFormat::Text).unwrap();
    let result = find_matches(&text, "software");
    assert_eq!(result.count(), 2);
    for range in &result.ranges {
        assert!(text[range.clone()].eq_ignore_ascii_case("software"));
    }
}

#[test]
fn test_background_session() {
    let path = temp_path("session.dat");
    std::fs::write(&path, build_hive(&sample_user_hive())).unwrap();
    assert!(!needs_confirmation(&path).unwrap());

    let mut session = AnalysisSession::spawn(&path);
    let mut progress = Vec::new();
    let mut completed = None;
    while completed.is_none() {
        for event in session.poll() {
            match event {
                SessionEvent::Progress(p) => progress.push(p),
                SessionEvent::Completed { report, text } => completed = Some((report, text)),
                SessionEvent::Failed(message) => panic!("analysis failed: {}", message),
            }
        }
        std::thread::yield_now();
    }

    let (report, text) = completed.unwrap();
    assert_eq!(report.key_count(), 8);
    assert_eq!(text, render_interactive_to_string(&report).unwrap());
    assert!(text.contains("  - Count (REG_DWORD): 42\n"));
    assert!(text.contains("  - (Default) (REG_SZ): default text\n"));
    assert!(text.contains(
        "[RecentDocs Decoded]\nLastWrite Time: 2021-01-01 00:00:00 UTC\n  1. notes.txt\n  0. budget.xlsx\n"
    ));
    assert_eq!(progress.last(), Some(&100));
    assert!(session.is_finished());

    std::fs::remove_file(path).unwrap();
}
