//! Depth-first traversal of a key tree into a [`Report`].

use crate::error::Result;
use crate::hive::Hive;
use crate::mru;
use crate::normalize::normalize;
use crate::report::{error_placeholder, KeyEntry, Report};
use crate::tree::TreeKey;
use std::fmt;
use std::path::Path;
use tracing::{debug, info, instrument, warn};

/// Nesting limit; keys below it are recorded but not descended into.
pub const MAX_KEY_DEPTH: usize = 512;

/// How a walk reports progress.
///
/// The callback runs after each key has been fully processed.
#[derive(Default)]
pub enum Progress<'a> {
    /// No progress reporting.
    #[default]
    Silent,
    /// Running count of processed keys. Single pass.
    Count(Box<dyn FnMut(usize) + 'a>),
    /// `floor(processed * 100 / total)`. Counts the tree first, so the
    /// tree is enumerated twice.
    Percent(Box<dyn FnMut(u8) + 'a>),
}

impl<'a> Progress<'a> {
    /// Count-based progress from a closure.
    pub fn count(callback: impl FnMut(usize) + 'a) -> Self {
        Progress::Count(Box::new(callback))
    }

    /// Percentage-based progress from a closure.
    pub fn percent(callback: impl FnMut(u8) + 'a) -> Self {
        Progress::Percent(Box::new(callback))
    }

    fn report(&mut self, processed: usize, total: usize) {
        match self {
            Progress::Silent => {}
            Progress::Count(callback) => callback(processed),
            Progress::Percent(callback) => callback(percent_of(processed, total)),
        }
    }
}

impl fmt::Debug for Progress<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = match self {
            Progress::Silent => "Silent",
            Progress::Count(_) => "Count",
            Progress::Percent(_) => "Percent",
        };
        f.debug_tuple("Progress").field(&mode).finish()
    }
}

fn percent_of(processed: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    (processed.saturating_mul(100) / total).min(100) as u8
}

/// Walks a key tree and records one [`KeyEntry`] per key.
///
/// Keys are visited pre-order, children in the order the source yields
/// them. Failures below the root are written into the affected entry and
/// never stop the walk.
///
/// ```rust
/// use hive_report::tree::{MemoryKey, MemoryValue};
/// use hive_report::walker::HiveWalker;
///
/// let root = MemoryKey::new("ROOT")
///     .with_subkey(MemoryKey::new("Software").with_value(MemoryValue::dword("Count", 3)));
/// let report = HiveWalker::new().walk(root);
/// assert_eq!(report.key_count(), 2);
/// assert_eq!(report.entries()[1].path, "ROOT\\Software");
/// ```
#[derive(Debug, Default)]
pub struct HiveWalker<'a> {
    progress: Progress<'a>,
    max_depth: Option<usize>,
}

impl<'a> HiveWalker<'a> {
    /// Creates a silent walker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the progress mode.
    pub fn with_progress(mut self, progress: Progress<'a>) -> Self {
        self.progress = progress;
        self
    }

    /// Overrides [`MAX_KEY_DEPTH`].
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Walks the tree below `root`, root included.
    pub fn walk<K: TreeKey>(&mut self, root: K) -> Report {
        let max_depth = self.max_depth.unwrap_or(MAX_KEY_DEPTH);
        let total = match self.progress {
            Progress::Percent(_) => count_keys(&root, max_depth),
            _ => 0,
        };
        info!(total, "Starting key walk");

        let mut entries = Vec::with_capacity(total);
        let mut stack = vec![(root, 0usize)];
        while let Some((key, depth)) = stack.pop() {
            let (mut entry, children) = visit(&key);

            if depth >= max_depth && !children.is_empty() {
                warn!(path = %entry.path, depth, "Key nesting limit reached");
                entry
                    .errors
                    .push(error_placeholder(format!("Subkeys below depth {} not traversed", max_depth)));
            } else {
                stack.extend(children.into_iter().rev().map(|child| (child, depth + 1)));
            }

            entries.push(entry);
            self.progress.report(entries.len(), total);
        }

        let failed = entries.iter().filter(|entry| entry.has_errors()).count();
        info!(keys = entries.len(), failed, "Key walk finished");
        Report::from_entries(entries)
    }
}

/// Builds the entry for one key and returns its children.
fn visit<K: TreeKey>(key: &K) -> (KeyEntry, Vec<K>) {
    let mut errors = Vec::new();

    let path = key.path();
    let timestamp = key
        .timestamp()
        .map_err(|e| errors.push(error_placeholder(format!("Failed to read timestamp: {}", e))))
        .ok();

    let mut entry = match &path {
        Ok(path) => KeyEntry::new(path.as_str(), timestamp),
        Err(e) => {
            warn!(error = %e, "Unreadable key path");
            KeyEntry::new(error_placeholder(e), timestamp)
        }
    };

    match key.values() {
        Ok(values) => {
            for value in &values {
                entry.insert_value(normalize(value));
            }
        }
        Err(e) => errors.push(error_placeholder(format!("Failed to read values: {}", e))),
    }

    if matches!(&path, Ok(path) if mru::is_recent_docs_path(path)) {
        let docs = mru::decode(key);
        debug!(path = %entry.path, entries = docs.len(), "Decoded recent documents");
        entry.recent_docs = Some(docs);
    }

    let children = key.subkeys().unwrap_or_else(|e| {
        errors.push(error_placeholder(format!("Failed to read subkeys: {}", e)));
        Vec::new()
    });

    for error in &errors {
        warn!(path = %entry.path, "{}", error);
    }
    entry.errors = errors;
    (entry, children)
}

/// Counts the keys a walk of `root` will visit.
pub fn count_keys<K: TreeKey>(root: &K, max_depth: usize) -> usize {
    let mut count = 1;
    let mut stack: Vec<(K, usize)> = match root.subkeys() {
        Ok(children) if max_depth > 0 => children.into_iter().map(|child| (child, 1)).collect(),
        _ => Vec::new(),
    };
    while let Some((key, depth)) = stack.pop() {
        count += 1;
        if depth < max_depth {
            if let Ok(children) = key.subkeys() {
                stack.extend(children.into_iter().map(|child| (child, depth + 1)));
            }
        }
    }
    count
}

/// Opens a hive file and walks it from its root key.
///
/// # Errors
///
/// Only opening the hive or resolving its root key can fail; everything
/// below the root is reported inside the returned [`Report`].
#[instrument(skip(path, progress), fields(path = %path.as_ref().display()))]
pub fn analyze_file<P: AsRef<Path>>(path: P, progress: Progress<'_>) -> Result<Report> {
    let hive = Hive::open(&path)?;
    let root = hive.root_key()?;
    Ok(HiveWalker::new().with_progress(progress).walk(root))
}
