//! Case-insensitive search over rendered report text.

use regex::RegexBuilder;
use std::ops::Range;

/// All matches of one search term.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchResult {
    /// Byte ranges of each match, in order, non-overlapping.
    pub ranges: Vec<Range<usize>>,
}

impl SearchResult {
    /// Number of matches.
    pub fn count(&self) -> usize {
        self.ranges.len()
    }

    /// Returns true if nothing matched.
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Status line for the match count.
    pub fn summary(&self) -> String {
        format!("Found {} matches", self.count())
    }
}

/// Finds every case-insensitive occurrence of `term` in `text`.
///
/// The term is matched literally. An empty term matches nothing.
///
/// ```rust
/// use hive_report::search::find_matches;
///
/// let result = find_matches("[Key] ROOT\\RecentDocs\n  0. Notes.txt", "recentdocs");
/// assert_eq!(result.count(), 1);
/// ```
pub fn find_matches(text: &str, term: &str) -> SearchResult {
    if term.is_empty() {
        return SearchResult::default();
    }

    // An escaped literal always compiles unless it exceeds the size limit
    let Ok(pattern) = RegexBuilder::new(&regex::escape(term))
        .case_insensitive(true)
        .build()
    else {
        return SearchResult::default();
    };

    SearchResult {
        ranges: pattern.find_iter(text).map(|m| m.range()).collect(),
    }
}
