//! Utility functions and helpers.

pub mod http;
pub mod report;

use std::sync::LazyLock;

use regex::Regex;

static NON_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\W+").expect("valid regex"));

/// Turn a free-text search query into a file-name-safe token.
///
/// Runs of non-word characters collapse into a single `_`, then the result
/// is lowercased.
pub fn normalize_keyword(keyword: &str) -> String {
    NON_WORD.replace_all(keyword, "_").to_lowercase()
}
