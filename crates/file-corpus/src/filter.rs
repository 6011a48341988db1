//! Key filter
//!
//! Glob-style pattern scoping which filenames belong to a corpus instance.
//! Two corpora can share one directory as long as their filters are
//! disjoint (say, `ham*` and `spam*`).

use crate::error::Result;
use glob::Pattern;

const MATCH_ALL: &str = "*";

/// Compiled glob filter over message keys.
#[derive(Debug, Clone)]
pub struct KeyFilter {
    pattern: Pattern,
    raw: String,
}

impl KeyFilter {
    /// Compile a glob pattern; malformed patterns are rejected here, not
    /// at match time.
    pub fn new(pattern: &str) -> Result<Self> {
        Ok(Self {
            pattern: Pattern::new(pattern)?,
            raw: pattern.to_string(),
        })
    }

    /// The filter that accepts every key.
    pub fn match_all() -> Self {
        Self {
            pattern: Pattern::new(MATCH_ALL).unwrap(),
            raw: MATCH_ALL.to_string(),
        }
    }

    pub fn matches(&self, key: &str) -> bool {
        self.pattern.matches(key)
    }

    /// The original pattern string.
    pub fn pattern(&self) -> &str {
        &self.raw
    }
}

impl Default for KeyFilter {
    fn default() -> Self {
        Self::match_all()
    }
}
