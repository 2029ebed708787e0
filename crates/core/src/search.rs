// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! History search mode selector.

use serde::{Deserialize, Serialize};

/// How a history query is matched. The wire default is substring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    /// Dedup by raw command, `LIKE prefix%` on the normalized form.
    Prefix,
    /// FTS5 full-text match over command events.
    Fts,
    /// Phrase and tag match against template tags.
    Describe,
    /// FTS and describe merged by score.
    Auto,
    /// `LIKE %q%` on the normalized form.
    #[default]
    Substring,
}

impl SearchMode {
    /// Parse the wire string, falling back to substring for unknown modes.
    pub fn parse(s: &str) -> Self {
        match s {
            "prefix" => Self::Prefix,
            "fts" => Self::Fts,
            "describe" => Self::Describe,
            "auto" => Self::Auto,
            _ => Self::Substring,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Prefix => "prefix",
            Self::Fts => "fts",
            Self::Describe => "describe",
            Self::Auto => "auto",
            Self::Substring => "substring",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_known_and_unknown() {
        assert_eq!(SearchMode::parse("fts"), SearchMode::Fts);
        assert_eq!(SearchMode::parse("describe"), SearchMode::Describe);
        assert_eq!(SearchMode::parse("auto"), SearchMode::Auto);
        assert_eq!(SearchMode::parse("prefix"), SearchMode::Prefix);
        assert_eq!(SearchMode::parse(""), SearchMode::Substring);
        assert_eq!(SearchMode::parse("anything"), SearchMode::Substring);
    }

    #[test]
    fn default_is_substring() {
        assert_eq!(SearchMode::default(), SearchMode::Substring);
    }
}
