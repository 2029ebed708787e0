// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded alias expansion.
//!
//! Only the first whitespace-delimited token is expanded, mirroring how
//! interactive shells resolve aliases. Expansion is depth-bounded and
//! cycle-guarded: the first repeated alias name stops expansion silently.

use std::collections::{HashMap, HashSet};

/// Per-session alias snapshot: name -> replacement text.
pub type AliasMap = HashMap<String, String>;

/// Expand the leading token of `raw` through `aliases`, up to `max_depth`
/// rounds. Returns the input unchanged when the first token has no alias.
pub fn expand(raw: &str, aliases: &AliasMap, max_depth: usize) -> String {
    if aliases.is_empty() {
        return raw.to_string();
    }

    let mut current = raw.to_string();
    let mut seen: HashSet<String> = HashSet::new();

    for _ in 0..max_depth {
        let trimmed = current.trim_start();
        let head_len = trimmed
            .find(char::is_whitespace)
            .unwrap_or(trimmed.len());
        let head = &trimmed[..head_len];
        if head.is_empty() {
            break;
        }

        let Some(replacement) = aliases.get(head) else {
            break;
        };

        // Cycle guard: stop at the first repeated name.
        if !seen.insert(head.to_string()) {
            break;
        }

        let rest = &trimmed[head_len..];
        current = if rest.is_empty() {
            replacement.clone()
        } else {
            format!("{}{}", replacement, rest)
        };
    }

    current
}

#[cfg(test)]
#[path = "alias_tests.rs"]
mod tests;
