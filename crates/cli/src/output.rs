// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plain-text rendering for shell consumption.

use clai_daemon::{HistoryItemWire, SuggestionWire};

/// One suggestion per line: `text<TAB>confidence<TAB>reasons`.
pub fn suggestions_plain(items: &[SuggestionWire]) -> String {
    items
        .iter()
        .map(|s| {
            format!(
                "{}\t{:.2}\t{}",
                s.text,
                s.confidence,
                s.reasons.join(",")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn suggestions_json(items: &[SuggestionWire]) -> String {
    serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string())
}

/// One history row per line, most recent first.
pub fn history_plain(items: &[HistoryItemWire]) -> String {
    items
        .iter()
        .map(|item| item.command.clone())
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn history_json(items: &[HistoryItemWire]) -> String {
    serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string())
}
