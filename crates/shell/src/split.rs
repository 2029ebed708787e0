// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Quote-aware pipeline splitting.
//!
//! Scans rune-by-rune honoring single quotes, double quotes, and backslash
//! escapes, and recognizes the four shell operators `&&`, `||`, `|`, `;`
//! only outside quotes. Anything fancier (subshells, redirects, heredocs)
//! stays inside a segment untouched.

use serde::{Deserialize, Serialize};

/// Shell operator following a pipeline segment. The final segment of a
/// command carries `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    And,
    Or,
    Pipe,
    Seq,
    #[default]
    None,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::And => "&&",
            Operator::Or => "||",
            Operator::Pipe => "|",
            Operator::Seq => ";",
            Operator::None => "",
        }
    }

    /// Parse the storage representation; unknown strings collapse to `None`.
    pub fn parse(s: &str) -> Self {
        match s {
            "&&" => Operator::And,
            "||" => Operator::Or,
            "|" => Operator::Pipe,
            ";" => Operator::Seq,
            _ => Operator::None,
        }
    }
}

/// One pipeline segment and the operator that follows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    pub op_following: Operator,
}

/// Split a raw command into pipeline segments on `&&`, `||`, `|`, `;`.
///
/// Empty segments (e.g. from `a ;; b` or a trailing operator) are dropped.
/// A command with no operators yields a single segment. Quotes and escapes
/// survive inside segment text; only the operators themselves are consumed.
pub fn split_segments(raw: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut in_single = false;
    let mut in_double = false;
    let mut escaped = false;

    let chars: Vec<char> = raw.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if escaped {
            current.push(c);
            escaped = false;
            i += 1;
            continue;
        }

        match c {
            '\\' if !in_single => {
                current.push(c);
                escaped = true;
                i += 1;
            }
            '\'' if !in_double => {
                in_single = !in_single;
                current.push(c);
                i += 1;
            }
            '"' if !in_single => {
                in_double = !in_double;
                current.push(c);
                i += 1;
            }
            '&' | '|' | ';' if !in_single && !in_double => {
                let op = if c == '&' && chars.get(i + 1) == Some(&'&') {
                    i += 2;
                    Some(Operator::And)
                } else if c == '|' && chars.get(i + 1) == Some(&'|') {
                    i += 2;
                    Some(Operator::Or)
                } else if c == '|' {
                    i += 1;
                    Some(Operator::Pipe)
                } else if c == ';' {
                    i += 1;
                    Some(Operator::Seq)
                } else {
                    // Lone '&' (background) is not a pipeline operator.
                    current.push(c);
                    i += 1;
                    None
                };

                if let Some(op) = op {
                    push_segment(&mut segments, &mut current, op);
                }
            }
            _ => {
                current.push(c);
                i += 1;
            }
        }
    }

    push_segment(&mut segments, &mut current, Operator::None);

    // The final non-empty segment never carries an operator.
    if let Some(last) = segments.last_mut() {
        last.op_following = Operator::None;
    }

    segments
}

fn push_segment(segments: &mut Vec<Segment>, current: &mut String, op: Operator) {
    let text = current.trim();
    if !text.is_empty() {
        segments.push(Segment {
            text: text.to_string(),
            op_following: op,
        });
    }
    current.clear();
}

#[cfg(test)]
#[path = "split_tests.rs"]
mod tests;
