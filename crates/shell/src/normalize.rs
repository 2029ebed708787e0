// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Raw command -> normalized template.
//!
//! The pipeline runs in a fixed order: size bound, alias expansion, pipeline
//! split, per-segment normalization, reassembly, template hashing, tag
//! derivation. Normalization is convergent: running it on its own output is
//! the identity, which keeps template ids stable when normalized text is fed
//! back through the pipeline (replay, backfill).

use sha2::{Digest, Sha256};

use clai_core::TemplateId;

use crate::alias::{self, AliasMap};
use crate::split::{split_segments, Operator};
use crate::tags::command_tags;

/// Placeholder tokens. Tokens already equal to one of these are left alone.
const PLACEHOLDERS: [&str; 4] = ["<UUID>", "<PATH>", "<URL>", "<NUM>"];

/// Normalization tunables.
#[derive(Debug, Clone)]
pub struct NormalizeOptions {
    /// Raw command size bound in bytes.
    pub max_bytes: usize,
    /// Alias expansion depth bound.
    pub alias_max_depth: usize,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            max_bytes: 10 * 1024,
            alias_max_depth: 5,
        }
    }
}

/// One normalized pipeline segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedSegment {
    pub position: usize,
    pub text: String,
    pub template_id: TemplateId,
    pub op_following: Operator,
}

/// Result of normalizing a raw command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedCommand {
    pub cmd_norm: String,
    pub template_id: TemplateId,
    pub truncated: bool,
    /// Sorted, deduplicated tag union over all segments.
    pub tags: Vec<String>,
    pub segments: Vec<NormalizedSegment>,
}

impl NormalizedCommand {
    /// True when the command split into more than one pipeline segment.
    pub fn is_pipeline(&self) -> bool {
        self.segments.len() > 1
    }
}

/// The template id is a pure function of the normalized command.
pub fn template_id_of(cmd_norm: &str) -> TemplateId {
    let mut hasher = Sha256::new();
    hasher.update(cmd_norm.as_bytes());
    TemplateId::new(format!("{:x}", hasher.finalize()))
}

/// Whitespace collapse only, used for last-command suppression where the
/// full template pipeline would be too aggressive.
pub fn simple_normalize(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalize a raw command string.
pub fn prenormalize(raw: &str, aliases: &AliasMap, opts: &NormalizeOptions) -> NormalizedCommand {
    // 1. Event size bound.
    let (bounded, truncated) = bound_bytes(raw, opts.max_bytes);

    // 2. Alias expansion of the leading token.
    let expanded = alias::expand(bounded, aliases, opts.alias_max_depth);

    // 3-4. Split into pipeline segments and normalize each.
    let segments: Vec<(String, Operator)> = split_segments(&expanded)
        .into_iter()
        .map(|seg| (normalize_segment(&seg.text), seg.op_following))
        .collect();

    // 5. Reassemble with single spaces around operators.
    let mut cmd_norm = String::new();
    for (text, op) in &segments {
        if !cmd_norm.is_empty() {
            cmd_norm.push(' ');
        }
        cmd_norm.push_str(text);
        if *op != Operator::None {
            cmd_norm.push(' ');
            cmd_norm.push_str(op.as_str());
        }
    }

    // 6-7. Template id and tags.
    let template_id = template_id_of(&cmd_norm);
    let tags = command_tags(segments.iter().map(|(text, _)| text.as_str()));

    let segments = segments
        .into_iter()
        .enumerate()
        .map(|(position, (text, op_following))| NormalizedSegment {
            position,
            template_id: template_id_of(&text),
            text,
            op_following,
        })
        .collect();

    NormalizedCommand {
        cmd_norm,
        template_id,
        truncated,
        tags,
        segments,
    }
}

/// Truncate to `max_bytes` on a char boundary.
fn bound_bytes(raw: &str, max_bytes: usize) -> (&str, bool) {
    if raw.len() <= max_bytes {
        return (raw, false);
    }
    let mut cut = max_bytes;
    while cut > 0 && !raw.is_char_boundary(cut) {
        cut -= 1;
    }
    (&raw[..cut], true)
}

/// Normalize one segment: collapse whitespace, lowercase the verb, replace
/// volatile tokens with placeholders. Flags pass through unchanged.
fn normalize_segment(text: &str) -> String {
    let mut out: Vec<String> = Vec::new();
    for (i, token) in text.split_whitespace().enumerate() {
        out.push(normalize_token(token, i == 0));
    }
    out.join(" ")
}

fn normalize_token(token: &str, is_verb: bool) -> String {
    if PLACEHOLDERS.contains(&token) {
        return token.to_string();
    }
    if token.starts_with('-') {
        return token.to_string();
    }
    if is_uuid(token) {
        return "<UUID>".to_string();
    }
    if is_url(token) {
        return "<URL>".to_string();
    }
    if is_path(token) {
        return "<PATH>".to_string();
    }
    if is_number(token) {
        return "<NUM>".to_string();
    }
    if is_verb {
        return token.to_lowercase();
    }
    token.to_string()
}

fn is_uuid(token: &str) -> bool {
    let bytes = token.as_bytes();
    if bytes.len() != 36 {
        return false;
    }
    for (i, b) in bytes.iter().enumerate() {
        match i {
            8 | 13 | 18 | 23 => {
                if *b != b'-' {
                    return false;
                }
            }
            _ => {
                if !b.is_ascii_hexdigit() {
                    return false;
                }
            }
        }
    }
    true
}

fn is_url(token: &str) -> bool {
    token.starts_with("http://") || token.starts_with("https://")
}

fn is_path(token: &str) -> bool {
    if token.contains('/') {
        return true;
    }
    if token.starts_with('~') {
        return true;
    }
    // Windows: drive-letter paths and backslash separators.
    let bytes = token.as_bytes();
    if bytes.len() >= 3 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' && bytes[2] == b'\\' {
        return true;
    }
    token.contains('\\') && token.len() > 1 && !token.starts_with('\\')
}

fn is_number(token: &str) -> bool {
    !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
#[path = "normalize_tests.rs"]
mod tests;
