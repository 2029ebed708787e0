// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shell history file parsers (bash, zsh, fish).
//!
//! Import feeds the backfill path: each parsed command becomes a synthetic
//! event with an optional original timestamp. Unparseable lines are skipped,
//! never fatal.

use std::path::Path;

/// One imported command with its original timestamp when the format
/// recorded one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedCommand {
    pub raw: String,
    pub ts_ms: Option<i64>,
}

/// Guess the shell from a history file path, falling back to content
/// sniffing. Returns "bash", "zsh", or "fish".
pub fn sniff_shell(path: &Path, content: &str) -> &'static str {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    if name.contains("fish") {
        return "fish";
    }
    if name.contains("zsh") {
        return "zsh";
    }
    if name.contains("bash") {
        return "bash";
    }
    // Content sniff: zsh extended history or fish yaml-ish entries.
    if content.lines().take(10).any(|l| l.starts_with(": ") && l.contains(";")) {
        return "zsh";
    }
    if content.lines().take(10).any(|l| l.starts_with("- cmd: ")) {
        return "fish";
    }
    "bash"
}

/// Parse a history file for the given shell ("auto" sniffs).
pub fn parse_history(shell: &str, path: &Path, content: &str) -> Vec<ImportedCommand> {
    let shell = if shell == "auto" || shell.is_empty() {
        sniff_shell(path, content)
    } else {
        shell
    };
    match shell {
        "zsh" => parse_zsh(content),
        "fish" => parse_fish(content),
        _ => parse_bash(content),
    }
}

/// Plain bash history: one command per line. `HISTTIMEFORMAT` comment lines
/// (`#1700000000`) attach a timestamp to the following command.
fn parse_bash(content: &str) -> Vec<ImportedCommand> {
    let mut out = Vec::new();
    let mut pending_ts: Option<i64> = None;
    for line in content.lines() {
        if let Some(ts) = line.strip_prefix('#').and_then(|s| s.parse::<i64>().ok()) {
            pending_ts = Some(ts * 1000);
            continue;
        }
        let raw = line.trim();
        if raw.is_empty() {
            continue;
        }
        out.push(ImportedCommand {
            raw: raw.to_string(),
            ts_ms: pending_ts.take(),
        });
    }
    out
}

/// Zsh history, plain or extended (`: <ts>:<duration>;<command>`).
/// Multi-line commands continue with a trailing backslash.
fn parse_zsh(content: &str) -> Vec<ImportedCommand> {
    let mut out: Vec<ImportedCommand> = Vec::new();
    let mut continuation = false;
    for line in content.lines() {
        if continuation {
            if let Some(last) = out.last_mut() {
                last.raw.push('\n');
                last.raw.push_str(line);
            }
            continuation = line.ends_with('\\');
            continue;
        }

        let (ts_ms, raw) = match line.strip_prefix(": ") {
            Some(rest) => match rest.split_once(';') {
                Some((meta, cmd)) => {
                    let ts = meta
                        .split(':')
                        .next()
                        .and_then(|s| s.trim().parse::<i64>().ok())
                        .map(|s| s * 1000);
                    (ts, cmd)
                }
                None => (None, rest),
            },
            None => (None, line),
        };

        let raw = raw.trim_end();
        if raw.trim().is_empty() {
            continue;
        }
        continuation = raw.ends_with('\\');
        out.push(ImportedCommand {
            raw: raw.to_string(),
            ts_ms,
        });
    }
    out
}

/// Fish history: yaml-ish `- cmd: <command>` entries with an optional
/// `  when: <ts>` line.
fn parse_fish(content: &str) -> Vec<ImportedCommand> {
    let mut out: Vec<ImportedCommand> = Vec::new();
    for line in content.lines() {
        if let Some(cmd) = line.strip_prefix("- cmd: ") {
            let raw = cmd.trim();
            if !raw.is_empty() {
                out.push(ImportedCommand {
                    raw: unescape_fish(raw),
                    ts_ms: None,
                });
            }
        } else if let Some(when) = line.trim_start().strip_prefix("when: ") {
            if let (Some(last), Ok(ts)) = (out.last_mut(), when.trim().parse::<i64>()) {
                last.ts_ms = Some(ts * 1000);
            }
        }
    }
    out
}

/// Fish escapes backslashes and newlines in stored commands.
fn unescape_fish(raw: &str) -> String {
    raw.replace("\\n", "\n").replace("\\\\", "\\")
}

#[cfg(test)]
#[path = "history_import_tests.rs"]
mod tests;
