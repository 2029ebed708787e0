// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shell-hook lifecycle commands. Always exit 0; failures are invisible to
//! the prompt.

use std::collections::HashMap;
use std::io::Read;

use clai_daemon::Request;

use crate::client::DaemonClient;
use crate::env;

/// Unix ms from the system clock.
fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

fn cwd_or(arg: &str) -> String {
    if !arg.is_empty() {
        return arg.to_string();
    }
    std::env::current_dir()
        .map(|p| p.display().to_string())
        .unwrap_or_default()
}

async fn send_silently(request: Request) -> i32 {
    let Ok(client) = DaemonClient::for_action() else {
        return 0;
    };
    let _ = client.request(&request).await;
    0
}

pub async fn session_start(session: &str, shell: &str, cwd: &str) -> i32 {
    if session.is_empty() {
        return 0;
    }
    let request = Request::SessionStart {
        session_id: session.to_string(),
        shell: shell.to_string(),
        os: std::env::consts::OS.to_string(),
        host: std::env::var("HOSTNAME").unwrap_or_default(),
        user: std::env::var("USER").unwrap_or_default(),
        cwd: cwd_or(cwd),
        started_at_ms: now_ms(),
        no_record: env::no_record(),
        ephemeral: env::ephemeral(),
    };
    send_silently(request).await
}

pub async fn session_end(session: &str) -> i32 {
    if session.is_empty() {
        return 0;
    }
    send_silently(Request::SessionEnd {
        session_id: session.to_string(),
        ended_at_ms: now_ms(),
    })
    .await
}

#[allow(clippy::too_many_arguments)]
pub async fn command_started(
    session: &str,
    id: &str,
    command: &str,
    cwd: &str,
    repo_name: &str,
    repo_root: &str,
    branch: &str,
) -> i32 {
    if session.is_empty() || command.is_empty() {
        return 0;
    }
    let command_id = if id.is_empty() {
        uuid::Uuid::new_v4().to_string()
    } else {
        id.to_string()
    };
    // The hook pairs start/end by id; echo it for hooks that did not mint
    // their own.
    if id.is_empty() {
        println!("{command_id}");
    }
    send_silently(Request::CommandStarted {
        command_id,
        session_id: session.to_string(),
        command: command.to_string(),
        cwd: cwd_or(cwd),
        repo_name: repo_name.to_string(),
        repo_root: repo_root.to_string(),
        branch: branch.to_string(),
        ts_ms: now_ms(),
        prev_command_id: String::new(),
    })
    .await
}

pub async fn command_ended(session: &str, id: &str, exit_code: i32, duration_ms: i64) -> i32 {
    if session.is_empty() || id.is_empty() {
        return 0;
    }
    send_silently(Request::CommandEnded {
        command_id: id.to_string(),
        session_id: session.to_string(),
        exit_code,
        ts_ms: now_ms(),
        duration_ms,
    })
    .await
}

/// Read `alias` output from stdin and sync the parsed snapshot.
pub async fn alias_sync(session: &str, shell: &str) -> i32 {
    if session.is_empty() {
        return 0;
    }
    let mut raw = String::new();
    if std::io::stdin().read_to_string(&mut raw).is_err() {
        return 0;
    }
    let aliases = parse_alias_lines(&raw);
    if aliases.is_empty() {
        return 0;
    }
    send_silently(Request::AliasSync {
        session_id: session.to_string(),
        shell: shell.to_string(),
        aliases,
    })
    .await
}

/// Parse `alias` builtin output: `name=value`, `alias name='value'`, or
/// fish's `alias name value`.
pub(crate) fn parse_alias_lines(raw: &str) -> HashMap<String, String> {
    let mut aliases = HashMap::new();
    for line in raw.lines() {
        let line = line.trim();
        let line = line.strip_prefix("alias ").unwrap_or(line);
        if line.is_empty() {
            continue;
        }
        if let Some((name, value)) = line.split_once('=') {
            let name = name.trim();
            if name.is_empty() || name.contains(char::is_whitespace) {
                continue;
            }
            aliases.insert(name.to_string(), unquote(value).to_string());
        } else if let Some((name, value)) = line.split_once(' ') {
            aliases.insert(name.trim().to_string(), unquote(value.trim()).to_string());
        }
    }
    aliases
}

fn unquote(value: &str) -> &str {
    let value = value.trim();
    if value.len() >= 2
        && ((value.starts_with('\'') && value.ends_with('\''))
            || (value.starts_with('"') && value.ends_with('"')))
    {
        &value[1..value.len() - 1]
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_zsh_alias_output() {
        let raw = "gs='git status'\nll='ls -la'\n";
        let aliases = parse_alias_lines(raw);
        assert_eq!(aliases.get("gs").unwrap(), "git status");
        assert_eq!(aliases.get("ll").unwrap(), "ls -la");
    }

    #[test]
    fn parse_bash_alias_output() {
        let raw = "alias gs='git status'\nalias grep=\"grep --color=auto\"\n";
        let aliases = parse_alias_lines(raw);
        assert_eq!(aliases.get("gs").unwrap(), "git status");
        assert_eq!(aliases.get("grep").unwrap(), "grep --color=auto");
    }

    #[test]
    fn parse_fish_alias_output() {
        let raw = "alias gs 'git status'\n";
        let aliases = parse_alias_lines(raw);
        assert_eq!(aliases.get("gs").unwrap(), "git status");
    }

    #[test]
    fn malformed_lines_skipped() {
        let raw = "\n=broken\nnot an alias line at all maybe\n";
        let aliases = parse_alias_lines(raw);
        assert!(!aliases.contains_key(""));
    }
}
