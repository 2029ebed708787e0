// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command event types: the immutable record of one finished command plus the
//! client/git context that accompanies it over the wire.

use serde::{Deserialize, Serialize};

use crate::id::{SessionId, TemplateId};

/// Client environment reported by the shell hook at session start.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientInfo {
    /// Shell kind: "zsh", "bash", "fish".
    pub shell: String,
    pub os: String,
    pub host: String,
    pub user: String,
}

/// Git context captured by the hook when a command starts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GitContext {
    pub repo_name: String,
    /// Canonical path of the VCS root; used as the repo scope key.
    pub repo_root: String,
    pub branch: String,
}

impl GitContext {
    /// True when the command did not run inside a repository.
    pub fn is_empty(&self) -> bool {
        self.repo_root.is_empty()
    }
}

/// The immutable record of one finished command.
///
/// Events are append-only; the ingest pipeline derives aggregate rows from
/// them but never mutates a written event. `ts_ms` is not required to be
/// monotonic within a session (clock adjustments happen).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandEvent {
    pub session_id: SessionId,
    pub ts_ms: i64,
    pub cwd: String,
    /// Normalized repo root, empty outside a repository.
    pub repo_key: String,
    pub branch: String,
    /// Raw command as typed, lossy-sanitized and size-bounded upstream.
    pub raw: String,
    pub cmd_norm: String,
    /// Set when the raw command exceeded the event size bound and was cut.
    pub truncated: bool,
    pub template_id: TemplateId,
    pub exit_code: i32,
    pub duration_ms: i64,
    /// Persisted but excluded from every aggregate.
    pub ephemeral: bool,
}

impl CommandEvent {
    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
