// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use std::path::PathBuf;
use std::time::Duration;

use clai_core::parse_duration;

/// Root override for every daemon path (used by tests for isolation).
pub fn state_dir_override() -> Option<PathBuf> {
    std::env::var("CLAI_STATE_DIR").ok().map(PathBuf::from)
}

/// Run dir: XDG_RUNTIME_DIR/clai when present, else /tmp/clai-<uid>/clai.
pub fn run_dir() -> PathBuf {
    if let Some(dir) = state_dir_override() {
        return dir.join("run");
    }
    if let Ok(xdg) = std::env::var("XDG_RUNTIME_DIR") {
        if !xdg.is_empty() {
            return PathBuf::from(xdg).join("clai");
        }
    }
    PathBuf::from(format!("/tmp/clai-{}/clai", current_uid()))
}

/// Data dir for the state database and daemon log.
pub fn data_dir() -> PathBuf {
    if let Some(dir) = state_dir_override() {
        return dir.join("data");
    }
    if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        if !xdg.is_empty() {
            return PathBuf::from(xdg).join("clai");
        }
    }
    home_dir().join(".local/share/clai")
}

/// Database path: CLAI_DB_PATH override, else `<data dir>/state.db`.
pub fn db_path() -> PathBuf {
    if let Ok(path) = std::env::var("CLAI_DB_PATH") {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }
    data_dir().join("state.db")
}

/// Cache dir: CLAI_CACHE override, else ~/.cache/clai.
pub fn cache_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("CLAI_CACHE") {
        if !dir.is_empty() {
            return PathBuf::from(dir);
        }
    }
    if let Ok(xdg) = std::env::var("XDG_CACHE_HOME") {
        if !xdg.is_empty() {
            return PathBuf::from(xdg).join("clai");
        }
    }
    home_dir().join(".cache/clai")
}

/// Idle shutdown: CLAI_IDLE_TIMEOUT duration string; invalid, zero, or
/// negative values silently fall back to the default.
pub fn idle_timeout(default_ms: i64) -> Duration {
    std::env::var("CLAI_IDLE_TIMEOUT")
        .ok()
        .and_then(|s| parse_duration(&s))
        .unwrap_or(Duration::from_millis(default_ms.max(0) as u64))
}

fn home_dir() -> PathBuf {
    std::env::var("HOME").map(PathBuf::from).unwrap_or_else(|_| PathBuf::from("/tmp"))
}

/// Owner uid of the home directory; good enough to key the per-user /tmp
/// fallback without a libc dependency.
fn current_uid() -> u32 {
    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        if let Ok(meta) = std::fs::metadata(home_dir()) {
            return meta.uid();
        }
    }
    0
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
