// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scope keys: the partition axis for every aggregate table.
//!
//! A scope is a plain string so aggregate rows stay flat. Four kinds exist:
//! the literal `global`, a repo key (canonical VCS root path), a directory
//! scope key (`dir:` + cwd, prefixed so it cannot collide with a repo key),
//! and a project-type tag (e.g. `rust`, `node`).

use serde::{Deserialize, Serialize};

/// The scope every event contributes to.
pub const SCOPE_GLOBAL: &str = "global";

/// Prefix distinguishing directory scope keys from repo keys.
const DIR_PREFIX: &str = "dir:";

/// Scope key for the working directory.
pub fn dir_scope_key(cwd: &str) -> String {
    format!("{}{}", DIR_PREFIX, cwd)
}

/// Which kind of scope a key denotes. Determines the weight class the scorer
/// applies to rows read under that key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScopeKind {
    Global,
    Repo,
    Dir,
    ProjectType,
}

impl ScopeKind {
    /// Classify a scope key string.
    pub fn of(scope: &str) -> Self {
        if scope == SCOPE_GLOBAL {
            Self::Global
        } else if scope.starts_with(DIR_PREFIX) {
            Self::Dir
        } else if scope.starts_with('/') || scope.starts_with('~') {
            Self::Repo
        } else {
            Self::ProjectType
        }
    }
}

#[cfg(test)]
#[path = "scope_tests.rs"]
mod tests;
