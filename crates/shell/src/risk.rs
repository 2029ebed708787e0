// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dangerous-command detection.
//!
//! A small closed set of literal commands that should never be suggested
//! enthusiastically. Matching is on the whitespace-collapsed lowercase form;
//! the scorer subtracts a flat penalty and tags the candidate.

/// Literal dangerous commands matched exactly.
const DANGEROUS_EXACT: [&str; 6] = [
    "rm -rf /",
    "rm -rf /*",
    "rm -rf ~",
    "chmod -r 777 /",
    ":(){ :|:& };:",
    "dd if=/dev/zero of=/dev/sda",
];

/// Dangerous command prefixes (e.g. every `mkfs.*` variant).
const DANGEROUS_PREFIX: [&str; 4] = ["mkfs", "rm -rf / ", "chmod -r 777 ", "> /dev/sda"];

/// Whether `cmd` is on the dangerous list.
pub fn is_dangerous(cmd: &str) -> bool {
    let collapsed = cmd
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    if collapsed.is_empty() {
        return false;
    }
    DANGEROUS_EXACT.iter().any(|d| collapsed == *d)
        || DANGEROUS_PREFIX.iter().any(|d| collapsed.starts_with(d))
}

#[cfg(test)]
mod tests {
    use super::*;
    use yare::parameterized;

    #[parameterized(
        rm_root = { "rm -rf /" },
        rm_root_spaced = { "rm   -rf   /" },
        rm_root_upper = { "RM -RF /" },
        mkfs = { "mkfs /dev/sda1" },
        mkfs_ext4 = { "mkfs.ext4 /dev/sda1" },
        chmod_world = { "chmod -R 777 /" },
        fork_bomb = { ":(){ :|:& };:" },
        dd_wipe = { "dd if=/dev/zero of=/dev/sda" },
    )]
    fn dangerous_commands(cmd: &str) {
        assert!(is_dangerous(cmd));
    }

    #[parameterized(
        rm_build = { "rm -rf build" },
        ls = { "ls -la" },
        chmod_file = { "chmod 644 notes.txt" },
        empty = { "" },
        git = { "git status" },
    )]
    fn safe_commands(cmd: &str) {
        assert!(!is_dangerous(cmd));
    }
}
