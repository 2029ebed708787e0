// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Project-type detection and task discovery.
//!
//! Detection is a pure function of the working directory (marker files).
//! Discovery parses those marker files into runnable targets under strict
//! caps: bounded file size, a wall-clock budget, and never as root. Results
//! replace the repo's `project_task` rows whenever the marker fingerprint
//! changes; failures land in a ring buffer surfaced by a debug endpoint.

use std::collections::VecDeque;
use std::path::Path;
use std::time::Instant;

use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use tracing::debug;

use clai_core::Config;
use clai_storage::TaskRow;

/// Marker files and the project type each one implies.
const MARKERS: [(&str, &str); 6] = [
    ("package.json", "node"),
    ("Cargo.toml", "rust"),
    ("go.mod", "go"),
    ("pyproject.toml", "python"),
    ("Makefile", "make"),
    ("justfile", "just"),
];

/// Detect project types from marker files in `cwd`. Pure given the
/// filesystem; sorted for deterministic scope ordering.
pub fn detect_project_types(cwd: &Path) -> Vec<String> {
    let mut types: Vec<String> = MARKERS
        .iter()
        .filter(|(marker, _)| cwd.join(marker).is_file())
        .map(|(_, kind)| (*kind).to_string())
        .collect();
    types.sort();
    types
}

/// Ring buffer of recent discovery failures (debug surface only).
#[derive(Default)]
pub struct DiscoveryErrors {
    ring: Mutex<VecDeque<String>>,
}

const ERROR_RING_CAP: usize = 32;

impl DiscoveryErrors {
    pub fn record(&self, message: String) {
        let mut ring = self.ring.lock();
        if ring.len() >= ERROR_RING_CAP {
            ring.pop_front();
        }
        ring.push_back(message);
    }

    pub fn recent(&self) -> Vec<String> {
        self.ring.lock().iter().cloned().collect()
    }
}

/// Task discovery over a repo's marker files.
pub struct ProjectDiscovery {
    cfg: Config,
    errors: DiscoveryErrors,
    refuse_root: bool,
}

impl ProjectDiscovery {
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            errors: DiscoveryErrors::default(),
            refuse_root: true,
        }
    }

    /// Disable the root refusal. Only for sandboxed harnesses that already
    /// control the files being parsed (replay, tests).
    pub fn allowing_root(mut self) -> Self {
        self.refuse_root = false;
        self
    }

    pub fn errors(&self) -> &DiscoveryErrors {
        &self.errors
    }

    /// Fingerprint of the repo's marker files (size + mtime). A changed
    /// fingerprint invalidates stored tasks.
    pub fn fingerprint(&self, repo_root: &Path) -> String {
        let mut hasher = Sha256::new();
        for (marker, _) in MARKERS {
            let path = repo_root.join(marker);
            let Ok(meta) = path.metadata() else {
                continue;
            };
            hasher.update(marker.as_bytes());
            hasher.update(meta.len().to_le_bytes());
            if let Ok(modified) = meta.modified() {
                if let Ok(age) = modified.duration_since(std::time::UNIX_EPOCH) {
                    hasher.update(age.as_millis().to_le_bytes());
                }
            }
        }
        format!("{:x}", hasher.finalize())
    }

    /// Discover runnable targets for a repo. Returns an empty list (never
    /// an error) so discovery can never break a suggestion query.
    pub fn discover(&self, repo_root: &Path) -> Vec<TaskRow> {
        if self.refuse_root && is_root_user() {
            self.errors
                .record("discovery refused: running as root".to_string());
            return Vec::new();
        }

        let deadline = Instant::now();
        let budget_ms = self.cfg.discovery_timeout_ms;
        let mut tasks: Vec<TaskRow> = Vec::new();
        let mut total_bytes = 0usize;

        for (marker, kind) in MARKERS {
            if deadline.elapsed().as_millis() as u64 > budget_ms {
                self.errors
                    .record(format!("discovery timed out scanning {}", repo_root.display()));
                break;
            }
            let path = repo_root.join(marker);
            if !path.is_file() {
                continue;
            }
            match self.read_bounded(&path, &mut total_bytes) {
                Ok(Some(content)) => {
                    let found = parse_tasks(kind, &content);
                    debug!(marker, count = found.len(), "discovered tasks");
                    tasks.extend(found);
                }
                Ok(None) => {}
                Err(message) => self.errors.record(message),
            }
        }

        tasks.sort_by(|a, b| a.kind.cmp(&b.kind).then(a.name.cmp(&b.name)));
        tasks.dedup_by(|a, b| a.kind == b.kind && a.name == b.name);
        tasks
    }

    fn read_bounded(&self, path: &Path, total: &mut usize) -> Result<Option<String>, String> {
        let meta = path
            .metadata()
            .map_err(|e| format!("{}: {}", path.display(), e))?;
        if meta.len() as usize > self.cfg.discovery_file_max {
            return Err(format!("{}: exceeds size cap", path.display()));
        }
        if *total + meta.len() as usize > self.cfg.discovery_output_max {
            return Err(format!("{}: discovery output cap reached", path.display()));
        }
        *total += meta.len() as usize;
        let content =
            std::fs::read_to_string(path).map_err(|e| format!("{}: {}", path.display(), e))?;
        Ok(Some(content))
    }
}

/// Best-effort root check from the environment; discovery parses untrusted
/// project files and must not do so with root privileges.
fn is_root_user() -> bool {
    std::env::var("USER").map(|u| u == "root").unwrap_or(false)
        || std::env::var("LOGNAME").map(|u| u == "root").unwrap_or(false)
}

fn parse_tasks(kind: &str, content: &str) -> Vec<TaskRow> {
    match kind {
        "node" => parse_package_json(content),
        "rust" => cargo_tasks(),
        "go" => go_tasks(),
        "python" => python_tasks(content),
        "make" => parse_makefile(content),
        "just" => parse_justfile(content),
        _ => Vec::new(),
    }
}

fn task(kind: &str, name: &str, command: String) -> TaskRow {
    TaskRow {
        kind: kind.to_string(),
        name: name.to_string(),
        command,
        description: None,
    }
}

/// `package.json` scripts become `npm run <name>`.
fn parse_package_json(content: &str) -> Vec<TaskRow> {
    let Ok(json) = serde_json::from_str::<serde_json::Value>(content) else {
        return Vec::new();
    };
    let Some(scripts) = json.get("scripts").and_then(|s| s.as_object()) else {
        return Vec::new();
    };
    scripts
        .iter()
        .map(|(name, body)| TaskRow {
            kind: "npm".to_string(),
            name: name.clone(),
            command: format!("npm run {}", name),
            description: body.as_str().map(str::to_string),
        })
        .collect()
}

/// Cargo targets are implicit; the standard verbs cover a workspace.
fn cargo_tasks() -> Vec<TaskRow> {
    ["build", "test", "run", "clippy", "fmt"]
        .into_iter()
        .map(|verb| task("cargo", verb, format!("cargo {}", verb)))
        .collect()
}

fn go_tasks() -> Vec<TaskRow> {
    [("build", "go build ./..."), ("test", "go test ./..."), ("vet", "go vet ./...")]
        .into_iter()
        .map(|(name, command)| task("go", name, command.to_string()))
        .collect()
}

fn python_tasks(content: &str) -> Vec<TaskRow> {
    let mut tasks = vec![task("python", "test", "pytest".to_string())];
    if content.contains("[tool.poetry") {
        tasks.push(task("python", "install", "poetry install".to_string()));
    } else {
        tasks.push(task("python", "install", "pip install -e .".to_string()));
    }
    tasks
}

/// Top-level Makefile targets: `name:` at column zero, skipping pattern
/// rules, special targets, and variable assignments.
fn parse_makefile(content: &str) -> Vec<TaskRow> {
    let mut tasks = Vec::new();
    for line in content.lines() {
        if line.starts_with(&['\t', ' ', '#', '.'][..]) {
            continue;
        }
        let Some((name, _)) = line.split_once(':') else {
            continue;
        };
        let name = name.trim();
        if name.is_empty()
            || name.contains('=')
            || name.contains('$')
            || name.contains('%')
            || name.contains(' ')
        {
            continue;
        }
        tasks.push(task("make", name, format!("make {}", name)));
    }
    tasks
}

/// Justfile recipes: `name:` or `name arg:` at column zero.
fn parse_justfile(content: &str) -> Vec<TaskRow> {
    let mut tasks = Vec::new();
    for line in content.lines() {
        if line.starts_with(&[' ', '\t', '#', '@'][..]) {
            continue;
        }
        let Some((head, _)) = line.split_once(':') else {
            continue;
        };
        let head = head.trim();
        if head.is_empty() || head.contains('=') {
            continue;
        }
        // Recipe parameters follow the name.
        let Some(name) = head.split_whitespace().next() else {
            continue;
        };
        if name.starts_with('_') {
            continue;
        }
        tasks.push(task("just", name, format!("just {}", name)));
    }
    tasks
}

#[cfg(test)]
#[path = "project_tests.rs"]
mod tests;
