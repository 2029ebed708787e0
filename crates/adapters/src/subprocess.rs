// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subprocess execution helpers.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;

/// Environment variables passed through to subprocesses; everything else is
/// scrubbed.
const PASSTHROUGH_ENV: [&str; 5] = ["PATH", "HOME", "LANG", "LC_ALL", "TERM"];

#[derive(Debug, Error)]
pub enum SubprocessError {
    #[error("{description} failed: {source}")]
    Spawn {
        description: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{description} timed out after {timeout_secs}s")]
    Timeout {
        description: String,
        timeout_secs: u64,
    },

    #[error("{description} exited with {code}: {stderr}")]
    NonZero {
        description: String,
        code: i32,
        stderr: String,
    },
}

/// Run a command with a sanitized environment, a timeout, and an output
/// byte cap.
///
/// The child is killed when the timeout elapses (tokio kills on drop).
/// Output beyond `max_output` is truncated, not an error.
pub async fn run_with_limits(
    mut cmd: Command,
    timeout: Duration,
    max_output: usize,
    description: &str,
) -> Result<String, SubprocessError> {
    cmd.env_clear();
    for key in PASSTHROUGH_ENV {
        if let Ok(value) = std::env::var(key) {
            cmd.env(key, value);
        }
    }
    cmd.kill_on_drop(true);
    cmd.stdin(std::process::Stdio::null());

    let output = match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(source)) => {
            return Err(SubprocessError::Spawn {
                description: description.to_string(),
                source,
            })
        }
        Err(_elapsed) => {
            return Err(SubprocessError::Timeout {
                description: description.to_string(),
                timeout_secs: timeout.as_secs(),
            })
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stderr = stderr.chars().take(400).collect::<String>();
        return Err(SubprocessError::NonZero {
            description: description.to_string(),
            code: output.status.code().unwrap_or(-1),
            stderr,
        });
    }

    let mut stdout = output.stdout;
    stdout.truncate(max_output);
    Ok(String::from_utf8_lossy(&stdout).into_owned())
}

/// Whether `name` resolves to an executable on PATH.
pub fn binary_on_path(name: &str) -> bool {
    let Some(path) = std::env::var_os("PATH") else {
        return false;
    };
    std::env::split_paths(&path).any(|dir: PathBuf| dir.join(name).is_file())
}

#[cfg(test)]
#[path = "subprocess_tests.rs"]
mod tests;
