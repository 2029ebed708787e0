// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon process management utilities.
//!
//! Functions for starting, probing, and cleaning up the clai daemon.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, Instant};

use crate::client::ClientError;

/// Start the daemon detached in the background, returning the child handle.
pub fn start_daemon_background() -> Result<std::process::Child, ClientError> {
    let claid_path = find_claid_binary();

    let mut cmd = Command::new(&claid_path);
    cmd.stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null());

    // Detach from the caller's process group so a Ctrl-C in the shell
    // never reaches the daemon.
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }

    cmd.spawn()
        .map_err(|e| ClientError::DaemonStartFailed(e.to_string()))
}

/// Find the claid binary: CLAI_DAEMON_PATH, then a sibling of the current
/// executable, then PATH.
fn find_claid_binary() -> PathBuf {
    if let Some(path) = crate::env::daemon_binary() {
        return PathBuf::from(path);
    }

    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            let sibling = dir.join("claid");
            if sibling.exists() {
                return sibling;
            }
        }
    }

    PathBuf::from("claid")
}

/// Socket path of the user-level daemon.
pub fn daemon_socket() -> PathBuf {
    clai_daemon::env::run_dir().join("clai.sock")
}

/// PID file path of the user-level daemon.
pub fn daemon_pid_path() -> PathBuf {
    clai_daemon::env::run_dir().join("clai.pid")
}

/// Read the PID from the daemon PID file, if present and parseable.
pub fn read_daemon_pid() -> Option<u32> {
    let content = std::fs::read_to_string(daemon_pid_path()).ok()?;
    content.trim().parse::<u32>().ok()
}

/// Execute kill with the given signal and PID.
fn kill_signal(signal: &str, pid: u32) -> bool {
    Command::new("kill")
        .args([signal, &pid.to_string()])
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Check if a process with the given PID exists.
pub fn process_exists(pid: u32) -> bool {
    kill_signal("-0", pid)
}

/// Probe whether a Unix socket is accepting connections.
pub fn probe_socket(socket_path: &Path) -> bool {
    std::os::unix::net::UnixStream::connect(socket_path).is_ok()
}

/// Remove stale socket and PID files when no live daemon holds them.
///
/// Called when the socket file exists but cannot be dialed. A live PID
/// means the daemon is starting or wedged; the caller retries with backoff
/// instead of unlinking a healthy daemon's socket.
///
/// Returns true when the caller should retry against a live daemon.
pub fn cleanup_stale_socket() -> bool {
    let socket_path = daemon_socket();
    match read_daemon_pid() {
        Some(pid) if process_exists(pid) => true,
        _ => {
            let _ = std::fs::remove_file(&socket_path);
            let _ = std::fs::remove_file(daemon_pid_path());
            false
        }
    }
}

/// Wait for a process to exit.
pub fn wait_for_exit(pid: u32, timeout: Duration) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if !process_exists(pid) {
            return true;
        }
        std::thread::sleep(crate::env::poll_interval());
    }
    false
}

/// Startup marker prefix the daemon writes to its log before anything else.
const STARTUP_MARKER_PREFIX: &str = "--- claid: starting (pid: ";

/// Read the daemon log from the last startup marker, looking for errors.
pub fn read_startup_error() -> Option<String> {
    let log_path = clai_daemon::env::data_dir().join("claid.log");
    let content = std::fs::read_to_string(log_path).ok()?;
    parse_startup_error(&content)
}

/// Parse startup errors from log content (pure logic, no I/O).
fn parse_startup_error(content: &str) -> Option<String> {
    let start_pos = content.rfind(STARTUP_MARKER_PREFIX)?;
    let startup_log = &content[start_pos..];

    let errors: Vec<&str> = startup_log
        .lines()
        .filter(|line| line.contains(" ERROR ") || line.contains("Failed to start"))
        .collect();

    if errors.is_empty() {
        return None;
    }

    let error_messages: Vec<String> = errors
        .iter()
        .filter_map(|line| line.split_once(": ").map(|(_, msg)| msg.to_string()))
        .collect();

    if error_messages.is_empty() {
        Some(errors.join("\n"))
    } else {
        Some(error_messages.join("\n"))
    }
}

/// Wrap an error with startup log info if available.
pub fn wrap_with_startup_error(err: ClientError) -> ClientError {
    if matches!(err, ClientError::DaemonStartFailed(_)) {
        return err;
    }

    if let Some(startup_error) = read_startup_error() {
        ClientError::DaemonStartFailed(startup_error)
    } else {
        err
    }
}

#[cfg(test)]
#[path = "daemon_process_tests.rs"]
mod tests;
