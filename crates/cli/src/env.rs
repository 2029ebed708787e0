// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the shim.

use std::time::Duration;

/// Authoritative session id exported by the shell hook.
pub fn session_id() -> Option<String> {
    std::env::var("CLAI_SESSION_ID").ok().filter(|s| !s.is_empty())
}

/// Override resolution of the daemon binary.
pub fn daemon_binary() -> Option<String> {
    std::env::var("CLAI_DAEMON_PATH").ok().filter(|s| !s.is_empty())
}

/// The session's events are dropped from aggregates entirely.
pub fn no_record() -> bool {
    std::env::var("CLAI_NO_RECORD").map(|v| v == "1").unwrap_or(false)
}

/// Events are persisted flagged ephemeral, never aggregated.
pub fn ephemeral() -> bool {
    std::env::var("CLAI_EPHEMERAL").map(|v| v == "1").unwrap_or(false)
}

fn parse_duration_ms(var: &str) -> Option<Duration> {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}

/// Timeout for IPC requests.
pub fn timeout_ipc() -> Duration {
    parse_duration_ms("CLAI_TIMEOUT_IPC_MS").unwrap_or(Duration::from_secs(5))
}

/// Timeout for waiting for the daemon to start.
pub fn timeout_connect() -> Duration {
    parse_duration_ms("CLAI_TIMEOUT_CONNECT_MS").unwrap_or(Duration::from_secs(5))
}

/// Polling interval for connection retries.
pub fn poll_interval() -> Duration {
    parse_duration_ms("CLAI_CONNECT_POLL_MS").unwrap_or(Duration::from_millis(50))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn privacy_flags_parse() {
        std::env::set_var("CLAI_NO_RECORD", "1");
        assert!(no_record());
        std::env::set_var("CLAI_NO_RECORD", "0");
        assert!(!no_record());
        std::env::remove_var("CLAI_NO_RECORD");
        assert!(!no_record());

        std::env::set_var("CLAI_EPHEMERAL", "1");
        assert!(ephemeral());
        std::env::remove_var("CLAI_EPHEMERAL");
    }

    #[test]
    #[serial]
    fn session_id_requires_nonempty() {
        std::env::set_var("CLAI_SESSION_ID", "");
        assert_eq!(session_id(), None);
        std::env::set_var("CLAI_SESSION_ID", "abc123");
        assert_eq!(session_id().as_deref(), Some("abc123"));
        std::env::remove_var("CLAI_SESSION_ID");
    }

    #[test]
    #[serial]
    fn ipc_timeout_override() {
        std::env::set_var("CLAI_TIMEOUT_IPC_MS", "250");
        assert_eq!(timeout_ipc(), Duration::from_millis(250));
        std::env::remove_var("CLAI_TIMEOUT_IPC_MS");
        assert_eq!(timeout_ipc(), Duration::from_secs(5));
    }
}
