// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;

#[test]
fn parse_startup_error_finds_last_attempt() {
    let log = "\
--- claid: starting (pid: 100) ---\n\
2026-01-01 INFO ready\n\
--- claid: starting (pid: 200) ---\n\
ERROR Failed to start daemon: Failed to bind socket\n";
    let err = parse_startup_error(log).unwrap();
    assert!(err.contains("Failed to bind socket"));
}

#[test]
fn parse_startup_error_ignores_clean_log() {
    let log = "--- claid: starting (pid: 100) ---\n2026-01-01 INFO ready\n";
    assert!(parse_startup_error(log).is_none());
}

#[test]
fn parse_startup_error_ignores_errors_from_older_attempts() {
    let log = "\
--- claid: starting (pid: 100) ---\n\
ERROR Failed to start daemon: old problem\n\
--- claid: starting (pid: 200) ---\n\
2026-01-01 INFO ready\n";
    assert!(parse_startup_error(log).is_none());
}

#[test]
fn process_exists_for_self() {
    assert!(process_exists(std::process::id()));
}

#[test]
#[serial]
fn cleanup_stale_socket_removes_dead_files() {
    let dir = tempfile::tempdir().unwrap();
    std::env::set_var("CLAI_STATE_DIR", dir.path());
    std::fs::create_dir_all(clai_daemon::env::run_dir()).unwrap();

    // Dead PID: files get removed.
    std::fs::write(daemon_socket(), b"stale").unwrap();
    std::fs::write(daemon_pid_path(), b"999999999").unwrap();
    assert!(!cleanup_stale_socket());
    assert!(!daemon_socket().exists());
    assert!(!daemon_pid_path().exists());

    // Live PID (our own): files are left for retry.
    std::fs::write(daemon_socket(), b"stale").unwrap();
    std::fs::write(daemon_pid_path(), std::process::id().to_string()).unwrap();
    assert!(cleanup_stale_socket());
    assert!(daemon_socket().exists());

    std::env::remove_var("CLAI_STATE_DIR");
}

#[test]
#[serial]
fn socket_paths_follow_run_dir() {
    std::env::set_var("CLAI_STATE_DIR", "/tmp/clai-dp-test");
    assert_eq!(
        daemon_socket(),
        std::path::PathBuf::from("/tmp/clai-dp-test/run/clai.sock")
    );
    assert_eq!(
        daemon_pid_path(),
        std::path::PathBuf::from("/tmp/clai-dp-test/run/clai.pid")
    );
    std::env::remove_var("CLAI_STATE_DIR");
}
