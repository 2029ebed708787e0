// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;

fn test_config(dir: &std::path::Path) -> Config {
    let run_dir = dir.join("run");
    let data_dir = dir.join("data");
    let engine = clai_core::Config::default();
    Config {
        socket_path: run_dir.join("clai.sock"),
        lock_path: run_dir.join("clai.pid"),
        version_path: run_dir.join("clai.version"),
        log_path: data_dir.join("claid.log"),
        db_path: data_dir.join("state.db"),
        run_dir,
        idle_timeout: Duration::from_millis(engine.idle_timeout_ms as u64),
        engine,
    }
}

#[tokio::test]
async fn startup_creates_lock_socket_and_store() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());

    let result = startup(&config).await.unwrap();
    assert!(config.socket_path.exists());
    assert!(config.lock_path.exists());
    assert!(config.version_path.exists());
    assert!(config.db_path.exists());

    let pid: u32 = std::fs::read_to_string(&config.lock_path)
        .unwrap()
        .trim()
        .parse()
        .unwrap();
    assert_eq!(pid, std::process::id());

    result.daemon.shutdown().await;
}

#[tokio::test]
async fn second_instance_cannot_acquire_lock() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());

    let first = startup(&config).await.unwrap();
    let second = startup(&config).await;
    assert!(matches!(second, Err(LifecycleError::LockFailed(_))));

    // The running daemon's files survive the failed second startup.
    assert!(config.socket_path.exists());
    assert!(config.lock_path.exists());

    first.daemon.shutdown().await;
}

#[tokio::test]
async fn shutdown_removes_runtime_files() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());

    let result = startup(&config).await.unwrap();
    result.daemon.shutdown().await;

    assert!(!config.socket_path.exists());
    assert!(!config.lock_path.exists());
    assert!(!config.version_path.exists());
    // The store persists across daemon lifetimes.
    assert!(config.db_path.exists());
}

#[tokio::test]
async fn restart_after_shutdown_succeeds() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());

    let first = startup(&config).await.unwrap();
    first.daemon.shutdown().await;

    let second = startup(&config).await.unwrap();
    second.daemon.shutdown().await;
}

#[tokio::test]
async fn stale_socket_is_replaced() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());

    std::fs::create_dir_all(&config.run_dir).unwrap();
    std::fs::write(&config.socket_path, b"stale").unwrap();

    let result = startup(&config).await.unwrap();
    // Bindable socket, not the stale regular file.
    assert!(config.socket_path.exists());
    result.daemon.shutdown().await;
}

#[cfg(unix)]
#[tokio::test]
async fn private_permissions_applied() {
    use std::os::unix::fs::PermissionsExt;
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());

    let result = startup(&config).await.unwrap();
    let run_mode = std::fs::metadata(&config.run_dir).unwrap().permissions().mode() & 0o777;
    assert_eq!(run_mode, 0o700);
    let lock_mode = std::fs::metadata(&config.lock_path).unwrap().permissions().mode() & 0o777;
    assert_eq!(lock_mode, 0o600);
    result.daemon.shutdown().await;
}

#[test]
#[serial]
fn config_load_honors_state_dir_override() {
    std::env::set_var("CLAI_STATE_DIR", "/tmp/clai-cfg-test");
    let config = Config::load().unwrap();
    assert_eq!(
        config.socket_path,
        std::path::PathBuf::from("/tmp/clai-cfg-test/run/clai.sock")
    );
    assert_eq!(
        config.db_path,
        std::path::PathBuf::from("/tmp/clai-cfg-test/data/state.db")
    );
    std::env::remove_var("CLAI_STATE_DIR");
}

#[test]
#[serial]
fn config_idle_timeout_from_env() {
    std::env::set_var("CLAI_STATE_DIR", "/tmp/clai-cfg-test");
    std::env::set_var("CLAI_IDLE_TIMEOUT", "30m");
    let config = Config::load().unwrap();
    assert_eq!(config.idle_timeout, Duration::from_secs(1800));

    std::env::set_var("CLAI_IDLE_TIMEOUT", "garbage");
    let config = Config::load().unwrap();
    assert_eq!(config.idle_timeout, Duration::from_secs(7200));

    std::env::remove_var("CLAI_IDLE_TIMEOUT");
    std::env::remove_var("CLAI_STATE_DIR");
}
