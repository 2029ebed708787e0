// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup, shutdown, single-instance lock.

use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use fs2::FileExt;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::net::UnixListener;
use tracing::{info, warn};

use clai_adapters::ProviderRegistry;
use clai_engine::{BatchWriter, Learner, ProjectDiscovery, Scorer, SessionManager};
use clai_storage::Store;

use crate::env;
use crate::listener::ListenCtx;

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Per-user run directory (socket + lock)
    pub run_dir: PathBuf,
    /// Path to Unix socket
    pub socket_path: PathBuf,
    /// Path to lock/PID file
    pub lock_path: PathBuf,
    /// Path to version file
    pub version_path: PathBuf,
    /// Path to daemon log file
    pub log_path: PathBuf,
    /// Path to the state database
    pub db_path: PathBuf,
    /// Engine tunables
    pub engine: clai_core::Config,
    /// Idle shutdown window
    pub idle_timeout: Duration,
}

impl Config {
    /// Load configuration for the user-level daemon.
    ///
    /// One daemon serves every shell session for a user; paths come from
    /// the environment (see `env.rs`).
    pub fn load() -> Result<Self, LifecycleError> {
        let run_dir = env::run_dir();
        let db_path = env::db_path();
        let data_dir = db_path
            .parent()
            .map(|p| p.to_path_buf())
            .ok_or(LifecycleError::NoStateDir)?;

        let engine = clai_core::Config::default();
        let idle_timeout = env::idle_timeout(engine.idle_timeout_ms);

        Ok(Self {
            socket_path: run_dir.join("clai.sock"),
            lock_path: run_dir.join("clai.pid"),
            version_path: run_dir.join("clai.version"),
            log_path: data_dir.join("claid.log"),
            run_dir,
            db_path,
            engine,
            idle_timeout,
        })
    }
}

/// Daemon state during operation.
pub struct DaemonState {
    pub config: Config,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
    /// Shared request-handler context
    pub ctx: Arc<ListenCtx>,
    /// Batch writer join handle, awaited at shutdown
    writer_handle: tokio::task::JoinHandle<()>,
}

/// Result of daemon startup.
pub struct StartupResult {
    pub daemon: DaemonState,
    /// The Unix socket listener to spawn as a task
    pub listener: UnixListener,
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Could not determine state directory")]
    NoStateDir,

    #[error("Failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("Failed to bind socket at {0}: {1}")]
    BindFailed(PathBuf, std::io::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] clai_storage::StorageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Start the daemon
pub async fn startup(config: &Config) -> Result<StartupResult, LifecycleError> {
    match startup_inner(config).await {
        Ok(result) => Ok(result),
        Err(e) => {
            // Don't clean up if we failed to acquire the lock —
            // those files belong to the already-running daemon.
            if !matches!(e, LifecycleError::LockFailed(_)) {
                cleanup_on_failure(config);
            }
            Err(e)
        }
    }
}

async fn startup_inner(config: &Config) -> Result<StartupResult, LifecycleError> {
    // 1. Create directories with owner-only permissions.
    create_private_dir(&config.run_dir)?;
    if let Some(parent) = config.db_path.parent() {
        create_private_dir(parent)?;
    }

    // 2. Acquire the lock file FIRST - prevents races.
    // Avoid truncating before the lock is held, which would wipe the
    // running daemon's PID.
    let lock_file = open_private(&config.lock_path)?;
    lock_file
        .try_lock_exclusive()
        .map_err(LifecycleError::LockFailed)?;

    // Write PID now that we hold the lock.
    use std::io::Write;
    let mut lock_file = lock_file;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;
    let lock_file = lock_file;

    // 3. Version file for the shim's mismatch restart.
    std::fs::write(
        &config.version_path,
        concat!(env!("CARGO_PKG_VERSION"), "+", env!("BUILD_GIT_HASH")),
    )?;

    // 4. Open the store: one write connection (owned by the batch writer
    // and feedback paths), one read-only connection for query handlers.
    let write_store = Store::open(&config.db_path)?.with_tau(config.engine.tau_ms);
    let commands = write_store.commands_logged().unwrap_or(0);
    info!(db = %config.db_path.display(), commands, "store opened");
    let read_store = Store::open_read_only(&config.db_path)?.with_tau(config.engine.tau_ms);
    let write_store = Arc::new(Mutex::new(write_store));

    // 5. Remove stale socket and bind (after all validation passes).
    if config.socket_path.exists() {
        std::fs::remove_file(&config.socket_path)?;
    }
    let listener = UnixListener::bind(&config.socket_path)
        .map_err(|e| LifecycleError::BindFailed(config.socket_path.clone(), e))?;

    // 6. Assemble the engine.
    let sessions = Arc::new(SessionManager::with_workflow_capacity(
        config.engine.workflow_lru,
    ));
    let (writer, writer_handle) =
        BatchWriter::spawn(Arc::clone(&write_store), Arc::clone(&sessions), &config.engine);
    let learner = Arc::new(Learner::new(config.engine.clone()));
    match read_store.load_profile(clai_core::SCOPE_GLOBAL) {
        Ok(profile) => learner.load(clai_core::SCOPE_GLOBAL, profile),
        Err(e) => warn!(error = %e, "failed to load global rank profile"),
    }

    let ctx = Arc::new(ListenCtx::new(
        config.engine.clone(),
        write_store,
        read_store,
        sessions,
        writer,
        Scorer::new(config.engine.clone()),
        learner,
        Arc::new(ProjectDiscovery::new(config.engine.clone())),
        ProviderRegistry::standard(Duration::from_millis(config.engine.provider_timeout_ms)),
    ));

    info!("Daemon started");

    Ok(StartupResult {
        daemon: DaemonState {
            config: config.clone(),
            lock_file,
            ctx,
            writer_handle,
        },
        listener,
    })
}

impl DaemonState {
    /// Shutdown the daemon gracefully: stop accepting (listener task dies
    /// with the runtime), drain the batch writer, close the store, release
    /// the lock, remove the socket.
    pub async fn shutdown(self) {
        info!("Shutting down daemon...");

        self.ctx.writer.shutdown();
        if let Err(e) = self.writer_handle.await {
            warn!("Batch writer task failed during shutdown: {}", e);
        }

        // 1. Remove socket file
        if self.config.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.socket_path) {
                warn!("Failed to remove socket file: {}", e);
            }
        }

        // 2. Remove PID file
        if self.config.lock_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.lock_path) {
                warn!("Failed to remove PID file: {}", e);
            }
        }

        // 3. Remove version file
        if self.config.version_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.version_path) {
                warn!("Failed to remove version file: {}", e);
            }
        }

        // 4. Lock released when self.lock_file drops; store connections
        // close when the ctx drops.
        info!("Daemon shutdown complete");
    }
}

/// Clean up resources on startup failure
fn cleanup_on_failure(config: &Config) {
    if config.socket_path.exists() {
        let _ = std::fs::remove_file(&config.socket_path);
    }
    if config.version_path.exists() {
        let _ = std::fs::remove_file(&config.version_path);
    }
    if config.lock_path.exists() {
        let _ = std::fs::remove_file(&config.lock_path);
    }
}

fn create_private_dir(path: &std::path::Path) -> Result<(), LifecycleError> {
    use std::os::unix::fs::DirBuilderExt;
    let mut builder = std::fs::DirBuilder::new();
    builder.recursive(true).mode(0o700);
    builder.create(path)?;
    Ok(())
}

fn open_private(path: &std::path::Path) -> Result<File, LifecycleError> {
    use std::os::unix::fs::OpenOptionsExt;
    let file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .mode(0o600)
        .open(path)?;
    Ok(file)
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
