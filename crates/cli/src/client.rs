// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon client for the one-shot shim.
//!
//! Every invocation dials the socket, sends one request, reads one
//! response, and exits. When the daemon is not running, action paths spawn
//! it on demand and poll for readiness; query paths fail soft so the shell
//! hook never blocks on a missing daemon.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::net::UnixStream;

use clai_daemon::protocol::{self, ProtocolError};
use clai_daemon::{Request, Response};

use crate::daemon_process::{
    cleanup_stale_socket, daemon_socket, probe_socket, start_daemon_background,
    wrap_with_startup_error,
};
use crate::env;

/// Client errors
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Daemon not running")]
    DaemonNotRunning,

    #[error("Failed to start daemon: {0}")]
    DaemonStartFailed(String),

    #[error("Connection timeout waiting for daemon to start")]
    DaemonStartTimeout,

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Daemon error ({code}): {message}")]
    Daemon { code: String, message: String },

    #[error("Unexpected response from daemon")]
    UnexpectedResponse,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Daemon client
pub struct DaemonClient {
    socket_path: PathBuf,
}

impl DaemonClient {
    /// For hook and action commands - auto-start the daemon when absent.
    pub fn for_action() -> Result<Self, ClientError> {
        Self::connect_or_start()
    }

    /// For query commands - connect only, never spawn.
    ///
    /// If the daemon is down there is nothing useful to query anyway; the
    /// caller prints an empty result.
    pub fn for_query() -> Result<Self, ClientError> {
        Self::connect()
    }

    /// Connect to the daemon, spawning it on demand.
    pub fn connect_or_start() -> Result<Self, ClientError> {
        match Self::connect() {
            Ok(client) => {
                // Verify the socket actually accepts connections (the
                // daemon may have crashed, leaving a stale socket file).
                if probe_socket(&client.socket_path) {
                    Ok(client)
                } else if cleanup_stale_socket() {
                    // A live daemon holds the lock; retry with backoff.
                    Self::connect_with_retry(env::timeout_connect(), None)
                } else {
                    let child = start_daemon_background()?;
                    Self::connect_with_retry(env::timeout_connect(), Some(child))
                }
            }
            Err(ClientError::DaemonNotRunning) => {
                let child = start_daemon_background()?;
                Self::connect_with_retry(env::timeout_connect(), Some(child))
            }
            Err(e) => Err(wrap_with_startup_error(e)),
        }
    }

    /// Connect to an existing daemon (no auto-start).
    pub fn connect() -> Result<Self, ClientError> {
        let socket_path = daemon_socket();
        if !socket_path.exists() {
            return Err(ClientError::DaemonNotRunning);
        }
        Ok(Self { socket_path })
    }

    fn connect_with_retry(
        timeout: Duration,
        mut child: Option<std::process::Child>,
    ) -> Result<Self, ClientError> {
        let start = Instant::now();
        while start.elapsed() < timeout {
            // A spawned daemon that exits early failed to start; surface
            // its logged error instead of timing out.
            if let Some(child) = child.as_mut() {
                if let Ok(Some(status)) = child.try_wait() {
                    if let Some(err) = crate::daemon_process::read_startup_error() {
                        return Err(ClientError::DaemonStartFailed(err));
                    }
                    return Err(ClientError::DaemonStartFailed(format!(
                        "exited with {}",
                        status
                    )));
                }
            }

            let socket_path = daemon_socket();
            if socket_path.exists() && probe_socket(&socket_path) {
                return Ok(Self { socket_path });
            }
            std::thread::sleep(env::poll_interval());
        }

        Err(wrap_with_startup_error(ClientError::DaemonStartTimeout))
    }

    /// Send one request, await one response.
    pub async fn request(&self, request: &Request) -> Result<Response, ClientError> {
        let mut stream = UnixStream::connect(&self.socket_path)
            .await
            .map_err(|_| ClientError::DaemonNotRunning)?;

        let data = protocol::encode(request)?;
        let timeout = env::timeout_ipc();
        tokio::time::timeout(timeout, protocol::write_message(&mut stream, &data))
            .await
            .map_err(|_| ProtocolError::Timeout)??;

        let bytes = tokio::time::timeout(timeout, protocol::read_message(&mut stream))
            .await
            .map_err(|_| ProtocolError::Timeout)??;
        let response: Response = protocol::decode(&bytes)?;

        if let Response::Error { code, message } = response {
            return Err(ClientError::Daemon { code, message });
        }
        Ok(response)
    }

    /// Send a request, expecting a plain Ok acknowledgement.
    pub async fn request_ack(&self, request: &Request) -> Result<(), ClientError> {
        match self.request(request).await? {
            Response::Ok => Ok(()),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }
}
