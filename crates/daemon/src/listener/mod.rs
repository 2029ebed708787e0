// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Listener task for handling socket I/O.
//!
//! The Listener runs in a spawned task, accepting connections and handling
//! each on its own task. Every request refreshes the idle-shutdown activity
//! clock. Handlers never panic and never write to a client's terminal; the
//! worst outcome is an empty result with an error code.

mod ai;
mod commands;
mod feedback;
mod history;
mod sessions;
mod suggest;

use std::collections::HashSet;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::Notify;
use tracing::{debug, error, warn};

use clai_adapters::ProviderRegistry;
use clai_core::{Clock, SystemClock};
use clai_engine::{BatchWriter, Learner, ProjectDiscovery, Scorer, SessionManager, SharedStore};
use clai_storage::Store;

use crate::protocol::{self, Request, Response, DEFAULT_TIMEOUT, PROTOCOL_VERSION};

/// Shared daemon context for all request handlers.
pub struct ListenCtx {
    pub(crate) cfg: clai_core::Config,
    /// Write connection, shared with the batch writer.
    pub(crate) write_store: SharedStore,
    /// Independent read-only connection for query handlers.
    pub(crate) read_store: Mutex<Store>,
    pub(crate) sessions: Arc<SessionManager>,
    pub(crate) writer: BatchWriter,
    pub(crate) scorer: Scorer,
    pub(crate) learner: Arc<Learner>,
    pub(crate) discovery: Arc<ProjectDiscovery>,
    pub(crate) providers: ProviderRegistry,
    /// Unix ms of the most recent RPC (idle shutdown input).
    pub(crate) activity_ms: AtomicI64,
    pub(crate) start_time: Instant,
    pub(crate) shutdown: Arc<Notify>,
    /// Scopes whose rank profiles were already pulled from storage.
    pub(crate) loaded_profiles: Mutex<HashSet<String>>,
}

impl ListenCtx {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        cfg: clai_core::Config,
        write_store: SharedStore,
        read_store: Store,
        sessions: Arc<SessionManager>,
        writer: BatchWriter,
        scorer: Scorer,
        learner: Arc<Learner>,
        discovery: Arc<ProjectDiscovery>,
        providers: ProviderRegistry,
    ) -> Self {
        let now = SystemClock.now_ms();
        Self {
            cfg,
            write_store,
            read_store: Mutex::new(read_store),
            sessions,
            writer,
            scorer,
            learner,
            discovery,
            providers,
            activity_ms: AtomicI64::new(now),
            start_time: Instant::now(),
            shutdown: Arc::new(Notify::new()),
            loaded_profiles: Mutex::new(HashSet::new()),
        }
    }

    pub(crate) fn now_ms(&self) -> i64 {
        SystemClock.now_ms()
    }

    fn touch_activity(&self) {
        self.activity_ms.store(self.now_ms(), Ordering::SeqCst);
    }

    /// Unix ms of the last RPC.
    pub fn last_activity_ms(&self) -> i64 {
        self.activity_ms.load(Ordering::SeqCst)
    }

    /// Shutdown signal shared with the main loop.
    pub fn shutdown_signal(&self) -> Arc<Notify> {
        Arc::clone(&self.shutdown)
    }

    /// Batch writer handle (main loop flushes on shutdown).
    pub fn batch_writer(&self) -> &BatchWriter {
        &self.writer
    }

    /// Active session count (main loop idle diagnostics).
    pub fn active_sessions(&self) -> usize {
        self.sessions.active_count()
    }

    /// Age out sessions idle longer than `idle_ms`.
    pub fn prune_idle_sessions(&self, now_ms: i64, idle_ms: i64) -> usize {
        self.sessions.prune_idle(now_ms, idle_ms)
    }
}

/// Listener task for accepting socket connections.
pub struct Listener {
    socket: UnixListener,
    ctx: Arc<ListenCtx>,
}

impl Listener {
    pub fn new(socket: UnixListener, ctx: Arc<ListenCtx>) -> Self {
        Self { socket, ctx }
    }

    /// Run the listener loop, spawning a task per connection.
    pub async fn run(self) {
        loop {
            match self.socket.accept().await {
                Ok((stream, _)) => {
                    let ctx = Arc::clone(&self.ctx);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, &ctx).await {
                            match e {
                                protocol::ProtocolError::ConnectionClosed => {
                                    debug!("Client disconnected")
                                }
                                protocol::ProtocolError::Timeout => warn!("Connection timeout"),
                                _ => error!("Connection error: {}", e),
                            }
                        }
                    });
                }
                Err(e) => {
                    error!("Accept error: {}", e);
                }
            }
        }
    }
}

/// Handle a single client connection (one request, one response).
async fn handle_connection(
    stream: UnixStream,
    ctx: &ListenCtx,
) -> Result<(), protocol::ProtocolError> {
    let (mut reader, mut writer) = stream.into_split();

    let request = protocol::read_request(&mut reader, DEFAULT_TIMEOUT).await?;

    // Suggest runs on every keystroke; keep it at debug.
    if matches!(request, Request::Suggest { .. } | Request::Ping) {
        debug!(request = ?request, "received request");
    } else {
        tracing::info!(request = ?request, "received request");
    }

    let response = handle_request(request, ctx).await;
    protocol::write_response(&mut writer, &response, DEFAULT_TIMEOUT).await?;
    Ok(())
}

/// Handle a single request and return a response.
pub(crate) async fn handle_request(request: Request, ctx: &ListenCtx) -> Response {
    ctx.touch_activity();

    match request {
        Request::Ping => Response::Pong,

        Request::Hello { version: _ } => Response::Hello {
            version: PROTOCOL_VERSION.to_string(),
        },

        Request::SessionStart {
            session_id,
            shell,
            os,
            host,
            user,
            cwd,
            started_at_ms,
            no_record,
            ephemeral,
        } => {
            sessions::handle_session_start(
                ctx,
                sessions::SessionStartParams {
                    session_id,
                    shell,
                    os,
                    host,
                    user,
                    cwd,
                    started_at_ms,
                    no_record,
                    ephemeral,
                },
            )
            .await
        }

        Request::SessionEnd {
            session_id,
            ended_at_ms,
        } => sessions::handle_session_end(ctx, &session_id, ended_at_ms).await,

        Request::AliasSync {
            session_id,
            shell: _,
            aliases,
        } => sessions::handle_alias_sync(ctx, &session_id, aliases),

        Request::CommandStarted {
            command_id,
            session_id,
            command,
            cwd,
            repo_name,
            repo_root,
            branch,
            ts_ms,
            prev_command_id: _,
        } => commands::handle_command_started(
            ctx,
            commands::CommandStartedParams {
                command_id,
                session_id,
                command,
                cwd,
                repo_name,
                repo_root,
                branch,
                ts_ms,
            },
        ),

        Request::CommandEnded {
            command_id,
            session_id,
            exit_code,
            ts_ms,
            duration_ms,
        } => commands::handle_command_ended(ctx, &command_id, &session_id, exit_code, ts_ms, duration_ms),

        Request::Suggest {
            session_id,
            cwd,
            buffer,
            max_results,
        } => suggest::handle_suggest(ctx, &session_id, &cwd, &buffer, max_results),

        Request::TextToCommand {
            session_id,
            prompt,
            cwd,
            provider,
        } => ai::handle_text_to_command(ctx, &session_id, &prompt, &cwd, &provider).await,

        Request::NextStep {
            session_id,
            cwd,
            provider,
        } => ai::handle_next_step(ctx, &session_id, &cwd, &provider).await,

        Request::Diagnose {
            session_id,
            cwd,
            detail,
            provider,
        } => ai::handle_diagnose(ctx, &session_id, &cwd, &detail, &provider).await,

        Request::RecordFeedback {
            session_id,
            suggested,
            action,
            executed,
            prefix: _,
            latency_ms: _,
        } => feedback::handle_feedback(ctx, &session_id, &suggested, &action, &executed),

        Request::FetchHistory {
            session_id,
            query,
            mode,
            scope,
            global,
            repo_key,
            limit,
            offset,
        } => history::handle_fetch(
            ctx,
            history::FetchParams {
                session_id,
                query,
                mode,
                scope,
                global,
                repo_key,
                limit,
                offset,
            },
        ),

        Request::ImportHistory {
            shell,
            path,
            if_not_exists,
        } => history::handle_import(ctx, &shell, &path, if_not_exists),

        Request::Flush => {
            ctx.writer.flush().await;
            Response::Ok
        }

        Request::DiscoveryErrors => Response::DiscoveryErrors {
            errors: ctx.discovery.errors().recent(),
        },

        Request::Status => Response::Status {
            version: PROTOCOL_VERSION.to_string(),
            active_sessions: ctx.sessions.active_count(),
            uptime_secs: ctx.start_time.elapsed().as_secs(),
            commands_logged: ctx.read_store.lock().commands_logged().unwrap_or(0),
        },

        Request::Shutdown => {
            ctx.shutdown.notify_one();
            Response::ShuttingDown
        }
    }
}

#[cfg(test)]
pub(crate) mod test_ctx;

#[cfg(test)]
#[path = "../listener_tests.rs"]
mod tests;
