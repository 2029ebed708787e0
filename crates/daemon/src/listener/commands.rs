// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command lifecycle handlers: stash on start, ingest on end.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, warn};

use clai_core::{CommandId, SessionId};
use clai_engine::sessions::PendingCommand;

use super::ListenCtx;
use crate::protocol::Response;

pub(super) struct CommandStartedParams {
    pub command_id: String,
    pub session_id: String,
    pub command: String,
    pub cwd: String,
    pub repo_name: String,
    pub repo_root: String,
    pub branch: String,
    pub ts_ms: i64,
}

pub(super) fn handle_command_started(ctx: &ListenCtx, params: CommandStartedParams) -> Response {
    if params.session_id.is_empty() || params.command_id.is_empty() {
        return Response::invalid("missing session or command id");
    }
    let session_id = SessionId::new(params.session_id);

    // Refresh project types on every start; cwd changes mid-session.
    let project_types = clai_engine::detect_project_types(Path::new(&params.cwd));
    ctx.sessions.set_project_types(&session_id, project_types);

    ctx.sessions.stash_command(
        &session_id,
        CommandId::new(params.command_id),
        PendingCommand {
            raw: params.command,
            cwd: params.cwd,
            repo_key: params.repo_root.clone(),
            repo_name: params.repo_name,
            branch: params.branch,
            started_at_ms: params.ts_ms,
        },
    );

    // Rebuild project tasks in the background when the repo changed.
    if !params.repo_root.is_empty() {
        refresh_tasks_if_stale(ctx, params.repo_root, params.ts_ms);
    }

    Response::Ok
}

/// Fire-and-forget task discovery; a changed marker fingerprint replaces
/// the repo's `project_task` rows.
fn refresh_tasks_if_stale(ctx: &ListenCtx, repo_root: String, now_ms: i64) {
    let discovery = Arc::clone(&ctx.discovery);
    let store = Arc::clone(&ctx.write_store);
    tokio::spawn(async move {
        let root = Path::new(&repo_root);
        let fingerprint = discovery.fingerprint(root);
        let stored = store.lock().project_fingerprint(&repo_root).ok().flatten();
        if stored.as_deref() == Some(fingerprint.as_str()) {
            return;
        }
        let tasks = discovery.discover(root);
        debug!(repo = %repo_root, tasks = tasks.len(), "project tasks refreshed");
        if let Err(e) = store
            .lock()
            .replace_project_tasks(&repo_root, &fingerprint, &tasks, now_ms)
        {
            warn!(error = %e, repo = %repo_root, "failed to store project tasks");
        }
    });
}

pub(super) fn handle_command_ended(
    ctx: &ListenCtx,
    command_id: &str,
    session_id: &str,
    exit_code: i32,
    ts_ms: i64,
    duration_ms: i64,
) -> Response {
    if session_id.is_empty() || command_id.is_empty() {
        return Response::invalid("missing session or command id");
    }
    let session_id = SessionId::new(session_id);
    let command_id = CommandId::new(command_id);

    // Unknown session or unmatched start: silently dropped, the shell hook
    // must never see an error for daemon-side races.
    let Some(pending) = ctx.sessions.take_pending(&session_id, &command_id) else {
        debug!(session = %session_id, command = %command_id, "no stash for ended command");
        return Response::Ok;
    };
    let Some(session) = ctx.sessions.get(&session_id) else {
        return Response::Ok;
    };

    if session.no_record {
        // Dropped entirely; the in-memory last-command state still advances
        // so suggestions keep working inside the session.
        let norm = clai_shell::prenormalize(
            &pending.raw,
            &session.aliases,
            &clai_shell::NormalizeOptions {
                max_bytes: ctx.cfg.max_event_bytes,
                alias_max_depth: ctx.cfg.alias_max_depth,
            },
        );
        ctx.sessions.set_last_command(
            &session_id,
            pending.raw,
            pending.cwd,
            pending.repo_key,
            pending.branch,
            norm.template_id,
            exit_code,
        );
        return Response::Ok;
    }

    let record = clai_engine::build_record(&session, &pending, exit_code, duration_ms, ts_ms, &ctx.cfg);
    ctx.writer.enqueue(record);
    Response::Ok
}
