// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session lifecycle handlers.

use std::collections::HashMap;

use tracing::warn;

use clai_core::{ClientInfo, SessionId};

use super::ListenCtx;
use crate::protocol::Response;

pub(super) struct SessionStartParams {
    pub session_id: String,
    pub shell: String,
    pub os: String,
    pub host: String,
    pub user: String,
    pub cwd: String,
    pub started_at_ms: i64,
    pub no_record: bool,
    pub ephemeral: bool,
}

pub(super) async fn handle_session_start(ctx: &ListenCtx, params: SessionStartParams) -> Response {
    if params.session_id.is_empty() {
        return Response::invalid("missing session id");
    }
    let session_id = SessionId::new(params.session_id);

    let client = ClientInfo {
        shell: params.shell,
        os: params.os,
        host: params.host,
        user: params.user,
    };
    ctx.sessions
        .start(session_id.clone(), client.clone(), params.cwd.clone(), params.started_at_ms);
    ctx.sessions
        .set_privacy(&session_id, params.no_record, params.ephemeral);

    let project_types =
        clai_engine::detect_project_types(std::path::Path::new(&params.cwd));
    ctx.sessions.set_project_types(&session_id, project_types);

    // The session row must exist before any of its events land (FK).
    let result = ctx.write_store.lock().upsert_session(
        &session_id,
        &client.shell,
        &client.os,
        &client.host,
        &client.user,
        &params.cwd,
        params.started_at_ms,
    );
    if let Err(e) = result {
        warn!(error = %e, session = %session_id, "failed to persist session row");
    }

    Response::Ok
}

pub(super) async fn handle_session_end(
    ctx: &ListenCtx,
    session_id: &str,
    ended_at_ms: i64,
) -> Response {
    if session_id.is_empty() {
        return Response::invalid("missing session id");
    }
    let session_id = SessionId::new(session_id);

    // Flush in-flight events for the session before it disappears.
    ctx.writer.flush().await;
    ctx.sessions.end(&session_id);

    if let Err(e) = ctx.write_store.lock().end_session(&session_id, ended_at_ms) {
        warn!(error = %e, session = %session_id, "failed to mark session ended");
    }
    Response::Ok
}

pub(super) fn handle_alias_sync(
    ctx: &ListenCtx,
    session_id: &str,
    aliases: HashMap<String, String>,
) -> Response {
    if session_id.is_empty() {
        return Response::invalid("missing session id");
    }
    ctx.sessions.set_aliases(&SessionId::new(session_id), aliases);
    Response::Ok
}
