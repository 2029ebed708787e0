// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! History search and import handlers.

use std::time::Instant;

use sha2::{Digest, Sha256};
use tracing::warn;

use clai_adapters::history_import;
use clai_core::{SearchMode, SessionId};
use clai_engine::ReplaySpec;
use clai_storage::{HistoryQuery, HistoryScope};

use super::ListenCtx;
use crate::protocol::{HistoryItemWire, Response};

pub(super) struct FetchParams {
    pub session_id: String,
    pub query: String,
    pub mode: String,
    pub scope: String,
    pub global: bool,
    pub repo_key: String,
    pub limit: usize,
    pub offset: usize,
}

pub(super) fn handle_fetch(ctx: &ListenCtx, params: FetchParams) -> Response {
    if params.session_id.is_empty() {
        return Response::invalid("missing session id");
    }
    let started = Instant::now();

    let scope = if params.global {
        HistoryScope::Global
    } else {
        match params.scope.as_str() {
            "session" => HistoryScope::Session(SessionId::new(params.session_id.clone())),
            "repo" if !params.repo_key.is_empty() => HistoryScope::Repo(params.repo_key.clone()),
            _ => HistoryScope::Global,
        }
    };

    let query = HistoryQuery {
        query: params.query,
        mode: SearchMode::parse(&params.mode),
        scope,
        limit: if params.limit == 0 { 20 } else { params.limit },
        offset: params.offset,
    };

    let page = match ctx.read_store.lock().search_history(&query) {
        Ok(page) => page,
        Err(e) => {
            // Degrade to an empty page; the picker falls back silently.
            warn!(error = %e, "history search failed");
            return Response::History {
                items: Vec::new(),
                at_end: true,
                backend: query.mode.as_str().to_string(),
                latency_ms: started.elapsed().as_millis() as i64,
            };
        }
    };

    Response::History {
        items: page.items.into_iter().map(HistoryItemWire::from).collect(),
        at_end: page.at_end,
        backend: page.backend.to_string(),
        latency_ms: started.elapsed().as_millis() as i64,
    }
}

pub(super) fn handle_import(
    ctx: &ListenCtx,
    shell: &str,
    path: &str,
    if_not_exists: bool,
) -> Response {
    if path.is_empty() {
        return Response::invalid("missing history path");
    }

    if if_not_exists {
        let existing = ctx.read_store.lock().commands_logged().unwrap_or(0);
        if existing > 0 {
            return Response::Imported {
                imported: 0,
                skipped: true,
            };
        }
    }

    let file_path = std::path::Path::new(path);
    let content = match std::fs::read_to_string(file_path) {
        Ok(content) => content,
        Err(e) => {
            return Response::invalid(format!("cannot read {}: {}", path, e));
        }
    };

    let commands = history_import::parse_history(shell, file_path, &content);
    if commands.is_empty() {
        return Response::Imported {
            imported: 0,
            skipped: false,
        };
    }

    // Backfill through the replay path: one synthetic session per source
    // file, 1s spacing ending roughly now. Replay keeps the run
    // deterministic for a given file and start time.
    let session_id = import_session_id(path);
    let now_ms = ctx.now_ms();
    let base_ts = now_ms - commands.len() as i64 * 1_000;
    let specs: Vec<ReplaySpec> = commands
        .iter()
        .map(|c| ReplaySpec::simple(&session_id, &c.raw))
        .collect();

    let result = {
        let mut store = ctx.write_store.lock();
        clai_engine::replay(&mut store, &ctx.cfg, &specs, base_ts, 1_000)
    };

    match result {
        Ok(imported) => Response::Imported {
            imported,
            skipped: false,
        },
        Err(e) => {
            warn!(error = %e, "history import failed");
            Response::Imported {
                imported: 0,
                skipped: false,
            }
        }
    }
}

/// Stable synthetic session id for an imported history file.
fn import_session_id(path: &str) -> SessionId {
    let mut hasher = Sha256::new();
    hasher.update(b"import:");
    hasher.update(path.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    SessionId::new(&digest[..16])
}
