// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Suggestion query handler.

use std::time::Instant;

use tracing::warn;

use clai_core::{dir_scope_key, SessionId, SuggestContext, SCOPE_GLOBAL};

use super::ListenCtx;
use crate::protocol::{Response, SuggestionWire};

pub(super) fn handle_suggest(
    ctx: &ListenCtx,
    session_id: &str,
    cwd: &str,
    buffer: &str,
    max_results: usize,
) -> Response {
    if session_id.is_empty() {
        return Response::invalid("missing session id");
    }
    let started = Instant::now();
    let session_id = SessionId::new(session_id);
    let now_ms = ctx.now_ms();
    ctx.sessions.touch(&session_id, now_ms);

    let session = ctx.sessions.get(&session_id);
    let (suggest_ctx, workflow_expected) = match &session {
        Some(record) => (
            SuggestContext {
                session_id: session_id.clone(),
                repo_key: record.last_repo_key.clone(),
                last_raw: record.last_raw.clone(),
                last_template: record.last_template.clone(),
                prefix: buffer.to_string(),
                cwd: cwd.to_string(),
                dir_scope: dir_scope_key(cwd),
                project_types: record.project_types.clone(),
                last_exit_code: record.last_exit_code,
                last_failed: record.last_failed,
                now_ms,
                max_results,
            },
            record.workflow.expected_next(),
        ),
        // A session-less query still ranks global aggregates.
        None => (
            SuggestContext {
                session_id: session_id.clone(),
                prefix: buffer.to_string(),
                cwd: cwd.to_string(),
                dir_scope: dir_scope_key(cwd),
                now_ms,
                max_results,
                ..Default::default()
            },
            Vec::new(),
        ),
    };

    let profile_scope = if suggest_ctx.repo_key.is_empty() {
        SCOPE_GLOBAL.to_string()
    } else {
        suggest_ctx.repo_key.clone()
    };
    let profile = load_profile(ctx, &profile_scope);

    let store = ctx.read_store.lock();
    let suggestions = match ctx
        .scorer
        .suggest(&store, &profile, &workflow_expected, &suggest_ctx)
    {
        Ok(suggestions) => suggestions,
        Err(e) => {
            // Read-side failure degrades to an empty page; the shell falls
            // back silently.
            warn!(error = %e, "suggestion query failed");
            Vec::new()
        }
    };
    drop(store);

    ctx.sessions.set_last_suggestions(&session_id, suggestions.clone());

    Response::Suggestions {
        items: suggestions.iter().map(SuggestionWire::from).collect(),
        cache: "live".to_string(),
        latency_ms: started.elapsed().as_millis() as i64,
    }
}

/// Pull the scope's persisted profile into the learner once per scope.
fn load_profile(ctx: &ListenCtx, scope: &str) -> clai_core::RankWeights {
    let needs_load = ctx.loaded_profiles.lock().insert(scope.to_string());
    if needs_load {
        match ctx.read_store.lock().load_profile(scope) {
            Ok(profile) => ctx.learner.load(scope, profile),
            Err(e) => warn!(error = %e, scope, "failed to load rank profile"),
        }
    }
    ctx.learner.snapshot(scope)
}
