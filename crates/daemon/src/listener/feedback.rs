// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Suggestion feedback handler: dismissal state machine + learner update.

use std::sync::Arc;

use tracing::{debug, warn};

use clai_core::{FeedbackAction, SessionId, SCOPE_GLOBAL};

use super::ListenCtx;
use crate::protocol::{Response, E_NO_FEEDBACK_STORE};

pub(super) fn handle_feedback(
    ctx: &ListenCtx,
    session_id: &str,
    suggested: &str,
    action: &str,
    executed: &str,
) -> Response {
    if session_id.is_empty() {
        return Response::invalid("missing session id");
    }
    if suggested.is_empty() {
        return Response::invalid("empty suggested text");
    }
    let Some(action) = FeedbackAction::parse(action) else {
        return Response::invalid(format!("unknown action: {action}"));
    };

    let session_id = SessionId::new(session_id);
    let Some(session) = ctx.sessions.get(&session_id) else {
        return Response::Error {
            code: E_NO_FEEDBACK_STORE.to_string(),
            message: "unknown session".to_string(),
        };
    };
    if session.last_suggestions.is_empty() {
        return Response::Error {
            code: E_NO_FEEDBACK_STORE.to_string(),
            message: "no suggestion batch for session".to_string(),
        };
    }

    let scope = if session.last_repo_key.is_empty() {
        SCOPE_GLOBAL.to_string()
    } else {
        session.last_repo_key.clone()
    };

    // Dismissal state machine, keyed by the context (last template) and the
    // suggested candidate's template.
    if !session.last_template.as_str().is_empty() {
        let suggested_norm = clai_shell::prenormalize(
            suggested,
            &session.aliases,
            &clai_shell::NormalizeOptions::default(),
        );
        let result = ctx.write_store.lock().apply_dismissal(
            &scope,
            &session.last_template,
            &suggested_norm.template_id,
            action.dismissal_event(),
            ctx.cfg.learned_threshold,
            ctx.now_ms(),
        );
        match result {
            Ok(state) => debug!(?state, "dismissal updated"),
            Err(e) => warn!(error = %e, "failed to update dismissal pattern"),
        }
    }

    // Edited feedback rewards what the user actually ran when it resolves
    // to a shown candidate.
    let target = if action == FeedbackAction::Edited && !executed.is_empty() {
        executed
    } else {
        suggested
    };
    let (outcome, profile) =
        ctx.learner
            .feedback(&scope, action, target, &session.last_suggestions);
    debug!(?outcome, scope, "learner feedback applied");

    // Fire-and-forget persistence; reads see the in-memory snapshot.
    let store = Arc::clone(&ctx.write_store);
    let now_ms = ctx.now_ms();
    tokio::spawn(async move {
        if let Err(e) = store.lock().save_profile(&scope, &profile, now_ms) {
            warn!(error = %e, "failed to persist rank profile");
        }
    });

    Response::Ok
}
