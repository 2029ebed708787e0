// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Suggest subcommand: the hot path behind ghost text.

use clai_daemon::{Request, Response};

use crate::cache;
use crate::client::DaemonClient;
use crate::output;

pub async fn run(session: &str, buffer: &str, cwd: &str, max: usize, json: bool) -> i32 {
    if session.is_empty() {
        // No session context: nothing to rank, nothing to break.
        return 0;
    }
    if cache::is_off() {
        return 0;
    }

    // Suggestions fall back to empty on every failure; the prompt renders
    // nothing rather than an error.
    let Ok(client) = DaemonClient::for_action() else {
        return 0;
    };

    let request = Request::Suggest {
        session_id: session.to_string(),
        cwd: resolve_cwd(cwd),
        buffer: buffer.to_string(),
        max_results: max,
    };

    let Ok(Response::Suggestions { items, .. }) = client.request(&request).await else {
        return 0;
    };

    if let Some(top) = items.first() {
        cache::write_suggestion(&top.text);
    }

    let rendered = if json {
        output::suggestions_json(&items)
    } else {
        output::suggestions_plain(&items)
    };
    if !rendered.is_empty() {
        println!("{rendered}");
        cache::write_last_output(&rendered);
    }
    0
}

fn resolve_cwd(arg: &str) -> String {
    if !arg.is_empty() {
        return arg.to_string();
    }
    std::env::current_dir()
        .map(|p| p.display().to_string())
        .unwrap_or_default()
}
