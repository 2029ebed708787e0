// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! History search and import subcommands.

use clai_daemon::{Request, Response};

use crate::client::DaemonClient;
use crate::output;

#[allow(clippy::too_many_arguments)]
pub async fn search(
    session: &str,
    query: &str,
    mode: &str,
    scope: &str,
    repo: &str,
    limit: usize,
    offset: usize,
    json: bool,
) -> i32 {
    // Query path: no daemon means no history; print nothing and succeed so
    // the picker degrades gracefully.
    let Ok(client) = DaemonClient::for_query() else {
        return 0;
    };

    let request = Request::FetchHistory {
        session_id: if session.is_empty() {
            "anonymous".to_string()
        } else {
            session.to_string()
        },
        query: query.to_string(),
        mode: mode.to_string(),
        scope: scope.to_string(),
        global: scope == "global",
        repo_key: repo.to_string(),
        limit,
        offset,
    };

    match client.request(&request).await {
        Ok(Response::History { items, .. }) => {
            let rendered = if json {
                output::history_json(&items)
            } else {
                output::history_plain(&items)
            };
            if !rendered.is_empty() {
                println!("{rendered}");
            }
            0
        }
        _ => 0,
    }
}

pub async fn import(shell: &str, path: &str, if_not_exists: bool) -> i32 {
    let client = match DaemonClient::for_action() {
        Ok(client) => client,
        Err(e) => {
            eprintln!("clai: {e}");
            return 1;
        }
    };

    let request = Request::ImportHistory {
        shell: shell.to_string(),
        path: path.to_string(),
        if_not_exists,
    };

    match client.request(&request).await {
        Ok(Response::Imported { imported, skipped }) => {
            if skipped {
                println!("skipped: store already has history");
            } else {
                println!("imported {imported} commands");
            }
            0
        }
        Ok(_) => {
            eprintln!("clai: unexpected response");
            1
        }
        Err(e) => {
            eprintln!("clai: {e}");
            1
        }
    }
}
