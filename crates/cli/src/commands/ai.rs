// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! AI-assisted flows: text-to-command, next-step, diagnosis.

use clai_daemon::{Request, Response};

use crate::cache;
use crate::client::DaemonClient;

pub async fn to_command(session: &str, prompt: &str, provider: &str, cwd: &str) -> i32 {
    if prompt.is_empty() {
        eprintln!("clai: empty prompt");
        return 1;
    }
    let request = Request::TextToCommand {
        session_id: session_or_anonymous(session),
        prompt: prompt.to_string(),
        cwd: resolve_cwd(cwd),
        provider: provider.to_string(),
    };
    run_ai(request).await
}

pub async fn next_step(session: &str, provider: &str, cwd: &str) -> i32 {
    let request = Request::NextStep {
        session_id: session_or_anonymous(session),
        cwd: resolve_cwd(cwd),
        provider: provider.to_string(),
    };
    run_ai(request).await
}

pub async fn diagnose(session: &str, detail: &str, provider: &str, cwd: &str) -> i32 {
    let request = Request::Diagnose {
        session_id: session_or_anonymous(session),
        cwd: resolve_cwd(cwd),
        detail: detail.to_string(),
        provider: provider.to_string(),
    };
    run_ai(request).await
}

async fn run_ai(request: Request) -> i32 {
    let client = match DaemonClient::for_action() {
        Ok(client) => client,
        Err(e) => {
            eprintln!("clai: {e}");
            return 1;
        }
    };

    match client.request(&request).await {
        Ok(Response::AiSuggestions {
            items, explanation, ..
        }) => {
            if items.is_empty() {
                eprintln!("clai: no AI provider produced a suggestion");
                return 1;
            }
            for item in &items {
                println!("{}", item.text);
            }
            if let Some(explanation) = explanation {
                eprintln!("{explanation}");
            }
            if let Some(top) = items.first() {
                cache::write_suggestion(&top.text);
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

fn session_or_anonymous(session: &str) -> String {
    if session.is_empty() {
        "anonymous".to_string()
    } else {
        session.to_string()
    }
}

fn resolve_cwd(arg: &str) -> String {
    if !arg.is_empty() {
        return arg.to_string();
    }
    std::env::current_dir()
        .map(|p| p.display().to_string())
        .unwrap_or_default()
}
