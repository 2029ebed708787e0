// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! AI provider handlers.
//!
//! Provider absence and provider failure both surface as an empty
//! suggestion list; the only hard errors are malformed requests.

use tracing::warn;

use clai_adapters::{AiRequest, AiResponse};
use clai_core::SessionId;
use clai_shell::is_dangerous;

use super::ListenCtx;
use crate::protocol::{Response, SuggestionWire};

pub(super) async fn handle_text_to_command(
    ctx: &ListenCtx,
    session_id: &str,
    prompt: &str,
    cwd: &str,
    provider: &str,
) -> Response {
    if session_id.is_empty() {
        return Response::invalid("missing session id");
    }
    if prompt.is_empty() {
        return Response::invalid("empty prompt");
    }
    let request = build_request(ctx, session_id, prompt, "", cwd);
    call_provider(ctx, provider, request, ProviderCall::TextToCommand).await
}

pub(super) async fn handle_next_step(
    ctx: &ListenCtx,
    session_id: &str,
    cwd: &str,
    provider: &str,
) -> Response {
    if session_id.is_empty() {
        return Response::invalid("missing session id");
    }
    let last = ctx
        .sessions
        .get(&SessionId::new(session_id))
        .map(|s| s.last_raw)
        .unwrap_or_default();
    if last.is_empty() {
        return empty_response(provider);
    }
    let request = build_request(ctx, session_id, &last, "", cwd);
    call_provider(ctx, provider, request, ProviderCall::NextStep).await
}

pub(super) async fn handle_diagnose(
    ctx: &ListenCtx,
    session_id: &str,
    cwd: &str,
    detail: &str,
    provider: &str,
) -> Response {
    if session_id.is_empty() {
        return Response::invalid("missing session id");
    }
    let session = ctx.sessions.get(&SessionId::new(session_id));
    let Some(session) = session else {
        return empty_response(provider);
    };
    if session.last_raw.is_empty() {
        return empty_response(provider);
    }

    let detail = if detail.is_empty() {
        format!("exit code {}", session.last_exit_code)
    } else {
        detail.to_string()
    };
    let request = build_request(ctx, session_id, &session.last_raw, &detail, cwd);
    call_provider(ctx, provider, request, ProviderCall::Diagnose).await
}

enum ProviderCall {
    TextToCommand,
    NextStep,
    Diagnose,
}

fn build_request(
    ctx: &ListenCtx,
    session_id: &str,
    input: &str,
    detail: &str,
    cwd: &str,
) -> AiRequest {
    let session = ctx.sessions.get(&SessionId::new(session_id));
    let (shell, recent) = session
        .map(|s| {
            let mut recent = Vec::new();
            if !s.last_raw.is_empty() {
                recent.push(s.last_raw.clone());
            }
            (s.client.shell.clone(), recent)
        })
        .unwrap_or_default();

    AiRequest {
        input: input.to_string(),
        detail: detail.to_string(),
        cwd: cwd.to_string(),
        shell,
        recent,
    }
}

async fn call_provider(
    ctx: &ListenCtx,
    preferred: &str,
    request: AiRequest,
    call: ProviderCall,
) -> Response {
    let Some(provider) = ctx.providers.resolve(preferred) else {
        // No provider installed: empty is always acceptable.
        return empty_response(preferred);
    };

    let result = match call {
        ProviderCall::TextToCommand => provider.text_to_command(&request).await,
        ProviderCall::NextStep => provider.next_step(&request).await,
        ProviderCall::Diagnose => provider.diagnose(&request).await,
    };

    match result {
        Ok(response) => ai_response(provider.name(), response),
        Err(e) => {
            warn!(provider = provider.name(), error = %e, "AI provider call failed");
            empty_response(provider.name())
        }
    }
}

fn ai_response(provider: &str, response: AiResponse) -> Response {
    let items = response
        .suggestions
        .into_iter()
        .map(|s| {
            let norm = clai_shell::simple_normalize(&s.text);
            SuggestionWire {
                risk: is_dangerous(&s.text),
                cmd_norm: norm.clone(),
                text: s.text,
                description: s.description,
                source: "ai".to_string(),
                score: 0.0,
                confidence: 0.5,
                reasons: Vec::new(),
            }
        })
        .collect();

    Response::AiSuggestions {
        items,
        explanation: response.explanation,
        provider: provider.to_string(),
    }
}

fn empty_response(provider: &str) -> Response {
    Response::AiSuggestions {
        items: Vec::new(),
        explanation: None,
        provider: provider.to_string(),
    }
}
