// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::HashMap;
use std::sync::Arc;

use clai_adapters::FakeProvider;

use super::test_ctx::{make_ctx, make_ctx_with_providers};
use super::{handle_request, ListenCtx};
use crate::protocol::{Request, Response, E_INVALID_REQUEST, E_NO_FEEDBACK_STORE};

const SESSION: &str = "0123456789abcdef";

fn session_start() -> Request {
    Request::SessionStart {
        session_id: SESSION.to_string(),
        shell: "zsh".to_string(),
        os: "linux".to_string(),
        host: "host".to_string(),
        user: "user".to_string(),
        cwd: "/repo".to_string(),
        started_at_ms: 1_000,
        no_record: false,
        ephemeral: false,
    }
}

fn command_started(id: &str, command: &str, ts_ms: i64) -> Request {
    Request::CommandStarted {
        command_id: id.to_string(),
        session_id: SESSION.to_string(),
        command: command.to_string(),
        cwd: "/repo".to_string(),
        repo_name: "repo".to_string(),
        repo_root: "/repo".to_string(),
        branch: "main".to_string(),
        ts_ms,
        prev_command_id: String::new(),
    }
}

fn command_ended(id: &str, exit_code: i32, ts_ms: i64) -> Request {
    Request::CommandEnded {
        command_id: id.to_string(),
        session_id: SESSION.to_string(),
        exit_code,
        ts_ms,
        duration_ms: 5,
    }
}

async fn run_command(ctx: &Arc<ListenCtx>, id: &str, command: &str, exit: i32, ts_ms: i64) {
    assert_eq!(
        handle_request(command_started(id, command, ts_ms), ctx).await,
        Response::Ok
    );
    assert_eq!(
        handle_request(command_ended(id, exit, ts_ms + 10), ctx).await,
        Response::Ok
    );
    // Commit before the next command so its previous-template chain is
    // visible (interactive commands are spaced beyond the batch age).
    assert_eq!(handle_request(Request::Flush, ctx).await, Response::Ok);
}

fn suggest(buffer: &str) -> Request {
    Request::Suggest {
        session_id: SESSION.to_string(),
        cwd: "/repo".to_string(),
        buffer: buffer.to_string(),
        max_results: 5,
    }
}

#[tokio::test]
async fn ping_and_hello() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = make_ctx(dir.path());
    assert_eq!(handle_request(Request::Ping, &ctx).await, Response::Pong);
    match handle_request(
        Request::Hello {
            version: "x".to_string(),
        },
        &ctx,
    )
    .await
    {
        Response::Hello { version } => assert!(!version.is_empty()),
        other => panic!("unexpected response: {other:?}"),
    }
}

#[tokio::test]
async fn session_lifecycle_updates_status() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = make_ctx(dir.path());

    assert_eq!(handle_request(session_start(), &ctx).await, Response::Ok);
    match handle_request(Request::Status, &ctx).await {
        Response::Status {
            active_sessions, ..
        } => assert_eq!(active_sessions, 1),
        other => panic!("unexpected response: {other:?}"),
    }

    assert_eq!(
        handle_request(
            Request::SessionEnd {
                session_id: SESSION.to_string(),
                ended_at_ms: 2_000,
            },
            &ctx
        )
        .await,
        Response::Ok
    );
    match handle_request(Request::Status, &ctx).await {
        Response::Status {
            active_sessions, ..
        } => assert_eq!(active_sessions, 0),
        other => panic!("unexpected response: {other:?}"),
    }
}

#[tokio::test]
async fn session_start_requires_id() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = make_ctx(dir.path());
    let mut request = session_start();
    if let Request::SessionStart { session_id, .. } = &mut request {
        session_id.clear();
    }
    match handle_request(request, &ctx).await {
        Response::Error { code, .. } => assert_eq!(code, E_INVALID_REQUEST),
        other => panic!("unexpected response: {other:?}"),
    }
}

#[tokio::test]
async fn commands_flow_into_aggregates() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = make_ctx(dir.path());
    handle_request(session_start(), &ctx).await;

    run_command(&ctx, "c1", "git status", 0, 1_000).await;
    run_command(&ctx, "c2", "git push", 0, 2_000).await;
    handle_request(Request::Flush, &ctx).await;

    match handle_request(Request::Status, &ctx).await {
        Response::Status {
            commands_logged, ..
        } => assert_eq!(commands_logged, 2),
        other => panic!("unexpected response: {other:?}"),
    }
}

#[tokio::test]
async fn suggest_returns_learned_transition() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = make_ctx(dir.path());
    handle_request(session_start(), &ctx).await;

    // status -> push, then status again so the transition applies.
    run_command(&ctx, "c1", "git status", 0, 1_000).await;
    run_command(&ctx, "c2", "git push", 0, 2_000).await;
    run_command(&ctx, "c3", "git status", 0, 3_000).await;
    handle_request(Request::Flush, &ctx).await;

    match handle_request(suggest(""), &ctx).await {
        Response::Suggestions { items, cache, .. } => {
            assert_eq!(cache, "live");
            assert!(!items.is_empty());
            assert_eq!(items[0].text, "git push");
            assert!(items[0].reasons.iter().any(|r| r == "repo_trans"));
            // The just-run command is suppressed.
            assert!(items.iter().all(|i| i.text != "git status"));
        }
        other => panic!("unexpected response: {other:?}"),
    }
}

#[tokio::test]
async fn suggest_with_prefix_filters() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = make_ctx(dir.path());
    handle_request(session_start(), &ctx).await;

    run_command(&ctx, "c1", "git status", 0, 1_000).await;
    run_command(&ctx, "c2", "docker ps", 0, 2_000).await;
    run_command(&ctx, "c3", "git push", 0, 3_000).await;
    handle_request(Request::Flush, &ctx).await;

    match handle_request(suggest("doc"), &ctx).await {
        Response::Suggestions { items, .. } => {
            assert!(items.iter().all(|i| i.text.starts_with("doc")));
        }
        other => panic!("unexpected response: {other:?}"),
    }
}

#[tokio::test]
async fn command_ended_without_start_is_silent() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = make_ctx(dir.path());
    handle_request(session_start(), &ctx).await;
    assert_eq!(
        handle_request(command_ended("ghost", 0, 1_000), &ctx).await,
        Response::Ok
    );
}

#[tokio::test]
async fn no_record_session_drops_events() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = make_ctx(dir.path());
    let mut request = session_start();
    if let Request::SessionStart { no_record, .. } = &mut request {
        *no_record = true;
    }
    handle_request(request, &ctx).await;

    run_command(&ctx, "c1", "secret command", 0, 1_000).await;
    handle_request(Request::Flush, &ctx).await;

    match handle_request(Request::Status, &ctx).await {
        Response::Status {
            commands_logged, ..
        } => assert_eq!(commands_logged, 0),
        other => panic!("unexpected response: {other:?}"),
    }
}

#[tokio::test]
async fn feedback_unknown_action_is_invalid() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = make_ctx(dir.path());
    handle_request(session_start(), &ctx).await;
    let response = handle_request(
        Request::RecordFeedback {
            session_id: SESSION.to_string(),
            suggested: "git push".to_string(),
            action: "meh".to_string(),
            executed: String::new(),
            prefix: String::new(),
            latency_ms: 0,
        },
        &ctx,
    )
    .await;
    match response {
        Response::Error { code, .. } => assert_eq!(code, E_INVALID_REQUEST),
        other => panic!("unexpected response: {other:?}"),
    }
}

#[tokio::test]
async fn feedback_without_batch_reports_no_store() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = make_ctx(dir.path());
    handle_request(session_start(), &ctx).await;
    let response = handle_request(
        Request::RecordFeedback {
            session_id: SESSION.to_string(),
            suggested: "git push".to_string(),
            action: "accepted".to_string(),
            executed: String::new(),
            prefix: String::new(),
            latency_ms: 0,
        },
        &ctx,
    )
    .await;
    match response {
        Response::Error { code, .. } => assert_eq!(code, E_NO_FEEDBACK_STORE),
        other => panic!("unexpected response: {other:?}"),
    }
}

#[tokio::test]
async fn dismissal_feedback_suppresses_candidate() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = make_ctx(dir.path());
    handle_request(session_start(), &ctx).await;

    run_command(&ctx, "c1", "git status", 0, 1_000).await;
    run_command(&ctx, "c2", "git push", 0, 2_000).await;
    run_command(&ctx, "c3", "git status", 0, 3_000).await;
    handle_request(Request::Flush, &ctx).await;

    let baseline = match handle_request(suggest(""), &ctx).await {
        Response::Suggestions { items, .. } => items,
        other => panic!("unexpected response: {other:?}"),
    };
    let base_score = baseline.iter().find(|i| i.text == "git push").unwrap().score;

    // Three dismissals reach LEARNED (threshold 3).
    for _ in 0..3 {
        let response = handle_request(
            Request::RecordFeedback {
                session_id: SESSION.to_string(),
                suggested: "git push".to_string(),
                action: "dismissed".to_string(),
                executed: String::new(),
                prefix: String::new(),
                latency_ms: 0,
            },
            &ctx,
        )
        .await;
        assert_eq!(response, Response::Ok);
    }

    match handle_request(suggest(""), &ctx).await {
        Response::Suggestions { items, .. } => {
            let push = items.iter().find(|i| i.text == "git push").unwrap();
            // Ratio comparison: both queries decay against the wall clock,
            // so the absolute scores drift together.
            assert!((push.score / base_score - 0.3).abs() < 1e-3);
            assert!(push.reasons.iter().any(|r| r == "dismissal_penalty"));
        }
        other => panic!("unexpected response: {other:?}"),
    }
}

#[tokio::test]
async fn never_feedback_zeroes_candidate() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = make_ctx(dir.path());
    handle_request(session_start(), &ctx).await;

    run_command(&ctx, "c1", "git status", 0, 1_000).await;
    run_command(&ctx, "c2", "git push", 0, 2_000).await;
    run_command(&ctx, "c3", "git status", 0, 3_000).await;
    handle_request(Request::Flush, &ctx).await;
    handle_request(suggest(""), &ctx).await;

    handle_request(
        Request::RecordFeedback {
            session_id: SESSION.to_string(),
            suggested: "git push".to_string(),
            action: "never".to_string(),
            executed: String::new(),
            prefix: String::new(),
            latency_ms: 0,
        },
        &ctx,
    )
    .await;

    match handle_request(suggest(""), &ctx).await {
        Response::Suggestions { items, .. } => {
            if let Some(push) = items.iter().find(|i| i.text == "git push") {
                assert!(push.score.abs() < 1e-9);
            }
        }
        other => panic!("unexpected response: {other:?}"),
    }
}

#[tokio::test]
async fn history_substring_search() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = make_ctx(dir.path());
    handle_request(session_start(), &ctx).await;
    run_command(&ctx, "c1", "git status", 0, 1_000).await;
    run_command(&ctx, "c2", "cargo build", 0, 2_000).await;
    handle_request(Request::Flush, &ctx).await;

    let response = handle_request(
        Request::FetchHistory {
            session_id: SESSION.to_string(),
            query: "cargo".to_string(),
            mode: String::new(),
            scope: "global".to_string(),
            global: false,
            repo_key: String::new(),
            limit: 10,
            offset: 0,
        },
        &ctx,
    )
    .await;
    match response {
        Response::History {
            items,
            at_end,
            backend,
            ..
        } => {
            assert_eq!(items.len(), 1);
            assert_eq!(items[0].command, "cargo build");
            assert!(at_end);
            assert_eq!(backend, "substring");
        }
        other => panic!("unexpected response: {other:?}"),
    }
}

#[tokio::test]
async fn import_history_backfills() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = make_ctx(dir.path());

    let history = dir.path().join("zsh_history");
    std::fs::write(&history, ": 1700000000:0;git status\n: 1700000001:0;git push\n").unwrap();

    let response = handle_request(
        Request::ImportHistory {
            shell: "auto".to_string(),
            path: history.display().to_string(),
            if_not_exists: false,
        },
        &ctx,
    )
    .await;
    match response {
        Response::Imported { imported, skipped } => {
            assert_eq!(imported, 2);
            assert!(!skipped);
        }
        other => panic!("unexpected response: {other:?}"),
    }

    match handle_request(Request::Status, &ctx).await {
        Response::Status {
            commands_logged, ..
        } => assert_eq!(commands_logged, 2),
        other => panic!("unexpected response: {other:?}"),
    }
}

#[tokio::test]
async fn import_if_not_exists_skips_populated_store() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = make_ctx(dir.path());
    handle_request(session_start(), &ctx).await;
    run_command(&ctx, "c1", "ls", 0, 1_000).await;
    handle_request(Request::Flush, &ctx).await;

    let history = dir.path().join("bash_history");
    std::fs::write(&history, "git status\n").unwrap();

    let response = handle_request(
        Request::ImportHistory {
            shell: "bash".to_string(),
            path: history.display().to_string(),
            if_not_exists: true,
        },
        &ctx,
    )
    .await;
    assert_eq!(
        response,
        Response::Imported {
            imported: 0,
            skipped: true
        }
    );
}

#[tokio::test]
async fn ai_uses_registry_provider() {
    let dir = tempfile::tempdir().unwrap();
    let provider = Arc::new(FakeProvider::new("fake", true).with_command("tar czf logs.tgz logs/"));
    let ctx = make_ctx_with_providers(dir.path(), vec![provider]);
    handle_request(session_start(), &ctx).await;

    let response = handle_request(
        Request::TextToCommand {
            session_id: SESSION.to_string(),
            prompt: "compress the logs".to_string(),
            cwd: "/repo".to_string(),
            provider: "auto".to_string(),
        },
        &ctx,
    )
    .await;
    match response {
        Response::AiSuggestions {
            items, provider, ..
        } => {
            assert_eq!(provider, "fake");
            assert_eq!(items.len(), 1);
            assert_eq!(items[0].text, "tar czf logs.tgz logs/");
            assert_eq!(items[0].source, "ai");
        }
        other => panic!("unexpected response: {other:?}"),
    }
}

#[tokio::test]
async fn ai_without_provider_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = make_ctx(dir.path());
    handle_request(session_start(), &ctx).await;

    let response = handle_request(
        Request::TextToCommand {
            session_id: SESSION.to_string(),
            prompt: "anything".to_string(),
            cwd: "/".to_string(),
            provider: "auto".to_string(),
        },
        &ctx,
    )
    .await;
    match response {
        Response::AiSuggestions { items, .. } => assert!(items.is_empty()),
        other => panic!("unexpected response: {other:?}"),
    }
}

#[tokio::test]
async fn discovery_errors_endpoint() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = make_ctx(dir.path());
    ctx.discovery.errors().record("boom".to_string());
    match handle_request(Request::DiscoveryErrors, &ctx).await {
        Response::DiscoveryErrors { errors } => assert_eq!(errors, vec!["boom".to_string()]),
        other => panic!("unexpected response: {other:?}"),
    }
}

#[tokio::test]
async fn shutdown_notifies_main_loop() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = make_ctx(dir.path());
    let signal = ctx.shutdown_signal();
    let waiter = tokio::spawn(async move { signal.notified().await });

    assert_eq!(
        handle_request(Request::Shutdown, &ctx).await,
        Response::ShuttingDown
    );
    waiter.await.unwrap();
}

#[tokio::test]
async fn requests_refresh_activity() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = make_ctx(dir.path());
    let before = ctx.last_activity_ms();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    handle_request(Request::Ping, &ctx).await;
    assert!(ctx.last_activity_ms() >= before);
}

#[tokio::test]
async fn alias_sync_affects_normalization() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = make_ctx(dir.path());
    handle_request(session_start(), &ctx).await;

    let mut aliases = HashMap::new();
    aliases.insert("gs".to_string(), "git status".to_string());
    handle_request(
        Request::AliasSync {
            session_id: SESSION.to_string(),
            shell: "zsh".to_string(),
            aliases,
        },
        &ctx,
    )
    .await;

    run_command(&ctx, "c1", "gs", 0, 1_000).await;
    handle_request(Request::Flush, &ctx).await;

    let response = handle_request(
        Request::FetchHistory {
            session_id: SESSION.to_string(),
            query: "git status".to_string(),
            mode: String::new(),
            scope: "global".to_string(),
            global: false,
            repo_key: String::new(),
            limit: 10,
            offset: 0,
        },
        &ctx,
    )
    .await;
    match response {
        Response::History { items, .. } => {
            assert_eq!(items.len(), 1);
            // Raw keeps the alias; the normalized form is expanded.
            assert_eq!(items[0].command, "gs");
            assert_eq!(items[0].cmd_norm, "git status");
        }
        other => panic!("unexpected response: {other:?}"),
    }
}
