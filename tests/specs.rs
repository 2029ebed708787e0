// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace-level end-to-end scenarios: a daemon assembled in-process,
//! driven over its real Unix socket.

use std::path::Path;
use std::time::Duration;

use clai_daemon::lifecycle::{startup, Config, LifecycleError};
use clai_daemon::listener::Listener;
use clai_daemon::protocol::{self, Request, Response};
use clai_shell::{prenormalize, AliasMap, NormalizeOptions};
use tokio::net::UnixStream;

const SESSION: &str = "0123456789abcdef";
const TAU_MS: f64 = 7.0 * 24.0 * 60.0 * 60.0 * 1000.0;

fn test_config(dir: &Path) -> Config {
    let run_dir = dir.join("run");
    let data_dir = dir.join("data");
    let engine = clai_core::Config::default();
    Config {
        socket_path: run_dir.join("clai.sock"),
        lock_path: run_dir.join("clai.pid"),
        version_path: run_dir.join("clai.version"),
        log_path: data_dir.join("claid.log"),
        db_path: data_dir.join("state.db"),
        run_dir,
        idle_timeout: Duration::from_millis(engine.idle_timeout_ms as u64),
        engine,
    }
}

struct TestDaemon {
    config: Config,
    daemon: Option<clai_daemon::lifecycle::DaemonState>,
}

impl TestDaemon {
    async fn launch(dir: &Path) -> Self {
        let config = test_config(dir);
        let result = startup(&config).await.expect("daemon startup");
        tokio::spawn(Listener::new(result.listener, std::sync::Arc::clone(&result.daemon.ctx)).run());
        Self {
            config,
            daemon: Some(result.daemon),
        }
    }

    async fn send(&self, request: Request) -> Response {
        let mut stream = UnixStream::connect(&self.config.socket_path)
            .await
            .expect("connect");
        let data = protocol::encode(&request).expect("encode");
        protocol::write_message(&mut stream, &data).await.expect("write");
        let bytes = protocol::read_message(&mut stream).await.expect("read");
        protocol::decode(&bytes).expect("decode")
    }

    async fn shutdown(mut self) {
        if let Some(daemon) = self.daemon.take() {
            daemon.shutdown().await;
        }
    }
}

fn session_start() -> Request {
    Request::SessionStart {
        session_id: SESSION.to_string(),
        shell: "zsh".to_string(),
        os: "linux".to_string(),
        host: "host".to_string(),
        user: "user".to_string(),
        cwd: "/r".to_string(),
        started_at_ms: 1_000,
        no_record: false,
        ephemeral: false,
    }
}

async fn run_command(daemon: &TestDaemon, id: &str, command: &str, exit: i32, ts_ms: i64) {
    let started = Request::CommandStarted {
        command_id: id.to_string(),
        session_id: SESSION.to_string(),
        command: command.to_string(),
        cwd: "/r".to_string(),
        repo_name: "r".to_string(),
        repo_root: "/r".to_string(),
        branch: "main".to_string(),
        ts_ms,
        prev_command_id: String::new(),
    };
    assert_eq!(daemon.send(started).await, Response::Ok);
    let ended = Request::CommandEnded {
        command_id: id.to_string(),
        session_id: SESSION.to_string(),
        exit_code: exit,
        ts_ms: ts_ms + 10,
        duration_ms: 10,
    };
    assert_eq!(daemon.send(ended).await, Response::Ok);
    // Commit before the next command so its previous-template chain is
    // visible (interactive commands are spaced beyond the batch age).
    assert_eq!(daemon.send(Request::Flush).await, Response::Ok);
}

// Two `git status` runs produce the decayed frequency score and a
// self-transition with count 1.
#[tokio::test]
async fn repeated_command_builds_decayed_stats() {
    let dir = tempfile::tempdir().unwrap();
    let daemon = TestDaemon::launch(dir.path()).await;

    daemon.send(session_start()).await;
    run_command(&daemon, "c1", "git status", 0, 1_000).await;
    run_command(&daemon, "c2", "git status", 0, 61_000).await;
    daemon.send(Request::Flush).await;

    let db = daemon.config.db_path.clone();
    daemon.shutdown().await;

    // Inspect the aggregates directly through a read-only store.
    let store = clai_storage::Store::open_read_only(&db).unwrap();
    let template = clai_shell::template_id_of("git status");
    let rows = store.top_frequencies("global", 10, 61_010).unwrap();
    assert_eq!(rows.len(), 1);
    let dt = (61_010 - 1_010) as f64;
    let expected = (-dt / TAU_MS).exp() + 1.0;
    assert!((rows[0].score - expected).abs() < 1e-9);

    let transitions = store.top_transitions("global", &template, 10, 61_010).unwrap();
    assert_eq!(transitions.len(), 1);
    assert_eq!(transitions[0].count, 1);
    assert_eq!(transitions[0].next_template_id, template);
}

// With a repo transition (git status -> git push), typing
// "git " after git status suggests git push with a repo_trans reason.
#[tokio::test]
async fn transition_drives_top_suggestion() {
    let dir = tempfile::tempdir().unwrap();
    let daemon = TestDaemon::launch(dir.path()).await;

    daemon.send(session_start()).await;
    let mut ts = 1_000;
    for i in 0..5 {
        run_command(&daemon, &format!("s{i}"), "git status", 0, ts).await;
        run_command(&daemon, &format!("p{i}"), "git push", 0, ts + 500).await;
        ts += 1_000;
    }
    run_command(&daemon, "last", "git status", 0, ts).await;
    daemon.send(Request::Flush).await;

    let response = daemon
        .send(Request::Suggest {
            session_id: SESSION.to_string(),
            cwd: "/r".to_string(),
            buffer: "git ".to_string(),
            max_results: 3,
        })
        .await;
    match response {
        Response::Suggestions { items, .. } => {
            assert!(!items.is_empty());
            assert_eq!(items[0].text, "git push");
            assert!(items[0].reasons.iter().any(|r| r == "repo_trans"));
        }
        other => panic!("unexpected response: {other:?}"),
    }

    daemon.shutdown().await;
}

// Three dismissals suppress to 0.3x; never zeroes the score.
#[tokio::test]
async fn dismissal_suppression_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let daemon = TestDaemon::launch(dir.path()).await;

    daemon.send(session_start()).await;
    let mut ts = 1_000;
    for i in 0..4 {
        run_command(&daemon, &format!("s{i}"), "git status", 0, ts).await;
        run_command(&daemon, &format!("p{i}"), "git push", 0, ts + 500).await;
        ts += 1_000;
    }
    run_command(&daemon, "last", "git status", 0, ts).await;
    daemon.send(Request::Flush).await;

    let suggest = Request::Suggest {
        session_id: SESSION.to_string(),
        cwd: "/r".to_string(),
        buffer: String::new(),
        max_results: 5,
    };

    let base_score = match daemon.send(suggest.clone()).await {
        Response::Suggestions { items, .. } => {
            items.iter().find(|i| i.text == "git push").unwrap().score
        }
        other => panic!("unexpected response: {other:?}"),
    };

    let feedback = |action: &str| Request::RecordFeedback {
        session_id: SESSION.to_string(),
        suggested: "git push".to_string(),
        action: action.to_string(),
        executed: String::new(),
        prefix: String::new(),
        latency_ms: 0,
    };

    for _ in 0..3 {
        assert_eq!(daemon.send(feedback("dismissed")).await, Response::Ok);
    }

    match daemon.send(suggest.clone()).await {
        Response::Suggestions { items, .. } => {
            let push = items.iter().find(|i| i.text == "git push").unwrap();
            // Ratio comparison: both queries decay against the wall clock,
            // so the absolute scores drift together.
            assert!((push.score / base_score - 0.3).abs() < 1e-3);
            assert!(push.reasons.iter().any(|r| r == "dismissal_penalty"));
        }
        other => panic!("unexpected response: {other:?}"),
    }

    assert_eq!(daemon.send(feedback("never")).await, Response::Ok);
    match daemon.send(suggest).await {
        Response::Suggestions { items, .. } => {
            if let Some(push) = items.iter().find(|i| i.text == "git push") {
                assert!(push.score.abs() < 1e-9);
            }
        }
        other => panic!("unexpected response: {other:?}"),
    }

    daemon.shutdown().await;
}

// Normalization of a piped command with a path and a UUID.
#[test]
fn pipeline_normalization_scenario() {
    let norm = prenormalize(
        "cat /etc/hosts | grep 550e8400-e29b-41d4-a716-446655440000",
        &AliasMap::new(),
        &NormalizeOptions::default(),
    );
    assert_eq!(norm.cmd_norm, "cat <PATH> | grep <UUID>");
    assert_eq!(norm.segments.len(), 2);
    for tag in ["shell", "file", "search"] {
        assert!(norm.tags.iter().any(|t| t == tag), "missing tag {tag}");
    }
}

// After a graceful shutdown the socket is gone
// and the PID lock is free for the next daemon.
#[tokio::test]
async fn shutdown_releases_socket_and_lock() {
    let dir = tempfile::tempdir().unwrap();
    let daemon = TestDaemon::launch(dir.path()).await;

    daemon.send(session_start()).await;
    match daemon.send(Request::Status).await {
        Response::Status {
            active_sessions, ..
        } => assert_eq!(active_sessions, 1),
        other => panic!("unexpected response: {other:?}"),
    }

    let socket_path = daemon.config.socket_path.clone();
    daemon.shutdown().await;
    assert!(!socket_path.exists());

    // A fresh daemon can bind immediately (lock released).
    let daemon = TestDaemon::launch(dir.path()).await;
    assert_eq!(daemon.send(Request::Ping).await, Response::Pong);
    daemon.shutdown().await;
}

// Single-instance invariant: a second daemon cannot acquire the PID lock.
#[tokio::test]
async fn second_daemon_is_locked_out() {
    let dir = tempfile::tempdir().unwrap();
    let daemon = TestDaemon::launch(dir.path()).await;

    let config = test_config(dir.path());
    match startup(&config).await {
        Err(LifecycleError::LockFailed(_)) => {}
        Ok(_) => panic!("second daemon acquired the lock"),
        Err(other) => panic!("unexpected error: {other}"),
    }

    daemon.shutdown().await;
}

// A 200-command two-session replay is deterministic.
#[test]
fn replay_is_deterministic_across_runs() {
    use clai_core::{RankWeights, SessionId, SuggestContext};
    use clai_engine::{replay, ReplaySpec, Scorer};

    let a = SessionId::new("aaaaaaaaaaaaaaaa");
    let b = SessionId::new("bbbbbbbbbbbbbbbb");
    let mut specs = Vec::new();
    for i in 0..100 {
        let session = if i % 2 == 0 { &a } else { &b };
        specs.push(ReplaySpec::simple(session, "git status"));
        specs.push(ReplaySpec::simple(session, "git push"));
    }
    assert_eq!(specs.len(), 200);

    let run = || {
        let mut store = clai_storage::Store::in_memory().unwrap();
        let cfg = clai_core::Config::default();
        replay(&mut store, &cfg, &specs, 1_000_000, 1_000).unwrap();
        let scorer = Scorer::new(cfg);
        let ctx = SuggestContext {
            session_id: a.clone(),
            last_raw: "git status".to_string(),
            last_template: clai_shell::template_id_of("git status"),
            now_ms: 1_500_000,
            max_results: 5,
            ..Default::default()
        };
        scorer
            .suggest(&store, &RankWeights::default(), &[], &ctx)
            .unwrap()
            .into_iter()
            .map(|s| (s.text, format!("{:.9}", s.score)))
            .collect::<Vec<_>>()
    };

    let first = run();
    assert!(!first.is_empty());
    assert_eq!(first[0].0, "git push");
    for _ in 0..2 {
        assert_eq!(run(), first);
    }
}

// Ephemeral sessions persist events without feeding aggregates.
#[tokio::test]
async fn ephemeral_session_skips_aggregates() {
    let dir = tempfile::tempdir().unwrap();
    let daemon = TestDaemon::launch(dir.path()).await;

    let mut start = session_start();
    if let Request::SessionStart { ephemeral, .. } = &mut start {
        *ephemeral = true;
    }
    daemon.send(start).await;
    run_command(&daemon, "c1", "echo secret", 0, 1_000).await;
    daemon.send(Request::Flush).await;

    let db = daemon.config.db_path.clone();
    daemon.shutdown().await;

    let store = clai_storage::Store::open_read_only(&db).unwrap();
    // Persisted with the flag, invisible to aggregates and the count.
    assert_eq!(store.commands_logged().unwrap(), 0);
    assert!(store.top_frequencies("global", 10, 2_000).unwrap().is_empty());

    // Still visible inside its own session's history.
    let page = store
        .search_history(&clai_storage::HistoryQuery {
            query: "secret".to_string(),
            mode: clai_core::SearchMode::Substring,
            scope: clai_storage::HistoryScope::Session(clai_core::SessionId::new(SESSION)),
            limit: 10,
            offset: 0,
        })
        .unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].raw, "echo secret");
}
