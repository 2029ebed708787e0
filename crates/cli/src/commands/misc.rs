// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Status, ping, feedback, toggles, and daemon control.

use clai_daemon::{Request, Response};

use crate::cache;
use crate::client::DaemonClient;
use crate::daemon_process;

pub async fn feedback(
    session: &str,
    suggested: &str,
    action: &str,
    executed: &str,
    prefix: &str,
) -> i32 {
    if session.is_empty() {
        eprintln!("clai: no session (set CLAI_SESSION_ID)");
        return 1;
    }
    let client = match DaemonClient::for_query() {
        Ok(client) => client,
        // No daemon means the suggestion came from nowhere; nothing to do.
        Err(_) => return 0,
    };

    let request = Request::RecordFeedback {
        session_id: session.to_string(),
        suggested: suggested.to_string(),
        action: action.to_string(),
        executed: executed.to_string(),
        prefix: prefix.to_string(),
        latency_ms: 0,
    };
    match client.request(&request).await {
        Ok(_) => 0,
        Err(e) => {
            eprintln!("clai: {e}");
            1
        }
    }
}

pub async fn status() -> i32 {
    let client = match DaemonClient::for_query() {
        Ok(client) => client,
        Err(_) => {
            println!("daemon: not running");
            return 0;
        }
    };
    match client.request(&Request::Status).await {
        Ok(Response::Status {
            version,
            active_sessions,
            uptime_secs,
            commands_logged,
        }) => {
            println!("daemon: running");
            println!("  version: {version}");
            println!("  uptime: {}", clai_core::format_elapsed(uptime_secs));
            println!("  active sessions: {active_sessions}");
            println!("  commands logged: {commands_logged}");
            0
        }
        _ => {
            println!("daemon: unreachable");
            1
        }
    }
}

pub async fn ping() -> i32 {
    let Ok(client) = DaemonClient::for_query() else {
        eprintln!("clai: daemon not running");
        return 1;
    };
    match client.request(&Request::Ping).await {
        Ok(Response::Pong) => {
            println!("pong");
            0
        }
        _ => {
            eprintln!("clai: daemon unreachable");
            1
        }
    }
}

pub fn set_off(off: bool) -> i32 {
    match cache::set_off(off) {
        Ok(()) => {
            println!("suggestions {}", if off { "off" } else { "on" });
            0
        }
        Err(e) => {
            eprintln!("clai: {e}");
            1
        }
    }
}

pub async fn daemon_stop() -> i32 {
    let Ok(client) = DaemonClient::for_query() else {
        println!("daemon: not running");
        return 0;
    };
    match client.request(&Request::Shutdown).await {
        Ok(Response::ShuttingDown) => {
            if let Some(pid) = daemon_process::read_daemon_pid() {
                daemon_process::wait_for_exit(pid, crate::env::timeout_connect());
            }
            println!("daemon: stopped");
            0
        }
        _ => {
            eprintln!("clai: daemon did not acknowledge shutdown");
            1
        }
    }
}

pub fn daemon_status() -> i32 {
    match daemon_process::read_daemon_pid() {
        Some(pid) if daemon_process::process_exists(pid) => {
            println!("daemon: running (pid {pid})");
            0
        }
        _ => {
            println!("daemon: not running");
            0
        }
    }
}
