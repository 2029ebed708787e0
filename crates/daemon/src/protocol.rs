// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! IPC Protocol for daemon communication.
//!
//! Wire format: 4-byte length prefix (big-endian) + JSON payload

use std::collections::HashMap;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

use clai_core::Suggestion;
use clai_storage::HistoryItem;

/// Malformed request (missing session id, empty text, unknown action).
pub const E_INVALID_REQUEST: &str = "E_INVALID_REQUEST";

/// Feedback cannot be resolved (no suggestion batch for the session).
pub const E_NO_FEEDBACK_STORE: &str = "E_NO_FEEDBACK_STORE";

/// Request from the shim to the daemon
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Request {
    /// Health check ping
    Ping,

    /// Version handshake
    Hello { version: String },

    /// Register a shell session
    SessionStart {
        session_id: String,
        shell: String,
        os: String,
        host: String,
        user: String,
        cwd: String,
        started_at_ms: i64,
        #[serde(default)]
        no_record: bool,
        #[serde(default)]
        ephemeral: bool,
    },

    /// End a shell session
    SessionEnd { session_id: String, ended_at_ms: i64 },

    /// Sync the session's alias snapshot
    AliasSync {
        session_id: String,
        shell: String,
        aliases: HashMap<String, String>,
    },

    /// A command began executing
    CommandStarted {
        command_id: String,
        session_id: String,
        command: String,
        cwd: String,
        #[serde(default)]
        repo_name: String,
        #[serde(default)]
        repo_root: String,
        #[serde(default)]
        branch: String,
        ts_ms: i64,
        /// Previous command id as seen by the hook; informational, the
        /// daemon chains on its own session state.
        #[serde(default)]
        prev_command_id: String,
    },

    /// A command finished
    CommandEnded {
        command_id: String,
        session_id: String,
        exit_code: i32,
        ts_ms: i64,
        duration_ms: i64,
    },

    /// Rank next-command suggestions
    Suggest {
        session_id: String,
        cwd: String,
        /// Typed prefix (ghost text buffer), may be empty
        #[serde(default)]
        buffer: String,
        #[serde(default)]
        max_results: usize,
    },

    /// Natural language -> command via an AI provider
    TextToCommand {
        session_id: String,
        prompt: String,
        cwd: String,
        #[serde(default)]
        provider: String,
    },

    /// AI next-step suggestion from the last command
    NextStep {
        session_id: String,
        cwd: String,
        #[serde(default)]
        provider: String,
    },

    /// AI diagnosis of the last failing command
    Diagnose {
        session_id: String,
        cwd: String,
        #[serde(default)]
        detail: String,
        #[serde(default)]
        provider: String,
    },

    /// Feedback on a shown suggestion
    RecordFeedback {
        session_id: String,
        suggested: String,
        /// accepted | edited | dismissed | never | unblock
        action: String,
        #[serde(default)]
        executed: String,
        #[serde(default)]
        prefix: String,
        #[serde(default)]
        latency_ms: i64,
    },

    /// Search command history
    FetchHistory {
        session_id: String,
        query: String,
        /// prefix | fts | describe | auto | substring
        #[serde(default)]
        mode: String,
        /// session | repo | global
        #[serde(default)]
        scope: String,
        /// Forces global scope regardless of `scope`.
        #[serde(default)]
        global: bool,
        #[serde(default)]
        repo_key: String,
        #[serde(default)]
        limit: usize,
        #[serde(default)]
        offset: usize,
    },

    /// Import a shell history file into the store
    ImportHistory {
        /// auto | bash | zsh | fish
        #[serde(default)]
        shell: String,
        path: String,
        #[serde(default)]
        if_not_exists: bool,
    },

    /// Flush the ingest queue (tests, shutdown paths)
    Flush,

    /// Recent task-discovery failures (debug surface)
    DiscoveryErrors,

    /// Daemon status
    Status,

    /// Request daemon shutdown
    Shutdown,
}

/// One suggestion over the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SuggestionWire {
    pub text: String,
    #[serde(default)]
    pub description: String,
    pub source: String,
    pub score: f64,
    pub risk: bool,
    pub cmd_norm: String,
    pub confidence: f64,
    pub reasons: Vec<String>,
}

impl From<&Suggestion> for SuggestionWire {
    fn from(s: &Suggestion) -> Self {
        Self {
            text: s.text.clone(),
            description: s.description.clone(),
            source: s.source.clone(),
            score: s.score,
            risk: s.risk,
            cmd_norm: s.cmd_norm.clone(),
            confidence: s.confidence,
            reasons: s.reasons.iter().map(|r| r.as_str().to_string()).collect(),
        }
    }
}

/// One history row over the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryItemWire {
    pub command: String,
    pub cmd_norm: String,
    pub ts_ms: i64,
    pub exit_code: i32,
    pub session_id: String,
    pub cwd: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub matched_tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank_score: Option<f64>,
}

impl From<HistoryItem> for HistoryItemWire {
    fn from(item: HistoryItem) -> Self {
        Self {
            command: item.raw,
            cmd_norm: item.cmd_norm,
            ts_ms: item.ts_ms,
            exit_code: item.exit_code,
            session_id: item.session_id,
            cwd: item.cwd,
            tags: item.tags,
            matched_tags: item.matched_tags,
            rank_score: item.rank_score,
        }
    }
}

/// Response from daemon to the shim
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Response {
    /// Generic success
    Ok,

    /// Health check response
    Pong,

    /// Version handshake response
    Hello { version: String },

    /// Daemon is shutting down
    ShuttingDown,

    /// Ranked suggestions
    Suggestions {
        items: Vec<SuggestionWire>,
        /// "live" from the engine; the shim layers its own cache
        cache: String,
        latency_ms: i64,
    },

    /// AI provider result
    AiSuggestions {
        items: Vec<SuggestionWire>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        explanation: Option<String>,
        provider: String,
    },

    /// History search page
    History {
        items: Vec<HistoryItemWire>,
        at_end: bool,
        backend: String,
        latency_ms: i64,
    },

    /// Import result
    Imported { imported: usize, skipped: bool },

    /// Recent discovery failures
    DiscoveryErrors { errors: Vec<String> },

    /// Daemon status
    Status {
        version: String,
        active_sessions: usize,
        uptime_secs: u64,
        commands_logged: u64,
    },

    /// Error response with a stable code
    Error { code: String, message: String },
}

impl Response {
    pub fn invalid(message: impl Into<String>) -> Self {
        Response::Error {
            code: E_INVALID_REQUEST.to_string(),
            message: message.into(),
        }
    }
}

/// Protocol errors
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Message too large: {size} bytes (max {max})")]
    MessageTooLarge { size: usize, max: usize },

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Timeout")]
    Timeout,
}

/// Maximum message size (16 MB; suggestion and history pages are small)
pub const MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// Default IPC timeout
pub const DEFAULT_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5);

/// Protocol version (from Cargo.toml)
pub const PROTOCOL_VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "+", env!("BUILD_GIT_HASH"));

/// Encode a message to JSON bytes (without length prefix)
///
/// Use with `write_message()` which handles the length-prefix wire format.
pub fn encode<T: Serialize>(msg: &T) -> Result<Vec<u8>, ProtocolError> {
    let json = serde_json::to_vec(msg)?;

    if json.len() > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::MessageTooLarge {
            size: json.len(),
            max: MAX_MESSAGE_SIZE,
        });
    }

    Ok(json)
}

/// Decode a message from wire format
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ProtocolError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Read a length-prefixed message from an async reader
pub async fn read_message<R: tokio::io::AsyncReadExt + Unpin>(
    reader: &mut R,
) -> Result<Vec<u8>, ProtocolError> {
    // Read length prefix
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(ProtocolError::ConnectionClosed);
        }
        Err(e) => return Err(ProtocolError::Io(e)),
    }
    let len = u32::from_be_bytes(len_buf) as usize;

    if len > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::MessageTooLarge {
            size: len,
            max: MAX_MESSAGE_SIZE,
        });
    }

    // Read payload
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).await?;
    Ok(buf)
}

/// Write a length-prefixed message to an async writer
pub async fn write_message<W: tokio::io::AsyncWriteExt + Unpin>(
    writer: &mut W,
    data: &[u8],
) -> Result<(), ProtocolError> {
    let len = data.len();
    if len > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::MessageTooLarge {
            size: len,
            max: MAX_MESSAGE_SIZE,
        });
    }

    writer.write_all(&(len as u32).to_be_bytes()).await?;
    writer.write_all(data).await?;
    writer.flush().await?;
    Ok(())
}

/// Read a request with timeout
pub async fn read_request<R: tokio::io::AsyncReadExt + Unpin>(
    reader: &mut R,
    timeout: std::time::Duration,
) -> Result<Request, ProtocolError> {
    let bytes = tokio::time::timeout(timeout, read_message(reader))
        .await
        .map_err(|_| ProtocolError::Timeout)??;
    decode(&bytes)
}

/// Write a response with timeout
pub async fn write_response<W: tokio::io::AsyncWriteExt + Unpin>(
    writer: &mut W,
    response: &Response,
    timeout: std::time::Duration,
) -> Result<(), ProtocolError> {
    let data = encode(response)?;
    tokio::time::timeout(timeout, write_message(writer, &data))
        .await
        .map_err(|_| ProtocolError::Timeout)?
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
