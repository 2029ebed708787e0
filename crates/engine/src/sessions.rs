// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory session registry.
//!
//! Tracks every live shell session: identity, the stash of the currently
//! running command, the last finished command (template, exit, raw text),
//! alias snapshot, detected project types, workflow tracker state, and the
//! last suggestion batch (so feedback can resolve feature vectors).
//!
//! All operations are thread-safe; operations on unknown sessions are
//! silently dropped (the shell hook must never see an error).

use std::collections::HashMap;

use parking_lot::Mutex;

use clai_core::{ClientInfo, CommandId, SessionId, Suggestion, TemplateId};
use clai_shell::AliasMap;

use crate::workflow::WorkflowState;

/// A command that has started but not yet ended.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PendingCommand {
    pub raw: String,
    pub cwd: String,
    pub repo_key: String,
    pub repo_name: String,
    pub branch: String,
    pub started_at_ms: i64,
}

/// Everything the daemon remembers about one live session.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub session_id: SessionId,
    pub client: ClientInfo,
    pub cwd: String,
    pub started_at_ms: i64,
    pub last_activity_ms: i64,

    /// Commands started but not yet ended, keyed by command id.
    pub pending: HashMap<CommandId, PendingCommand>,

    /// Last finished command.
    pub last_raw: String,
    pub last_cwd: String,
    pub last_repo_key: String,
    pub last_branch: String,
    /// Empty before the first finished command.
    pub last_template: TemplateId,
    pub last_exit_code: i32,
    pub last_failed: bool,

    pub aliases: AliasMap,
    pub project_types: Vec<String>,

    /// CLAI_NO_RECORD: drop events entirely.
    pub no_record: bool,
    /// CLAI_EPHEMERAL: persist but never aggregate.
    pub ephemeral: bool,

    pub workflow: WorkflowState,
    /// Last suggestion batch shown; feedback resolves against this.
    pub last_suggestions: Vec<Suggestion>,
}

impl SessionRecord {
    fn new(
        session_id: SessionId,
        client: ClientInfo,
        cwd: String,
        started_at_ms: i64,
        workflow_capacity: usize,
    ) -> Self {
        Self {
            session_id,
            client,
            cwd,
            started_at_ms,
            last_activity_ms: started_at_ms,
            pending: HashMap::new(),
            last_raw: String::new(),
            last_cwd: String::new(),
            last_repo_key: String::new(),
            last_branch: String::new(),
            last_template: TemplateId::new(""),
            last_exit_code: 0,
            last_failed: false,
            aliases: AliasMap::new(),
            project_types: Vec::new(),
            no_record: false,
            ephemeral: false,
            workflow: WorkflowState::new(workflow_capacity),
            last_suggestions: Vec::new(),
        }
    }
}

/// Bound on partially matched workflows per session.
const DEFAULT_WORKFLOW_CAPACITY: usize = 8;

/// Thread-safe registry of live sessions.
pub struct SessionManager {
    sessions: Mutex<HashMap<SessionId, SessionRecord>>,
    workflow_capacity: usize,
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::with_workflow_capacity(DEFAULT_WORKFLOW_CAPACITY)
    }
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_workflow_capacity(capacity: usize) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            workflow_capacity: capacity.max(1),
        }
    }

    /// Register a session. Re-registering an id refreshes the client info
    /// but keeps accumulated state.
    pub fn start(&self, session_id: SessionId, client: ClientInfo, cwd: String, now_ms: i64) {
        let mut sessions = self.sessions.lock();
        sessions
            .entry(session_id.clone())
            .and_modify(|record| {
                record.client = client.clone();
                record.cwd = cwd.clone();
                record.last_activity_ms = now_ms;
            })
            .or_insert_with(|| {
                SessionRecord::new(session_id, client, cwd, now_ms, self.workflow_capacity)
            });
    }

    /// Remove a session, returning whether it existed.
    pub fn end(&self, session_id: &SessionId) -> bool {
        self.sessions.lock().remove(session_id).is_some()
    }

    /// Refresh last-activity.
    pub fn touch(&self, session_id: &SessionId, now_ms: i64) {
        if let Some(record) = self.sessions.lock().get_mut(session_id) {
            record.last_activity_ms = now_ms;
        }
    }

    pub fn update_cwd(&self, session_id: &SessionId, cwd: String) {
        if let Some(record) = self.sessions.lock().get_mut(session_id) {
            record.cwd = cwd;
        }
    }

    /// Stash a started command. Unknown sessions are silently dropped.
    pub fn stash_command(
        &self,
        session_id: &SessionId,
        command_id: CommandId,
        pending: PendingCommand,
    ) {
        if let Some(record) = self.sessions.lock().get_mut(session_id) {
            record.last_activity_ms = pending.started_at_ms;
            record.cwd = pending.cwd.clone();
            record.pending.insert(command_id, pending);
        }
    }

    /// Take the stash for a finished command.
    pub fn take_pending(
        &self,
        session_id: &SessionId,
        command_id: &CommandId,
    ) -> Option<PendingCommand> {
        self.sessions
            .lock()
            .get_mut(session_id)?
            .pending
            .remove(command_id)
    }

    pub fn set_aliases(&self, session_id: &SessionId, aliases: AliasMap) {
        if let Some(record) = self.sessions.lock().get_mut(session_id) {
            record.aliases = aliases;
        }
    }

    pub fn set_project_types(&self, session_id: &SessionId, project_types: Vec<String>) {
        if let Some(record) = self.sessions.lock().get_mut(session_id) {
            record.project_types = project_types;
        }
    }

    pub fn set_privacy(&self, session_id: &SessionId, no_record: bool, ephemeral: bool) {
        if let Some(record) = self.sessions.lock().get_mut(session_id) {
            record.no_record = no_record;
            record.ephemeral = ephemeral;
        }
    }

    /// Record the last finished command. Called by the batch writer after
    /// its transaction commits, so the ingest pipeline reads the previous
    /// template, and by the ingest path for dropped (no-record) events.
    pub fn set_last_command(
        &self,
        session_id: &SessionId,
        raw: String,
        cwd: String,
        repo_key: String,
        branch: String,
        template: TemplateId,
        exit_code: i32,
    ) {
        if let Some(record) = self.sessions.lock().get_mut(session_id) {
            record.last_raw = raw;
            record.last_cwd = cwd;
            record.last_repo_key = repo_key;
            record.last_branch = branch;
            record.last_template = template;
            record.last_exit_code = exit_code;
            record.last_failed = exit_code != 0;
        }
    }

    /// Advance the session's workflow tracker with an observed template.
    pub fn observe_workflow(
        &self,
        session_id: &SessionId,
        patterns: &[clai_storage::WorkflowRow],
        observed: &TemplateId,
    ) {
        if let Some(record) = self.sessions.lock().get_mut(session_id) {
            record.workflow.observe(patterns, observed);
        }
    }

    /// Remember the suggestion batch just shown to a session.
    pub fn set_last_suggestions(&self, session_id: &SessionId, suggestions: Vec<Suggestion>) {
        if let Some(record) = self.sessions.lock().get_mut(session_id) {
            record.last_suggestions = suggestions;
        }
    }

    /// Snapshot of one session.
    pub fn get(&self, session_id: &SessionId) -> Option<SessionRecord> {
        self.sessions.lock().get(session_id).cloned()
    }

    /// Snapshot of all sessions.
    pub fn get_all(&self) -> Vec<SessionRecord> {
        self.sessions.lock().values().cloned().collect()
    }

    /// Session ids, sorted for deterministic listings.
    pub fn list(&self) -> Vec<SessionId> {
        let mut ids: Vec<SessionId> = self.sessions.lock().keys().cloned().collect();
        ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        ids
    }

    pub fn active_count(&self) -> usize {
        self.sessions.lock().len()
    }

    /// Drop sessions idle longer than `idle_ms`. Returns how many were
    /// removed.
    pub fn prune_idle(&self, now_ms: i64, idle_ms: i64) -> usize {
        let mut sessions = self.sessions.lock();
        let before = sessions.len();
        sessions.retain(|_, record| now_ms - record.last_activity_ms <= idle_ms);
        before - sessions.len()
    }
}

#[cfg(test)]
#[path = "sessions_tests.rs"]
mod tests;
