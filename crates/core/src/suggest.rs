// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Suggestion request context and result types shared by the scorer, the
//! daemon protocol, and the learner.

use serde::{Deserialize, Serialize};

use crate::id::{SessionId, TemplateId};
use crate::rank::FEATURE_COUNT;

/// Why a candidate scored; the set is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reason {
    DirTrans,
    RepoTrans,
    GlobalTrans,
    DirFreq,
    RepoFreq,
    GlobalFreq,
    ProjectTask,
    Dangerous,
    WorkflowBoost,
    PipelineConf,
    DismissalPenalty,
    RecoveryBoost,
}

impl Reason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Reason::DirTrans => "dir_trans",
            Reason::RepoTrans => "repo_trans",
            Reason::GlobalTrans => "global_trans",
            Reason::DirFreq => "dir_freq",
            Reason::RepoFreq => "repo_freq",
            Reason::GlobalFreq => "global_freq",
            Reason::ProjectTask => "project_task",
            Reason::Dangerous => "dangerous",
            Reason::WorkflowBoost => "workflow_boost",
            Reason::PipelineConf => "pipeline_conf",
            Reason::DismissalPenalty => "dismissal_penalty",
            Reason::RecoveryBoost => "recovery_boost",
        }
    }
}

/// Everything the scorer needs to rank candidates for one keystroke.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SuggestContext {
    pub session_id: SessionId,
    /// Repo scope key, empty outside a repository.
    pub repo_key: String,
    /// Last raw command in this session, for last-command suppression.
    pub last_raw: String,
    /// Last template id; empty before the first command.
    pub last_template: TemplateId,
    /// What the user has typed so far (ghost-text prefix), may be empty.
    pub prefix: String,
    pub cwd: String,
    pub dir_scope: String,
    pub project_types: Vec<String>,
    pub last_exit_code: i32,
    pub last_failed: bool,
    pub now_ms: i64,
    /// Requested result count; clamped to the configured maximum.
    pub max_results: usize,
}

impl SuggestContext {
    /// Blank context with defaults for a session-less query.
    pub fn new(session_id: SessionId, now_ms: i64) -> Self {
        Self {
            session_id,
            now_ms,
            ..Default::default()
        }
    }
}

/// One ranked suggestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    /// The command to offer, exactly as it should be inserted.
    pub text: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Producing engine: "engine" for ranked suggestions, "ai" for provider
    /// results.
    pub source: String,
    pub score: f64,
    /// True when the command is on the dangerous list.
    pub risk: bool,
    pub cmd_norm: String,
    pub template_id: TemplateId,
    /// In `[0, 1]`.
    pub confidence: f64,
    pub reasons: Vec<Reason>,
    /// Decayed frequency at scoring time, used as the second sort key and
    /// surfaced for debugging.
    #[serde(default)]
    pub frequency: f64,
    #[serde(default)]
    pub last_seen_ms: i64,
    /// Per-feature contribution vector retained for the learner.
    #[serde(default = "zero_features")]
    pub features: [f64; FEATURE_COUNT],
}

fn zero_features() -> [f64; FEATURE_COUNT] {
    [0.0; FEATURE_COUNT]
}

impl Suggestion {
    /// Push a reason tag, keeping the list deduplicated.
    pub fn add_reason(&mut self, reason: Reason) {
        if !self.reasons.contains(&reason) {
            self.reasons.push(reason);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reasons_dedupe() {
        let mut s = Suggestion {
            text: "git push".into(),
            description: String::new(),
            source: "engine".into(),
            score: 1.0,
            risk: false,
            cmd_norm: "git push".into(),
            template_id: TemplateId::new("t"),
            confidence: 0.5,
            reasons: vec![],
            frequency: 0.0,
            last_seen_ms: 0,
            features: [0.0; FEATURE_COUNT],
        };
        s.add_reason(Reason::RepoTrans);
        s.add_reason(Reason::RepoTrans);
        s.add_reason(Reason::GlobalFreq);
        assert_eq!(s.reasons, vec![Reason::RepoTrans, Reason::GlobalFreq]);
    }

    #[test]
    fn reason_wire_names() {
        assert_eq!(Reason::DirTrans.as_str(), "dir_trans");
        assert_eq!(Reason::DismissalPenalty.as_str(), "dismissal_penalty");
        assert_eq!(
            serde_json::to_string(&Reason::PipelineConf).unwrap(),
            "\"pipeline_conf\""
        );
    }
}
