// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Row types returned by aggregate reads.

use clai_core::TemplateId;

/// A transition row, decayed to the query time.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionRow {
    pub next_template_id: TemplateId,
    pub cmd_norm: String,
    pub count: u64,
    /// Weight decayed to the query time.
    pub weight: f64,
    pub last_seen_ms: i64,
}

/// A frequency row, decayed to the query time.
#[derive(Debug, Clone, PartialEq)]
pub struct FrequencyRow {
    pub template_id: TemplateId,
    pub cmd_norm: String,
    /// Score decayed to the query time.
    pub score: f64,
    pub success_count: u64,
    pub failure_count: u64,
    pub last_seen_ms: i64,
}

/// A discovered runnable target.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskRow {
    pub kind: String,
    pub name: String,
    pub command: String,
    pub description: Option<String>,
}

/// A pipeline adjacency row for the current last template.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineNextRow {
    pub next_segment_template: TemplateId,
    pub cmd_norm: String,
    pub operator: String,
    pub count: u64,
    pub weight: f64,
    pub last_seen_ms: i64,
}

/// A recovery row for a failed template + exit code.
#[derive(Debug, Clone, PartialEq)]
pub struct RecoveryRow {
    pub recovery_template_id: TemplateId,
    pub cmd_norm: String,
    pub success_rate: f64,
    pub weight: f64,
    pub last_seen_ms: i64,
}

/// A command template row.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateRow {
    pub template_id: TemplateId,
    pub cmd_norm: String,
    pub tags: Vec<String>,
    pub slot_count: u32,
    pub first_seen_ms: i64,
    pub last_seen_ms: i64,
}
