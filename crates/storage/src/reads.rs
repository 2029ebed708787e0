// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Aggregate reads for the scorer.
//!
//! All scores are decayed to the caller's `now_ms` before ordering, so the
//! store never needs a background sweeper. Candidate queries fetch a bounded
//! superset, decay in memory, re-sort, and truncate.

use rusqlite::{params, OptionalExtension};

use clai_core::{DismissalState, TemplateId};

use crate::db::{StorageError, Store};
use crate::decay;
use crate::records::{FrequencyRow, PipelineNextRow, RecoveryRow, TemplateRow, TransitionRow};

/// Rows fetched per point lookup before decay-sort-truncate.
const FETCH_BOUND: u32 = 64;

impl Store {
    /// Top transitions out of `prev` in `scope`, ordered by decayed weight
    /// then count.
    pub fn top_transitions(
        &self,
        scope: &str,
        prev: &TemplateId,
        limit: usize,
        now_ms: i64,
    ) -> Result<Vec<TransitionRow>, StorageError> {
        let mut stmt = self.conn.prepare_cached(
            r#"
            SELECT t.next_template_id, ct.cmd_norm, t.count, t.weight, t.last_seen_ms
            FROM transition_stat t
            JOIN command_template ct ON ct.template_id = t.next_template_id
            WHERE t.scope = ?1 AND t.prev_template_id = ?2
            ORDER BY t.weight DESC
            LIMIT ?3
            "#,
        )?;
        let mut rows: Vec<TransitionRow> = stmt
            .query_map(params![scope, prev.as_str(), FETCH_BOUND], |row| {
                Ok(TransitionRow {
                    next_template_id: TemplateId::new(row.get::<_, String>(0)?),
                    cmd_norm: row.get(1)?,
                    count: row.get::<_, i64>(2)? as u64,
                    weight: row.get(3)?,
                    last_seen_ms: row.get(4)?,
                })
            })?
            .collect::<Result<_, _>>()?;

        for row in &mut rows {
            row.weight = decay::read_decayed(row.weight, row.last_seen_ms, now_ms, self.tau_ms);
        }
        rows.sort_by(|a, b| {
            b.weight
                .total_cmp(&a.weight)
                .then(b.count.cmp(&a.count))
                .then(a.cmd_norm.cmp(&b.cmd_norm))
        });
        rows.truncate(limit);
        Ok(rows)
    }

    /// Top frequency rows in `scope` by decayed score.
    pub fn top_frequencies(
        &self,
        scope: &str,
        limit: usize,
        now_ms: i64,
    ) -> Result<Vec<FrequencyRow>, StorageError> {
        let mut stmt = self.conn.prepare_cached(
            r#"
            SELECT s.template_id, ct.cmd_norm, s.score, s.success_count, s.failure_count,
                   s.last_seen_ms
            FROM command_stat s
            JOIN command_template ct ON ct.template_id = s.template_id
            WHERE s.scope = ?1
            ORDER BY s.score DESC
            LIMIT ?2
            "#,
        )?;
        let mut rows: Vec<FrequencyRow> = stmt
            .query_map(params![scope, FETCH_BOUND], |row| {
                Ok(FrequencyRow {
                    template_id: TemplateId::new(row.get::<_, String>(0)?),
                    cmd_norm: row.get(1)?,
                    score: row.get(2)?,
                    success_count: row.get::<_, i64>(3)? as u64,
                    failure_count: row.get::<_, i64>(4)? as u64,
                    last_seen_ms: row.get(5)?,
                })
            })?
            .collect::<Result<_, _>>()?;

        for row in &mut rows {
            row.score = decay::read_decayed(row.score, row.last_seen_ms, now_ms, self.tau_ms);
        }
        rows.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then(b.last_seen_ms.cmp(&a.last_seen_ms))
                .then(a.cmd_norm.cmp(&b.cmd_norm))
        });
        rows.truncate(limit);
        Ok(rows)
    }

    /// Decayed frequency for one (scope, template) pair, zero when absent.
    pub fn frequency_of(
        &self,
        scope: &str,
        template: &TemplateId,
        now_ms: i64,
    ) -> Result<f64, StorageError> {
        let row: Option<(f64, i64)> = self
            .conn
            .query_row(
                "SELECT score, last_seen_ms FROM command_stat WHERE scope = ?1 AND template_id = ?2",
                params![scope, template.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        Ok(row
            .map(|(score, seen)| decay::read_decayed(score, seen, now_ms, self.tau_ms))
            .unwrap_or(0.0))
    }

    /// Top project-type frequency rows by decayed score.
    pub fn top_project_type_frequencies(
        &self,
        project_type: &str,
        limit: usize,
        now_ms: i64,
    ) -> Result<Vec<FrequencyRow>, StorageError> {
        let mut stmt = self.conn.prepare_cached(
            r#"
            SELECT s.template_id, ct.cmd_norm, s.score, s.last_seen_ms
            FROM project_type_stat s
            JOIN command_template ct ON ct.template_id = s.template_id
            WHERE s.project_type = ?1
            ORDER BY s.score DESC
            LIMIT ?2
            "#,
        )?;
        let mut rows: Vec<FrequencyRow> = stmt
            .query_map(params![project_type, FETCH_BOUND], |row| {
                Ok(FrequencyRow {
                    template_id: TemplateId::new(row.get::<_, String>(0)?),
                    cmd_norm: row.get(1)?,
                    score: row.get(2)?,
                    success_count: 0,
                    failure_count: 0,
                    last_seen_ms: row.get(3)?,
                })
            })?
            .collect::<Result<_, _>>()?;

        for row in &mut rows {
            row.score = decay::read_decayed(row.score, row.last_seen_ms, now_ms, self.tau_ms);
        }
        rows.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.cmd_norm.cmp(&b.cmd_norm)));
        rows.truncate(limit);
        Ok(rows)
    }

    /// Top project-type transitions out of `prev`.
    pub fn top_project_type_transitions(
        &self,
        project_type: &str,
        prev: &TemplateId,
        limit: usize,
        now_ms: i64,
    ) -> Result<Vec<TransitionRow>, StorageError> {
        let mut stmt = self.conn.prepare_cached(
            r#"
            SELECT t.next_template_id, ct.cmd_norm, t.count, t.weight, t.last_seen_ms
            FROM project_type_transition t
            JOIN command_template ct ON ct.template_id = t.next_template_id
            WHERE t.project_type = ?1 AND t.prev_template_id = ?2
            ORDER BY t.weight DESC
            LIMIT ?3
            "#,
        )?;
        let mut rows: Vec<TransitionRow> = stmt
            .query_map(params![project_type, prev.as_str(), FETCH_BOUND], |row| {
                Ok(TransitionRow {
                    next_template_id: TemplateId::new(row.get::<_, String>(0)?),
                    cmd_norm: row.get(1)?,
                    count: row.get::<_, i64>(2)? as u64,
                    weight: row.get(3)?,
                    last_seen_ms: row.get(4)?,
                })
            })?
            .collect::<Result<_, _>>()?;

        for row in &mut rows {
            row.weight = decay::read_decayed(row.weight, row.last_seen_ms, now_ms, self.tau_ms);
        }
        rows.sort_by(|a, b| {
            b.weight
                .total_cmp(&a.weight)
                .then(b.count.cmp(&a.count))
                .then(a.cmd_norm.cmp(&b.cmd_norm))
        });
        rows.truncate(limit);
        Ok(rows)
    }

    /// Pipeline adjacencies whose previous segment is `prev`, decayed.
    pub fn pipeline_next(
        &self,
        scope: &str,
        prev: &TemplateId,
        now_ms: i64,
    ) -> Result<Vec<PipelineNextRow>, StorageError> {
        let mut stmt = self.conn.prepare_cached(
            r#"
            SELECT p.next_segment_template, ct.cmd_norm, p.operator, p.count, p.weight,
                   p.last_seen_ms
            FROM pipeline_transition p
            JOIN command_template ct ON ct.template_id = p.next_segment_template
            WHERE p.scope = ?1 AND p.prev_segment_template = ?2
            ORDER BY p.weight DESC
            LIMIT ?3
            "#,
        )?;
        let mut rows: Vec<PipelineNextRow> = stmt
            .query_map(params![scope, prev.as_str(), FETCH_BOUND], |row| {
                Ok(PipelineNextRow {
                    next_segment_template: TemplateId::new(row.get::<_, String>(0)?),
                    cmd_norm: row.get(1)?,
                    operator: row.get(2)?,
                    count: row.get::<_, i64>(3)? as u64,
                    weight: row.get(4)?,
                    last_seen_ms: row.get(5)?,
                })
            })?
            .collect::<Result<_, _>>()?;

        for row in &mut rows {
            row.weight = decay::read_decayed(row.weight, row.last_seen_ms, now_ms, self.tau_ms);
        }
        rows.sort_by(|a, b| b.weight.total_cmp(&a.weight).then(a.cmd_norm.cmp(&b.cmd_norm)));
        Ok(rows)
    }

    /// Recovery rows for a failed template + exit code, decayed.
    pub fn recovery_candidates(
        &self,
        scope: &str,
        failed: &TemplateId,
        exit_code: i32,
        now_ms: i64,
    ) -> Result<Vec<RecoveryRow>, StorageError> {
        let mut stmt = self.conn.prepare_cached(
            r#"
            SELECT r.recovery_template_id, ct.cmd_norm, r.success_rate, r.weight, r.last_seen_ms
            FROM recovery_pattern r
            JOIN command_template ct ON ct.template_id = r.recovery_template_id
            WHERE r.scope = ?1 AND r.failed_template_id = ?2 AND r.exit_code = ?3
            ORDER BY r.weight DESC
            LIMIT ?4
            "#,
        )?;
        let mut rows: Vec<RecoveryRow> = stmt
            .query_map(params![scope, failed.as_str(), exit_code, FETCH_BOUND], |row| {
                Ok(RecoveryRow {
                    recovery_template_id: TemplateId::new(row.get::<_, String>(0)?),
                    cmd_norm: row.get(1)?,
                    success_rate: row.get(2)?,
                    weight: row.get(3)?,
                    last_seen_ms: row.get(4)?,
                })
            })?
            .collect::<Result<_, _>>()?;

        for row in &mut rows {
            row.weight = decay::read_decayed(row.weight, row.last_seen_ms, now_ms, self.tau_ms);
        }
        rows.sort_by(|a, b| b.weight.total_cmp(&a.weight).then(a.cmd_norm.cmp(&b.cmd_norm)));
        Ok(rows)
    }

    /// Dismissal suppression state for a (context, candidate) pair.
    pub fn dismissal_state(
        &self,
        scope: &str,
        context: &TemplateId,
        candidate: &TemplateId,
    ) -> Result<DismissalState, StorageError> {
        let row: Option<(String, i64)> = self
            .conn
            .query_row(
                r#"SELECT level, count FROM dismissal_pattern
                   WHERE scope = ?1 AND context_template_id = ?2 AND dismissed_template_id = ?3"#,
                params![scope, context.as_str(), candidate.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        Ok(match row {
            Some((level, count)) => DismissalState::from_level(&level, count as u32),
            None => DismissalState::None,
        })
    }

    /// Look up a template row by id.
    pub fn template(&self, template_id: &TemplateId) -> Result<Option<TemplateRow>, StorageError> {
        let row = self
            .conn
            .query_row(
                r#"SELECT template_id, cmd_norm, tags, slot_count, first_seen_ms, last_seen_ms
                   FROM command_template WHERE template_id = ?1"#,
                [template_id.as_str()],
                |row| {
                    Ok(TemplateRow {
                        template_id: TemplateId::new(row.get::<_, String>(0)?),
                        cmd_norm: row.get(1)?,
                        tags: row
                            .get::<_, String>(2)?
                            .split_whitespace()
                            .map(str::to_string)
                            .collect(),
                        slot_count: row.get::<_, i64>(3)? as u32,
                        first_seen_ms: row.get(4)?,
                        last_seen_ms: row.get(5)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }
}

#[cfg(test)]
#[path = "reads_tests.rs"]
mod tests;
