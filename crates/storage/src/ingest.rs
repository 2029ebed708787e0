// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Transactional multi-table ingest.
//!
//! One batch = one `BEGIN IMMEDIATE` transaction. Per event: template
//! upsert, append-only event insert, decayed frequency/transition updates
//! for every scope, pipeline rows for multi-segment commands, and recovery
//! upserts when a failure was followed by a success. Ephemeral events are
//! persisted (flagged) but contribute to no aggregate.

use rusqlite::{params, OptionalExtension, Transaction, TransactionBehavior};
use sha2::{Digest, Sha256};

use clai_core::{dir_scope_key, CommandEvent, SessionId, TemplateId, SCOPE_GLOBAL};
use clai_shell::Operator;

use crate::db::{StorageError, Store};
use crate::decay;

/// One normalized pipeline segment ready for ingest.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentRecord {
    pub position: u32,
    pub segment_norm: String,
    pub template_id: TemplateId,
    pub op_following: Operator,
    /// Tags for this segment alone (whole-command tags are their union).
    pub tags: Vec<String>,
    pub slot_count: u32,
}

/// Everything the batch writer hands storage for one finished command.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestRecord {
    pub event: CommandEvent,
    pub tags: Vec<String>,
    pub slot_count: u32,
    /// Pipeline segments; a single-segment command has exactly one.
    pub segments: Vec<SegmentRecord>,
    /// Template of the command immediately preceding this one in the same
    /// session, if any.
    pub prev_template: Option<TemplateId>,
    /// Exit code of that previous command.
    pub prev_exit: Option<i32>,
    pub project_types: Vec<String>,
}

impl IngestRecord {
    /// String scopes this event contributes to (global, repo, dir).
    fn scopes(&self) -> Vec<String> {
        let mut scopes = vec![SCOPE_GLOBAL.to_string()];
        if !self.event.repo_key.is_empty() {
            scopes.push(self.event.repo_key.clone());
        }
        if !self.event.cwd.is_empty() {
            scopes.push(dir_scope_key(&self.event.cwd));
        }
        scopes
    }
}

impl Store {
    /// Register a session row; `command_event` rows are rejected for
    /// unknown sessions (FK), so this runs before any ingest for the session.
    pub fn upsert_session(
        &self,
        session_id: &SessionId,
        shell: &str,
        os: &str,
        host: &str,
        user: &str,
        cwd: &str,
        started_at_ms: i64,
    ) -> Result<(), StorageError> {
        self.conn.execute(
            r#"
            INSERT INTO session (session_id, shell, os, host, user, cwd, started_at_ms)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(session_id) DO UPDATE SET
                shell = excluded.shell,
                os = excluded.os,
                host = excluded.host,
                user = excluded.user,
                cwd = excluded.cwd
            "#,
            params![session_id.as_str(), shell, os, host, user, cwd, started_at_ms],
        )?;
        Ok(())
    }

    /// Mark a session ended.
    pub fn end_session(&self, session_id: &SessionId, ended_at_ms: i64) -> Result<(), StorageError> {
        self.conn.execute(
            "UPDATE session SET ended_at_ms = ?2 WHERE session_id = ?1",
            params![session_id.as_str(), ended_at_ms],
        )?;
        Ok(())
    }

    /// True when the session row exists.
    pub fn session_exists(&self, session_id: &SessionId) -> Result<bool, StorageError> {
        let row: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM session WHERE session_id = ?1",
                [session_id.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(row.is_some())
    }

    /// Write a batch of ingest records in one immediate transaction.
    pub fn apply_batch(&mut self, records: &[IngestRecord]) -> Result<(), StorageError> {
        if records.is_empty() {
            return Ok(());
        }
        let tau_ms = self.tau_ms;
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        for record in records {
            apply_record(&tx, record, tau_ms)?;
        }

        tx.commit()?;
        Ok(())
    }
}

fn apply_record(tx: &Transaction, record: &IngestRecord, tau_ms: i64) -> Result<(), StorageError> {
    let ev = &record.event;

    // 1. Template upserts: the whole command plus each pipeline segment, so
    // pipeline candidates resolve to suggestion text later.
    upsert_template(
        tx,
        &ev.template_id,
        &ev.cmd_norm,
        &record.tags,
        record.slot_count,
        ev.ts_ms,
    )?;
    for seg in &record.segments {
        if seg.template_id != ev.template_id {
            upsert_template(
                tx,
                &seg.template_id,
                &seg.segment_norm,
                &seg.tags,
                seg.slot_count,
                ev.ts_ms,
            )?;
        }
    }

    // 2. Append the event row.
    tx.execute(
        r#"
        INSERT INTO command_event
            (session_id, ts_ms, cwd, repo_key, branch, raw, cmd_norm, truncated,
             template_id, exit_code, duration_ms, ephemeral)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        "#,
        params![
            ev.session_id.as_str(),
            ev.ts_ms,
            ev.cwd,
            ev.repo_key,
            ev.branch,
            ev.raw,
            ev.cmd_norm,
            ev.truncated as i64,
            ev.template_id.as_str(),
            ev.exit_code,
            ev.duration_ms,
            ev.ephemeral as i64,
        ],
    )?;
    let event_rowid = tx.last_insert_rowid();

    // Ephemeral events stop here: persisted, never aggregated.
    if ev.ephemeral {
        return Ok(());
    }

    // 3. Frequency and transition updates per scope.
    for scope in record.scopes() {
        bump_command_stat(tx, &scope, ev, tau_ms)?;
        if let Some(prev) = &record.prev_template {
            bump_transition(tx, &scope, prev, &ev.template_id, ev.ts_ms, tau_ms)?;
        }
    }
    for project_type in &record.project_types {
        bump_project_type_stat(tx, project_type, ev, tau_ms)?;
        if let Some(prev) = &record.prev_template {
            bump_project_type_transition(
                tx,
                project_type,
                prev,
                &ev.template_id,
                ev.ts_ms,
                tau_ms,
            )?;
        }
    }

    // 4. Pipeline rows for multi-segment commands.
    if record.segments.len() > 1 {
        for seg in &record.segments {
            tx.execute(
                r#"
                INSERT INTO pipeline_event (event_id, position, segment_norm, template_id, op_following)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
                params![
                    event_rowid,
                    seg.position,
                    seg.segment_norm,
                    seg.template_id.as_str(),
                    seg.op_following.as_str(),
                ],
            )?;
        }

        for scope in record.scopes() {
            for pair in record.segments.windows(2) {
                bump_pipeline_transition(
                    tx,
                    &scope,
                    &pair[0].template_id,
                    &pair[1].template_id,
                    pair[0].op_following,
                    ev.ts_ms,
                    tau_ms,
                )?;
            }
        }

        bump_pipeline_pattern(tx, &record.segments, ev.ts_ms)?;
    }

    // 5. Recovery: a non-zero exit followed by a success.
    if let (Some(prev), Some(prev_exit)) = (&record.prev_template, record.prev_exit) {
        if prev_exit != 0 {
            for scope in record.scopes() {
                if ev.succeeded() {
                    bump_recovery(tx, &scope, prev, prev_exit, &ev.template_id, ev.ts_ms, tau_ms)?;
                } else {
                    // A failed follow-up only dilutes an existing pattern.
                    note_failed_recovery(tx, &scope, prev, prev_exit, &ev.template_id)?;
                }
            }
        }
    }

    Ok(())
}

fn upsert_template(
    tx: &Transaction,
    template_id: &TemplateId,
    cmd_norm: &str,
    tags: &[String],
    slot_count: u32,
    ts_ms: i64,
) -> Result<(), StorageError> {
    tx.execute(
        r#"
        INSERT INTO command_template
            (template_id, cmd_norm, tags, slot_count, first_seen_ms, last_seen_ms)
        VALUES (?1, ?2, ?3, ?4, ?5, ?5)
        ON CONFLICT(template_id) DO UPDATE SET
            first_seen_ms = MIN(first_seen_ms, excluded.first_seen_ms),
            last_seen_ms = MAX(last_seen_ms, excluded.last_seen_ms)
        "#,
        params![
            template_id.as_str(),
            cmd_norm,
            tags.join(" "),
            slot_count,
            ts_ms,
        ],
    )?;
    Ok(())
}

fn bump_command_stat(
    tx: &Transaction,
    scope: &str,
    ev: &CommandEvent,
    tau_ms: i64,
) -> Result<(), StorageError> {
    let existing: Option<(f64, i64)> = tx
        .query_row(
            "SELECT score, last_seen_ms FROM command_stat WHERE scope = ?1 AND template_id = ?2",
            params![scope, ev.template_id.as_str()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    let (old_score, old_seen) = existing.unwrap_or((0.0, ev.ts_ms));
    let score = decay::decayed_bump(old_score, old_seen, ev.ts_ms, tau_ms);
    let last_seen = old_seen.max(ev.ts_ms);
    let (succ, fail) = if ev.succeeded() { (1, 0) } else { (0, 1) };

    tx.execute(
        r#"
        INSERT INTO command_stat
            (scope, template_id, score, success_count, failure_count, last_seen_ms)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        ON CONFLICT(scope, template_id) DO UPDATE SET
            score = ?3,
            success_count = success_count + ?4,
            failure_count = failure_count + ?5,
            last_seen_ms = ?6
        "#,
        params![scope, ev.template_id.as_str(), score, succ, fail, last_seen],
    )?;
    Ok(())
}

fn bump_transition(
    tx: &Transaction,
    scope: &str,
    prev: &TemplateId,
    next: &TemplateId,
    ts_ms: i64,
    tau_ms: i64,
) -> Result<(), StorageError> {
    let existing: Option<(f64, i64)> = tx
        .query_row(
            r#"SELECT weight, last_seen_ms FROM transition_stat
               WHERE scope = ?1 AND prev_template_id = ?2 AND next_template_id = ?3"#,
            params![scope, prev.as_str(), next.as_str()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    let (old_weight, old_seen) = existing.unwrap_or((0.0, ts_ms));
    let weight = decay::decayed_bump(old_weight, old_seen, ts_ms, tau_ms);

    tx.execute(
        r#"
        INSERT INTO transition_stat
            (scope, prev_template_id, next_template_id, count, weight, last_seen_ms)
        VALUES (?1, ?2, ?3, 1, ?4, ?5)
        ON CONFLICT(scope, prev_template_id, next_template_id) DO UPDATE SET
            count = count + 1,
            weight = ?4,
            last_seen_ms = MAX(last_seen_ms, ?5)
        "#,
        params![scope, prev.as_str(), next.as_str(), weight, ts_ms],
    )?;
    Ok(())
}

fn bump_project_type_stat(
    tx: &Transaction,
    project_type: &str,
    ev: &CommandEvent,
    tau_ms: i64,
) -> Result<(), StorageError> {
    let existing: Option<(f64, i64)> = tx
        .query_row(
            r#"SELECT score, last_seen_ms FROM project_type_stat
               WHERE project_type = ?1 AND template_id = ?2"#,
            params![project_type, ev.template_id.as_str()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    let (old_score, old_seen) = existing.unwrap_or((0.0, ev.ts_ms));
    let score = decay::decayed_bump(old_score, old_seen, ev.ts_ms, tau_ms);

    tx.execute(
        r#"
        INSERT INTO project_type_stat (project_type, template_id, score, last_seen_ms)
        VALUES (?1, ?2, ?3, ?4)
        ON CONFLICT(project_type, template_id) DO UPDATE SET
            score = ?3,
            last_seen_ms = MAX(last_seen_ms, ?4)
        "#,
        params![project_type, ev.template_id.as_str(), score, ev.ts_ms],
    )?;
    Ok(())
}

fn bump_project_type_transition(
    tx: &Transaction,
    project_type: &str,
    prev: &TemplateId,
    next: &TemplateId,
    ts_ms: i64,
    tau_ms: i64,
) -> Result<(), StorageError> {
    let existing: Option<(f64, i64)> = tx
        .query_row(
            r#"SELECT weight, last_seen_ms FROM project_type_transition
               WHERE project_type = ?1 AND prev_template_id = ?2 AND next_template_id = ?3"#,
            params![project_type, prev.as_str(), next.as_str()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    let (old_weight, old_seen) = existing.unwrap_or((0.0, ts_ms));
    let weight = decay::decayed_bump(old_weight, old_seen, ts_ms, tau_ms);

    tx.execute(
        r#"
        INSERT INTO project_type_transition
            (project_type, prev_template_id, next_template_id, count, weight, last_seen_ms)
        VALUES (?1, ?2, ?3, 1, ?4, ?5)
        ON CONFLICT(project_type, prev_template_id, next_template_id) DO UPDATE SET
            count = count + 1,
            weight = ?4,
            last_seen_ms = MAX(last_seen_ms, ?5)
        "#,
        params![project_type, prev.as_str(), next.as_str(), weight, ts_ms],
    )?;
    Ok(())
}

fn bump_pipeline_transition(
    tx: &Transaction,
    scope: &str,
    prev: &TemplateId,
    next: &TemplateId,
    operator: Operator,
    ts_ms: i64,
    tau_ms: i64,
) -> Result<(), StorageError> {
    let existing: Option<(f64, i64)> = tx
        .query_row(
            r#"SELECT weight, last_seen_ms FROM pipeline_transition
               WHERE scope = ?1 AND prev_segment_template = ?2
                 AND next_segment_template = ?3 AND operator = ?4"#,
            params![scope, prev.as_str(), next.as_str(), operator.as_str()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    let (old_weight, old_seen) = existing.unwrap_or((0.0, ts_ms));
    let weight = decay::decayed_bump(old_weight, old_seen, ts_ms, tau_ms);

    tx.execute(
        r#"
        INSERT INTO pipeline_transition
            (scope, prev_segment_template, next_segment_template, operator, count, weight, last_seen_ms)
        VALUES (?1, ?2, ?3, ?4, 1, ?5, ?6)
        ON CONFLICT(scope, prev_segment_template, next_segment_template, operator) DO UPDATE SET
            count = count + 1,
            weight = ?5,
            last_seen_ms = MAX(last_seen_ms, ?6)
        "#,
        params![
            scope,
            prev.as_str(),
            next.as_str(),
            operator.as_str(),
            weight,
            ts_ms
        ],
    )?;
    Ok(())
}

/// Hash of the full template chain concatenated with the operator chain.
pub fn pipeline_pattern_hash(segments: &[SegmentRecord]) -> String {
    let mut hasher = Sha256::new();
    for seg in segments {
        hasher.update(seg.template_id.as_str().as_bytes());
        hasher.update(b"\x1f");
    }
    hasher.update(b"\x1e");
    for seg in segments {
        hasher.update(seg.op_following.as_str().as_bytes());
        hasher.update(b"\x1f");
    }
    format!("{:x}", hasher.finalize())
}

fn bump_pipeline_pattern(
    tx: &Transaction,
    segments: &[SegmentRecord],
    ts_ms: i64,
) -> Result<(), StorageError> {
    let hash = pipeline_pattern_hash(segments);
    let template_chain = segments
        .iter()
        .map(|s| s.template_id.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    let operator_chain = segments
        .iter()
        .map(|s| s.op_following.as_str())
        .collect::<Vec<_>>()
        .join(" ");

    tx.execute(
        r#"
        INSERT INTO pipeline_pattern (pattern_hash, template_chain, operator_chain, count, last_seen_ms)
        VALUES (?1, ?2, ?3, 1, ?4)
        ON CONFLICT(pattern_hash) DO UPDATE SET
            count = count + 1,
            last_seen_ms = MAX(last_seen_ms, ?4)
        "#,
        params![hash, template_chain, operator_chain, ts_ms],
    )?;
    Ok(())
}

fn bump_recovery(
    tx: &Transaction,
    scope: &str,
    failed: &TemplateId,
    exit_code: i32,
    recovery: &TemplateId,
    ts_ms: i64,
    tau_ms: i64,
) -> Result<(), StorageError> {
    let existing: Option<(f64, i64)> = tx
        .query_row(
            r#"SELECT weight, last_seen_ms FROM recovery_pattern
               WHERE scope = ?1 AND failed_template_id = ?2
                 AND exit_code = ?3 AND recovery_template_id = ?4"#,
            params![scope, failed.as_str(), exit_code, recovery.as_str()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    let (old_weight, old_seen) = existing.unwrap_or((0.0, ts_ms));
    let weight = decay::decayed_bump(old_weight, old_seen, ts_ms, tau_ms);

    tx.execute(
        r#"
        INSERT INTO recovery_pattern
            (scope, failed_template_id, exit_code, recovery_template_id,
             success_count, attempt_count, success_rate, weight, last_seen_ms)
        VALUES (?1, ?2, ?3, ?4, 1, 1, 1.0, ?5, ?6)
        ON CONFLICT(scope, failed_template_id, exit_code, recovery_template_id) DO UPDATE SET
            success_count = success_count + 1,
            attempt_count = attempt_count + 1,
            success_rate = CAST(success_count + 1 AS REAL) / CAST(attempt_count + 1 AS REAL),
            weight = ?5,
            last_seen_ms = MAX(last_seen_ms, ?6)
        "#,
        params![scope, failed.as_str(), exit_code, recovery.as_str(), weight, ts_ms],
    )?;
    Ok(())
}

/// A failed follow-up dilutes an existing recovery pattern; it never creates
/// a new row.
fn note_failed_recovery(
    tx: &Transaction,
    scope: &str,
    failed: &TemplateId,
    exit_code: i32,
    recovery: &TemplateId,
) -> Result<(), StorageError> {
    tx.execute(
        r#"
        UPDATE recovery_pattern SET
            attempt_count = attempt_count + 1,
            success_rate = CAST(success_count AS REAL) / CAST(attempt_count + 1 AS REAL)
        WHERE scope = ?1 AND failed_template_id = ?2
          AND exit_code = ?3 AND recovery_template_id = ?4
        "#,
        params![scope, failed.as_str(), exit_code, recovery.as_str()],
    )?;
    Ok(())
}

#[cfg(test)]
#[path = "ingest_tests.rs"]
mod tests;
