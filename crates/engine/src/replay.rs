// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deterministic replay and bulk backfill.
//!
//! Feeds synthetic command sequences through the normal ingest transaction
//! with a fixed base timestamp and increment, so two runs over the same
//! input produce byte-identical aggregates. History import uses the same
//! path to seed a fresh store.

use std::collections::HashMap;

use clai_core::{Config, SessionId, TemplateId};
use clai_shell::{prenormalize, tags::segment_tags, AliasMap, NormalizeOptions};
use clai_storage::{IngestRecord, SegmentRecord, StorageError, Store};

/// One command to replay.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplaySpec {
    pub session_id: SessionId,
    pub raw: String,
    pub exit_code: i32,
    pub cwd: String,
    pub repo_key: String,
}

impl ReplaySpec {
    /// A successful command in a repo-less session.
    pub fn simple(session_id: &SessionId, raw: &str) -> Self {
        Self {
            session_id: session_id.clone(),
            raw: raw.to_string(),
            exit_code: 0,
            cwd: String::new(),
            repo_key: String::new(),
        }
    }
}

/// Replay `specs` in order with timestamps `base_ts_ms + i * step_ms`.
///
/// Sessions are registered on first sight; previous-template chains are
/// tracked per session exactly as the live ingest path does. Returns the
/// number of events written.
pub fn replay(
    store: &mut Store,
    cfg: &Config,
    specs: &[ReplaySpec],
    base_ts_ms: i64,
    step_ms: i64,
) -> Result<usize, StorageError> {
    let opts = NormalizeOptions {
        max_bytes: cfg.max_event_bytes,
        alias_max_depth: cfg.alias_max_depth,
    };
    let aliases = AliasMap::new();
    let mut prev: HashMap<SessionId, (TemplateId, i32)> = HashMap::new();
    let mut batch: Vec<IngestRecord> = Vec::with_capacity(specs.len());

    for (i, spec) in specs.iter().enumerate() {
        if !store.session_exists(&spec.session_id)? {
            store.upsert_session(
                &spec.session_id,
                "replay",
                "",
                "",
                "",
                &spec.cwd,
                base_ts_ms,
            )?;
        }

        let ts_ms = base_ts_ms + i as i64 * step_ms;
        let norm = prenormalize(&spec.raw, &aliases, &opts);
        let segments = norm
            .segments
            .iter()
            .map(|seg| SegmentRecord {
                position: seg.position as u32,
                segment_norm: seg.text.clone(),
                template_id: seg.template_id.clone(),
                op_following: seg.op_following,
                tags: segment_tags(&seg.text).into_iter().collect(),
                slot_count: count_slots(&seg.text),
            })
            .collect();

        let previous = prev.get(&spec.session_id).cloned();
        batch.push(IngestRecord {
            event: clai_core::CommandEvent {
                session_id: spec.session_id.clone(),
                ts_ms,
                cwd: spec.cwd.clone(),
                repo_key: spec.repo_key.clone(),
                branch: String::new(),
                raw: spec.raw.clone(),
                cmd_norm: norm.cmd_norm.clone(),
                truncated: norm.truncated,
                template_id: norm.template_id.clone(),
                exit_code: spec.exit_code,
                duration_ms: 0,
                ephemeral: false,
            },
            tags: norm.tags.clone(),
            slot_count: count_slots(&norm.cmd_norm),
            segments,
            prev_template: previous.as_ref().map(|(t, _)| t.clone()),
            prev_exit: previous.map(|(_, exit)| exit),
            project_types: Vec::new(),
        });

        prev.insert(spec.session_id.clone(), (norm.template_id, spec.exit_code));

        // Commit in ingest-sized chunks so replay and live traffic share
        // the same transaction shape.
        if batch.len() >= cfg.batch_max {
            store.apply_batch(&batch)?;
            batch.clear();
        }
    }

    let written = specs.len();
    store.apply_batch(&batch)?;
    Ok(written)
}

fn count_slots(norm: &str) -> u32 {
    norm.split_whitespace()
        .filter(|t| matches!(*t, "<UUID>" | "<PATH>" | "<URL>" | "<NUM>"))
        .count() as u32
}

#[cfg(test)]
#[path = "replay_tests.rs"]
mod tests;
