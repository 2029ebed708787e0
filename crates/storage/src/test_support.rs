// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Builders shared by the storage unit tests.

use clai_core::{CommandEvent, SessionId, TemplateId};
use clai_shell::{prenormalize, AliasMap, NormalizeOptions};

use crate::db::Store;
use crate::ingest::{IngestRecord, SegmentRecord};

pub const SESSION: &str = "0123456789abcdef";

/// Store with a registered test session.
pub fn store_with_session() -> Store {
    let store = Store::in_memory().unwrap();
    store
        .upsert_session(
            &SessionId::new(SESSION),
            "zsh",
            "linux",
            "host",
            "user",
            "/home/u",
            0,
        )
        .unwrap();
    store
}

/// Build an ingest record from a raw command through the real normalizer.
pub fn record(raw: &str, ts_ms: i64, exit_code: i32) -> IngestRecord {
    record_in(raw, ts_ms, exit_code, "/repo", "/repo/sub")
}

/// Like [`record`] with explicit repo/cwd.
pub fn record_in(raw: &str, ts_ms: i64, exit_code: i32, repo: &str, cwd: &str) -> IngestRecord {
    let norm = prenormalize(raw, &AliasMap::new(), &NormalizeOptions::default());
    let segments = norm
        .segments
        .iter()
        .map(|seg| SegmentRecord {
            position: seg.position as u32,
            segment_norm: seg.text.clone(),
            template_id: seg.template_id.clone(),
            op_following: seg.op_following,
            tags: clai_shell::tags::segment_tags(&seg.text).into_iter().collect(),
            slot_count: count_slots(&seg.text),
        })
        .collect();

    IngestRecord {
        event: CommandEvent {
            session_id: SessionId::new(SESSION),
            ts_ms,
            cwd: cwd.to_string(),
            repo_key: repo.to_string(),
            branch: "main".to_string(),
            raw: raw.to_string(),
            cmd_norm: norm.cmd_norm.clone(),
            truncated: norm.truncated,
            template_id: norm.template_id.clone(),
            exit_code,
            duration_ms: 5,
            ephemeral: false,
        },
        tags: norm.tags,
        slot_count: count_slots(&norm.cmd_norm),
        segments,
        prev_template: None,
        prev_exit: None,
        project_types: Vec::new(),
    }
}

/// Chain `records` so each carries the previous record's template and exit.
pub fn chain(records: &mut [IngestRecord]) {
    for i in 1..records.len() {
        let prev_template = records[i - 1].event.template_id.clone();
        let prev_exit = records[i - 1].event.exit_code;
        records[i].prev_template = Some(prev_template);
        records[i].prev_exit = Some(prev_exit);
    }
}

pub fn template_of(raw: &str) -> TemplateId {
    prenormalize(raw, &AliasMap::new(), &NormalizeOptions::default()).template_id
}

fn count_slots(norm: &str) -> u32 {
    norm.split_whitespace()
        .filter(|t| matches!(*t, "<UUID>" | "<PATH>" | "<URL>" | "<NUM>"))
        .count() as u32
}
