// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Schema definition.
//!
//! Versioned via `PRAGMA user_version`. The schema is fixed: aggregate rows
//! hold template ids (stable content-addressed strings) rather than row
//! references, so templates outlive any aggregate without cascade
//! management. `command_event` is append-only and shadowed by an FTS5
//! virtual table maintained by triggers.

use rusqlite::Connection;

use crate::db::StorageError;

/// Schema version (increment when changing table definitions).
pub const SCHEMA_VERSION: i32 = 1;

pub fn init(conn: &Connection) -> Result<(), StorageError> {
    let current: i32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    if current != 0 && current != SCHEMA_VERSION {
        // Fixed schema; older files are rebuilt rather than migrated.
        drop_all(conn)?;
    }

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS session (
            session_id TEXT PRIMARY KEY,
            shell TEXT NOT NULL DEFAULT '',
            os TEXT NOT NULL DEFAULT '',
            host TEXT NOT NULL DEFAULT '',
            user TEXT NOT NULL DEFAULT '',
            cwd TEXT NOT NULL DEFAULT '',
            started_at_ms INTEGER NOT NULL,
            ended_at_ms INTEGER
        );

        CREATE TABLE IF NOT EXISTS command_template (
            template_id TEXT PRIMARY KEY,
            cmd_norm TEXT NOT NULL,
            tags TEXT NOT NULL DEFAULT '',
            slot_count INTEGER NOT NULL DEFAULT 0,
            first_seen_ms INTEGER NOT NULL,
            last_seen_ms INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS command_event (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            session_id TEXT NOT NULL REFERENCES session(session_id),
            ts_ms INTEGER NOT NULL,
            cwd TEXT NOT NULL DEFAULT '',
            repo_key TEXT NOT NULL DEFAULT '',
            branch TEXT NOT NULL DEFAULT '',
            raw TEXT NOT NULL,
            cmd_norm TEXT NOT NULL,
            truncated INTEGER NOT NULL DEFAULT 0,
            template_id TEXT NOT NULL REFERENCES command_template(template_id),
            exit_code INTEGER NOT NULL DEFAULT 0,
            duration_ms INTEGER NOT NULL DEFAULT 0,
            ephemeral INTEGER NOT NULL DEFAULT 0
        );
        CREATE INDEX IF NOT EXISTS idx_event_session ON command_event(session_id, ts_ms);
        CREATE INDEX IF NOT EXISTS idx_event_repo ON command_event(repo_key, ts_ms);
        CREATE INDEX IF NOT EXISTS idx_event_norm ON command_event(cmd_norm);

        CREATE VIRTUAL TABLE IF NOT EXISTS command_event_fts USING fts5(
            raw, cmd_norm, content='command_event', content_rowid='id'
        );

        CREATE TRIGGER IF NOT EXISTS command_event_ai AFTER INSERT ON command_event BEGIN
            INSERT INTO command_event_fts(rowid, raw, cmd_norm)
            VALUES (new.id, new.raw, new.cmd_norm);
        END;
        CREATE TRIGGER IF NOT EXISTS command_event_ad AFTER DELETE ON command_event BEGIN
            INSERT INTO command_event_fts(command_event_fts, rowid, raw, cmd_norm)
            VALUES ('delete', old.id, old.raw, old.cmd_norm);
        END;

        CREATE TABLE IF NOT EXISTS command_stat (
            scope TEXT NOT NULL,
            template_id TEXT NOT NULL REFERENCES command_template(template_id),
            score REAL NOT NULL DEFAULT 0,
            success_count INTEGER NOT NULL DEFAULT 0,
            failure_count INTEGER NOT NULL DEFAULT 0,
            last_seen_ms INTEGER NOT NULL,
            PRIMARY KEY (scope, template_id)
        );
        CREATE INDEX IF NOT EXISTS idx_stat_scope_score ON command_stat(scope, score DESC);

        CREATE TABLE IF NOT EXISTS transition_stat (
            scope TEXT NOT NULL,
            prev_template_id TEXT NOT NULL REFERENCES command_template(template_id),
            next_template_id TEXT NOT NULL REFERENCES command_template(template_id),
            count INTEGER NOT NULL DEFAULT 0,
            weight REAL NOT NULL DEFAULT 0,
            last_seen_ms INTEGER NOT NULL,
            PRIMARY KEY (scope, prev_template_id, next_template_id)
        );
        CREATE INDEX IF NOT EXISTS idx_trans_prev ON transition_stat(scope, prev_template_id);

        CREATE TABLE IF NOT EXISTS pipeline_event (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_id INTEGER NOT NULL REFERENCES command_event(id),
            position INTEGER NOT NULL,
            segment_norm TEXT NOT NULL,
            template_id TEXT NOT NULL,
            op_following TEXT NOT NULL DEFAULT ''
        );
        CREATE INDEX IF NOT EXISTS idx_pipe_event ON pipeline_event(event_id);

        CREATE TABLE IF NOT EXISTS pipeline_transition (
            scope TEXT NOT NULL,
            prev_segment_template TEXT NOT NULL,
            next_segment_template TEXT NOT NULL,
            operator TEXT NOT NULL,
            count INTEGER NOT NULL DEFAULT 0,
            weight REAL NOT NULL DEFAULT 0,
            last_seen_ms INTEGER NOT NULL,
            PRIMARY KEY (scope, prev_segment_template, next_segment_template, operator)
        );
        CREATE INDEX IF NOT EXISTS idx_pipetrans_prev
            ON pipeline_transition(scope, prev_segment_template);

        CREATE TABLE IF NOT EXISTS pipeline_pattern (
            pattern_hash TEXT PRIMARY KEY,
            template_chain TEXT NOT NULL,
            operator_chain TEXT NOT NULL,
            count INTEGER NOT NULL DEFAULT 0,
            last_seen_ms INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS project_task (
            repo_key TEXT NOT NULL,
            kind TEXT NOT NULL,
            name TEXT NOT NULL,
            command TEXT NOT NULL,
            description TEXT,
            discovered_ts INTEGER NOT NULL,
            PRIMARY KEY (repo_key, kind, name)
        );

        CREATE TABLE IF NOT EXISTS project_fingerprint (
            repo_key TEXT PRIMARY KEY,
            fingerprint TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS project_type_stat (
            project_type TEXT NOT NULL,
            template_id TEXT NOT NULL REFERENCES command_template(template_id),
            score REAL NOT NULL DEFAULT 0,
            last_seen_ms INTEGER NOT NULL,
            PRIMARY KEY (project_type, template_id)
        );

        CREATE TABLE IF NOT EXISTS project_type_transition (
            project_type TEXT NOT NULL,
            prev_template_id TEXT NOT NULL,
            next_template_id TEXT NOT NULL,
            count INTEGER NOT NULL DEFAULT 0,
            weight REAL NOT NULL DEFAULT 0,
            last_seen_ms INTEGER NOT NULL,
            PRIMARY KEY (project_type, prev_template_id, next_template_id)
        );

        CREATE TABLE IF NOT EXISTS dismissal_pattern (
            scope TEXT NOT NULL,
            context_template_id TEXT NOT NULL,
            dismissed_template_id TEXT NOT NULL,
            count INTEGER NOT NULL DEFAULT 0,
            level TEXT NOT NULL,
            last_dismissed_ms INTEGER NOT NULL,
            PRIMARY KEY (scope, context_template_id, dismissed_template_id)
        );

        CREATE TABLE IF NOT EXISTS recovery_pattern (
            scope TEXT NOT NULL,
            failed_template_id TEXT NOT NULL,
            exit_code INTEGER NOT NULL,
            recovery_template_id TEXT NOT NULL,
            success_count INTEGER NOT NULL DEFAULT 0,
            attempt_count INTEGER NOT NULL DEFAULT 0,
            success_rate REAL NOT NULL DEFAULT 0,
            weight REAL NOT NULL DEFAULT 0,
            last_seen_ms INTEGER NOT NULL,
            PRIMARY KEY (scope, failed_template_id, exit_code, recovery_template_id)
        );

        CREATE TABLE IF NOT EXISTS rank_weight_profile (
            scope TEXT PRIMARY KEY,
            weights TEXT NOT NULL,
            samples INTEGER NOT NULL DEFAULT 0,
            learning_rate REAL NOT NULL DEFAULT 0.02,
            updated_at_ms INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS workflow_pattern (
            name TEXT PRIMARY KEY,
            template_chain TEXT NOT NULL,
            created_at_ms INTEGER NOT NULL
        );
        "#,
    )?;

    conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    Ok(())
}

fn drop_all(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        r#"
        DROP TRIGGER IF EXISTS command_event_ai;
        DROP TRIGGER IF EXISTS command_event_ad;
        DROP TABLE IF EXISTS command_event_fts;
        DROP TABLE IF EXISTS workflow_pattern;
        DROP TABLE IF EXISTS rank_weight_profile;
        DROP TABLE IF EXISTS recovery_pattern;
        DROP TABLE IF EXISTS dismissal_pattern;
        DROP TABLE IF EXISTS project_type_transition;
        DROP TABLE IF EXISTS project_type_stat;
        DROP TABLE IF EXISTS project_fingerprint;
        DROP TABLE IF EXISTS project_task;
        DROP TABLE IF EXISTS pipeline_pattern;
        DROP TABLE IF EXISTS pipeline_transition;
        DROP TABLE IF EXISTS pipeline_event;
        DROP TABLE IF EXISTS transition_stat;
        DROP TABLE IF EXISTS command_stat;
        DROP TABLE IF EXISTS command_event;
        DROP TABLE IF EXISTS command_template;
        DROP TABLE IF EXISTS session;
        "#,
    )?;
    Ok(())
}
