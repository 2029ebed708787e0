// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Project task persistence.
//!
//! Tasks for a repo are replaced wholesale when the repo fingerprint
//! changes; individual rows are never edited.

use rusqlite::{params, OptionalExtension};

use crate::db::{StorageError, Store};
use crate::records::TaskRow;

impl Store {
    /// Stored fingerprint for a repo, if any.
    pub fn project_fingerprint(&self, repo_key: &str) -> Result<Option<String>, StorageError> {
        let fp = self
            .conn
            .query_row(
                "SELECT fingerprint FROM project_fingerprint WHERE repo_key = ?1",
                [repo_key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(fp)
    }

    /// Replace every task for a repo and record the new fingerprint.
    pub fn replace_project_tasks(
        &mut self,
        repo_key: &str,
        fingerprint: &str,
        tasks: &[TaskRow],
        now_ms: i64,
    ) -> Result<(), StorageError> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM project_task WHERE repo_key = ?1", [repo_key])?;
        for task in tasks {
            tx.execute(
                r#"
                INSERT INTO project_task (repo_key, kind, name, command, description, discovered_ts)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ON CONFLICT(repo_key, kind, name) DO UPDATE SET
                    command = excluded.command,
                    description = excluded.description,
                    discovered_ts = excluded.discovered_ts
                "#,
                params![repo_key, task.kind, task.name, task.command, task.description, now_ms],
            )?;
        }
        tx.execute(
            r#"
            INSERT INTO project_fingerprint (repo_key, fingerprint)
            VALUES (?1, ?2)
            ON CONFLICT(repo_key) DO UPDATE SET fingerprint = ?2
            "#,
            params![repo_key, fingerprint],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Every discovered task for a repo.
    pub fn project_tasks(&self, repo_key: &str) -> Result<Vec<TaskRow>, StorageError> {
        let mut stmt = self.conn.prepare_cached(
            r#"
            SELECT kind, name, command, description
            FROM project_task
            WHERE repo_key = ?1
            ORDER BY kind, name
            "#,
        )?;
        let rows = stmt
            .query_map([repo_key], |row| {
                Ok(TaskRow {
                    kind: row.get(0)?,
                    name: row.get(1)?,
                    command: row.get(2)?,
                    description: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
