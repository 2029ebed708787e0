// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow pattern persistence: named ordered template chains.

use rusqlite::params;

use clai_core::TemplateId;

use crate::db::{StorageError, Store};

/// A declared workflow: ordered template chain under a name.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowRow {
    pub name: String,
    pub chain: Vec<TemplateId>,
}

impl Store {
    /// Declare (or replace) a workflow pattern.
    pub fn upsert_workflow(
        &self,
        name: &str,
        chain: &[TemplateId],
        now_ms: i64,
    ) -> Result<(), StorageError> {
        let chain_json = serde_json::to_string(
            &chain.iter().map(|t| t.as_str()).collect::<Vec<_>>(),
        )?;
        self.conn.execute(
            r#"
            INSERT INTO workflow_pattern (name, template_chain, created_at_ms)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(name) DO UPDATE SET template_chain = ?2
            "#,
            params![name, chain_json, now_ms],
        )?;
        Ok(())
    }

    /// All declared workflows.
    pub fn workflows(&self) -> Result<Vec<WorkflowRow>, StorageError> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT name, template_chain FROM workflow_pattern ORDER BY name")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut out = Vec::with_capacity(rows.len());
        for (name, chain_json) in rows {
            let ids: Vec<String> = serde_json::from_str(&chain_json).unwrap_or_default();
            if ids.len() < 2 {
                // A workflow needs at least two steps to predict anything.
                continue;
            }
            out.push(WorkflowRow {
                name,
                chain: ids.into_iter().map(TemplateId::new).collect(),
            });
        }
        Ok(out)
    }
}
