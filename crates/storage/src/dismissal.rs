// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dismissal pattern persistence.
//!
//! The state machine itself lives in `clai_core::dismissal`; this module
//! reads the current row, applies one event, and writes the result back.
//! `None` is represented by row absence.

use rusqlite::params;

use clai_core::{DismissalEvent, DismissalState, TemplateId};

use crate::db::{StorageError, Store};

impl Store {
    /// Apply one dismissal event and persist the resulting state.
    ///
    /// Returns the new state.
    pub fn apply_dismissal(
        &self,
        scope: &str,
        context: &TemplateId,
        candidate: &TemplateId,
        event: DismissalEvent,
        threshold: u32,
        now_ms: i64,
    ) -> Result<DismissalState, StorageError> {
        let current = self.dismissal_state(scope, context, candidate)?;
        let next = current.apply(event, threshold);

        match next.level_str() {
            None => {
                self.conn.execute(
                    r#"DELETE FROM dismissal_pattern
                       WHERE scope = ?1 AND context_template_id = ?2 AND dismissed_template_id = ?3"#,
                    params![scope, context.as_str(), candidate.as_str()],
                )?;
            }
            Some(level) => {
                self.conn.execute(
                    r#"
                    INSERT INTO dismissal_pattern
                        (scope, context_template_id, dismissed_template_id, count, level,
                         last_dismissed_ms)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                    ON CONFLICT(scope, context_template_id, dismissed_template_id) DO UPDATE SET
                        count = ?4,
                        level = ?5,
                        last_dismissed_ms = ?6
                    "#,
                    params![
                        scope,
                        context.as_str(),
                        candidate.as_str(),
                        next.count(),
                        level,
                        now_ms
                    ],
                )?;
            }
        }

        Ok(next)
    }
}

#[cfg(test)]
#[path = "dismissal_tests.rs"]
mod tests;
