// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! History search backends.
//!
//! Five modes over `command_event`: substring (default), prefix (deduped by
//! raw command), FTS5, describe (tag match against template tags), and auto
//! (FTS merged with describe). Pagination probes `limit + 1` rows to compute
//! `at_end`; returned text is ANSI-stripped.

use rusqlite::ToSql;

use clai_core::{SearchMode, SessionId};
use clai_shell::strip_ansi;

use crate::db::{StorageError, Store};

/// Which slice of history to search.
#[derive(Debug, Clone, PartialEq)]
pub enum HistoryScope {
    Session(SessionId),
    Repo(String),
    Global,
}

/// A history search request.
#[derive(Debug, Clone)]
pub struct HistoryQuery {
    pub query: String,
    pub mode: SearchMode,
    pub scope: HistoryScope,
    pub limit: usize,
    pub offset: usize,
}

/// One history row.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryItem {
    pub raw: String,
    pub cmd_norm: String,
    pub ts_ms: i64,
    pub exit_code: i32,
    pub session_id: String,
    pub cwd: String,
    pub tags: Vec<String>,
    pub matched_tags: Vec<String>,
    pub rank_score: Option<f64>,
}

/// A page of history results.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryPage {
    pub items: Vec<HistoryItem>,
    pub at_end: bool,
    /// Which backend produced the page ("substring", "prefix", "fts",
    /// "describe", "auto").
    pub backend: &'static str,
}

impl Store {
    /// Run a history search.
    pub fn search_history(&self, query: &HistoryQuery) -> Result<HistoryPage, StorageError> {
        let limit = query.limit.max(1);
        match query.mode {
            SearchMode::Substring => self.search_substring(query, limit),
            SearchMode::Prefix => self.search_prefix(query, limit),
            SearchMode::Fts => self.search_fts(query, limit),
            SearchMode::Describe => self.search_describe(query, limit),
            SearchMode::Auto => self.search_auto(query, limit),
        }
    }

    fn search_substring(
        &self,
        query: &HistoryQuery,
        limit: usize,
    ) -> Result<HistoryPage, StorageError> {
        let (scope_sql, scope_arg) = scope_filter(&query.scope);
        let sql = format!(
            r#"
            SELECT e.raw, e.cmd_norm, e.ts_ms, e.exit_code, e.session_id, e.cwd, ct.tags
            FROM command_event e
            JOIN command_template ct ON ct.template_id = e.template_id
            WHERE LOWER(e.cmd_norm) LIKE '%' || LOWER(:q) || '%' {scope_sql}
            ORDER BY e.ts_ms DESC
            LIMIT :limit OFFSET :offset
            "#
        );
        let items = self.run_item_query(&sql, &query.query, &scope_arg, limit + 1, query.offset)?;
        Ok(page(items, limit, "substring"))
    }

    fn search_prefix(&self, query: &HistoryQuery, limit: usize) -> Result<HistoryPage, StorageError> {
        let (scope_sql, scope_arg) = scope_filter(&query.scope);
        // Dedup by raw command, keeping the most recent occurrence.
        let sql = format!(
            r#"
            SELECT e.raw, e.cmd_norm, MAX(e.ts_ms) AS ts_ms, e.exit_code, e.session_id, e.cwd,
                   ct.tags
            FROM command_event e
            JOIN command_template ct ON ct.template_id = e.template_id
            WHERE LOWER(e.cmd_norm) LIKE LOWER(:q) || '%' {scope_sql}
            GROUP BY e.raw
            ORDER BY ts_ms DESC
            LIMIT :limit OFFSET :offset
            "#
        );
        let items = self.run_item_query(&sql, &query.query, &scope_arg, limit + 1, query.offset)?;
        Ok(page(items, limit, "prefix"))
    }

    fn search_fts(&self, query: &HistoryQuery, limit: usize) -> Result<HistoryPage, StorageError> {
        let match_expr = fts_match_expr(&query.query);
        if match_expr.is_empty() {
            return Ok(empty_page("fts"));
        }
        let (scope_sql, scope_arg) = scope_filter(&query.scope);
        let sql = format!(
            r#"
            SELECT e.raw, e.cmd_norm, e.ts_ms, e.exit_code, e.session_id, e.cwd, ct.tags,
                   bm25(command_event_fts) AS rank
            FROM command_event_fts f
            JOIN command_event e ON e.id = f.rowid
            JOIN command_template ct ON ct.template_id = e.template_id
            WHERE command_event_fts MATCH :q {scope_sql}
            ORDER BY rank, e.ts_ms DESC
            LIMIT :limit OFFSET :offset
            "#
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut binds: Vec<(&str, &dyn ToSql)> = Vec::new();
        let fetch = (limit + 1) as i64;
        let offset = query.offset as i64;
        binds.push((":q", &match_expr));
        binds.push((":limit", &fetch));
        binds.push((":offset", &offset));
        if let Some(arg) = &scope_arg {
            binds.push((":scope", arg));
        }
        let items: Vec<HistoryItem> = stmt
            .query_map(binds.as_slice(), |row| {
                // bm25 is lower-is-better; negate so a higher rank_score wins.
                let rank: f64 = row.get(7)?;
                item_from_row(row, Some(-rank))
            })?
            .collect::<Result<_, _>>()?;
        Ok(page(items, limit, "fts"))
    }

    fn search_describe(
        &self,
        query: &HistoryQuery,
        limit: usize,
    ) -> Result<HistoryPage, StorageError> {
        let words: Vec<String> = query
            .query
            .to_lowercase()
            .split_whitespace()
            .map(str::to_string)
            .collect();
        if words.is_empty() {
            return Ok(empty_page("describe"));
        }

        // Fetch recent tagged rows and match in memory; the tag vocabulary
        // is tiny so the candidate pool stays small.
        let (scope_sql, scope_arg) = scope_filter(&query.scope);
        let sql = format!(
            r#"
            SELECT e.raw, e.cmd_norm, MAX(e.ts_ms) AS ts_ms, e.exit_code, e.session_id, e.cwd,
                   ct.tags
            FROM command_event e
            JOIN command_template ct ON ct.template_id = e.template_id
            WHERE ct.tags != '' {scope_sql}
            GROUP BY e.raw
            ORDER BY ts_ms DESC
            LIMIT 500
            "#
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut binds: Vec<(&str, &dyn ToSql)> = Vec::new();
        if let Some(arg) = &scope_arg {
            binds.push((":scope", arg));
        }
        let rows: Vec<HistoryItem> = stmt
            .query_map(binds.as_slice(), |row| item_from_row(row, None))?
            .collect::<Result<_, _>>()?;

        let mut matched: Vec<HistoryItem> = rows
            .into_iter()
            .filter_map(|mut item| {
                let hits: Vec<String> = item
                    .tags
                    .iter()
                    .filter(|t| words.iter().any(|w| w == *t))
                    .cloned()
                    .collect();
                if hits.is_empty() {
                    return None;
                }
                item.rank_score = Some(hits.len() as f64);
                item.matched_tags = hits;
                Some(item)
            })
            .collect();

        matched.sort_by(|a, b| {
            b.rank_score
                .unwrap_or(0.0)
                .total_cmp(&a.rank_score.unwrap_or(0.0))
                .then(b.ts_ms.cmp(&a.ts_ms))
                .then(a.raw.cmp(&b.raw))
        });

        let items: Vec<HistoryItem> = matched
            .into_iter()
            .skip(query.offset)
            .take(limit + 1)
            .collect();
        Ok(page(items, limit, "describe"))
    }

    fn search_auto(&self, query: &HistoryQuery, limit: usize) -> Result<HistoryPage, StorageError> {
        // Run both backends unpaginated, merge by score, then paginate.
        let inner = HistoryQuery {
            offset: 0,
            limit: limit + query.offset + 1,
            ..query.clone()
        };
        let fts = self.search_fts(&inner, inner.limit)?;
        let describe = self.search_describe(&inner, inner.limit)?;

        let mut merged: Vec<HistoryItem> = Vec::new();
        for item in fts.items.into_iter().chain(describe.items) {
            let mut absorbed = false;
            for existing in merged.iter_mut() {
                if existing.raw == item.raw {
                    let combined =
                        existing.rank_score.unwrap_or(0.0) + item.rank_score.unwrap_or(0.0);
                    existing.rank_score = Some(combined);
                    if existing.matched_tags.is_empty() {
                        existing.matched_tags = item.matched_tags.clone();
                    }
                    absorbed = true;
                    break;
                }
            }
            if !absorbed {
                merged.push(item);
            }
        }
        merged.sort_by(|a, b| {
            b.rank_score
                .unwrap_or(0.0)
                .total_cmp(&a.rank_score.unwrap_or(0.0))
                .then(b.ts_ms.cmp(&a.ts_ms))
                .then(a.raw.cmp(&b.raw))
        });

        let items: Vec<HistoryItem> = merged
            .into_iter()
            .skip(query.offset)
            .take(limit + 1)
            .collect();
        Ok(page(items, limit, "auto"))
    }

    fn run_item_query(
        &self,
        sql: &str,
        q: &str,
        scope_arg: &Option<String>,
        fetch: usize,
        offset: usize,
    ) -> Result<Vec<HistoryItem>, StorageError> {
        let mut stmt = self.conn.prepare(sql)?;
        let fetch = fetch as i64;
        let offset = offset as i64;
        let mut binds: Vec<(&str, &dyn ToSql)> = Vec::new();
        binds.push((":q", &q));
        binds.push((":limit", &fetch));
        binds.push((":offset", &offset));
        if let Some(arg) = scope_arg {
            binds.push((":scope", arg));
        }
        let items = stmt
            .query_map(binds.as_slice(), |row| item_from_row(row, None))?
            .collect::<Result<_, _>>()?;
        Ok(items)
    }
}

/// Scope filter fragment binding `:scope` when present. Ephemeral rows are
/// only visible inside their own session.
fn scope_filter(scope: &HistoryScope) -> (&'static str, Option<String>) {
    match scope {
        HistoryScope::Session(id) => (" AND e.session_id = :scope", Some(id.as_str().to_string())),
        HistoryScope::Repo(key) => (
            " AND e.repo_key = :scope AND e.ephemeral = 0",
            Some(key.clone()),
        ),
        HistoryScope::Global => (" AND e.ephemeral = 0", None),
    }
}

/// Quote each token so user input cannot break FTS5 query syntax. Tokens of
/// one or two characters are dropped; they match too much to be useful.
fn fts_match_expr(query: &str) -> String {
    query
        .split_whitespace()
        .map(|token| token.replace('"', ""))
        .filter(|t| t.len() > 2)
        .map(|t| format!("\"{}\"", t))
        .collect::<Vec<_>>()
        .join(" ")
}

fn item_from_row(row: &rusqlite::Row<'_>, rank_score: Option<f64>) -> rusqlite::Result<HistoryItem> {
    let raw: String = row.get(0)?;
    let tags: String = row.get(6)?;
    Ok(HistoryItem {
        raw: strip_ansi(&raw),
        cmd_norm: row.get(1)?,
        ts_ms: row.get(2)?,
        exit_code: row.get(3)?,
        session_id: row.get(4)?,
        cwd: row.get(5)?,
        tags: tags.split_whitespace().map(str::to_string).collect(),
        matched_tags: Vec::new(),
        rank_score,
    })
}

fn page(mut items: Vec<HistoryItem>, limit: usize, backend: &'static str) -> HistoryPage {
    let at_end = items.len() <= limit;
    items.truncate(limit);
    HistoryPage {
        items,
        at_end,
        backend,
    }
}

fn empty_page(backend: &'static str) -> HistoryPage {
    HistoryPage {
        items: Vec::new(),
        at_end: true,
        backend,
    }
}

#[cfg(test)]
#[path = "history_tests.rs"]
mod tests;
