// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Connection management and pragmas.

use std::path::Path;

use rusqlite::{Connection, OpenFlags};
use thiserror::Error;

use clai_core::config::DEFAULT_TAU_MS;

use crate::schema;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    /// Transient errors (busy/locked) are retried once by the batch writer.
    pub fn is_transient(&self) -> bool {
        match self {
            StorageError::Sqlite(rusqlite::Error::SqliteFailure(err, _)) => matches!(
                err.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            ),
            _ => false,
        }
    }
}

/// One database connection plus the decay constant applied on reads.
///
/// The write connection is owned by the batch writer task; request handlers
/// open their own read-only stores.
pub struct Store {
    pub(crate) conn: Connection,
    pub(crate) tau_ms: i64,
}

impl Store {
    /// Open (or create) the database read-write and initialize the schema.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        Self::apply_pragmas(&conn)?;
        schema::init(&conn)?;
        Ok(Self {
            conn,
            tau_ms: DEFAULT_TAU_MS,
        })
    }

    /// Open an existing database read-only (no schema writes).
    pub fn open_read_only(path: &Path) -> Result<Self, StorageError> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Self::apply_read_pragmas(&conn)?;
        Ok(Self {
            conn,
            tau_ms: DEFAULT_TAU_MS,
        })
    }

    /// In-memory store for tests and replay.
    pub fn in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        schema::init(&conn)?;
        Ok(Self {
            conn,
            tau_ms: DEFAULT_TAU_MS,
        })
    }

    /// Override the decay constant (tests, replay).
    pub fn with_tau(mut self, tau_ms: i64) -> Self {
        self.tau_ms = tau_ms;
        self
    }

    pub fn tau_ms(&self) -> i64 {
        self.tau_ms
    }

    fn apply_pragmas(conn: &Connection) -> Result<(), StorageError> {
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "busy_timeout", 5_000)?;
        Ok(())
    }

    fn apply_read_pragmas(conn: &Connection) -> Result<(), StorageError> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "busy_timeout", 5_000)?;
        Ok(())
    }

    /// Total non-ephemeral commands logged (status surface).
    pub fn commands_logged(&self) -> Result<u64, StorageError> {
        let n: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM command_event WHERE ephemeral = 0",
            [],
            |row| row.get(0),
        )?;
        Ok(n as u64)
    }
}

#[cfg(test)]
#[path = "db_tests.rs"]
mod tests;
