// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test harness: an assembled ListenCtx over a temp-file store.

use std::sync::Arc;

use parking_lot::Mutex;

use clai_adapters::{AiProvider, ProviderRegistry};
use clai_engine::{BatchWriter, Learner, ProjectDiscovery, Scorer, SessionManager};
use clai_storage::Store;

use super::ListenCtx;

/// Build a ListenCtx backed by a database file in `dir`. Must run inside a
/// tokio runtime (the batch writer task is spawned).
pub(crate) fn make_ctx(dir: &std::path::Path) -> Arc<ListenCtx> {
    make_ctx_with_providers(dir, Vec::new())
}

pub(crate) fn make_ctx_with_providers(
    dir: &std::path::Path,
    providers: Vec<Arc<dyn AiProvider>>,
) -> Arc<ListenCtx> {
    let db = dir.join("state.db");
    let cfg = clai_core::Config::default();

    let write_store = Store::open(&db).unwrap().with_tau(cfg.tau_ms);
    let read_store = Store::open_read_only(&db).unwrap().with_tau(cfg.tau_ms);
    let write_store = Arc::new(Mutex::new(write_store));

    let sessions = Arc::new(SessionManager::new());
    let (writer, _handle) = BatchWriter::spawn(Arc::clone(&write_store), Arc::clone(&sessions), &cfg);

    Arc::new(ListenCtx::new(
        cfg.clone(),
        write_store,
        read_store,
        sessions,
        writer,
        Scorer::new(cfg.clone()),
        Arc::new(Learner::new(cfg.clone())),
        Arc::new(ProjectDiscovery::new(cfg)),
        ProviderRegistry::with_providers(providers),
    ))
}
