// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Asynchronous batch writer.
//!
//! Enqueue is non-blocking and bounded (drop-oldest on overflow); a single
//! worker task owns all writes so transactions never overlap. Batches flush
//! when full, when the age window elapses, on an explicit flush request, and
//! at shutdown. After a commit the worker advances each session's
//! previous-template state and workflow tracker.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{oneshot, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use clai_core::{CommandEvent, Config};
use clai_shell::{prenormalize, tags::segment_tags, NormalizeOptions};
use clai_storage::{IngestRecord, SegmentRecord, Store};

use crate::sessions::{PendingCommand, SessionManager, SessionRecord};

/// The write connection, shared between the batch worker and the feedback
/// paths (dismissals, profile persistence). The mutex keeps "exactly one
/// writer at a time" true.
pub type SharedStore = Arc<Mutex<Store>>;

/// Build the ingest record for a finished command from the session's stash.
pub fn build_record(
    session: &SessionRecord,
    pending: &PendingCommand,
    exit_code: i32,
    duration_ms: i64,
    ts_ms: i64,
    cfg: &Config,
) -> IngestRecord {
    let opts = NormalizeOptions {
        max_bytes: cfg.max_event_bytes,
        alias_max_depth: cfg.alias_max_depth,
    };
    let norm = prenormalize(&pending.raw, &session.aliases, &opts);

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

    let has_prev = !session.last_template.as_str().is_empty();

    IngestRecord {
        event: CommandEvent {
            session_id: session.session_id.clone(),
            ts_ms,
            cwd: pending.cwd.clone(),
            repo_key: pending.repo_key.clone(),
            branch: pending.branch.clone(),
            raw: pending.raw.clone(),
            cmd_norm: norm.cmd_norm.clone(),
            truncated: norm.truncated,
            template_id: norm.template_id.clone(),
            exit_code,
            duration_ms,
            ephemeral: session.ephemeral,
        },
        tags: norm.tags,
        slot_count: count_slots(&norm.cmd_norm),
        segments,
        prev_template: has_prev.then(|| session.last_template.clone()),
        prev_exit: has_prev.then_some(session.last_exit_code),
        project_types: session.project_types.clone(),
    }
}

fn count_slots(norm: &str) -> u32 {
    norm.split_whitespace()
        .filter(|t| matches!(*t, "<UUID>" | "<PATH>" | "<URL>" | "<NUM>"))
        .count() as u32
}

struct WriterInner {
    queue: Mutex<VecDeque<IngestRecord>>,
    capacity: usize,
    batch_max: usize,
    batch_age: Duration,
    wake: Notify,
    flush_requested: AtomicBool,
    flush_waiters: Mutex<Vec<oneshot::Sender<()>>>,
    shutdown: AtomicBool,
    dropped: AtomicU64,
}

/// Handle to the batch writer queue.
#[derive(Clone)]
pub struct BatchWriter {
    inner: Arc<WriterInner>,
}

impl BatchWriter {
    /// Spawn the worker task. The returned handle completes after a
    /// [`BatchWriter::shutdown`] once the queue has drained.
    pub fn spawn(
        store: SharedStore,
        sessions: Arc<SessionManager>,
        cfg: &Config,
    ) -> (Self, JoinHandle<()>) {
        let inner = Arc::new(WriterInner {
            queue: Mutex::new(VecDeque::new()),
            capacity: cfg.queue_capacity,
            batch_max: cfg.batch_max,
            batch_age: Duration::from_millis(cfg.batch_age_ms),
            wake: Notify::new(),
            flush_requested: AtomicBool::new(false),
            flush_waiters: Mutex::new(Vec::new()),
            shutdown: AtomicBool::new(false),
            dropped: AtomicU64::new(0),
        });

        let worker_inner = Arc::clone(&inner);
        let handle = tokio::spawn(async move {
            run_worker(worker_inner, store, sessions).await;
        });

        (Self { inner }, handle)
    }

    /// Queue one record. Never blocks; the oldest queued record is dropped
    /// when the queue is full.
    pub fn enqueue(&self, record: IngestRecord) {
        let len = {
            let mut queue = self.inner.queue.lock();
            if queue.len() >= self.inner.capacity {
                queue.pop_front();
                let dropped = self.inner.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                warn!(dropped, "ingest queue full, dropping oldest event");
            }
            queue.push_back(record);
            queue.len()
        };
        // Wake on the first record (starts the age window) and when the
        // batch is full (flush early).
        if len == 1 || len >= self.inner.batch_max {
            self.inner.wake.notify_one();
        }
    }

    /// Flush everything queued and wait for the commits.
    pub async fn flush(&self) {
        let (tx, rx) = oneshot::channel();
        self.inner.flush_waiters.lock().push(tx);
        self.inner.flush_requested.store(true, Ordering::SeqCst);
        self.inner.wake.notify_one();
        let _ = rx.await;
    }

    /// Signal shutdown; the worker drains the queue and exits. Await the
    /// spawn handle to join it.
    pub fn shutdown(&self) {
        self.inner.shutdown.store(true, Ordering::SeqCst);
        self.inner.wake.notify_one();
    }

    /// Events dropped to overflow since startup.
    pub fn dropped(&self) -> u64 {
        self.inner.dropped.load(Ordering::Relaxed)
    }

    /// Records currently queued (test and status surface).
    pub fn queued(&self) -> usize {
        self.inner.queue.lock().len()
    }
}

async fn run_worker(inner: Arc<WriterInner>, store: SharedStore, sessions: Arc<SessionManager>) {
    loop {
        // Wait for work, a flush request, or shutdown.
        loop {
            if inner.shutdown.load(Ordering::SeqCst)
                || inner.flush_requested.load(Ordering::SeqCst)
                || !inner.queue.lock().is_empty()
            {
                break;
            }
            inner.wake.notified().await;
        }

        // Give a partial batch its age window unless something wants it now.
        if !inner.flush_requested.load(Ordering::SeqCst) && !inner.shutdown.load(Ordering::SeqCst) {
            let len = inner.queue.lock().len();
            if len > 0 && len < inner.batch_max {
                tokio::select! {
                    _ = inner.wake.notified() => {}
                    _ = tokio::time::sleep(inner.batch_age) => {}
                }
            }
        }

        // Drain everything queued, batch by batch.
        loop {
            let batch: Vec<IngestRecord> = {
                let mut queue = inner.queue.lock();
                let n = queue.len().min(inner.batch_max);
                queue.drain(..n).collect()
            };
            if batch.is_empty() {
                break;
            }
            apply_batch(&store, &sessions, &batch).await;
        }

        inner.flush_requested.store(false, Ordering::SeqCst);
        for waiter in inner.flush_waiters.lock().drain(..) {
            let _ = waiter.send(());
        }

        if inner.shutdown.load(Ordering::SeqCst) && inner.queue.lock().is_empty() {
            debug!("batch writer drained, exiting");
            break;
        }
    }
}

/// Apply one batch with a single retry on transient (busy/locked) errors,
/// then advance per-session state for the committed events.
async fn apply_batch(store: &SharedStore, sessions: &SessionManager, batch: &[IngestRecord]) {
    let result = store.lock().apply_batch(batch);
    let result = match result {
        Err(err) if err.is_transient() => {
            debug!(error = %err, "transient storage error, retrying batch once");
            tokio::time::sleep(Duration::from_millis(10)).await;
            store.lock().apply_batch(batch)
        }
        other => other,
    };

    if let Err(err) = result {
        warn!(error = %err, events = batch.len(), "dropping batch after write failure");
        return;
    }

    // Post-commit: the session's previous-template now reflects this event,
    // and the workflow tracker consumes it.
    let patterns = match store.lock().workflows() {
        Ok(patterns) => patterns,
        Err(err) => {
            warn!(error = %err, "failed to load workflow patterns");
            Vec::new()
        }
    };

    for record in batch {
        let ev = &record.event;
        sessions.set_last_command(
            &ev.session_id,
            ev.raw.clone(),
            ev.cwd.clone(),
            ev.repo_key.clone(),
            ev.branch.clone(),
            ev.template_id.clone(),
            ev.exit_code,
        );
        if !patterns.is_empty() {
            sessions.observe_workflow(&ev.session_id, &patterns, &ev.template_id);
        }
    }
}

#[cfg(test)]
#[path = "ingest_tests.rs"]
mod tests;
