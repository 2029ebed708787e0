// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-session workflow matching.
//!
//! A workflow is a named ordered template chain. Each session holds a
//! bounded LRU of partially matched workflows: the templates consumed so far
//! and the next expected element. Observing a command either advances a
//! match, abandons it, or starts a new one.

use clai_core::TemplateId;
use clai_storage::WorkflowRow;

/// One partially matched workflow.
#[derive(Debug, Clone, PartialEq)]
struct ActiveWorkflow {
    name: String,
    chain: Vec<TemplateId>,
    /// Templates consumed so far; `chain[matched]` is the next expected.
    matched: usize,
}

/// Bounded LRU of partially matched workflows for one session.
#[derive(Debug, Clone, Default)]
pub struct WorkflowState {
    active: Vec<ActiveWorkflow>,
    capacity: usize,
}

impl WorkflowState {
    pub fn new(capacity: usize) -> Self {
        Self {
            active: Vec::new(),
            capacity: capacity.max(1),
        }
    }

    /// Feed one observed template through the tracker.
    ///
    /// Existing matches advance when the observation is their expected next
    /// element and are dropped otherwise (a workflow is a strict sequence).
    /// Completed matches are removed. Any pattern whose first element is the
    /// observation starts a fresh match, evicting the least recently
    /// advanced one when the LRU is full.
    pub fn observe(&mut self, patterns: &[WorkflowRow], observed: &TemplateId) {
        let mut kept = Vec::with_capacity(self.active.len());
        for mut wf in self.active.drain(..) {
            if wf.chain.get(wf.matched) == Some(observed) {
                wf.matched += 1;
                if wf.matched < wf.chain.len() {
                    kept.push(wf);
                }
            }
            // Mismatch: the sequence broke, drop the partial match.
        }
        self.active = kept;

        for pattern in patterns {
            if pattern.chain.first() != Some(observed) {
                continue;
            }
            if self.active.iter().any(|wf| wf.name == pattern.name) {
                continue;
            }
            if self.active.len() >= self.capacity {
                self.active.remove(0);
            }
            self.active.push(ActiveWorkflow {
                name: pattern.name.clone(),
                chain: pattern.chain.clone(),
                matched: 1,
            });
        }
    }

    /// Templates the active workflows expect next, deduplicated in order.
    pub fn expected_next(&self) -> Vec<TemplateId> {
        let mut out: Vec<TemplateId> = Vec::new();
        for wf in &self.active {
            if let Some(next) = wf.chain.get(wf.matched) {
                if !out.contains(next) {
                    out.push(next.clone());
                }
            }
        }
        out
    }

    /// Number of partially matched workflows.
    pub fn active_count(&self) -> usize {
        self.active.len()
    }
}

#[cfg(test)]
#[path = "workflow_tests.rs"]
mod tests;
