// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine tunables, collected in one place so tests can construct variants
//! and the daemon can apply environment overrides.

use serde::{Deserialize, Serialize};

/// One week, the default decay time constant.
pub const DEFAULT_TAU_MS: i64 = 7 * 24 * 60 * 60 * 1000;

/// Default daemon idle shutdown: two hours.
pub const DEFAULT_IDLE_TIMEOUT_MS: i64 = 2 * 60 * 60 * 1000;

/// Static per-source weight table. The learner scales these
/// through the per-scope profile multipliers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceWeights {
    pub dir_trans: f64,
    pub repo_trans: f64,
    pub global_trans: f64,
    pub dir_freq: f64,
    pub repo_freq: f64,
    pub global_freq: f64,
    pub project_task: f64,
}

impl Default for SourceWeights {
    fn default() -> Self {
        Self {
            dir_trans: 90.0,
            repo_trans: 80.0,
            global_trans: 60.0,
            dir_freq: 40.0,
            repo_freq: 30.0,
            global_freq: 30.0,
            project_task: 20.0,
        }
    }
}

/// All engine tunables with their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Raw command size bound in bytes; longer commands are truncated and
    /// flagged.
    pub max_event_bytes: usize,
    /// Alias expansion depth bound.
    pub alias_max_depth: usize,
    /// Decay time constant in milliseconds.
    pub tau_ms: i64,
    /// Batch writer: flush when this many events are queued.
    pub batch_max: usize,
    /// Batch writer: flush when the oldest queued event is this old.
    pub batch_age_ms: u64,
    /// Ingest queue capacity; oldest events are dropped on overflow.
    pub queue_capacity: usize,
    /// Dismiss count at which suppression becomes LEARNED.
    pub learned_threshold: u32,
    /// Default suggestion count.
    pub top_k: usize,
    /// Hard cap on suggestion count.
    pub top_k_max: usize,
    /// Per-scope row caps for candidate collection.
    pub collect_limit: usize,
    /// Static source weight table.
    pub weights: SourceWeights,
    /// Workflow amplifier multiplier.
    pub workflow_boost: f64,
    /// Pipeline-confidence amplifier weight.
    pub pipeline_weight: f64,
    /// Recovery amplifier multiplier.
    pub recovery_boost: f64,
    /// Flat score penalty for dangerous commands.
    pub dangerous_penalty: f64,
    /// Prefixes at or under this length get fuzzy (distance 1) matching.
    pub fuzzy_prefix_max: usize,
    /// Learner freeze window.
    pub learner_min_samples: u64,
    pub learner_eta_init: f64,
    pub learner_eta_decay: f64,
    pub learner_eta_floor: f64,
    /// Daemon idle shutdown in milliseconds.
    pub idle_timeout_ms: i64,
    /// Sessions with no activity for this long are aged out of the registry.
    pub session_idle_ms: i64,
    /// AI provider subprocess timeout in milliseconds.
    pub provider_timeout_ms: u64,
    /// Task discovery wall-clock cap in milliseconds.
    pub discovery_timeout_ms: u64,
    /// Task discovery output byte cap.
    pub discovery_output_max: usize,
    /// Task discovery input file size cap.
    pub discovery_file_max: usize,
    /// Bounded LRU of partially matched workflows per session.
    pub workflow_lru: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_event_bytes: 10 * 1024,
            alias_max_depth: 5,
            tau_ms: DEFAULT_TAU_MS,
            batch_max: 64,
            batch_age_ms: 50,
            queue_capacity: 1024,
            learned_threshold: 3,
            top_k: 3,
            top_k_max: 10,
            collect_limit: 10,
            weights: SourceWeights::default(),
            workflow_boost: 1.5,
            pipeline_weight: 50.0,
            recovery_boost: 2.0,
            dangerous_penalty: 50.0,
            fuzzy_prefix_max: 5,
            learner_min_samples: 30,
            learner_eta_init: 0.02,
            learner_eta_decay: 500.0,
            learner_eta_floor: 0.001,
            idle_timeout_ms: DEFAULT_IDLE_TIMEOUT_MS,
            session_idle_ms: 8 * 60 * 60 * 1000,
            provider_timeout_ms: 20_000,
            discovery_timeout_ms: 500,
            discovery_output_max: 1024 * 1024,
            discovery_file_max: 512 * 1024,
            workflow_lru: 8,
        }
    }
}

impl Config {
    /// Clamp a requested result count to `[1, top_k_max]`, defaulting to
    /// `top_k` when zero.
    pub fn clamp_top_k(&self, requested: usize) -> usize {
        if requested == 0 {
            self.top_k
        } else {
            requested.min(self.top_k_max)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = Config::default();
        assert_eq!(cfg.max_event_bytes, 10 * 1024);
        assert_eq!(cfg.tau_ms, 7 * 24 * 60 * 60 * 1000);
        assert_eq!(cfg.learned_threshold, 3);
        assert_eq!(cfg.top_k, 3);
        assert_eq!(cfg.top_k_max, 10);
        assert_eq!(cfg.idle_timeout_ms, 2 * 60 * 60 * 1000);
        assert!((cfg.weights.dir_trans - 90.0).abs() < f64::EPSILON);
        assert!((cfg.weights.global_freq - 30.0).abs() < f64::EPSILON);
    }

    #[test]
    fn clamp_top_k_bounds() {
        let cfg = Config::default();
        assert_eq!(cfg.clamp_top_k(0), 3);
        assert_eq!(cfg.clamp_top_k(5), 5);
        assert_eq!(cfg.clamp_top_k(50), 10);
    }
}
