// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Online per-scope weight learner.
//!
//! A bounded pairwise update, not gradient descent: each feedback event
//! nudges the scope's weight vector toward the accepted candidate's feature
//! vector and away from the best rejected one. Freeze window, decaying
//! learning rate, clamping, and re-normalization keep the profile stable.

use std::collections::HashMap;

use parking_lot::Mutex;
use tracing::debug;

use clai_core::rank::{RISK_PENALTY_INDEX, RISK_PENALTY_MIN, WEIGHT_MAX};
use clai_core::{Config, FeedbackAction, RankWeights, Suggestion, FEATURE_COUNT};

/// Outcome of one feedback event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LearnOutcome {
    /// Still inside the freeze window; only the sample count moved.
    Frozen,
    /// Weights were updated.
    Updated,
    /// Nothing to learn from (no counterpart candidate, or identical
    /// feature vectors).
    Skipped,
}

/// Per-scope learner state. Reads return snapshots; updates serialize on an
/// internal mutex per scope map.
pub struct Learner {
    cfg: Config,
    profiles: Mutex<HashMap<String, RankWeights>>,
}

impl Learner {
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            profiles: Mutex::new(HashMap::new()),
        }
    }

    /// Immutable snapshot of a scope's profile (default when untrained).
    pub fn snapshot(&self, scope: &str) -> RankWeights {
        self.profiles
            .lock()
            .get(scope)
            .cloned()
            .unwrap_or_default()
    }

    /// Seed a profile loaded from storage.
    pub fn load(&self, scope: &str, profile: RankWeights) {
        self.profiles.lock().insert(scope.to_string(), profile);
    }

    /// Apply one feedback event against the candidate set that was shown.
    ///
    /// Returns the outcome plus the resulting profile for asynchronous
    /// persistence.
    pub fn feedback(
        &self,
        scope: &str,
        action: FeedbackAction,
        suggested: &str,
        candidates: &[Suggestion],
    ) -> (LearnOutcome, RankWeights) {
        let Some((chosen, counterpart)) = resolve_pair(suggested, candidates) else {
            return (LearnOutcome::Skipped, self.snapshot(scope));
        };

        // Positive is the accepted/edited candidate; for dismissed/never the
        // pair swaps so the shown-but-rejected candidate is pushed down.
        let (pos, neg) = if action.is_positive() {
            (chosen, counterpart)
        } else {
            (counterpart, chosen)
        };

        if pos == neg {
            return (LearnOutcome::Skipped, self.snapshot(scope));
        }

        let mut profiles = self.profiles.lock();
        let profile = profiles.entry(scope.to_string()).or_default();

        // Freeze window: accumulate samples before touching weights.
        if profile.samples < self.cfg.learner_min_samples {
            profile.samples += 1;
            return (LearnOutcome::Frozen, profile.clone());
        }

        let eta = (self.cfg.learner_eta_init
            / (1.0 + profile.samples as f64 / self.cfg.learner_eta_decay))
            .max(self.cfg.learner_eta_floor);
        profile.learning_rate = eta;
        profile.samples += 1;

        let prior_sum = profile.non_penalty_sum();

        for i in 0..FEATURE_COUNT {
            if i == RISK_PENALTY_INDEX {
                continue;
            }
            profile.weights[i] += eta * (pos[i] - neg[i]);
        }

        // Clamp, then restore the non-penalty mass so one feedback event
        // cannot inflate or deflate the whole profile.
        for (i, weight) in profile.weights.iter_mut().enumerate() {
            let floor = if i == RISK_PENALTY_INDEX {
                RISK_PENALTY_MIN
            } else {
                0.0
            };
            *weight = weight.clamp(floor, WEIGHT_MAX);
        }

        let new_sum = profile.non_penalty_sum();
        if new_sum > 0.0 && prior_sum > 0.0 {
            let scale = prior_sum / new_sum;
            for weight in profile.weights.iter_mut().take(RISK_PENALTY_INDEX) {
                *weight = (*weight * scale).clamp(0.0, WEIGHT_MAX);
            }
        }

        debug!(scope, samples = profile.samples, eta, "rank profile updated");
        (LearnOutcome::Updated, profile.clone())
    }
}

/// Resolve the (chosen, best-other) feature vector pair from the shown
/// candidate set.
fn resolve_pair(
    suggested: &str,
    candidates: &[Suggestion],
) -> Option<([f64; FEATURE_COUNT], [f64; FEATURE_COUNT])> {
    let chosen = candidates
        .iter()
        .find(|c| c.text == suggested || c.cmd_norm == suggested)?;
    let counterpart = candidates
        .iter()
        .filter(|c| c.text != chosen.text)
        .max_by(|a, b| a.score.total_cmp(&b.score).then(b.text.cmp(&a.text)))?;
    Some((chosen.features, counterpart.features))
}

#[cfg(test)]
#[path = "learner_tests.rs"]
mod tests;
