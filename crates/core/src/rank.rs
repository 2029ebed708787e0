// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ranking feature set and per-scope weight profiles.
//!
//! The scorer accumulates per-candidate contributions into ten feature
//! classes; the online learner nudges a per-scope weight vector over those
//! classes. A fresh profile is uniform, so an untrained scope reproduces the
//! static weight table exactly.

use serde::{Deserialize, Serialize};

/// Number of ranking features (fixed).
pub const FEATURE_COUNT: usize = 10;

/// The ten ranking features, in storage order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    Transition,
    Frequency,
    Success,
    Prefix,
    Affinity,
    Task,
    Feedback,
    ProjectTypeAffinity,
    FailureRecovery,
    RiskPenalty,
}

impl Feature {
    pub const ALL: [Feature; FEATURE_COUNT] = [
        Feature::Transition,
        Feature::Frequency,
        Feature::Success,
        Feature::Prefix,
        Feature::Affinity,
        Feature::Task,
        Feature::Feedback,
        Feature::ProjectTypeAffinity,
        Feature::FailureRecovery,
        Feature::RiskPenalty,
    ];

    /// Index into a weight vector.
    pub fn index(self) -> usize {
        match self {
            Feature::Transition => 0,
            Feature::Frequency => 1,
            Feature::Success => 2,
            Feature::Prefix => 3,
            Feature::Affinity => 4,
            Feature::Task => 5,
            Feature::Feedback => 6,
            Feature::ProjectTypeAffinity => 7,
            Feature::FailureRecovery => 8,
            Feature::RiskPenalty => 9,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Feature::Transition => "transition",
            Feature::Frequency => "frequency",
            Feature::Success => "success",
            Feature::Prefix => "prefix",
            Feature::Affinity => "affinity",
            Feature::Task => "task",
            Feature::Feedback => "feedback",
            Feature::ProjectTypeAffinity => "project_type_affinity",
            Feature::FailureRecovery => "failure_recovery",
            Feature::RiskPenalty => "risk_penalty",
        }
    }
}

/// Index of the risk-penalty weight, which clamps differently.
pub const RISK_PENALTY_INDEX: usize = 9;

/// Upper clamp for every weight.
pub const WEIGHT_MAX: f64 = 0.60;

/// Lower clamp for the risk-penalty weight.
pub const RISK_PENALTY_MIN: f64 = 0.10;

/// A per-scope feature weight vector with learner bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankWeights {
    pub weights: [f64; FEATURE_COUNT],
    /// Feedback events observed for this scope (drives the freeze window
    /// and the learning-rate schedule).
    pub samples: u64,
    /// Effective learning rate at the last update.
    pub learning_rate: f64,
}

impl Default for RankWeights {
    fn default() -> Self {
        Self {
            weights: [0.10; FEATURE_COUNT],
            samples: 0,
            learning_rate: 0.02,
        }
    }
}

impl RankWeights {
    pub fn weight(&self, feature: Feature) -> f64 {
        self.weights[feature.index()]
    }

    /// Multiplier the scorer applies to a feature-class subtotal: the learned
    /// weight relative to the uniform default, so a fresh profile is identity.
    pub fn multiplier(&self, feature: Feature) -> f64 {
        self.weights[feature.index()] / 0.10
    }

    /// Sum of the nine non-penalty weights.
    pub fn non_penalty_sum(&self) -> f64 {
        self.weights
            .iter()
            .take(RISK_PENALTY_INDEX)
            .copied()
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_profile_is_uniform_identity() {
        let profile = RankWeights::default();
        for feature in Feature::ALL {
            assert!((profile.weight(feature) - 0.10).abs() < 1e-12);
            assert!((profile.multiplier(feature) - 1.0).abs() < 1e-12);
        }
        assert!((profile.non_penalty_sum() - 0.90).abs() < 1e-12);
    }

    #[test]
    fn feature_indices_are_dense_and_unique() {
        let mut seen = [false; FEATURE_COUNT];
        for feature in Feature::ALL {
            assert!(!seen[feature.index()]);
            seen[feature.index()] = true;
        }
        assert!(seen.iter().all(|&s| s));
        assert_eq!(Feature::RiskPenalty.index(), RISK_PENALTY_INDEX);
    }

    #[test]
    fn feature_names_match_storage_order() {
        assert_eq!(Feature::Transition.as_str(), "transition");
        assert_eq!(Feature::ProjectTypeAffinity.as_str(), "project_type_affinity");
        assert_eq!(Feature::RiskPenalty.as_str(), "risk_penalty");
    }
}
