// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dismissal suppression state machine.
//!
//! Keyed by `(scope, context_template, dismissed_template)` in storage; the
//! transition logic is pure so it can be tested exhaustively and shared by
//! the store and the scorer.

use serde::{Deserialize, Serialize};

/// Suppression level for a (context, candidate) pair. Absence of a stored
/// row means `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DismissalState {
    None,
    /// Dismissed fewer times than the learned threshold.
    Temporary { count: u32 },
    /// Dismissed at or past the threshold; strongly suppressed.
    Learned { count: u32 },
    /// User said "never"; only an explicit unblock clears it.
    Permanent { count: u32 },
}

/// Feedback events that drive the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DismissalEvent {
    Dismiss,
    Accept,
    Never,
    Unblock,
}

impl DismissalState {
    /// Apply one feedback event, returning the next state.
    ///
    /// `threshold` is the dismiss count at which suppression becomes
    /// `Learned`; with `threshold = 1` the first dismiss goes straight from
    /// `None` to `Learned`.
    pub fn apply(self, event: DismissalEvent, threshold: u32) -> Self {
        match (self, event) {
            (_, DismissalEvent::Accept) => Self::None,
            (_, DismissalEvent::Never) => {
                let count = self.count();
                Self::Permanent { count }
            }
            (Self::Permanent { .. }, DismissalEvent::Unblock) => Self::None,
            (state, DismissalEvent::Unblock) => state,
            (Self::Permanent { count }, DismissalEvent::Dismiss) => Self::Permanent { count },
            (state, DismissalEvent::Dismiss) => {
                let count = state.count() + 1;
                if count >= threshold {
                    Self::Learned { count }
                } else {
                    Self::Temporary { count }
                }
            }
        }
    }

    /// Dismiss count carried by the state (0 for `None`).
    pub fn count(&self) -> u32 {
        match self {
            Self::None => 0,
            Self::Temporary { count } | Self::Learned { count } | Self::Permanent { count } => {
                *count
            }
        }
    }

    /// Score multiplier the scorer applies for this suppression level.
    ///
    /// Temporary sits at the midpoint between learned and no suppression.
    pub fn score_multiplier(&self) -> f64 {
        match self {
            Self::None => 1.0,
            Self::Temporary { .. } => 0.65,
            Self::Learned { .. } => 0.3,
            Self::Permanent { .. } => 0.0,
        }
    }

    /// Storage level string; `None` has no row.
    pub fn level_str(&self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Temporary { .. } => Some("TEMPORARY"),
            Self::Learned { .. } => Some("LEARNED"),
            Self::Permanent { .. } => Some("PERMANENT"),
        }
    }

    /// Reconstruct a state from its storage representation.
    pub fn from_level(level: &str, count: u32) -> Self {
        match level {
            "TEMPORARY" => Self::Temporary { count },
            "LEARNED" => Self::Learned { count },
            "PERMANENT" => Self::Permanent { count },
            _ => Self::None,
        }
    }
}

#[cfg(test)]
#[path = "dismissal_tests.rs"]
mod tests;
