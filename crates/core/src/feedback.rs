// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Feedback actions reported by the shell UI after a suggestion was shown.

use serde::{Deserialize, Serialize};

use crate::dismissal::DismissalEvent;

/// What the user did with a suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackAction {
    Accepted,
    /// Accepted after editing; treated as a positive signal.
    Edited,
    Dismissed,
    /// "Never show this again."
    Never,
    /// Lift a permanent block.
    Unblock,
}

impl FeedbackAction {
    /// Parse the wire string; `None` for unknown actions (invalid request).
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "accepted" => Some(Self::Accepted),
            "edited" => Some(Self::Edited),
            "dismissed" => Some(Self::Dismissed),
            "never" => Some(Self::Never),
            "unblock" => Some(Self::Unblock),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::Edited => "edited",
            Self::Dismissed => "dismissed",
            Self::Never => "never",
            Self::Unblock => "unblock",
        }
    }

    /// True for accept/edit, which reward the suggested candidate.
    pub fn is_positive(&self) -> bool {
        matches!(self, Self::Accepted | Self::Edited)
    }

    /// Corresponding dismissal state-machine event.
    pub fn dismissal_event(&self) -> DismissalEvent {
        match self {
            Self::Accepted | Self::Edited => DismissalEvent::Accept,
            Self::Dismissed => DismissalEvent::Dismiss,
            Self::Never => DismissalEvent::Never,
            Self::Unblock => DismissalEvent::Unblock,
        }
    }
}

#[cfg(test)]
#[path = "feedback_tests.rs"]
mod tests;
