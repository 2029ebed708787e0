// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    accepted = { "accepted", FeedbackAction::Accepted },
    edited = { "edited", FeedbackAction::Edited },
    dismissed = { "dismissed", FeedbackAction::Dismissed },
    never = { "never", FeedbackAction::Never },
    unblock = { "unblock", FeedbackAction::Unblock },
)]
fn parse_known_actions(input: &str, expected: FeedbackAction) {
    assert_eq!(FeedbackAction::parse(input), Some(expected));
    assert_eq!(expected.as_str(), input);
}

#[test]
fn parse_unknown_action_is_none() {
    assert_eq!(FeedbackAction::parse("ignored"), None);
    assert_eq!(FeedbackAction::parse(""), None);
    assert_eq!(FeedbackAction::parse("ACCEPTED"), None);
}

#[test]
fn positive_classification() {
    assert!(FeedbackAction::Accepted.is_positive());
    assert!(FeedbackAction::Edited.is_positive());
    assert!(!FeedbackAction::Dismissed.is_positive());
    assert!(!FeedbackAction::Never.is_positive());
    assert!(!FeedbackAction::Unblock.is_positive());
}

#[test]
fn dismissal_event_mapping() {
    use crate::dismissal::DismissalEvent;
    assert_eq!(
        FeedbackAction::Accepted.dismissal_event(),
        DismissalEvent::Accept
    );
    assert_eq!(
        FeedbackAction::Dismissed.dismissal_event(),
        DismissalEvent::Dismiss
    );
    assert_eq!(FeedbackAction::Never.dismissal_event(), DismissalEvent::Never);
    assert_eq!(
        FeedbackAction::Unblock.dismissal_event(),
        DismissalEvent::Unblock
    );
}
