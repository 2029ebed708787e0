// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

const THRESHOLD: u32 = 3;

#[test]
fn none_dismiss_goes_temporary() {
    let next = DismissalState::None.apply(DismissalEvent::Dismiss, THRESHOLD);
    assert_eq!(next, DismissalState::Temporary { count: 1 });
}

#[test]
fn temporary_counts_up_to_learned() {
    let mut state = DismissalState::None;
    state = state.apply(DismissalEvent::Dismiss, THRESHOLD);
    state = state.apply(DismissalEvent::Dismiss, THRESHOLD);
    assert_eq!(state, DismissalState::Temporary { count: 2 });
    state = state.apply(DismissalEvent::Dismiss, THRESHOLD);
    assert_eq!(state, DismissalState::Learned { count: 3 });
}

#[test]
fn threshold_one_skips_temporary() {
    let next = DismissalState::None.apply(DismissalEvent::Dismiss, 1);
    assert_eq!(next, DismissalState::Learned { count: 1 });
}

#[test]
fn learned_keeps_counting() {
    let state = DismissalState::Learned { count: 3 }.apply(DismissalEvent::Dismiss, THRESHOLD);
    assert_eq!(state, DismissalState::Learned { count: 4 });
}

#[parameterized(
    from_none = { DismissalState::None },
    from_temporary = { DismissalState::Temporary { count: 2 } },
    from_learned = { DismissalState::Learned { count: 5 } },
    from_permanent = { DismissalState::Permanent { count: 1 } },
)]
fn accept_clears_any_state(state: DismissalState) {
    assert_eq!(
        state.apply(DismissalEvent::Accept, THRESHOLD),
        DismissalState::None
    );
}

#[parameterized(
    from_none = { DismissalState::None, 0 },
    from_temporary = { DismissalState::Temporary { count: 2 }, 2 },
    from_learned = { DismissalState::Learned { count: 5 }, 5 },
)]
fn never_goes_permanent(state: DismissalState, count: u32) {
    assert_eq!(
        state.apply(DismissalEvent::Never, THRESHOLD),
        DismissalState::Permanent { count }
    );
}

#[test]
fn permanent_ignores_dismiss() {
    let state = DismissalState::Permanent { count: 2 };
    assert_eq!(state.apply(DismissalEvent::Dismiss, THRESHOLD), state);
}

#[test]
fn unblock_only_clears_permanent() {
    assert_eq!(
        DismissalState::Permanent { count: 2 }.apply(DismissalEvent::Unblock, THRESHOLD),
        DismissalState::None
    );
    let temp = DismissalState::Temporary { count: 1 };
    assert_eq!(temp.apply(DismissalEvent::Unblock, THRESHOLD), temp);
    let learned = DismissalState::Learned { count: 4 };
    assert_eq!(learned.apply(DismissalEvent::Unblock, THRESHOLD), learned);
}

#[parameterized(
    none = { DismissalState::None, 1.0 },
    temporary = { DismissalState::Temporary { count: 1 }, 0.65 },
    learned = { DismissalState::Learned { count: 3 }, 0.3 },
    permanent = { DismissalState::Permanent { count: 3 }, 0.0 },
)]
fn score_multipliers(state: DismissalState, expected: f64) {
    assert!((state.score_multiplier() - expected).abs() < f64::EPSILON);
}

#[test]
fn level_str_roundtrip() {
    for state in [
        DismissalState::Temporary { count: 2 },
        DismissalState::Learned { count: 3 },
        DismissalState::Permanent { count: 4 },
    ] {
        let level = state.level_str().unwrap();
        assert_eq!(DismissalState::from_level(level, state.count()), state);
    }
    assert!(DismissalState::None.level_str().is_none());
}
