// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use clai_core::rank::{RISK_PENALTY_INDEX, RISK_PENALTY_MIN, WEIGHT_MAX};
use clai_core::{Feature, Reason, TemplateId};

fn suggestion(text: &str, score: f64, features: [f64; FEATURE_COUNT]) -> Suggestion {
    Suggestion {
        text: text.to_string(),
        description: String::new(),
        source: "engine".to_string(),
        score,
        risk: false,
        cmd_norm: text.to_string(),
        template_id: TemplateId::new(text),
        confidence: 0.5,
        reasons: vec![Reason::GlobalFreq],
        frequency: 0.0,
        last_seen_ms: 0,
        features,
    }
}

fn two_candidates() -> Vec<Suggestion> {
    let mut a = [0.0; FEATURE_COUNT];
    a[Feature::Transition.index()] = 0.9;
    let mut b = [0.0; FEATURE_COUNT];
    b[Feature::Frequency.index()] = 0.9;
    vec![suggestion("git push", 10.0, a), suggestion("git pull", 8.0, b)]
}

fn warmed_learner() -> Learner {
    let cfg = Config {
        learner_min_samples: 0,
        ..Default::default()
    };
    Learner::new(cfg)
}

#[test]
fn freeze_window_counts_without_updating() {
    let learner = Learner::new(Config::default());
    let candidates = two_candidates();
    for i in 0..30 {
        let (outcome, profile) =
            learner.feedback("global", FeedbackAction::Accepted, "git push", &candidates);
        assert_eq!(outcome, LearnOutcome::Frozen, "event {i}");
        assert_eq!(profile.weights, RankWeights::default().weights);
    }
    // The 31st event escapes the freeze window.
    let (outcome, profile) =
        learner.feedback("global", FeedbackAction::Accepted, "git push", &candidates);
    assert_eq!(outcome, LearnOutcome::Updated);
    assert_ne!(profile.weights, RankWeights::default().weights);
}

#[test]
fn accept_moves_weight_toward_chosen_features() {
    let learner = warmed_learner();
    let candidates = two_candidates();
    let (outcome, profile) =
        learner.feedback("global", FeedbackAction::Accepted, "git push", &candidates);
    assert_eq!(outcome, LearnOutcome::Updated);
    // Chosen had transition mass, counterpart had frequency mass: after
    // renormalization transition must exceed frequency.
    assert!(profile.weight(Feature::Transition) > profile.weight(Feature::Frequency));
}

#[test]
fn dismiss_swaps_the_pair() {
    let learner = warmed_learner();
    let candidates = two_candidates();
    let (outcome, profile) =
        learner.feedback("global", FeedbackAction::Dismissed, "git push", &candidates);
    assert_eq!(outcome, LearnOutcome::Updated);
    assert!(profile.weight(Feature::Frequency) > profile.weight(Feature::Transition));
}

#[test]
fn unknown_suggested_text_is_skipped() {
    let learner = warmed_learner();
    let (outcome, profile) =
        learner.feedback("global", FeedbackAction::Accepted, "nope", &two_candidates());
    assert_eq!(outcome, LearnOutcome::Skipped);
    assert_eq!(profile, RankWeights::default());
}

#[test]
fn single_candidate_is_skipped() {
    let learner = warmed_learner();
    let only = vec![suggestion("git push", 10.0, [0.1; FEATURE_COUNT])];
    let (outcome, _) = learner.feedback("global", FeedbackAction::Accepted, "git push", &only);
    assert_eq!(outcome, LearnOutcome::Skipped);
}

#[test]
fn identical_vectors_are_a_noop() {
    let learner = warmed_learner();
    let same = [0.4; FEATURE_COUNT];
    let candidates = vec![
        suggestion("git push", 10.0, same),
        suggestion("git pull", 8.0, same),
    ];
    let (outcome, _) = learner.feedback("global", FeedbackAction::Accepted, "git push", &candidates);
    assert_eq!(outcome, LearnOutcome::Skipped);
}

#[test]
fn weights_stay_clamped_over_many_updates() {
    let learner = warmed_learner();
    let candidates = two_candidates();
    for _ in 0..2_000 {
        learner.feedback("global", FeedbackAction::Accepted, "git push", &candidates);
    }
    let profile = learner.snapshot("global");
    for (i, weight) in profile.weights.iter().enumerate() {
        assert!(*weight <= WEIGHT_MAX + 1e-9, "weight {i} above max");
        let floor = if i == RISK_PENALTY_INDEX { RISK_PENALTY_MIN } else { 0.0 };
        assert!(*weight >= floor - 1e-9, "weight {i} below floor");
    }
}

#[test]
fn non_penalty_sum_preserved() {
    let learner = warmed_learner();
    let candidates = two_candidates();
    let before = learner.snapshot("global").non_penalty_sum();
    for _ in 0..50 {
        learner.feedback("global", FeedbackAction::Accepted, "git push", &candidates);
    }
    let after = learner.snapshot("global").non_penalty_sum();
    assert!((before - after).abs() < 1e-2);
}

#[test]
fn learning_rate_decays() {
    let learner = warmed_learner();
    let candidates = two_candidates();
    learner.feedback("global", FeedbackAction::Accepted, "git push", &candidates);
    let early = learner.snapshot("global").learning_rate;
    for _ in 0..1_000 {
        learner.feedback("global", FeedbackAction::Accepted, "git push", &candidates);
    }
    let late = learner.snapshot("global").learning_rate;
    assert!(late < early);
    assert!(late >= Config::default().learner_eta_floor);
}

#[test]
fn scopes_learn_independently() {
    let learner = warmed_learner();
    let candidates = two_candidates();
    learner.feedback("/repo", FeedbackAction::Accepted, "git push", &candidates);
    assert_eq!(learner.snapshot("global"), RankWeights::default());
    assert_ne!(learner.snapshot("/repo"), RankWeights::default());
}

#[test]
fn load_seeds_profile() {
    let learner = Learner::new(Config::default());
    let mut profile = RankWeights::default();
    profile.samples = 99;
    learner.load("global", profile.clone());
    assert_eq!(learner.snapshot("global").samples, 99);
}

#[test]
fn edited_counts_as_positive() {
    let learner = warmed_learner();
    let candidates = two_candidates();
    let (outcome, profile) =
        learner.feedback("global", FeedbackAction::Edited, "git push", &candidates);
    assert_eq!(outcome, LearnOutcome::Updated);
    assert!(profile.weight(Feature::Transition) > profile.weight(Feature::Frequency));
}
