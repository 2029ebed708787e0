// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Suggestion scoring engine.
//!
//! Candidates are collected from every non-empty scope (transitions,
//! frequencies, project tasks, project-type aggregates, discovery priors),
//! amplified (workflow, pipeline, recovery, dismissal, dangerous), filtered
//! by typed prefix, deduplicated by template, and sorted deterministically.
//!
//! Contributions accumulate into ten feature classes; the per-scope learned
//! profile scales each class relative to the uniform default, so an
//! untrained scope reproduces the static weight table exactly.

use std::collections::HashMap;

use clai_core::{
    Config, Feature, RankWeights, Reason, SuggestContext, Suggestion, TemplateId, FEATURE_COUNT,
    SCOPE_GLOBAL,
};
use clai_shell::{is_dangerous, prenormalize, simple_normalize, AliasMap, NormalizeOptions};
use clai_storage::{StorageError, Store};

/// Half-saturation constant for squashing score contributions into `[0, 1)`
/// feature-vector components.
const FEATURE_SQUASH: f64 = 50.0;

#[derive(Debug, Clone)]
struct Candidate {
    text: String,
    cmd_norm: String,
    template_id: TemplateId,
    description: String,
    /// Additive contributions per feature class.
    contribs: [f64; FEATURE_COUNT],
    /// Product of amplifier multipliers (workflow, recovery, dismissal).
    mult: f64,
    /// Flat dangerous penalty, subtracted after multipliers.
    penalty: f64,
    reasons: Vec<Reason>,
    frequency: f64,
    last_seen_ms: i64,
    success_count: u64,
    failure_count: u64,
    risk: bool,
    /// Prefix match strength, filled during filtering.
    prefix_strength: f64,
    /// Dismissal suppression signal for the learner vector.
    suppression: f64,
}

impl Candidate {
    fn new(text: String, cmd_norm: String, template_id: TemplateId) -> Self {
        Self {
            text,
            cmd_norm,
            template_id,
            description: String::new(),
            contribs: [0.0; FEATURE_COUNT],
            mult: 1.0,
            penalty: 0.0,
            reasons: Vec::new(),
            frequency: 0.0,
            last_seen_ms: 0,
            success_count: 0,
            failure_count: 0,
            risk: false,
            prefix_strength: 0.0,
            suppression: 0.0,
        }
    }

    fn add(&mut self, feature: Feature, amount: f64, reason: Reason) {
        self.contribs[feature.index()] += amount;
        if !self.reasons.contains(&reason) {
            self.reasons.push(reason);
        }
    }

    fn score(&self, profile: &RankWeights) -> f64 {
        let mut base = 0.0;
        for feature in Feature::ALL {
            if feature == Feature::RiskPenalty {
                continue;
            }
            base += profile.multiplier(feature) * self.contribs[feature.index()];
        }
        base * self.mult - profile.multiplier(Feature::RiskPenalty) * self.penalty
    }

    /// Bounded feature vector handed to the learner.
    fn feature_vector(&self) -> [f64; FEATURE_COUNT] {
        let mut out = [0.0; FEATURE_COUNT];
        for feature in Feature::ALL {
            let c = self.contribs[feature.index()];
            out[feature.index()] = c / (c + FEATURE_SQUASH);
        }
        let runs = self.success_count + self.failure_count;
        if runs > 0 {
            out[Feature::Success.index()] = self.success_count as f64 / runs as f64;
        }
        out[Feature::Prefix.index()] = self.prefix_strength;
        out[Feature::Feedback.index()] = self.suppression;
        if self.risk {
            out[Feature::RiskPenalty.index()] = 1.0;
        }
        out
    }
}

/// The suggestion scorer. Synchronous; all suspension happens in callers.
pub struct Scorer {
    cfg: Config,
}

impl Scorer {
    pub fn new(cfg: Config) -> Self {
        Self { cfg }
    }

    /// Rank suggestions for a context. `workflow_expected` is the session's
    /// active workflow expectation (empty when none).
    pub fn suggest(
        &self,
        store: &Store,
        profile: &RankWeights,
        workflow_expected: &[TemplateId],
        ctx: &SuggestContext,
    ) -> Result<Vec<Suggestion>, StorageError> {
        let mut candidates: HashMap<String, Candidate> = HashMap::new();

        self.collect_transitions(store, ctx, &mut candidates)?;
        self.collect_frequencies(store, ctx, &mut candidates)?;
        self.collect_project_tasks(store, ctx, &mut candidates)?;
        self.collect_project_types(store, ctx, &mut candidates)?;
        if candidates.len() < self.cfg.top_k && ctx.prefix.is_empty() {
            self.collect_discovery_priors(ctx, &mut candidates);
        }

        self.amplify_workflow(store, workflow_expected, &mut candidates)?;
        self.amplify_pipeline(store, ctx, &mut candidates)?;
        self.amplify_recovery(store, ctx, &mut candidates)?;
        self.apply_dangerous(&mut candidates);
        self.apply_dismissal(store, ctx, &mut candidates)?;

        Ok(self.finalize(profile, ctx, candidates))
    }

    /// Scopes in collection order with their weight kinds.
    fn scopes<'a>(&self, ctx: &'a SuggestContext) -> Vec<(&'a str, f64, f64, Reason, Reason)> {
        let w = &self.cfg.weights;
        let mut scopes = Vec::new();
        if !ctx.dir_scope.is_empty() {
            scopes.push((
                ctx.dir_scope.as_str(),
                w.dir_trans,
                w.dir_freq,
                Reason::DirTrans,
                Reason::DirFreq,
            ));
        }
        if !ctx.repo_key.is_empty() {
            scopes.push((
                ctx.repo_key.as_str(),
                w.repo_trans,
                w.repo_freq,
                Reason::RepoTrans,
                Reason::RepoFreq,
            ));
        }
        scopes.push((
            SCOPE_GLOBAL,
            w.global_trans,
            w.global_freq,
            Reason::GlobalTrans,
            Reason::GlobalFreq,
        ));
        scopes
    }

    fn collect_transitions(
        &self,
        store: &Store,
        ctx: &SuggestContext,
        candidates: &mut HashMap<String, Candidate>,
    ) -> Result<(), StorageError> {
        if ctx.last_template.as_str().is_empty() {
            return Ok(());
        }
        for (scope, w_trans, _, trans_reason, _) in self.scopes(ctx) {
            let rows =
                store.top_transitions(scope, &ctx.last_template, self.cfg.collect_limit, ctx.now_ms)?;
            for row in rows {
                let candidate = candidates
                    .entry(row.cmd_norm.clone())
                    .or_insert_with(|| {
                        Candidate::new(
                            row.cmd_norm.clone(),
                            row.cmd_norm.clone(),
                            row.next_template_id.clone(),
                        )
                    });
                let contribution = (1.0 + row.count as f64).ln() * w_trans;
                candidate.add(Feature::Transition, contribution, trans_reason);
                candidate.last_seen_ms = candidate.last_seen_ms.max(row.last_seen_ms);
            }
        }
        Ok(())
    }

    fn collect_frequencies(
        &self,
        store: &Store,
        ctx: &SuggestContext,
        candidates: &mut HashMap<String, Candidate>,
    ) -> Result<(), StorageError> {
        for (scope, _, w_freq, _, freq_reason) in self.scopes(ctx) {
            let rows = store.top_frequencies(scope, self.cfg.collect_limit, ctx.now_ms)?;
            for row in rows {
                let candidate = candidates
                    .entry(row.cmd_norm.clone())
                    .or_insert_with(|| {
                        Candidate::new(
                            row.cmd_norm.clone(),
                            row.cmd_norm.clone(),
                            row.template_id.clone(),
                        )
                    });
                // Frequency contributions carry the recency decay already
                // (scores are decayed to now at read time).
                candidate.add(Feature::Frequency, row.score * w_freq, freq_reason);
                candidate.frequency = candidate.frequency.max(row.score);
                candidate.last_seen_ms = candidate.last_seen_ms.max(row.last_seen_ms);
                candidate.success_count += row.success_count;
                candidate.failure_count += row.failure_count;
            }
        }
        Ok(())
    }

    fn collect_project_tasks(
        &self,
        store: &Store,
        ctx: &SuggestContext,
        candidates: &mut HashMap<String, Candidate>,
    ) -> Result<(), StorageError> {
        if ctx.repo_key.is_empty() {
            return Ok(());
        }
        let opts = NormalizeOptions::default();
        for task in store.project_tasks(&ctx.repo_key)? {
            let norm = prenormalize(&task.command, &AliasMap::new(), &opts);
            let candidate = candidates
                .entry(norm.cmd_norm.clone())
                .or_insert_with(|| {
                    Candidate::new(task.command.clone(), norm.cmd_norm.clone(), norm.template_id.clone())
                });
            candidate.add(Feature::Task, self.cfg.weights.project_task, Reason::ProjectTask);
            if candidate.description.is_empty() {
                candidate.description = task
                    .description
                    .unwrap_or_else(|| format!("{} task", task.kind));
            }
        }
        Ok(())
    }

    fn collect_project_types(
        &self,
        store: &Store,
        ctx: &SuggestContext,
        candidates: &mut HashMap<String, Candidate>,
    ) -> Result<(), StorageError> {
        let w_freq = self.cfg.weights.repo_freq * 0.8;
        let w_trans = self.cfg.weights.repo_trans * 0.7;
        for project_type in &ctx.project_types {
            let rows =
                store.top_project_type_frequencies(project_type, self.cfg.collect_limit, ctx.now_ms)?;
            for row in rows {
                let candidate = candidates
                    .entry(row.cmd_norm.clone())
                    .or_insert_with(|| {
                        Candidate::new(
                            row.cmd_norm.clone(),
                            row.cmd_norm.clone(),
                            row.template_id.clone(),
                        )
                    });
                candidate.add(Feature::ProjectTypeAffinity, row.score * w_freq, Reason::RepoFreq);
                candidate.last_seen_ms = candidate.last_seen_ms.max(row.last_seen_ms);
            }

            if ctx.last_template.as_str().is_empty() {
                continue;
            }
            let rows = store.top_project_type_transitions(
                project_type,
                &ctx.last_template,
                self.cfg.collect_limit,
                ctx.now_ms,
            )?;
            for row in rows {
                let candidate = candidates
                    .entry(row.cmd_norm.clone())
                    .or_insert_with(|| {
                        Candidate::new(
                            row.cmd_norm.clone(),
                            row.cmd_norm.clone(),
                            row.next_template_id.clone(),
                        )
                    });
                let contribution = (1.0 + row.count as f64).ln() * w_trans;
                candidate.add(Feature::ProjectTypeAffinity, contribution, Reason::RepoTrans);
                candidate.last_seen_ms = candidate.last_seen_ms.max(row.last_seen_ms);
            }
        }
        Ok(())
    }

    /// Low-weight static priors for detected project types, only when the
    /// candidate set is sparse and nothing has been typed.
    fn collect_discovery_priors(
        &self,
        ctx: &SuggestContext,
        candidates: &mut HashMap<String, Candidate>,
    ) {
        const PRIOR_WEIGHT: f64 = 5.0;
        for project_type in &ctx.project_types {
            for command in prior_commands(project_type) {
                let norm = prenormalize(command, &AliasMap::new(), &NormalizeOptions::default());
                let candidate = candidates
                    .entry(norm.cmd_norm.clone())
                    .or_insert_with(|| {
                        Candidate::new(
                            (*command).to_string(),
                            norm.cmd_norm.clone(),
                            norm.template_id.clone(),
                        )
                    });
                candidate.add(Feature::Task, PRIOR_WEIGHT, Reason::ProjectTask);
            }
        }
    }

    fn amplify_workflow(
        &self,
        store: &Store,
        expected: &[TemplateId],
        candidates: &mut HashMap<String, Candidate>,
    ) -> Result<(), StorageError> {
        if expected.is_empty() {
            return Ok(());
        }
        let inject_base = 0.5 * self.cfg.weights.global_trans * self.cfg.workflow_boost;
        for template in expected {
            let boosted = candidates
                .values_mut()
                .find(|c| &c.template_id == template)
                .map(|candidate| {
                    candidate.mult *= self.cfg.workflow_boost;
                    if !candidate.reasons.contains(&Reason::WorkflowBoost) {
                        candidate.reasons.push(Reason::WorkflowBoost);
                    }
                })
                .is_some();
            if boosted {
                continue;
            }

            // Inject from the template arena; unknown templates have no text
            // to suggest.
            let Some(row) = store.template(template)? else {
                continue;
            };
            let mut candidate = Candidate::new(
                row.cmd_norm.clone(),
                row.cmd_norm.clone(),
                row.template_id.clone(),
            );
            candidate.add(Feature::Affinity, inject_base, Reason::WorkflowBoost);
            candidate.last_seen_ms = row.last_seen_ms;
            candidates.insert(candidate.cmd_norm.clone(), candidate);
        }
        Ok(())
    }

    fn amplify_pipeline(
        &self,
        store: &Store,
        ctx: &SuggestContext,
        candidates: &mut HashMap<String, Candidate>,
    ) -> Result<(), StorageError> {
        if ctx.last_template.as_str().is_empty() {
            return Ok(());
        }
        for (scope, _, _, _, _) in self.scopes(ctx) {
            for row in store.pipeline_next(scope, &ctx.last_template, ctx.now_ms)? {
                let amount = row.weight * self.cfg.pipeline_weight;
                let candidate = candidates
                    .entry(row.cmd_norm.clone())
                    .or_insert_with(|| {
                        Candidate::new(
                            row.cmd_norm.clone(),
                            row.cmd_norm.clone(),
                            row.next_segment_template.clone(),
                        )
                    });
                candidate.add(Feature::Affinity, amount, Reason::PipelineConf);
                candidate.last_seen_ms = candidate.last_seen_ms.max(row.last_seen_ms);
            }
        }
        Ok(())
    }

    fn amplify_recovery(
        &self,
        store: &Store,
        ctx: &SuggestContext,
        candidates: &mut HashMap<String, Candidate>,
    ) -> Result<(), StorageError> {
        if !ctx.last_failed || ctx.last_template.as_str().is_empty() {
            return Ok(());
        }
        for (scope, _, _, _, _) in self.scopes(ctx) {
            for row in store.recovery_candidates(scope, &ctx.last_template, ctx.last_exit_code, ctx.now_ms)? {
                let boosted = candidates
                    .get_mut(&row.cmd_norm)
                    .map(|candidate| {
                        // Boost once even when several scopes carry the row.
                        if !candidate.reasons.contains(&Reason::RecoveryBoost) {
                            candidate.mult *= self.cfg.recovery_boost;
                            candidate.reasons.push(Reason::RecoveryBoost);
                        }
                    })
                    .is_some();
                if boosted {
                    continue;
                }

                let amount = row.success_rate * row.weight * self.cfg.recovery_boost * 10.0;
                let mut candidate = Candidate::new(
                    row.cmd_norm.clone(),
                    row.cmd_norm.clone(),
                    row.recovery_template_id.clone(),
                );
                candidate.add(Feature::FailureRecovery, amount, Reason::RecoveryBoost);
                candidate.last_seen_ms = row.last_seen_ms;
                candidates.insert(candidate.cmd_norm.clone(), candidate);
            }
        }
        Ok(())
    }

    fn apply_dangerous(&self, candidates: &mut HashMap<String, Candidate>) {
        for candidate in candidates.values_mut() {
            if is_dangerous(&candidate.text) {
                candidate.penalty += self.cfg.dangerous_penalty;
                candidate.contribs[Feature::RiskPenalty.index()] = self.cfg.dangerous_penalty;
                candidate.risk = true;
                if !candidate.reasons.contains(&Reason::Dangerous) {
                    candidate.reasons.push(Reason::Dangerous);
                }
            }
        }
    }

    fn apply_dismissal(
        &self,
        store: &Store,
        ctx: &SuggestContext,
        candidates: &mut HashMap<String, Candidate>,
    ) -> Result<(), StorageError> {
        if ctx.last_template.as_str().is_empty() {
            return Ok(());
        }
        // Feedback is written under the repo scope when present and global
        // otherwise; reads consult both and take the stronger suppression.
        let mut scopes = vec![SCOPE_GLOBAL];
        if !ctx.repo_key.is_empty() {
            scopes.push(ctx.repo_key.as_str());
        }
        for candidate in candidates.values_mut() {
            let mut multiplier = 1.0f64;
            for scope in &scopes {
                let state = store.dismissal_state(scope, &ctx.last_template, &candidate.template_id)?;
                multiplier = multiplier.min(state.score_multiplier());
            }
            if multiplier < 1.0 {
                candidate.mult *= multiplier;
                candidate.suppression = 1.0 - multiplier;
                if !candidate.reasons.contains(&Reason::DismissalPenalty) {
                    candidate.reasons.push(Reason::DismissalPenalty);
                }
            }
        }
        Ok(())
    }

    fn finalize(
        &self,
        profile: &RankWeights,
        ctx: &SuggestContext,
        candidates: HashMap<String, Candidate>,
    ) -> Vec<Suggestion> {
        let mut list: Vec<Candidate> = candidates.into_values().collect();

        // 1. Prefix filter.
        if !ctx.prefix.is_empty() {
            let prefix = ctx.prefix.to_lowercase();
            list.retain_mut(|candidate| {
                match prefix_match(&candidate.text, &prefix, self.cfg.fuzzy_prefix_max) {
                    Some(strength) => {
                        candidate.prefix_strength = strength;
                        true
                    }
                    None => false,
                }
            });
        }

        // 2. Last-command suppression.
        if !ctx.last_raw.is_empty() {
            let simple = simple_normalize(&ctx.last_raw);
            list.retain(|c| c.text != ctx.last_raw && c.text != simple && c.cmd_norm != simple);
        }

        // 4. Near-duplicate suppression: one candidate per template id.
        let mut best: HashMap<TemplateId, (f64, Candidate)> = HashMap::new();
        for candidate in list {
            let score = candidate.score(profile);
            let keep_existing = match best.get(&candidate.template_id) {
                Some((existing, kept)) => {
                    *existing > score || (*existing == score && kept.text <= candidate.text)
                }
                None => false,
            };
            if !keep_existing {
                best.insert(candidate.template_id.clone(), (score, candidate));
            }
        }

        // 3 + 5. Confidence, then the deterministic total order.
        let mut scored: Vec<(f64, Candidate)> = best.into_values().collect();
        scored.sort_by(|(score_a, a), (score_b, b)| {
            score_b
                .total_cmp(score_a)
                .then(b.frequency.total_cmp(&a.frequency))
                .then(b.last_seen_ms.cmp(&a.last_seen_ms))
                .then(a.text.cmp(&b.text))
        });

        // 6. Truncate.
        scored.truncate(self.cfg.clamp_top_k(ctx.max_results));

        scored
            .into_iter()
            .map(|(score, candidate)| {
                let source_share = candidate.reasons.len() as f64 / 20.0;
                let sigmoid = 0.5 / (1.0 + (-score / 50.0).exp());
                let confidence = (source_share + sigmoid).clamp(0.0, 1.0);
                Suggestion {
                    features: candidate.feature_vector(),
                    text: candidate.text,
                    description: candidate.description,
                    source: "engine".to_string(),
                    score,
                    risk: candidate.risk,
                    cmd_norm: candidate.cmd_norm,
                    template_id: candidate.template_id,
                    confidence,
                    reasons: candidate.reasons,
                    frequency: candidate.frequency,
                    last_seen_ms: candidate.last_seen_ms,
                }
            })
            .collect()
    }
}

/// Prefix match strength: 1.0 for a whole-command prefix, 0.8 for a
/// first-token prefix, 0.5 for a close fuzzy match on short prefixes.
fn prefix_match(text: &str, prefix_lower: &str, fuzzy_max: usize) -> Option<f64> {
    let lower = text.to_lowercase();
    if lower.starts_with(prefix_lower) {
        return Some(1.0);
    }
    if let Some(first) = lower.split_whitespace().next() {
        if first.starts_with(prefix_lower) {
            return Some(0.8);
        }
    }
    let prefix_chars: Vec<char> = prefix_lower.chars().collect();
    if prefix_chars.len() <= fuzzy_max {
        let head: String = lower.chars().take(prefix_chars.len()).collect();
        if edit_distance(prefix_lower, &head) <= 1 {
            return Some(0.5);
        }
    }
    None
}

/// Levenshtein edit distance between two strings.
pub(crate) fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut dp = vec![vec![0usize; b.len() + 1]; a.len() + 1];
    for (i, row) in dp.iter_mut().enumerate() {
        row[0] = i;
    }
    for (j, val) in dp[0].iter_mut().enumerate() {
        *val = j;
    }
    for i in 1..=a.len() {
        for j in 1..=b.len() {
            let cost = if a[i - 1] == b[j - 1] { 0 } else { 1 };
            dp[i][j] = (dp[i - 1][j] + 1)
                .min(dp[i][j - 1] + 1)
                .min(dp[i - 1][j - 1] + cost);
        }
    }
    dp[a.len()][b.len()]
}

/// Static command priors per detected project type.
fn prior_commands(project_type: &str) -> &'static [&'static str] {
    match project_type {
        "rust" => &["cargo build", "cargo test", "cargo clippy"],
        "node" => &["npm install", "npm test", "npm run build"],
        "go" => &["go build ./...", "go test ./..."],
        "python" => &["pytest", "pip install -e ."],
        "make" => &["make", "make test"],
        "just" => &["just"],
        _ => &[],
    }
}

#[cfg(test)]
#[path = "scorer_tests.rs"]
mod tests;
