// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rank weight profile persistence.
//!
//! Weights are stored as a JSON array so the schema stays fixed if the
//! feature order ever grows. Loads fall back to the default profile on any
//! malformed row (the learner rebuilds it from feedback).

use rusqlite::{params, OptionalExtension};

use clai_core::{RankWeights, FEATURE_COUNT};

use crate::db::{StorageError, Store};

impl Store {
    /// Load the profile for a scope, defaulting when absent.
    pub fn load_profile(&self, scope: &str) -> Result<RankWeights, StorageError> {
        let row: Option<(String, i64, f64)> = self
            .conn
            .query_row(
                "SELECT weights, samples, learning_rate FROM rank_weight_profile WHERE scope = ?1",
                [scope],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        let Some((weights_json, samples, learning_rate)) = row else {
            return Ok(RankWeights::default());
        };

        let weights: Vec<f64> = serde_json::from_str(&weights_json).unwrap_or_default();
        if weights.len() != FEATURE_COUNT {
            tracing::warn!(scope, "malformed rank profile row, using defaults");
            return Ok(RankWeights::default());
        }

        let mut array = [0.0; FEATURE_COUNT];
        array.copy_from_slice(&weights);
        Ok(RankWeights {
            weights: array,
            samples: samples as u64,
            learning_rate,
        })
    }

    /// Persist the profile for a scope.
    pub fn save_profile(
        &self,
        scope: &str,
        profile: &RankWeights,
        now_ms: i64,
    ) -> Result<(), StorageError> {
        let weights_json = serde_json::to_string(&profile.weights.to_vec())?;
        self.conn.execute(
            r#"
            INSERT INTO rank_weight_profile (scope, weights, samples, learning_rate, updated_at_ms)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(scope) DO UPDATE SET
                weights = ?2,
                samples = ?3,
                learning_rate = ?4,
                updated_at_ms = ?5
            "#,
            params![
                scope,
                weights_json,
                profile.samples as i64,
                profile.learning_rate,
                now_ms
            ],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::db::Store;
    use clai_core::RankWeights;

    #[test]
    fn missing_profile_is_default() {
        let store = Store::in_memory().unwrap();
        let profile = store.load_profile("global").unwrap();
        assert_eq!(profile, RankWeights::default());
    }

    #[test]
    fn save_and_load_roundtrip() {
        let store = Store::in_memory().unwrap();
        let mut profile = RankWeights::default();
        profile.weights[0] = 0.25;
        profile.weights[9] = 0.15;
        profile.samples = 42;
        profile.learning_rate = 0.011;
        store.save_profile("/repo", &profile, 1_000).unwrap();
        assert_eq!(store.load_profile("/repo").unwrap(), profile);
    }

    #[test]
    fn save_overwrites() {
        let store = Store::in_memory().unwrap();
        let mut profile = RankWeights::default();
        store.save_profile("global", &profile, 1_000).unwrap();
        profile.samples = 7;
        store.save_profile("global", &profile, 2_000).unwrap();
        assert_eq!(store.load_profile("global").unwrap().samples, 7);
    }
}
