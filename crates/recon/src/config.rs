use serde::Deserialize;

use crate::error::ReconError;

// ---------------------------------------------------------------------------
// Scoring weights
// ---------------------------------------------------------------------------

/// Weights for the three score components. Must sum to 1.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ScoreWeights {
    pub text: f64,
    pub date: f64,
    pub amount: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            text: 0.5,
            date: 0.2,
            amount: 0.3,
        }
    }
}

// ---------------------------------------------------------------------------
// Engine config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Date distance at which the date component reaches zero.
    pub date_tolerance_days: u32,
    /// Maximum |ledger − statement| amount delta, in minor units.
    pub amount_tolerance_minor: i64,
    /// Minimum weighted total for a fuzzy candidate.
    pub score_threshold: f64,
    /// Bucket width on the date axis, in days.
    pub bucket_window_days: u32,
    /// Bucket width on the amount axis, in minor units.
    pub bucket_amount_granularity: i64,
    /// Largest subset the split resolver will search for.
    pub max_split_group_size: usize,
    /// Node cap for one subset-sum search. Keeps worst-case buckets
    /// tractable; a true split needing more search is left unmatched.
    pub max_search_nodes: usize,
    /// Classify unmatched statement credits with no plausible ledger
    /// counterpart as foreign credits.
    pub classify_foreign_credits: bool,
    pub weights: ScoreWeights,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            date_tolerance_days: 3,
            amount_tolerance_minor: 0,
            score_threshold: 0.70,
            bucket_window_days: 3,
            bucket_amount_granularity: 1000,
            max_split_group_size: 4,
            max_search_nodes: 50_000,
            classify_foreign_credits: true,
            weights: ScoreWeights::default(),
        }
    }
}

const WEIGHT_SUM_EPSILON: f64 = 1e-9;

impl EngineConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: EngineConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if self.amount_tolerance_minor < 0 {
            return Err(ReconError::ConfigValidation(format!(
                "amount_tolerance_minor must be >= 0, got {}",
                self.amount_tolerance_minor
            )));
        }

        if !(0.0..=1.0).contains(&self.score_threshold) {
            return Err(ReconError::ConfigValidation(format!(
                "score_threshold must be in [0, 1], got {}",
                self.score_threshold
            )));
        }

        if self.bucket_window_days == 0 {
            return Err(ReconError::ConfigValidation(
                "bucket_window_days must be >= 1".into(),
            ));
        }

        if self.bucket_amount_granularity <= 0 {
            return Err(ReconError::ConfigValidation(format!(
                "bucket_amount_granularity must be >= 1, got {}",
                self.bucket_amount_granularity
            )));
        }

        if self.max_split_group_size < 2 {
            return Err(ReconError::ConfigValidation(format!(
                "max_split_group_size must be >= 2, got {}",
                self.max_split_group_size
            )));
        }

        if self.max_search_nodes == 0 {
            return Err(ReconError::ConfigValidation(
                "max_search_nodes must be >= 1".into(),
            ));
        }

        let w = &self.weights;
        for (name, value) in [("text", w.text), ("date", w.date), ("amount", w.amount)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ReconError::ConfigValidation(format!(
                    "weights.{name} must be in [0, 1], got {value}"
                )));
            }
        }
        let sum = w.text + w.date + w.amount;
        if (sum - 1.0).abs() > WEIGHT_SUM_EPSILON {
            return Err(ReconError::ConfigValidation(format!(
                "weights must sum to 1, got {sum}"
            )));
        }

        Ok(())
    }

    /// True when the pair of buckets ±1 apart can still hold a true
    /// match: a pair within tolerance on both axes always shares the
    /// ledger record's home bucket (see index module).
    pub fn tolerances_fit_buckets(&self) -> bool {
        u64::from(self.date_tolerance_days) <= u64::from(self.bucket_window_days)
            && self.amount_tolerance_minor <= self.bucket_amount_granularity
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        EngineConfig::default().validate().unwrap();
    }

    #[test]
    fn parse_valid_toml() {
        let config = EngineConfig::from_toml(
            r#"
date_tolerance_days = 5
amount_tolerance_minor = 100
score_threshold = 0.8
bucket_window_days = 7
bucket_amount_granularity = 500
max_split_group_size = 3

[weights]
text = 0.4
date = 0.3
amount = 0.3
"#,
        )
        .unwrap();
        assert_eq!(config.date_tolerance_days, 5);
        assert_eq!(config.amount_tolerance_minor, 100);
        assert_eq!(config.max_split_group_size, 3);
        assert_eq!(config.weights.text, 0.4);
        // Unspecified fields keep their defaults
        assert_eq!(config.max_search_nodes, 50_000);
        assert!(config.classify_foreign_credits);
    }

    #[test]
    fn reject_negative_tolerance() {
        let err = EngineConfig {
            amount_tolerance_minor: -1,
            ..Default::default()
        }
        .validate()
        .unwrap_err();
        assert!(err.to_string().contains("amount_tolerance_minor"));
    }

    #[test]
    fn reject_weights_not_summing_to_one() {
        let err = EngineConfig::from_toml(
            r#"
[weights]
text = 0.5
date = 0.5
amount = 0.5
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("sum to 1"));
    }

    #[test]
    fn reject_out_of_range_threshold() {
        let err = EngineConfig {
            score_threshold: 1.5,
            ..Default::default()
        }
        .validate()
        .unwrap_err();
        assert!(err.to_string().contains("score_threshold"));
    }

    #[test]
    fn reject_split_group_below_two() {
        let err = EngineConfig {
            max_split_group_size: 1,
            ..Default::default()
        }
        .validate()
        .unwrap_err();
        assert!(err.to_string().contains("max_split_group_size"));
    }

    #[test]
    fn reject_unparseable_toml() {
        let err = EngineConfig::from_toml("date_tolerance_days = \"soon\"").unwrap_err();
        assert!(matches!(err, ReconError::ConfigParse(_)));
    }
}
