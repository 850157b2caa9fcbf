//! Score normalization
//!
//! Reshapes the detector ratios into raw per-pattern credit and normalizes the credit
//! into a probability triple.

use crate::config::ClassifierConfig;
use crate::types::{ProbabilityTriple, WindowRatios, LANE_COUNT};

/// Weight of chain coverage in sequential credit
const SEQ_CHAIN_WEIGHT: f64 = 0.7;

/// Weight of lane diversity in sequential credit
const SEQ_DIVERSITY_WEIGHT: f64 = 0.3;

/// Weight of lane diversity in exploratory credit
const EXP_DIVERSITY_WEIGHT: f64 = 0.7;

/// Weight of non-repetition in exploratory credit
const EXP_SPREAD_WEIGHT: f64 = 0.3;

/// Normalizer for detector ratios
#[derive(Debug, Clone, Copy)]
pub struct ScoreNormalizer {
    sequential_ratio_scale: f64,
    repetition_ratio_scale: f64,
}

impl Default for ScoreNormalizer {
    fn default() -> Self {
        Self::from_config(&ClassifierConfig::default())
    }
}

impl ScoreNormalizer {
    pub fn from_config(config: &ClassifierConfig) -> Self {
        Self {
            sequential_ratio_scale: config.sequential_ratio_scale,
            repetition_ratio_scale: config.repetition_ratio_scale,
        }
    }

    /// Raw credit per pattern before normalization
    ///
    /// - `seq_raw = min(1, (seq_ratio/0.8)*0.7 + (distinct/5)*0.3)`
    /// - `rep_raw = min(1, rep_ratio/0.6)`
    /// - `exp_raw = min(1, (distinct/5)*0.7 + (1-rep_ratio)*0.3)`
    pub fn raw_scores(&self, ratios: &WindowRatios) -> ProbabilityTriple {
        let diversity = ratios.distinct_lanes as f64 / LANE_COUNT as f64;

        let seq = ((ratios.seq_ratio / self.sequential_ratio_scale) * SEQ_CHAIN_WEIGHT
            + diversity * SEQ_DIVERSITY_WEIGHT)
            .min(1.0);
        let rep = (ratios.rep_ratio / self.repetition_ratio_scale).min(1.0);
        let exp = (diversity * EXP_DIVERSITY_WEIGHT + (1.0 - ratios.rep_ratio) * EXP_SPREAD_WEIGHT)
            .min(1.0);

        ProbabilityTriple::new(seq, rep, exp)
    }

    /// Instantaneous probability triple for a window
    pub fn normalize(&self, ratios: &WindowRatios) -> ProbabilityTriple {
        normalize_triple(self.raw_scores(ratios))
    }
}

/// Divide each component by the sum, substituting 1 for a zero sum
pub fn normalize_triple(raw: ProbabilityTriple) -> ProbabilityTriple {
    let total = raw.sum();
    let total = if total == 0.0 { 1.0 } else { total };
    ProbabilityTriple::new(raw.seq / total, raw.rep / total, raw.exp / total)
}
