//! Hysteresis gate and label arbitration
//!
//! The sequential label has a two-threshold band: entering requires a high chain
//! ratio, staying only a moderate one. The other labels come from the smoothed
//! probabilities.
//!
//! Arbitration deliberately mixes signals: forced-sequential confidence takes the larger
//! of the smoothed probability and the raw ratio, and the repetitive override gates on
//! the raw `rep_ratio` together with the smoothed `rep` probability.

use crate::config::ClassifierConfig;
use crate::types::{Classification, PatternType, ProbabilityTriple, WindowRatios};
use serde::{Deserialize, Serialize};

/// Label carried between classification calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HysteresisState {
    pub last_pattern: PatternType,
}

impl Default for HysteresisState {
    fn default() -> Self {
        Self {
            last_pattern: PatternType::Mixed,
        }
    }
}

/// Two-threshold gate over {sequential, non-sequential}
#[derive(Debug, Clone, Copy)]
pub struct HysteresisGate {
    on_threshold: f64,
    hold_threshold: f64,
}

impl HysteresisGate {
    pub fn new(on_threshold: f64, hold_threshold: f64) -> Self {
        Self {
            on_threshold,
            hold_threshold,
        }
    }

    pub fn force_sequential(&self, seq_ratio: f64, state: &HysteresisState) -> bool {
        seq_ratio >= self.on_threshold
            || (state.last_pattern == PatternType::Sequential && seq_ratio >= self.hold_threshold)
    }
}

/// Picks the final label from ratios, smoothed probabilities and the gate
#[derive(Debug, Clone, Copy)]
pub struct Arbiter {
    gate: HysteresisGate,
    repetition_ratio_threshold: f64,
    repetition_probability_threshold: f64,
}

impl Default for Arbiter {
    fn default() -> Self {
        Self::from_config(&ClassifierConfig::default())
    }
}

impl Arbiter {
    pub fn from_config(config: &ClassifierConfig) -> Self {
        Self {
            gate: HysteresisGate::new(
                config.sequential_on_threshold,
                config.sequential_hold_threshold,
            ),
            repetition_ratio_threshold: config.repetition_ratio_threshold,
            repetition_probability_threshold: config.repetition_probability_threshold,
        }
    }

    pub fn gate(&self) -> &HysteresisGate {
        &self.gate
    }

    /// Choose a label and record it as the new hysteresis state
    pub fn decide(
        &self,
        ratios: &WindowRatios,
        smoothed: &ProbabilityTriple,
        state: &mut HysteresisState,
    ) -> Classification {
        let classification = if self.gate.force_sequential(ratios.seq_ratio, state) {
            Classification {
                pattern: PatternType::Sequential,
                confidence: smoothed.seq.max(ratios.seq_ratio),
            }
        } else if smoothed.top() == PatternType::Repetitive
            || (ratios.rep_ratio >= self.repetition_ratio_threshold
                && smoothed.rep >= self.repetition_probability_threshold)
        {
            Classification {
                pattern: PatternType::Repetitive,
                confidence: smoothed.rep,
            }
        } else {
            Classification {
                pattern: PatternType::Exploratory,
                confidence: smoothed.exp,
            }
        };

        state.last_pattern = classification.pattern;
        classification
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ratios(seq_ratio: f64, rep_ratio: f64) -> WindowRatios {
        WindowRatios {
            seq_ratio,
            rep_ratio,
            exp_ratio: 0.6,
            distinct_lanes: 3,
            window_len: 12,
        }
    }

    fn state(last_pattern: PatternType) -> HysteresisState {
        HysteresisState { last_pattern }
    }

    #[test]
    fn test_gate_holds_sequential_inside_band() {
        let gate = HysteresisGate::new(0.7, 0.4);
        assert!(gate.force_sequential(0.45, &state(PatternType::Sequential)));
        assert!(!gate.force_sequential(0.35, &state(PatternType::Sequential)));
    }

    #[test]
    fn test_gate_requires_on_threshold_to_enter() {
        let gate = HysteresisGate::new(0.7, 0.4);
        assert!(!gate.force_sequential(0.5, &state(PatternType::Exploratory)));
        assert!(!gate.force_sequential(0.69, &state(PatternType::Mixed)));
        assert!(gate.force_sequential(0.7, &state(PatternType::Exploratory)));
    }

    #[test]
    fn test_forced_sequential_confidence_uses_larger_signal() {
        let arbiter = Arbiter::default();
        let mut st = state(PatternType::Mixed);
        let smoothed = ProbabilityTriple::new(0.5, 0.2, 0.3);

        let out = arbiter.decide(&ratios(0.9, 0.2), &smoothed, &mut st);
        assert_eq!(out.pattern, PatternType::Sequential);
        assert_eq!(out.confidence, 0.9);
        assert_eq!(st.last_pattern, PatternType::Sequential);
    }

    #[test]
    fn test_held_sequential_confidence() {
        let arbiter = Arbiter::default();
        let mut st = state(PatternType::Sequential);
        let smoothed = ProbabilityTriple::new(0.5, 0.2, 0.3);

        let out = arbiter.decide(&ratios(0.45, 0.2), &smoothed, &mut st);
        assert_eq!(out.pattern, PatternType::Sequential);
        assert_eq!(out.confidence, 0.5);
    }

    #[test]
    fn test_repetitive_when_top() {
        let arbiter = Arbiter::default();
        let mut st = HysteresisState::default();
        let out = arbiter.decide(
            &ratios(0.0, 0.4),
            &ProbabilityTriple::new(0.2, 0.45, 0.35),
            &mut st,
        );
        assert_eq!(out.pattern, PatternType::Repetitive);
        assert_eq!(out.confidence, 0.45);
    }

    #[test]
    fn test_repetitive_override_without_top() {
        // Raw rep_ratio and smoothed rep both clear their thresholds
        let arbiter = Arbiter::default();
        let mut st = HysteresisState::default();
        let smoothed = ProbabilityTriple::new(0.51, 0.5, 0.0);
        assert_eq!(smoothed.top(), PatternType::Sequential);

        let out = arbiter.decide(&ratios(0.0, 0.6), &smoothed, &mut st);
        assert_eq!(out.pattern, PatternType::Repetitive);
    }

    #[test]
    fn test_exploratory_fallback_when_sequential_top_not_forced() {
        let arbiter = Arbiter::default();
        let mut st = HysteresisState::default();
        let smoothed = ProbabilityTriple::new(0.5, 0.2, 0.3);

        let out = arbiter.decide(&ratios(0.3, 0.3), &smoothed, &mut st);
        assert_eq!(out.pattern, PatternType::Exploratory);
        assert_eq!(out.confidence, 0.3);
        assert_eq!(st.last_pattern, PatternType::Exploratory);
    }
}
