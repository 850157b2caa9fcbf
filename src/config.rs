//! Classifier configuration
//!
//! Every tuning constant of the pipeline lives here with its default. Missing JSON
//! fields fall back to the defaults, so a partial config file is valid.

use crate::error::ClassifierError;
use serde::{Deserialize, Serialize};

/// Default number of recorded hits kept in the event buffer
pub const DEFAULT_BUFFER_CAPACITY: usize = 16;

/// Default number of most recent hits examined by the detectors
pub const DEFAULT_WINDOW_SIZE: usize = 12;

/// Default lookahead when extending a lane chain
pub const DEFAULT_MAX_CHAIN_GAP: usize = 6;

/// Minimum buffered hits before classification is defined
pub const DEFAULT_MIN_EVENTS: usize = 5;

/// Upper bound on `buffer_capacity`
pub const MAX_BUFFER_CAPACITY: usize = 4096;

/// EMA weight of the previous smoothed triple
pub const DEFAULT_SMOOTHING_ALPHA: f64 = 0.6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub buffer_capacity: usize,
    pub window_size: usize,
    pub max_chain_gap: usize,
    pub min_events: usize,
    pub smoothing_alpha: f64,
    /// seq_ratio that forces the sequential label
    pub sequential_on_threshold: f64,
    /// seq_ratio that keeps an already sequential label
    pub sequential_hold_threshold: f64,
    /// seq_ratio at which sequential raw credit saturates the chain term
    pub sequential_ratio_scale: f64,
    /// rep_ratio at which repetitive raw credit saturates
    pub repetition_ratio_scale: f64,
    /// Raw rep_ratio required for the repetitive override
    pub repetition_ratio_threshold: f64,
    /// Smoothed rep probability required for the repetitive override
    pub repetition_probability_threshold: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            window_size: DEFAULT_WINDOW_SIZE,
            max_chain_gap: DEFAULT_MAX_CHAIN_GAP,
            min_events: DEFAULT_MIN_EVENTS,
            smoothing_alpha: DEFAULT_SMOOTHING_ALPHA,
            sequential_on_threshold: 0.7,
            sequential_hold_threshold: 0.4,
            sequential_ratio_scale: 0.8,
            repetition_ratio_scale: 0.6,
            repetition_ratio_threshold: 0.6,
            repetition_probability_threshold: 0.5,
        }
    }
}

impl ClassifierConfig {
    /// Check value ranges and cross-field constraints
    pub fn validate(&self) -> Result<(), ClassifierError> {
        if self.window_size == 0 {
            return Err(invalid("window_size must be at least 1"));
        }
        if self.buffer_capacity < self.window_size {
            return Err(invalid(format!(
                "buffer_capacity ({}) must be >= window_size ({})",
                self.buffer_capacity, self.window_size
            )));
        }
        if self.buffer_capacity > MAX_BUFFER_CAPACITY {
            return Err(invalid(format!(
                "buffer_capacity ({}) must be <= {}",
                self.buffer_capacity, MAX_BUFFER_CAPACITY
            )));
        }
        if self.max_chain_gap == 0 {
            return Err(invalid("max_chain_gap must be at least 1"));
        }
        if self.max_chain_gap > self.window_size {
            return Err(invalid(format!(
                "max_chain_gap ({}) must be <= window_size ({})",
                self.max_chain_gap, self.window_size
            )));
        }
        if self.min_events == 0 {
            return Err(invalid("min_events must be at least 1"));
        }
        if !(0.0..1.0).contains(&self.smoothing_alpha) {
            return Err(invalid(format!(
                "smoothing_alpha must be in [0, 1), got {}",
                self.smoothing_alpha
            )));
        }
        if self.sequential_hold_threshold > self.sequential_on_threshold {
            return Err(invalid(format!(
                "sequential_hold_threshold ({}) must not exceed sequential_on_threshold ({})",
                self.sequential_hold_threshold, self.sequential_on_threshold
            )));
        }
        if self.sequential_ratio_scale <= 0.0 || self.repetition_ratio_scale <= 0.0 {
            return Err(invalid("ratio scales must be positive"));
        }
        Ok(())
    }

    /// Parse and validate a JSON configuration
    pub fn from_json(json: &str) -> Result<Self, ClassifierError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

fn invalid(msg: impl Into<String>) -> ClassifierError {
    ClassifierError::InvalidConfig(msg.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_is_valid() {
        assert!(ClassifierConfig::default().validate().is_ok());
    }

    #[test]
    fn test_oversized_values_rejected() {
        let gap = ClassifierConfig::from_json(r#"{"max_chain_gap": 18446744073709551615}"#);
        assert!(matches!(gap, Err(ClassifierError::InvalidConfig(_))));

        let gap = ClassifierConfig {
            max_chain_gap: 13,
            ..Default::default()
        };
        assert!(gap.validate().is_err());

        let capacity = ClassifierConfig::from_json(r#"{"buffer_capacity": 18446744073709551615}"#);
        assert!(matches!(capacity, Err(ClassifierError::InvalidConfig(_))));

        let at_limit = ClassifierConfig {
            buffer_capacity: MAX_BUFFER_CAPACITY,
            max_chain_gap: DEFAULT_WINDOW_SIZE,
            ..Default::default()
        };
        assert!(at_limit.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = ClassifierConfig::from_json(r#"{"window_size": 8}"#).unwrap();
        assert_eq!(config.window_size, 8);
        assert_eq!(config.buffer_capacity, DEFAULT_BUFFER_CAPACITY);
        assert_eq!(config.smoothing_alpha, DEFAULT_SMOOTHING_ALPHA);
    }

    #[test]
    fn test_round_trip() {
        let config = ClassifierConfig {
            max_chain_gap: 4,
            ..Default::default()
        };
        let json = config.to_json().unwrap();
        assert_eq!(ClassifierConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_window_larger_than_buffer_rejected() {
        let result = ClassifierConfig::from_json(r#"{"buffer_capacity": 10, "window_size": 12}"#);
        assert!(matches!(result, Err(ClassifierError::InvalidConfig(_))));
    }

    #[test]
    fn test_inverted_hysteresis_band_rejected() {
        let config = ClassifierConfig {
            sequential_on_threshold: 0.3,
            sequential_hold_threshold: 0.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_alpha_out_of_range_rejected() {
        let config = ClassifierConfig {
            smoothing_alpha: 1.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_json() {
        let result = ClassifierConfig::from_json("{not json");
        assert!(matches!(result, Err(ClassifierError::JsonError(_))));
    }
}
