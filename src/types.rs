//! Core data types
//!
//! This module defines the events, probability triples and labels that flow through
//! the classification pipeline.

use serde::{Deserialize, Serialize};

/// Number of lanes on the play field
pub const LANE_COUNT: u8 = 5;

/// A single lane interaction reported by the host
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LaneEvent {
    /// Lane index (1-based)
    pub lane: u8,
    /// Monotonic timestamp in milliseconds
    pub timestamp: f64,
    /// Whether the interaction hit its target
    #[serde(default = "default_success")]
    pub success: bool,
}

fn default_success() -> bool {
    true
}

impl LaneEvent {
    pub fn new(lane: u8, timestamp: f64, success: bool) -> Self {
        Self {
            lane,
            timestamp,
            success,
        }
    }

    /// Convenience constructor for a successful hit
    pub fn hit(lane: u8, timestamp: f64) -> Self {
        Self::new(lane, timestamp, true)
    }

    /// Whether the lane index is on the play field
    pub fn has_valid_lane(&self) -> bool {
        (1..=LANE_COUNT).contains(&self.lane)
    }
}

/// Behavioral pattern label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternType {
    Sequential,
    Repetitive,
    Exploratory,
    /// Initial hysteresis value before any defined classification
    Mixed,
    /// Not enough history to classify
    Unknown,
}

impl PatternType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatternType::Sequential => "sequential",
            PatternType::Repetitive => "repetitive",
            PatternType::Exploratory => "exploratory",
            PatternType::Mixed => "mixed",
            PatternType::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for PatternType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Probability mass over the three patterns
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProbabilityTriple {
    pub seq: f64,
    pub rep: f64,
    pub exp: f64,
}

impl ProbabilityTriple {
    /// Construction default of the smoothed triple
    pub const INITIAL: ProbabilityTriple = ProbabilityTriple {
        seq: 0.33,
        rep: 0.33,
        exp: 0.33,
    };

    pub fn new(seq: f64, rep: f64, exp: f64) -> Self {
        Self { seq, rep, exp }
    }

    pub fn sum(&self) -> f64 {
        self.seq + self.rep + self.exp
    }

    /// Component with the highest value; ties resolve in seq, rep, exp order
    pub fn top(&self) -> PatternType {
        let mut best = (PatternType::Sequential, self.seq);
        if self.rep > best.1 {
            best = (PatternType::Repetitive, self.rep);
        }
        if self.exp > best.1 {
            best = (PatternType::Exploratory, self.exp);
        }
        best.0
    }
}

impl Default for ProbabilityTriple {
    fn default() -> Self {
        Self::INITIAL
    }
}

/// Detector outputs for one classification window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowRatios {
    /// Share of the window covered by complete lane chains
    pub seq_ratio: f64,
    /// Share of the window taken by the most frequent lane
    pub rep_ratio: f64,
    /// Distinct lanes over the lane count
    pub exp_ratio: f64,
    /// Number of distinct lanes in the window
    pub distinct_lanes: usize,
    /// Number of events examined
    pub window_len: usize,
}

/// Final label and confidence
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    #[serde(rename = "type")]
    pub pattern: PatternType,
    pub confidence: f64,
}

impl Classification {
    pub const UNKNOWN: Classification = Classification {
        pattern: PatternType::Unknown,
        confidence: 0.0,
    };

    pub fn is_unknown(&self) -> bool {
        self.pattern == PatternType::Unknown
    }
}

/// Classification plus the intermediate signals that produced it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PatternAnalysis {
    pub classification: Classification,
    /// Absent when history was insufficient
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ratios: Option<WindowRatios>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instantaneous: Option<ProbabilityTriple>,
    /// Carried smoothed triple after this call
    pub smoothed: ProbabilityTriple,
}
