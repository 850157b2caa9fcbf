//! Round tracking
//!
//! Accumulates classification frames over a round and summarizes them into a
//! report carrying the round's dominant pattern label.

use crate::classifier::PatternClassifier;
use crate::config::ClassifierConfig;
use crate::error::ClassifierError;
use crate::types::{Classification, LaneEvent, PatternAnalysis, PatternType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;
use uuid::Uuid;

/// Summary of one round
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundReport {
    pub round_id: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    /// Classification calls made during the round
    pub frames: u32,
    /// Frames per label, `unknown` included
    pub label_counts: BTreeMap<PatternType, u32>,
    /// Most frequent defined label, `unknown` when none was produced
    pub pattern_label: PatternType,
    /// Mean confidence of the frames carrying `pattern_label`
    pub pattern_confidence: f64,
    pub attempts: u64,
    pub hits: u64,
    pub hit_rate: f64,
}

/// Frame accumulator for a single round
#[derive(Debug, Clone)]
pub struct RoundTracker {
    round_id: String,
    started_at: DateTime<Utc>,
    label_counts: BTreeMap<PatternType, u32>,
    confidence_sums: BTreeMap<PatternType, f64>,
    frames: u32,
}

impl Default for RoundTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl RoundTracker {
    pub fn new() -> Self {
        Self::with_round_id(Uuid::new_v4().to_string())
    }

    pub fn with_round_id(round_id: String) -> Self {
        Self {
            round_id,
            started_at: Utc::now(),
            label_counts: BTreeMap::new(),
            confidence_sums: BTreeMap::new(),
            frames: 0,
        }
    }

    pub fn round_id(&self) -> &str {
        &self.round_id
    }

    pub fn frames(&self) -> u32 {
        self.frames
    }

    pub fn record(&mut self, classification: &Classification) {
        self.frames += 1;
        *self.label_counts.entry(classification.pattern).or_insert(0) += 1;
        *self
            .confidence_sums
            .entry(classification.pattern)
            .or_insert(0.0) += classification.confidence;
    }

    /// Most frequent defined label; ties resolve in label order
    pub fn dominant_pattern(&self) -> PatternType {
        let mut best: Option<(PatternType, u32)> = None;
        for (&pattern, &count) in &self.label_counts {
            if pattern == PatternType::Unknown || pattern == PatternType::Mixed {
                continue;
            }
            if best.map_or(true, |(_, c)| count > c) {
                best = Some((pattern, count));
            }
        }
        best.map(|(p, _)| p).unwrap_or(PatternType::Unknown)
    }

    /// Build a report with the attempt counters of the round's classifier
    pub fn report(&self, attempts: u64, hits: u64) -> RoundReport {
        let pattern_label = self.dominant_pattern();
        let pattern_confidence = match self.label_counts.get(&pattern_label) {
            Some(&count) if count > 0 && pattern_label != PatternType::Unknown => {
                self.confidence_sums.get(&pattern_label).copied().unwrap_or(0.0) / count as f64
            }
            _ => 0.0,
        };
        let hit_rate = if attempts == 0 {
            0.0
        } else {
            hits as f64 / attempts as f64
        };

        RoundReport {
            round_id: self.round_id.clone(),
            started_at: self.started_at,
            ended_at: Utc::now(),
            frames: self.frames,
            label_counts: self.label_counts.clone(),
            pattern_label,
            pattern_confidence,
            attempts,
            hits,
            hit_rate,
        }
    }
}

/// A classifier paired with the tracker of its current round
#[derive(Debug, Clone)]
pub struct RoundSession {
    classifier: PatternClassifier,
    tracker: RoundTracker,
}

impl Default for RoundSession {
    fn default() -> Self {
        Self::new()
    }
}

impl RoundSession {
    pub fn new() -> Self {
        Self {
            classifier: PatternClassifier::new(),
            tracker: RoundTracker::new(),
        }
    }

    pub fn with_config(config: ClassifierConfig) -> Result<Self, ClassifierError> {
        Ok(Self {
            classifier: PatternClassifier::with_config(config)?,
            tracker: RoundTracker::new(),
        })
    }

    pub fn ingest(&mut self, event: LaneEvent) {
        self.classifier.ingest(event);
    }

    /// Classify and record the frame
    pub fn poll(&mut self) -> PatternAnalysis {
        let analysis = self.classifier.analyze();
        self.tracker.record(&analysis.classification);
        analysis
    }

    pub fn classifier(&self) -> &PatternClassifier {
        &self.classifier
    }

    pub fn tracker(&self) -> &RoundTracker {
        &self.tracker
    }

    /// Report on the current round without ending it
    pub fn report(&self) -> RoundReport {
        self.tracker
            .report(self.classifier.attempts(), self.classifier.hits())
    }

    /// Close the round, reset the classifier and start a new round
    pub fn finish_round(&mut self) -> RoundReport {
        let report = self.report();
        info!(
            round_id = %report.round_id,
            pattern = %report.pattern_label,
            frames = report.frames,
            hit_rate = report.hit_rate,
            "round finished"
        );
        self.classifier.reset();
        self.tracker = RoundTracker::new();
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(pattern: PatternType, confidence: f64) -> Classification {
        Classification {
            pattern,
            confidence,
        }
    }

    #[test]
    fn test_dominant_ignores_unknown() {
        let mut tracker = RoundTracker::with_round_id("round-1".to_string());
        for _ in 0..5 {
            tracker.record(&Classification::UNKNOWN);
        }
        tracker.record(&frame(PatternType::Exploratory, 0.4));
        tracker.record(&frame(PatternType::Repetitive, 0.6));
        tracker.record(&frame(PatternType::Repetitive, 0.8));

        assert_eq!(tracker.frames(), 8);
        assert_eq!(tracker.dominant_pattern(), PatternType::Repetitive);

        let report = tracker.report(10, 8);
        assert_eq!(report.round_id, "round-1");
        assert_eq!(report.pattern_label, PatternType::Repetitive);
        assert!((report.pattern_confidence - 0.7).abs() < 1e-12);
        assert_eq!(report.label_counts[&PatternType::Unknown], 5);
        assert!((report.hit_rate - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_empty_round_is_unknown() {
        let report = RoundTracker::new().report(0, 0);
        assert_eq!(report.pattern_label, PatternType::Unknown);
        assert_eq!(report.pattern_confidence, 0.0);
        assert_eq!(report.hit_rate, 0.0);
        assert!(report.ended_at >= report.started_at);
    }

    #[test]
    fn test_session_finish_round_resets() {
        let mut session = RoundSession::new();
        for (i, lane) in [1u8, 2, 3, 4, 5, 1, 2, 3, 4, 5].into_iter().enumerate() {
            session.ingest(LaneEvent::hit(lane, i as f64 * 200.0));
            session.poll();
        }
        let first_id = session.tracker().round_id().to_string();

        let report = session.finish_round();
        assert_eq!(report.frames, 10);
        assert_eq!(report.pattern_label, PatternType::Sequential);
        assert_eq!(report.hits, 10);

        assert_ne!(session.tracker().round_id(), first_id);
        assert_eq!(session.tracker().frames(), 0);
        assert_eq!(session.classifier().attempts(), 0);
        assert!(session.classifier().buffer().is_empty());
    }

    #[test]
    fn test_report_serializes_labels_snake_case() {
        let mut tracker = RoundTracker::new();
        tracker.record(&frame(PatternType::Sequential, 0.9));
        let value = serde_json::to_value(tracker.report(1, 1)).unwrap();
        assert_eq!(value["pattern_label"], "sequential");
        assert_eq!(value["label_counts"]["sequential"], 1);
    }
}
