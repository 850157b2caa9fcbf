//! Pattern classifier
//!
//! Orchestrates the pipeline from the event buffer to a final label:
//! window → detectors → normalizer → smoother → hysteresis gate + arbiter.
//!
//! The carried state (smoothed triple and hysteresis label) is grouped in
//! [`ClassifierState`] so the transition function [`classify_window`] can be driven
//! directly in tests.

use crate::buffer::EventBuffer;
use crate::config::ClassifierConfig;
use crate::detectors::WindowAnalyzer;
use crate::error::ClassifierError;
use crate::hysteresis::{Arbiter, HysteresisState};
use crate::normalizer::ScoreNormalizer;
use crate::smoother::TemporalSmoother;
use crate::types::{Classification, LaneEvent, PatternAnalysis, PatternType, ProbabilityTriple};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

/// State carried between classification calls
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ClassifierState {
    pub smoothed: ProbabilityTriple,
    pub hysteresis: HysteresisState,
}

/// Stateless pipeline stages built from a configuration
#[derive(Debug, Clone)]
pub struct ClassifierPipeline {
    window_size: usize,
    min_events: usize,
    analyzer: WindowAnalyzer,
    normalizer: ScoreNormalizer,
    smoother: TemporalSmoother,
    arbiter: Arbiter,
}

impl ClassifierPipeline {
    pub fn new(config: &ClassifierConfig) -> Self {
        Self {
            window_size: config.window_size,
            min_events: config.min_events,
            analyzer: WindowAnalyzer::new(config.max_chain_gap),
            normalizer: ScoreNormalizer::from_config(config),
            smoother: TemporalSmoother::new(config.smoothing_alpha),
            arbiter: Arbiter::from_config(config),
        }
    }
}

/// Classify the current buffer contents, advancing `state`
///
/// With fewer than `min_events` buffered hits the result is `unknown` and `state` is
/// left untouched.
pub fn classify_window(
    buffer: &EventBuffer,
    pipeline: &ClassifierPipeline,
    state: &mut ClassifierState,
) -> PatternAnalysis {
    if buffer.len() < pipeline.min_events {
        return PatternAnalysis {
            classification: Classification::UNKNOWN,
            ratios: None,
            instantaneous: None,
            smoothed: state.smoothed,
        };
    }

    let lanes = buffer.recent_lanes_chronological(pipeline.window_size);
    let ratios = pipeline.analyzer.analyze(&lanes);
    let instantaneous = pipeline.normalizer.normalize(&ratios);
    let smoothed = pipeline
        .smoother
        .update(&mut state.smoothed, &instantaneous);

    let previous = state.hysteresis.last_pattern;
    let classification = pipeline
        .arbiter
        .decide(&ratios, &smoothed, &mut state.hysteresis);

    if classification.pattern != previous {
        debug!(
            from = %previous,
            to = %classification.pattern,
            confidence = classification.confidence,
            seq_ratio = ratios.seq_ratio,
            rep_ratio = ratios.rep_ratio,
            "pattern label changed"
        );
    }

    PatternAnalysis {
        classification,
        ratios: Some(ratios),
        instantaneous: Some(instantaneous),
        smoothed,
    }
}

/// Real-time lane pattern classifier for one round
///
/// `ingest`, `classify` and `reset` all take `&mut self`; hosts sharing an instance
/// across threads must wrap it in a mutex.
#[derive(Debug, Clone)]
pub struct PatternClassifier {
    config: ClassifierConfig,
    pipeline: ClassifierPipeline,
    buffer: EventBuffer,
    state: ClassifierState,
    attempts: u64,
    hits: u64,
}

impl Default for PatternClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternClassifier {
    /// Create a classifier with default settings (16 event buffer, 12 event window)
    pub fn new() -> Self {
        Self::from_valid_config(ClassifierConfig::default())
    }

    /// Create a classifier from a validated configuration
    pub fn with_config(config: ClassifierConfig) -> Result<Self, ClassifierError> {
        config.validate()?;
        Ok(Self::from_valid_config(config))
    }

    fn from_valid_config(config: ClassifierConfig) -> Self {
        Self {
            pipeline: ClassifierPipeline::new(&config),
            buffer: EventBuffer::new(config.buffer_capacity),
            state: ClassifierState::default(),
            attempts: 0,
            hits: 0,
            config,
        }
    }

    /// Record an interaction. Only successful, on-field hits enter the buffer.
    pub fn ingest(&mut self, event: LaneEvent) {
        self.attempts += 1;

        if !event.success {
            trace!(lane = event.lane, timestamp = event.timestamp, "miss recorded");
            return;
        }
        if !event.has_valid_lane() {
            warn!(lane = event.lane, timestamp = event.timestamp, "ignoring off-field lane");
            return;
        }

        self.hits += 1;
        self.buffer.push(event);
        trace!(
            lane = event.lane,
            timestamp = event.timestamp,
            buffered = self.buffer.len(),
            "hit recorded"
        );
    }

    /// Current label and confidence. Advances smoothing and hysteresis state.
    pub fn classify(&mut self) -> Classification {
        self.analyze().classification
    }

    /// Like [`classify`](Self::classify) but also returns the intermediate signals
    pub fn analyze(&mut self) -> PatternAnalysis {
        classify_window(&self.buffer, &self.pipeline, &mut self.state)
    }

    /// Restore construction defaults
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.state = ClassifierState::default();
        self.attempts = 0;
        self.hits = 0;
        debug!("classifier reset");
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    pub fn state(&self) -> &ClassifierState {
        &self.state
    }

    pub fn buffer(&self) -> &EventBuffer {
        &self.buffer
    }

    pub fn last_pattern(&self) -> PatternType {
        self.state.hysteresis.last_pattern
    }

    pub fn attempts(&self) -> u64 {
        self.attempts
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    /// Hits over attempts, 0 before any attempt
    pub fn hit_rate(&self) -> f64 {
        if self.attempts == 0 {
            0.0
        } else {
            self.hits as f64 / self.attempts as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn feed(classifier: &mut PatternClassifier, lanes: &[u8]) {
        for (i, &lane) in lanes.iter().enumerate() {
            classifier.ingest(LaneEvent::hit(lane, i as f64 * 250.0));
        }
    }

    #[test]
    fn test_pipeline_takes_tunables_from_config() {
        let config = ClassifierConfig {
            smoothing_alpha: 0.25,
            sequential_on_threshold: 0.8,
            sequential_hold_threshold: 0.5,
            ..Default::default()
        };
        let pipeline = ClassifierPipeline::new(&config);
        assert_eq!(pipeline.smoother.alpha(), 0.25);

        let gate = pipeline.arbiter.gate();
        let held = HysteresisState {
            last_pattern: PatternType::Sequential,
        };
        assert!(!gate.force_sequential(0.75, &HysteresisState::default()));
        assert!(gate.force_sequential(0.8, &HysteresisState::default()));
        assert!(!gate.force_sequential(0.45, &held));
        assert!(gate.force_sequential(0.5, &held));
    }

    #[test]
    fn test_unknown_below_min_events_leaves_state() {
        let mut classifier = PatternClassifier::new();
        feed(&mut classifier, &[1, 2, 3, 4]);

        let out = classifier.classify();
        assert!(out.is_unknown());
        assert_eq!(out, Classification::UNKNOWN);
        assert_eq!(classifier.state(), &ClassifierState::default());
        assert_eq!(classifier.last_pattern(), PatternType::Mixed);
    }

    #[test]
    fn test_ascending_chain_is_sequential() {
        let mut classifier = PatternClassifier::new();
        feed(&mut classifier, &[1, 2, 3, 4, 5, 1, 2, 3, 4, 5]);

        let analysis = classifier.analyze();
        let ratios = analysis.ratios.unwrap();
        assert!((ratios.seq_ratio - 1.0).abs() < 1e-12);
        assert_eq!(analysis.classification.pattern, PatternType::Sequential);
        assert!(analysis.classification.confidence >= 0.7);
    }

    #[test]
    fn test_single_lane_spam_is_repetitive() {
        let mut classifier = PatternClassifier::new();
        feed(&mut classifier, &[3; 10]);

        let analysis = classifier.analyze();
        let ratios = analysis.ratios.unwrap();
        assert_eq!(ratios.rep_ratio, 1.0);
        assert_eq!(ratios.distinct_lanes, 1);
        assert_eq!(analysis.classification.pattern, PatternType::Repetitive);
    }

    #[test]
    fn test_shuffled_spread_is_exploratory() {
        let mut classifier = PatternClassifier::new();
        feed(&mut classifier, &[1, 3, 5, 2, 4, 1, 3, 5, 2, 4]);

        let analysis = classifier.analyze();
        let ratios = analysis.ratios.unwrap();
        assert_eq!(ratios.distinct_lanes, 5);
        assert!((ratios.rep_ratio - 0.2).abs() < 1e-12);
        assert_eq!(ratios.seq_ratio, 0.0);
        assert_eq!(analysis.classification.pattern, PatternType::Exploratory);
    }

    #[test]
    fn test_misses_are_counted_not_buffered() {
        let mut classifier = PatternClassifier::new();
        classifier.ingest(LaneEvent::new(2, 0.0, false));
        classifier.ingest(LaneEvent::hit(2, 10.0));
        classifier.ingest(LaneEvent::hit(9, 20.0));

        assert_eq!(classifier.attempts(), 3);
        assert_eq!(classifier.hits(), 1);
        assert_eq!(classifier.buffer().len(), 1);
        assert!((classifier.hit_rate() - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_reset_restores_defaults_and_is_idempotent() {
        let mut classifier = PatternClassifier::new();
        feed(&mut classifier, &[3; 10]);
        classifier.classify();

        classifier.reset();
        assert_eq!(classifier.state().smoothed, ProbabilityTriple::new(0.33, 0.33, 0.33));
        assert_eq!(classifier.last_pattern(), PatternType::Mixed);
        assert!(classifier.buffer().is_empty());
        assert_eq!(classifier.attempts(), 0);
        assert_eq!(classifier.hit_rate(), 0.0);

        let once = *classifier.state();
        classifier.reset();
        assert_eq!(*classifier.state(), once);
        assert!(classifier.buffer().is_empty());
    }

    #[test]
    fn test_sequential_label_holds_through_noise() {
        let mut classifier = PatternClassifier::new();
        feed(&mut classifier, &[1, 2, 3, 4, 5, 1, 2, 3, 4, 5]);
        assert_eq!(classifier.classify().pattern, PatternType::Sequential);

        // 12-window becomes [3,4,5,1,2,3,4,5,3,3,1,3]: one chain, 5/12 ≈ 0.42 coverage
        feed(&mut classifier, &[3, 3, 1, 3]);
        let analysis = classifier.analyze();
        let seq_ratio = analysis.ratios.unwrap().seq_ratio;
        assert!(seq_ratio >= 0.4 && seq_ratio < 0.7);
        assert_eq!(analysis.classification.pattern, PatternType::Sequential);
    }

    #[test]
    fn test_same_window_without_history_is_not_sequential() {
        let mut classifier = PatternClassifier::new();
        feed(&mut classifier, &[1, 2, 3, 4, 5, 1, 2, 3, 4, 5, 3, 3, 1, 3]);
        assert_ne!(classifier.classify().pattern, PatternType::Sequential);
    }

    #[test]
    fn test_classify_window_drives_explicit_state() {
        let config = ClassifierConfig::default();
        let pipeline = ClassifierPipeline::new(&config);
        let mut buffer = EventBuffer::new(config.buffer_capacity);
        for lane in [3u8; 6] {
            buffer.push(LaneEvent::hit(lane, 0.0));
        }

        let mut state = ClassifierState::default();
        let first = classify_window(&buffer, &pipeline, &mut state);
        let second = classify_window(&buffer, &pipeline, &mut state);

        assert_eq!(state.hysteresis.last_pattern, PatternType::Repetitive);
        assert!(second.smoothed.rep > first.smoothed.rep);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = ClassifierConfig {
            window_size: 0,
            ..Default::default()
        };
        assert!(PatternClassifier::with_config(config).is_err());
    }

    #[test]
    fn test_independent_instances() {
        let mut a = PatternClassifier::new();
        let mut b = PatternClassifier::new();
        feed(&mut a, &[3; 10]);
        a.classify();

        assert_eq!(b.classify(), Classification::UNKNOWN);
        assert_eq!(b.state(), &ClassifierState::default());
    }
}
