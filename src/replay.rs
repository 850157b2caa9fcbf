//! Replay of recorded rounds
//!
//! Drives a fresh classifier through recorded events the way a polling host would,
//! producing one frame per classification call.

use crate::adapter::trail_to_events;
use crate::config::ClassifierConfig;
use crate::error::ClassifierError;
use crate::session::{RoundReport, RoundSession};
use crate::types::{LaneEvent, PatternAnalysis, PatternType, ProbabilityTriple, WindowRatios};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default host polling period in milliseconds
pub const DEFAULT_POLL_INTERVAL_MS: f64 = 250.0;

/// Most frames a polled replay may produce
pub const MAX_POLL_FRAMES: u64 = 1_000_000;

/// When the replayed host calls `classify`
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReplayMode {
    /// Once per tick, ticks from the first to the last event timestamp inclusive
    Poll { interval_ms: f64 },
    /// After every ingested event
    PerEvent,
}

impl Default for ReplayMode {
    fn default() -> Self {
        ReplayMode::Poll {
            interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

/// One classification call during a replay
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationFrame {
    /// Host time of the call in milliseconds
    pub timestamp: f64,
    #[serde(rename = "type")]
    pub pattern: PatternType,
    pub confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ratios: Option<WindowRatios>,
    pub smoothed: ProbabilityTriple,
}

impl ClassificationFrame {
    pub fn from_analysis(timestamp: f64, analysis: PatternAnalysis) -> Self {
        Self {
            timestamp,
            pattern: analysis.classification.pattern,
            confidence: analysis.classification.confidence,
            ratios: analysis.ratios,
            smoothed: analysis.smoothed,
        }
    }
}

/// Frames and round summary of a replay
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayOutput {
    pub frames: Vec<ClassificationFrame>,
    pub report: RoundReport,
}

/// Replay `events` through a fresh classifier
pub fn replay(
    events: &[LaneEvent],
    config: &ClassifierConfig,
    mode: ReplayMode,
) -> Result<ReplayOutput, ClassifierError> {
    let mut session = RoundSession::with_config(config.clone())?;

    let mut ordered = events.to_vec();
    ordered.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));

    let mut frames = Vec::new();
    match mode {
        ReplayMode::PerEvent => {
            for event in ordered {
                session.ingest(event);
                frames.push(ClassificationFrame::from_analysis(
                    event.timestamp,
                    session.poll(),
                ));
            }
        }
        ReplayMode::Poll { interval_ms } => {
            if !(interval_ms > 0.0 && interval_ms.is_finite()) {
                return Err(ClassifierError::InvalidConfig(format!(
                    "poll interval must be positive, got {}",
                    interval_ms
                )));
            }
            if let (Some(first), Some(last)) = (ordered.first(), ordered.last()) {
                let start = first.timestamp;
                let span = last.timestamp - start;
                if !span.is_finite() {
                    return Err(ClassifierError::InvalidConfig(
                        "event timestamps must be finite".to_string(),
                    ));
                }
                let ticks = (span / interval_ms).ceil();
                if ticks >= MAX_POLL_FRAMES as f64 {
                    return Err(ClassifierError::InvalidConfig(format!(
                        "replay of {} ms at {} ms intervals exceeds {} frames",
                        span, interval_ms, MAX_POLL_FRAMES
                    )));
                }

                let mut pending = ordered.iter().peekable();
                for tick in 0..=ticks as u64 {
                    // The last tick catches every remaining event even when `start` is
                    // too large for the offset to register
                    let now = start + tick as f64 * interval_ms;
                    let is_last = tick == ticks as u64;
                    while let Some(event) = pending.next_if(|e| is_last || e.timestamp <= now) {
                        session.ingest(*event);
                    }
                    frames.push(ClassificationFrame::from_analysis(now, session.poll()));
                }
            }
        }
    }

    debug!(events = events.len(), frames = frames.len(), "replay complete");

    Ok(ReplayOutput {
        frames,
        report: session.report(),
    })
}

/// Replay a click-trail JSON document and return the frames as a JSON array
/// (stateless, one-shot).
pub fn trail_to_frames_json(
    trail_json: &str,
    config: &ClassifierConfig,
    mode: ReplayMode,
) -> Result<String, ClassifierError> {
    let events = trail_to_events(trail_json)?;
    if events.is_empty() {
        return Err(ClassifierError::EmptyTrail);
    }
    let output = replay(&events, config, mode)?;
    serde_json::to_string(&output.frames).map_err(|e| ClassifierError::EncodingError(e.to_string()))
}
