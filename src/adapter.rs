//! Input adapters
//!
//! Converts the game's click-trail export and plain lane-event streams into
//! validated [`LaneEvent`]s.

use crate::error::ClassifierError;
use crate::types::{LaneEvent, LANE_COUNT};
use serde::{Deserialize, Serialize};

/// Lane names used by the game when a trail does not list its own
pub const DEFAULT_LANE_NAMES: [&str; 5] = ["C", "D", "E", "G", "A"];

/// Lane reference inside a trail point: a lane name or a 1-based index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LaneRef {
    Index(u8),
    Name(String),
}

/// One recorded click
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrailPoint {
    pub lane: LaneRef,
    /// Seconds since the round started
    #[serde(default)]
    pub time_sec: f64,
    #[serde(default = "default_success")]
    pub success: bool,
}

fn default_success() -> bool {
    true
}

/// Click-trail export of one round
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClickTrail {
    #[serde(default = "default_lane_names")]
    pub lanes: Vec<String>,
    #[serde(default)]
    pub points: Vec<TrailPoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_sec: Option<f64>,
}

fn default_lane_names() -> Vec<String> {
    DEFAULT_LANE_NAMES.iter().map(|s| s.to_string()).collect()
}

impl ClickTrail {
    /// Resolve a lane reference to a 1-based lane index
    pub fn resolve_lane(&self, lane: &LaneRef) -> Result<u8, ClassifierError> {
        match lane {
            LaneRef::Index(idx) if (1..=LANE_COUNT).contains(idx) => Ok(*idx),
            LaneRef::Index(idx) => Err(ClassifierError::InvalidLane(format!(
                "lane index {} outside 1..={}",
                idx, LANE_COUNT
            ))),
            LaneRef::Name(name) => self
                .lanes
                .iter()
                .position(|l| l == name)
                .filter(|&pos| pos < LANE_COUNT as usize)
                .map(|pos| pos as u8 + 1)
                .ok_or_else(|| ClassifierError::InvalidLane(format!("unknown lane name '{}'", name))),
        }
    }

    /// Convert the trail to lane events with millisecond timestamps
    pub fn to_events(&self) -> Result<Vec<LaneEvent>, ClassifierError> {
        self.points
            .iter()
            .map(|p| {
                let event = LaneEvent::new(self.resolve_lane(&p.lane)?, p.time_sec * 1000.0, p.success);
                validate_event(&event)?;
                Ok(event)
            })
            .collect()
    }
}

/// Parse a click-trail JSON document
pub fn parse_trail(json: &str) -> Result<ClickTrail, ClassifierError> {
    serde_json::from_str(json)
        .map_err(|e| ClassifierError::ParseError(format!("Failed to parse click trail: {}", e)))
}

/// Parse a click trail and convert it to events
pub fn trail_to_events(json: &str) -> Result<Vec<LaneEvent>, ClassifierError> {
    parse_trail(json)?.to_events()
}

/// Parse a single lane event and check its lane
pub fn parse_event(json: &str) -> Result<LaneEvent, ClassifierError> {
    let event: LaneEvent = serde_json::from_str(json)
        .map_err(|e| ClassifierError::ParseError(format!("Failed to parse lane event: {}", e)))?;
    validate_event(&event)?;
    Ok(event)
}

/// Parse newline-delimited lane events, skipping blank lines
pub fn parse_ndjson(input: &str) -> Result<Vec<LaneEvent>, ClassifierError> {
    input
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(parse_event)
        .collect()
}

/// Parse a JSON array of lane events
pub fn parse_array(input: &str) -> Result<Vec<LaneEvent>, ClassifierError> {
    let events: Vec<LaneEvent> = serde_json::from_str(input)
        .map_err(|e| ClassifierError::ParseError(format!("Failed to parse lane events: {}", e)))?;
    for event in &events {
        validate_event(event)?;
    }
    Ok(events)
}

fn validate_event(event: &LaneEvent) -> Result<(), ClassifierError> {
    if !event.has_valid_lane() {
        return Err(ClassifierError::InvalidLane(format!(
            "lane {} outside 1..={}",
            event.lane, LANE_COUNT
        )));
    }
    if !event.timestamp.is_finite() {
        return Err(ClassifierError::ParseError(
            "timestamp must be a finite number".to_string(),
        ));
    }
    Ok(())
}
