//! Error types for the lane pattern classifier

use thiserror::Error;

/// Errors raised by the adapters, configuration and embedding layers.
///
/// The classification core itself is total and never returns these.
#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("Failed to parse input: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid lane: {0}")]
    InvalidLane(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Trail contains no events")]
    EmptyTrail,

    #[error("Encoding error: {0}")]
    EncodingError(String),
}
