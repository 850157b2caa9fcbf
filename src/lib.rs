//! Lane Pattern - Real-time play-pattern classifier for lane-based rhythm games
//!
//! A classifier watches successful lane hits (lanes 1-5) and continuously labels the
//! player's recent play as sequential, repetitive or exploratory through a
//! deterministic pipeline: event buffer → detectors → score normalization →
//! temporal smoothing → hysteresis gate and arbitration.
//!
//! ## Modules
//!
//! - **Core**: [`PatternClassifier`] with `ingest` / `classify` / `reset`
//! - **Rounds**: [`RoundSession`] and [`RoundReport`] for per-round summaries
//! - **Replay**: click-trail and event-stream adapters driving offline replays

pub mod adapter;
pub mod buffer;
pub mod classifier;
pub mod config;
pub mod detectors;
pub mod error;
pub mod hysteresis;
pub mod normalizer;
pub mod replay;
pub mod session;
pub mod smoother;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use classifier::{classify_window, ClassifierState, PatternClassifier};
pub use config::ClassifierConfig;
pub use error::ClassifierError;
pub use replay::{replay, trail_to_frames_json, ClassificationFrame, ReplayMode};
pub use session::{RoundReport, RoundSession};
pub use types::{Classification, LaneEvent, PatternAnalysis, PatternType, ProbabilityTriple};

/// Library version
pub const LANES_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name reported by the CLI
pub const PRODUCER_NAME: &str = "lane-pattern";
