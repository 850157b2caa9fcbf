//! Temporal smoothing of probability triples

use crate::types::ProbabilityTriple;

/// First-order exponential moving average over classification calls
///
/// `smoothed_t = alpha * smoothed_{t-1} + (1 - alpha) * instantaneous_t`
#[derive(Debug, Clone, Copy)]
pub struct TemporalSmoother {
    alpha: f64,
}

impl TemporalSmoother {
    pub fn new(alpha: f64) -> Self {
        Self { alpha }
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Blend `instantaneous` into `carried` in place and return the new value
    pub fn update(
        &self,
        carried: &mut ProbabilityTriple,
        instantaneous: &ProbabilityTriple,
    ) -> ProbabilityTriple {
        let keep = self.alpha;
        let take = 1.0 - self.alpha;
        *carried = ProbabilityTriple::new(
            keep * carried.seq + take * instantaneous.seq,
            keep * carried.rep + take * instantaneous.rep,
            keep * carried.exp + take * instantaneous.exp,
        );
        *carried
    }
}
