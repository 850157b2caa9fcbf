//! Pattern detectors
//!
//! Three stateless scorers read the recent lane window and each produce a ratio in
//! [0, 1]. Lanes are given in the order they were played (oldest first).

use crate::types::{WindowRatios, LANE_COUNT};

const ASCENDING_CHAIN: [u8; LANE_COUNT as usize] = [1, 2, 3, 4, 5];
const DESCENDING_CHAIN: [u8; LANE_COUNT as usize] = [5, 4, 3, 2, 1];

/// Scores coverage of the window by complete 1→5 or 5→1 lane chains
#[derive(Debug, Clone, Copy)]
pub struct SequentialDetector {
    max_gap: usize,
}

impl SequentialDetector {
    pub fn new(max_gap: usize) -> Self {
        Self { max_gap }
    }

    /// Compute `seq_ratio`
    ///
    /// Formula: `max(|covered_asc|, |covered_desc|) / window_len`
    /// Every 1 seeds an ascending chain and every 5 a descending one. Each step looks
    /// at most `max_gap` positions past the previous match and takes the first hit.
    pub fn score(&self, lanes: &[u8]) -> f64 {
        if lanes.is_empty() {
            return 0.0;
        }

        let covered_asc = self.covered_positions(lanes, &ASCENDING_CHAIN);
        let covered_desc = self.covered_positions(lanes, &DESCENDING_CHAIN);

        covered_asc.max(covered_desc) as f64 / lanes.len() as f64
    }

    /// Number of distinct positions belonging to at least one complete chain
    fn covered_positions(&self, lanes: &[u8], chain: &[u8]) -> usize {
        let mut covered = vec![false; lanes.len()];

        for start in 0..lanes.len() {
            if lanes[start] != chain[0] {
                continue;
            }
            if let Some(matched) = self.extend_chain(lanes, start, chain) {
                for idx in matched {
                    covered[idx] = true;
                }
            }
        }

        covered.iter().filter(|&&c| c).count()
    }

    /// Indices of a complete chain seeded at `start`, if one exists
    fn extend_chain(&self, lanes: &[u8], start: usize, chain: &[u8]) -> Option<Vec<usize>> {
        let mut matched = Vec::with_capacity(chain.len());
        matched.push(start);
        let mut last = start;

        for &expected in &chain[1..] {
            let horizon = last.saturating_add(self.max_gap).min(lanes.len() - 1);
            let next = (last + 1..=horizon).find(|&k| lanes[k] == expected)?;
            matched.push(next);
            last = next;
        }

        Some(matched)
    }
}

/// Scores concentration on a single lane
#[derive(Debug, Clone, Copy, Default)]
pub struct RepetitionDetector;

impl RepetitionDetector {
    /// Compute `rep_ratio`
    ///
    /// Formula: `max(count per lane) / window_len`
    pub fn score(&self, lanes: &[u8]) -> f64 {
        if lanes.is_empty() {
            return 0.0;
        }
        let counts = lane_counts(lanes);
        let max_count = counts.iter().copied().max().unwrap_or(0);
        max_count as f64 / lanes.len() as f64
    }
}

/// Scores breadth of lane coverage
#[derive(Debug, Clone, Copy, Default)]
pub struct ExploratoryDetector;

impl ExploratoryDetector {
    /// Compute `exp_ratio`
    ///
    /// Formula: `distinct_lanes / LANE_COUNT`
    pub fn score(&self, lanes: &[u8]) -> f64 {
        distinct_lanes(lanes) as f64 / LANE_COUNT as f64
    }
}

/// Runs the three detectors over one window
#[derive(Debug, Clone)]
pub struct WindowAnalyzer {
    sequential: SequentialDetector,
    repetition: RepetitionDetector,
    exploratory: ExploratoryDetector,
}

impl WindowAnalyzer {
    pub fn new(max_chain_gap: usize) -> Self {
        Self {
            sequential: SequentialDetector::new(max_chain_gap),
            repetition: RepetitionDetector,
            exploratory: ExploratoryDetector,
        }
    }

    pub fn analyze(&self, lanes: &[u8]) -> WindowRatios {
        WindowRatios {
            seq_ratio: self.sequential.score(lanes),
            rep_ratio: self.repetition.score(lanes),
            exp_ratio: self.exploratory.score(lanes),
            distinct_lanes: distinct_lanes(lanes),
            window_len: lanes.len(),
        }
    }
}

/// Per-lane hit counts, index 0 is lane 1. Off-field lanes are skipped.
fn lane_counts(lanes: &[u8]) -> [usize; LANE_COUNT as usize] {
    let mut counts = [0usize; LANE_COUNT as usize];
    for &lane in lanes {
        if (1..=LANE_COUNT).contains(&lane) {
            counts[(lane - 1) as usize] += 1;
        }
    }
    counts
}

fn distinct_lanes(lanes: &[u8]) -> usize {
    lane_counts(lanes).iter().filter(|&&c| c > 0).count()
}
