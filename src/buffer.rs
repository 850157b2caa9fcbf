//! Bounded recent-event buffer

use crate::config::MAX_BUFFER_CAPACITY;
use crate::types::LaneEvent;
use std::collections::VecDeque;

/// Newest-first sequence of recorded hits with a fixed capacity
#[derive(Debug, Clone)]
pub struct EventBuffer {
    events: VecDeque<LaneEvent>,
    capacity: usize,
}

impl EventBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(capacity.min(MAX_BUFFER_CAPACITY) + 1),
            capacity,
        }
    }

    /// Insert at the front, evicting the oldest event past capacity
    pub fn push(&mut self, event: LaneEvent) {
        self.events.push_front(event);
        while self.events.len() > self.capacity {
            self.events.pop_back();
        }
    }

    /// Up to `n` most recent events, newest first
    pub fn slice(&self, n: usize) -> Vec<LaneEvent> {
        self.events.iter().take(n).copied().collect()
    }

    /// Lanes of the `n` most recent events in the order they were played
    pub fn recent_lanes_chronological(&self, n: usize) -> Vec<u8> {
        let mut lanes: Vec<u8> = self.events.iter().take(n).map(|e| e.lane).collect();
        lanes.reverse();
        lanes
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
