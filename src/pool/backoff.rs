//! Reconnect backoff

use std::time::Duration;

/// Doubling delay between reconnect attempts, bounded by `[min, max]`
///
/// The sequence is `min, 2·min, 4·min, …` capped at `max`: it never drops
/// below `min`, never exceeds `max`, and never decreases until `reset`.
#[derive(Debug, Clone)]
pub struct ReconnectBackoff {
    min: Duration,
    max: Duration,
    next: Duration,
    attempts: u32,
}

impl ReconnectBackoff {
    /// Create a backoff; `max` is raised to `min` if smaller
    pub fn new(min: Duration, max: Duration) -> Self {
        let max = max.max(min);
        Self {
            min,
            max,
            next: min,
            attempts: 0,
        }
    }

    /// Delay to wait before the next attempt
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.next;
        self.next = self
            .next
            .checked_mul(2)
            .map_or(self.max, |doubled| doubled.min(self.max));
        self.attempts = self.attempts.saturating_add(1);
        delay
    }

    /// Attempts made since creation or the last reset
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Start over from the minimum delay
    pub fn reset(&mut self) {
        self.next = self.min;
        self.attempts = 0;
    }
}
