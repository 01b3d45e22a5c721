//! Sliding-window rate limiter

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Allows at most `limit` acquisitions in any rolling `window`.
///
/// The caller supplies `now`, which keeps the limiter free of clocks and
/// lets it run under whatever synchronization the owner already holds.
#[derive(Debug, Clone)]
pub struct SlidingWindowRateLimiter {
    limit: usize,
    window: Duration,
    hits: VecDeque<Instant>,
}

impl SlidingWindowRateLimiter {
    pub fn new(limit: usize, window: Duration) -> Self {
        Self {
            limit,
            window,
            hits: VecDeque::with_capacity(limit),
        }
    }

    /// `limit` per rolling hour
    pub fn per_hour(limit: usize) -> Self {
        Self::new(limit, Duration::from_secs(3600))
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Take one slot if the window has room
    pub fn try_acquire(&mut self, now: Instant) -> bool {
        self.evict(now);
        if self.hits.len() >= self.limit {
            return false;
        }
        self.hits.push_back(now);
        true
    }

    /// Slots still free at `now`
    pub fn remaining(&mut self, now: Instant) -> usize {
        self.evict(now);
        self.limit.saturating_sub(self.hits.len())
    }

    fn evict(&mut self, now: Instant) {
        while let Some(&oldest) = self.hits.front() {
            if now.saturating_duration_since(oldest) >= self.window {
                self.hits.pop_front();
            } else {
                break;
            }
        }
    }
}
