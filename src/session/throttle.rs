// ABOUTME: Per-session submit throughput limiter refilled once per one-second window
// ABOUTME: A coarse cap: up to twice the limit can pass across a window boundary

use std::time::Duration;
use tokio::time::Instant;

const WINDOW: Duration = Duration::from_secs(1);

/// Token bucket that resets to full capacity once a second.
///
/// There is no continuous drip: the whole capacity becomes available again as
/// soon as a second has passed since the window opened.
#[derive(Debug, Clone)]
pub struct TokenBucket {
    capacity: u32,
    tokens: u32,
    window_start: Instant,
}

impl TokenBucket {
    /// A full bucket. A zero limit is treated as one message per second.
    pub fn new(max_per_second: u32, now: Instant) -> Self {
        let capacity = max_per_second.max(1);
        Self {
            capacity,
            tokens: capacity,
            window_start: now,
        }
    }

    /// Takes one token if available.
    pub fn try_acquire(&mut self, now: Instant) -> bool {
        self.refill(now);
        if self.tokens == 0 {
            return false;
        }
        self.tokens -= 1;
        true
    }

    /// How long until the current window rolls over.
    pub fn time_until_refill(&self, now: Instant) -> Duration {
        (self.window_start + WINDOW).saturating_duration_since(now)
    }

    pub fn available(&self) -> u32 {
        self.tokens
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    fn refill(&mut self, now: Instant) {
        if now.saturating_duration_since(self.window_start) >= WINDOW {
            self.tokens = self.capacity;
            self.window_start = now;
        }
    }
}
