// ABOUTME: Reconnect delay policies, pure functions of the attempt number
// ABOUTME: Fixed delay is the default; exponential backoff can be swapped in per session

use std::time::Duration;

/// Decides how long to wait before reconnect attempt `attempt` (1-based).
pub trait ReconnectPolicy: Send + Sync + 'static {
    fn delay(&self, attempt: u32) -> Duration;
}

/// Same delay for every attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedDelay(pub Duration);

impl ReconnectPolicy for FixedDelay {
    fn delay(&self, _attempt: u32) -> Duration {
        self.0
    }
}

/// Doubles the delay per attempt up to `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExponentialBackoff {
    pub initial: Duration,
    pub max: Duration,
}

impl ExponentialBackoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self { initial, max }
    }
}

impl ReconnectPolicy for ExponentialBackoff {
    fn delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.initial
            .checked_mul(1u32 << exponent)
            .map_or(self.max, |delay| delay.min(self.max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_delay_ignores_attempt() {
        let policy = FixedDelay(Duration::from_secs(5));
        assert_eq!(policy.delay(1), Duration::from_secs(5));
        assert_eq!(policy.delay(40), Duration::from_secs(5));
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = ExponentialBackoff::new(Duration::from_secs(1), Duration::from_secs(30));
        assert_eq!(policy.delay(1), Duration::from_secs(1));
        assert_eq!(policy.delay(2), Duration::from_secs(2));
        assert_eq!(policy.delay(5), Duration::from_secs(16));
        assert_eq!(policy.delay(6), Duration::from_secs(30));
        assert_eq!(policy.delay(u32::MAX), Duration::from_secs(30));
    }
}
