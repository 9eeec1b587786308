// ABOUTME: Enquire_link bookkeeping for a bound session's heartbeat
// ABOUTME: Tracks pings and pongs; a missed pong is logged, the transport decides when the link is dead

use tokio::time::Instant;
use tracing::{debug, warn};

/// Health counters for the enquire_link heartbeat.
///
/// `consecutive_failures` counts pings that could not be queued plus pings
/// sent while the previous one was still unanswered. It resets on any pong.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeepAliveStatus {
    /// True while the heartbeat timer is armed.
    pub running: bool,
    pub consecutive_failures: u32,
    pub total_pings: u32,
    pub total_pongs: u32,
}

#[derive(Debug, Default)]
pub(crate) struct KeepAlive {
    status: KeepAliveStatus,
    awaiting_pong: bool,
    last_ping: Option<Instant>,
}

impl KeepAlive {
    pub(crate) fn start(&mut self) {
        self.status.running = true;
        self.status.consecutive_failures = 0;
        self.awaiting_pong = false;
    }

    pub(crate) fn stop(&mut self) {
        self.status.running = false;
        self.awaiting_pong = false;
    }

    pub(crate) fn on_ping_sent(&mut self, provider: &str, now: Instant) {
        if self.awaiting_pong {
            self.status.consecutive_failures += 1;
            let silent_for = self.last_ping.map(|last| now.saturating_duration_since(last));
            warn!(
                provider,
                consecutive_failures = self.status.consecutive_failures,
                "no enquire_link_resp since last ping ({silent_for:?})"
            );
        }
        self.awaiting_pong = true;
        self.last_ping = Some(now);
        self.status.total_pings += 1;
        debug!(provider, total = self.status.total_pings, "enquire_link sent");
    }

    pub(crate) fn on_ping_failed(&mut self) {
        self.status.consecutive_failures += 1;
    }

    pub(crate) fn on_pong(&mut self) {
        self.awaiting_pong = false;
        self.status.consecutive_failures = 0;
        self.status.total_pongs += 1;
    }

    pub(crate) fn status(&self) -> KeepAliveStatus {
        self.status.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn unanswered_ping_counts_as_failure() {
        let mut keepalive = KeepAlive::default();
        keepalive.start();
        let now = Instant::now();

        keepalive.on_ping_sent("p", now);
        keepalive.on_ping_sent("p", now + Duration::from_secs(30));
        assert_eq!(keepalive.status().consecutive_failures, 1);

        keepalive.on_pong();
        let status = keepalive.status();
        assert_eq!(status.consecutive_failures, 0);
        assert_eq!(status.total_pings, 2);
        assert_eq!(status.total_pongs, 1);
        assert!(status.running);
    }

    #[test]
    fn stop_clears_running() {
        let mut keepalive = KeepAlive::default();
        keepalive.start();
        keepalive.on_ping_failed();
        keepalive.stop();
        let status = keepalive.status();
        assert!(!status.running);
        assert_eq!(status.consecutive_failures, 1);
    }
}
