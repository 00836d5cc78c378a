//! Poll scheduler.
//!
//! Arms and disarms periodic log polling. The stream controller disarms it
//! for the whole life of a live connection, so poll-driven replay never
//! overlaps live dispatch.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone)]
pub struct PollScheduler {
    interval: Duration,
    armed: bool,
}

impl Default for PollScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL)
    }
}

impl PollScheduler {
    /// A disarmed scheduler ticking every `interval`.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            armed: false,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn arm(&mut self) {
        self.armed = true;
    }

    pub fn disarm(&mut self) {
        self.armed = false;
    }

    /// Sleep one interval. Returns false if `stop` fired first.
    pub async fn tick(&self, stop: &CancellationToken) -> bool {
        tokio::select! {
            _ = stop.cancelled() => false,
            _ = tokio::time::sleep(self.interval) => true,
        }
    }
}
