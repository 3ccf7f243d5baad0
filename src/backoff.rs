// MIT License - Copyright (c) 2026 Peter Wright
// Reconnect backoff

use std::time::Duration;

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::constants::{BACKOFF_INITIAL_DELAY, BACKOFF_MAX_DELAY, BACKOFF_MULTIPLIER};

/// Exponential reconnect delay.
///
/// The first attempt after construction or [`reset`](Backoff::reset) never
/// waits. Each later attempt waits the current delay and then doubles it,
/// capped at the maximum.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    multiplier: f64,
    delay: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(BACKOFF_INITIAL_DELAY, BACKOFF_MAX_DELAY, BACKOFF_MULTIPLIER)
    }
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration, multiplier: f64) -> Self {
        Self {
            initial,
            max,
            multiplier,
            delay: initial,
        }
    }

    /// Delay in effect for the next attempt.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Returns how long the upcoming attempt must wait (if at all) and grows
    /// the delay for the one after it.
    pub fn advance(&mut self) -> Option<Duration> {
        let wait = (self.delay > self.initial).then_some(self.delay);
        self.delay = self.delay.mul_f64(self.multiplier).min(self.max);
        wait
    }

    /// Sleeps for the pending delay, returning early if `shutdown` fires.
    pub async fn wait_and_advance(&mut self, shutdown: &CancellationToken) {
        if let Some(wait) = self.advance() {
            info!("Waiting {:?} before reconnecting...", wait);
            tokio::select! {
                _ = shutdown.cancelled() => {}
                _ = sleep(wait) => {}
            }
        }
    }

    pub fn reset(&mut self) {
        self.delay = self.initial;
    }
}
