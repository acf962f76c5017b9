//! Minimum spacing between API requests.
//!
//! One limiter is shared by every batch worker through the API client, so
//! the spacing holds for the whole run, not per worker.

use bridge_traits::time::Clock;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::trace;

/// Enforces `min_spacing` between the starts of consecutive requests.
pub struct RateLimiter {
    clock: Arc<dyn Clock>,
    min_spacing: Duration,
    previous_start_ms: Option<i64>,
}

impl RateLimiter {
    pub fn new(spacing_ms: u64, clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            min_spacing: Duration::from_millis(spacing_ms),
            previous_start_ms: None,
        }
    }

    /// Wraps a limiter for sharing between workers.
    pub fn shared(spacing_ms: u64, clock: Arc<dyn Clock>) -> SharedRateLimiter {
        Arc::new(Mutex::new(Self::new(spacing_ms, clock)))
    }

    /// Time still owed before the next request may start.
    fn remaining(&self) -> Duration {
        let Some(previous) = self.previous_start_ms else {
            return Duration::ZERO;
        };
        let elapsed = self.clock.unix_timestamp_millis().saturating_sub(previous);
        let elapsed = Duration::from_millis(elapsed.max(0) as u64);
        self.min_spacing.saturating_sub(elapsed)
    }

    pub async fn wait_if_needed(&mut self) {
        let remaining = self.remaining();
        if !remaining.is_zero() {
            trace!(wait_ms = remaining.as_millis() as u64, "Spacing requests");
            sleep(remaining).await;
        }
        self.previous_start_ms = Some(self.clock.unix_timestamp_millis());
    }
}

pub type SharedRateLimiter = Arc<Mutex<RateLimiter>>;
