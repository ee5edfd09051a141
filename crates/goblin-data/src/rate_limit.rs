use std::time::Duration;

/// Fixed-interval throttle: every call waits the full interval, with no burst
/// allowance. A zero interval disables it.
#[derive(Debug, Clone, Copy)]
pub struct RateLimiter {
    interval: Duration,
}

impl RateLimiter {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn from_millis(millis: u64) -> Self {
        Self::new(Duration::from_millis(millis))
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub async fn wait(&self) {
        if self.interval.is_zero() {
            return;
        }
        tracing::trace!(interval_ms = self.interval.as_millis() as u64, "Rate limit wait");
        tokio::time::sleep(self.interval).await;
    }
}
